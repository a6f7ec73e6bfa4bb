//! Shared helpers for the Cloelia end-to-end test suite.
//!
//! Provides [`spawn_node`], which binds a `TcpListener` on an ephemeral port,
//! wires up an in-process node backed by `MemoryStorage` with stub text and
//! speech services, and returns a [`TestNode`] so tests can seed data without
//! going through the HTTP layer.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use cloelia_node::{
    build_app, config::NodeConfig, seed_default_virtues, MemoryStorage, ReplyError,
    SpeechSynthesizer, Storage, TextGenerator,
};
use serde_json::{json, Value};

/// Bytes every stub narration contains.
pub const STUB_AUDIO: &[u8] = b"ID3\x04\x00stub-narration";

/// Replies with `"Reflect: <first line of prompt>"`.
pub struct StubGenerator;

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<Value, ReplyError> {
        let first = prompt.lines().next().unwrap_or_default();
        Ok(json!({ "role": "assistant", "content": format!("Reflect: {first}") }))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Always returns the same (possibly malformed) output.
pub struct CannedGenerator(pub Value);

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Value, ReplyError> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}

pub struct StubSynthesizer;

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ReplyError> {
        Ok(STUB_AUDIO.to_vec())
    }
}

/// A running in-process node. Dropping it removes its data directory.
pub struct TestNode {
    /// e.g. `http://127.0.0.1:51234`
    pub base_url: String,
    pub storage: Arc<MemoryStorage>,
    data_dir: tempfile::TempDir,
}

impl TestNode {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.path().join("audio")
    }
}

/// Start an ephemeral node with rate limiting off and the stub generator.
pub async fn spawn_node() -> TestNode {
    spawn_node_with(0, Arc::new(StubGenerator)).await
}

/// Start an ephemeral in-process node.
///
/// The node runs in a background `tokio` task bound to an OS-assigned port on
/// `127.0.0.1`, and sees each client's real TCP peer address.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the node fails to start.
pub async fn spawn_node_with(rate_limit: u32, generator: Arc<dyn TextGenerator>) -> TestNode {
    let data_dir = tempfile::tempdir().expect("create data dir");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{addr}");

    let mem_storage = Arc::new(MemoryStorage::new());
    let storage: Arc<dyn Storage> = Arc::clone(&mem_storage) as Arc<dyn Storage>;
    seed_default_virtues(storage.as_ref())
        .await
        .expect("seed virtues");

    let mut config = NodeConfig::for_data_dir(data_dir.path());
    config.bind_addr = addr;
    config.rate_limit_per_minute = rate_limit;
    config.trust_proxy = false;

    let app = build_app(config, storage, generator, Arc::new(StubSynthesizer))
        .expect("build node");

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test node error");
    });

    TestNode {
        base_url,
        storage: mem_storage,
        data_dir,
    }
}
