//! Node configuration, populated from environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors that stop the node from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CLOELIA_BIND must be a valid socket address (e.g. 0.0.0.0:8000), got {0:?}")]
    InvalidBind(String),

    #[error("{0} is not set")]
    MissingKey(&'static str),
}

/// Runtime configuration for a Cloelia node.
///
/// A `.env` file in the working directory is loaded first (if present); real
/// environment variables take precedence over it.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `CLOELIA_BIND` | `0.0.0.0:8000` | TCP socket address to listen on |
/// | `CLOELIA_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `CLOELIA_LOG_DIR` | `logs` | Directory for the firewall and symbolic logs |
/// | `CLOELIA_AUDIO_DIR` | `static/audio/responses` | Where generated replies are written |
/// | `CLOELIA_RATE_LIMIT_PER_MINUTE` | `10` | Requests per IP per window before 429 (0 = off) |
/// | `CLOELIA_RATE_WINDOW_SECS` | `60` | Sliding window length |
/// | `CLOELIA_TRUST_PROXY` | `false` | Read the client IP from `X-Forwarded-For` / `X-Real-IP` |
/// | `CLOELIA_EXTERNAL_TIMEOUT_SECS` | `30` | Timeout for text generation and speech synthesis |
/// | `CLOELIA_LLM_BRIDGE` | (absent) | Command whose whole stdout is one `{"content": ...}` object |
/// | `OPENAI_KEY` / `OPENAI_API_KEY` | (required without a bridge) | Chat completions API key |
/// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` | Chat completions API base |
/// | `CLOELIA_LLM_MODEL` | `gpt-4o` | Model name sent to the chat completions API |
/// | `ELEVENLABS_KEY` | (required) | Text-to-speech API key |
/// | `ELEVENLABS_VOICE_ID` | `EXAVITQu4vr4xnSDxMaL` | Voice used for narration |
/// | `ELEVENLABS_BASE_URL` | `https://api.elevenlabs.io/v1` | Text-to-speech API base |
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    pub log_dir: PathBuf,
    pub audio_dir: PathBuf,

    /// Requests allowed per IP inside one window. `0` disables rejection
    /// (requests are still logged).
    pub rate_limit_per_minute: u32,
    pub rate_window_secs: u64,

    /// Trust `X-Forwarded-For` / `X-Real-IP`. Only enable behind a proxy
    /// that overwrites them.
    pub trust_proxy: bool,

    pub external_timeout_secs: u64,

    /// When set, text generation runs this command instead of calling the
    /// chat completions API directly.
    pub llm_bridge: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub llm_model: String,

    pub elevenlabs_api_key: String,
    pub elevenlabs_voice_id: String,
    pub elevenlabs_base_url: String,
}

impl NodeConfig {
    pub const DEFAULT_VOICE_ID: &'static str = "EXAVITQu4vr4xnSDxMaL";

    /// Populate config from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is the normal case in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Populate config from an arbitrary key lookup, applying defaults where
    /// absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = var("CLOELIA_BIND").unwrap_or_else(|| "0.0.0.0:8000".into());
        let bind_addr: SocketAddr = bind_raw
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_raw.clone()))?;

        let parsed_u64 = |key: &str, default: u64| {
            var(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let llm_bridge = var("CLOELIA_LLM_BRIDGE");
        let openai_api_key = var("OPENAI_KEY").or_else(|| var("OPENAI_API_KEY"));
        if llm_bridge.is_none() && openai_api_key.is_none() {
            return Err(ConfigError::MissingKey("OPENAI_KEY"));
        }

        let elevenlabs_api_key =
            var("ELEVENLABS_KEY").ok_or(ConfigError::MissingKey("ELEVENLABS_KEY"))?;

        Ok(Self {
            bind_addr,
            db_path: var("CLOELIA_DB"),
            log_dir: var("CLOELIA_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
            audio_dir: var("CLOELIA_AUDIO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static/audio/responses")),
            rate_limit_per_minute: var("CLOELIA_RATE_LIMIT_PER_MINUTE")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(10),
            rate_window_secs: parsed_u64("CLOELIA_RATE_WINDOW_SECS", 60).max(1),
            trust_proxy: var("CLOELIA_TRUST_PROXY")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            external_timeout_secs: parsed_u64("CLOELIA_EXTERNAL_TIMEOUT_SECS", 30).max(1),
            llm_bridge,
            openai_api_key,
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".into()),
            llm_model: var("CLOELIA_LLM_MODEL").unwrap_or_else(|| "gpt-4o".into()),
            elevenlabs_api_key,
            elevenlabs_voice_id: var("ELEVENLABS_VOICE_ID")
                .unwrap_or_else(|| Self::DEFAULT_VOICE_ID.into()),
            elevenlabs_base_url: var("ELEVENLABS_BASE_URL")
                .unwrap_or_else(|| "https://api.elevenlabs.io/v1".into()),
        })
    }

    /// A self-contained config rooted at `data_dir`, with placeholder API
    /// keys. Used by tests and the end-to-end suite.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            db_path: None,
            log_dir: data_dir.join("logs"),
            audio_dir: data_dir.join("audio"),
            rate_limit_per_minute: 10,
            rate_window_secs: 60,
            trust_proxy: true,
            external_timeout_secs: 5,
            llm_bridge: None,
            openai_api_key: Some("test-openai-key".into()),
            openai_base_url: "http://127.0.0.1:9/v1".into(),
            llm_model: "gpt-4o".into(),
            elevenlabs_api_key: "test-elevenlabs-key".into(),
            elevenlabs_voice_id: Self::DEFAULT_VOICE_ID.into(),
            elevenlabs_base_url: "http://127.0.0.1:9/v1".into(),
        }
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs)
    }

    pub fn firewall_log_path(&self) -> PathBuf {
        self.log_dir.join("firewall_log.jsonl")
    }

    pub fn symbolic_log_path(&self) -> PathBuf {
        self.log_dir.join("symbolic_log.jsonl")
    }
}
