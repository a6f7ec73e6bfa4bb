//! Public surface for the `cloelia-node` crate.
//!
//! Exposes the app builder, config, storage and reply seams so that external
//! crates (e.g. the end-to-end suite) can spin up an in-process node without
//! spawning a subprocess or calling real text and speech services.

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod reply;
pub mod request_log;
pub mod router;
pub mod storage;

pub use config::NodeConfig;
pub use reply::{ReplyError, SpeechSynthesizer, TextGenerator};
pub use router::{build_app, build_router, App};
pub use storage::{memory::MemoryStorage, seed_default_virtues, Storage};
