//! Request and response types for the Cloelia HTTP API.
//!
//! Shared by the node (`cloelia-node`), the CLI, and the end-to-end test
//! suite so that all three agree on the wire format.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET | `/` | → [`MessageResponse`] |
//! | GET | `/cloelia/` | → [`StatusResponse`] |
//! | GET | `/db/test` | → [`DbStatusResponse`] |
//! | POST | `/log-emotion` | [`LogEmotionRequest`] → [`MessageResponse`] |
//! | POST | `/analyze-emotion` | [`AnalyzeRequest`] → [`AnalyzeResponse`] |
//! | GET | `/firewall-log` | → [`FirewallLogResponse`] |
//! | GET | `/trigger-feed` | → [`TriggerFeedResponse`] |
//! | POST | `/gpt/generate-response` | [`GenerateRequest`] → [`GenerateResponse`] |
//! | GET | `/gpt/audio/{filename}` | → `audio/mpeg` bytes |
//! | GET | `/graph/virtues/{emotion}` | → [`VirtuesResponse`] |
//! | GET | `/graph/path` | [`PathQuery`] → [`PathResponse`] |
//! | GET | `/triggers/{trigger_id}` | → [`cloelia::SymbolicTrigger`] |
//! | GET | `/users/{user_id}/triggers` | [`TriggerListQuery`] → [`TriggerListResponse`] |
//!
//! Every error is an [`ErrorResponse`].

pub mod emotion;
pub mod error;
pub mod graph;
pub mod health;
pub mod log;
pub mod reply;
pub mod triggers;

pub use emotion::{AnalyzeRequest, AnalyzeResponse, LogEmotionRequest, MessageResponse};
pub use error::{codes, ErrorResponse};
pub use graph::{PathQuery, PathResponse, VirtuesResponse};
pub use health::{DbStatusResponse, StatusResponse};
pub use log::{FirewallLogResponse, TriggerFeedResponse};
pub use reply::{GenerateRequest, GenerateResponse, ReplyBody};
pub use triggers::{TriggerListQuery, TriggerListResponse};
