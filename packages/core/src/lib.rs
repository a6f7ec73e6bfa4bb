//! Core library for Cloelia, the symbolic-emotion service.
//!
//! This crate holds everything that does not touch the network or disk: the
//! record types, input validation, the dominant-emotion rule, the symbolic
//! emotion/virtue graph, and plain-text rendering. It is shared by the node
//! (`cloelia-node`), its HTTP type layer (`cloelia-node-api`), and the CLI.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | [`EmotionRecord`], [`VirtueEntry`], [`SymbolicTrigger`], log entry types |
//! | [`validation`] | Input checks and normalisation |
//! | [`pattern`] | [`dominant_emotion`] and narration file naming |
//! | [`graph`] | [`SymbolicGraph`]: emotions, virtues, shortest paths |
//! | [`render`] | Terminal rendering for the CLI |
//!
//! # Quick start
//!
//! ```rust
//! use cloelia::{dominant_emotion, SymbolicGraph};
//!
//! let recent = ["anger", "anger", "fear", "anger", "happiness"];
//! let dominant = dominant_emotion(&recent).unwrap();
//! assert_eq!(dominant, "anger");
//!
//! let graph = SymbolicGraph::new();
//! assert_eq!(graph.virtues_for(dominant), vec!["patience"]);
//! ```

pub mod graph;
pub mod pattern;
pub mod render;
pub mod types;
pub mod validation;

pub use graph::{NodeKind, SymbolicGraph};
pub use pattern::{dominant_emotion, narration_file, RECENT_WINDOW};
pub use types::{
    ActionType, EmotionRecord, FirewallLogEntry, NewEmotionRecord, NewTrigger, SymbolicMemoryEntry,
    SymbolicTrigger, VirtueEntry,
};
pub use validation::{
    normalize_emotion, prepare_emotion_record, prepare_message, validate_user_id, ValidationError,
};
