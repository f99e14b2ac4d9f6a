//! Arena runner — wires the negotiation engine to real transports.
//!
//! The library half of the runner: configuration, the HTTP reasoning
//! client, the scripted replay service, and the JSON-file store. The binary
//! in `main.rs` glues these to the arena and streams the negotiation to the
//! terminal.

pub mod config;
pub mod http;
pub mod json_store;
pub mod scripted;

pub use config::{check_endpoint, RunnerConfig};
pub use http::HttpReasoningService;
pub use json_store::JsonFileStore;
pub use scripted::ScriptedReasoningService;
