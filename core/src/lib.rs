//! Poem generator tool server core.
//!
//! A tool call flows `protocol` → `dispatch` → `prompt` + `orchestrator`;
//! the orchestrator asks the upstream provider (`llm`, retried per `retry`)
//! and falls back to local templates (`fallback`, `acrostic`) when the
//! provider has nothing usable. Nothing here opens a listening socket.

pub mod acrostic;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod protocol;
pub mod registry;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{GenerationMode, ProviderKind, Settings, Transport};
pub use dispatch::{ContentResult, Dispatcher, ToolRequest};
pub use orchestrator::{GenerationResult, Provenance};
pub use protocol::McpHandler;
pub use registry::Registry;
