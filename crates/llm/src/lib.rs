//! Incident Lens LLM
//!
//! Provides the generation-capability abstraction the analysis roles run on:
//! - `LlmProvider` - async trait every backend implements
//! - `types` - flat messages, tool schemas, usage and error types
//! - `salvage` - ordered JSON recovery transforms for malformed replies
//! - `scripted` - replay provider for offline runs and tests
//!
//! Vendor HTTP clients are intentionally not part of this crate.

pub mod provider;
pub mod salvage;
pub mod scripted;
pub mod types;

// Re-export main types
pub use provider::LlmProvider;
pub use salvage::{salvage_json, SalvageStep};
pub use scripted::{ScriptEntry, ScriptedProvider};
pub use types::*;
