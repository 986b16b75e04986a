//! Services
//!
//! Analysis logic, from chunk selection through persisted artifacts.

pub mod agents;
pub mod chunking;
pub mod conversation;
pub mod orchestrator;
pub mod persistence;
pub mod redaction;
pub mod replay;
pub mod samples;

pub use agents::{Agent, AgentError, AgentResponse, AgentRole, AnalyzerRole, CriticRole};
pub use chunking::{select_best_chunk, ChunkSource, SelectedChunk};
pub use conversation::{ConversationExport, ConversationState};
pub use orchestrator::{run_pipeline, run_tools_only, EventSink, PipelineInputs, PipelineOutcome};
pub use persistence::{ArtifactPaths, ArtifactWriter};
pub use redaction::{redact_entries, redact_text};
pub use replay::ReplayScript;
pub use samples::{write_sample_files, SampleFiles};
