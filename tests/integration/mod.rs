//! Integration Tests Module
//!
//! End-to-end coverage of the analysis stack: log parsing and chunk
//! selection through the tool router, the agent retry/repair routine, and
//! full pipeline runs against scripted providers.

// Parser, chunk selection, redaction and tool router
mod tools_test;

// Agent call/retry/repair behavior
mod agent_test;

// Full pipeline and tools-only runs
mod pipeline_test;

// Configuration loading
mod config_test;
