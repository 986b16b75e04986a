//! Storage Layer
//!
//! Configuration loading. Run artifacts are written by
//! `services::persistence`.

pub mod config;

pub use config::*;
