//! Utilities
//!
//! Common utilities used throughout the application.

pub mod error;

pub use error::*;
