//! Data Models
//!
//! Contains the role outputs, the final report, run metrics and settings.

pub mod critique;
pub mod hypothesis;
pub mod metrics;
pub mod report;
pub mod settings;

pub use critique::*;
pub use hypothesis::*;
pub use metrics::*;
pub use report::*;
pub use settings::*;
