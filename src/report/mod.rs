//! Reporting Module
//!
//! Turns closed pool windows into text reports. Each line is a metric name
//! followed by its values:
//!
//! ```text
//! keyheat.keys.user get 1520
//! keyheat.keys.session set 87
//! keyheat.errors.match_error 12
//! ```

pub mod reporter;

// Re-export commonly used types
pub use reporter::{render, ReportConfig, Reporter};
