//! Key Classification
//!
//! Caches often hold one key per user, session or item, which makes raw key
//! reports unbounded. The classifier collapses such keys into a small set of
//! logical names using ordered, named regular expressions.
//!
//! ```text
//! "user_1842"      ──┐
//! "user_77"        ──┼──> ^user_.*   ──> "user"
//! "user_90210"     ──┘
//! "session:ab12"   ─────> ^session:  ──> "session"
//! "config"         ─────> (no match) ──> unmatched
//! ```

pub mod patterns;

pub use patterns::{ClassifierError, KeyClassifier, NamedPattern};

/// Name recorded in the error pool for keys no pattern matched.
pub const MATCH_ERROR: &str = "match_error";
