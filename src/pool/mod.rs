//! Hot Key Pool Module
//!
//! This module provides the windowed counter at the heart of keyheat. The
//! ingestion loop records observations into the open epoch; the reporting
//! loop periodically rotates the pool and ranks the closed epoch.
//!
//! ## Architecture
//!
//! ```text
//!   Ingestion loop                        Reporting loop
//!        │                                      │
//!        │ record([(name, command)])            │ rotate()
//!        ▼                                      ▼
//! ┌──────────────────────────┐   swap   ┌──────────────────────────┐
//! │  HotKeyPool (open epoch) │ ───────> │  Snapshot (closed epoch) │
//! └──────────────────────────┘          └────────────┬─────────────┘
//!                                                    │ top(limit)
//!                                                    ▼
//!                                          BinaryHeap, best first
//! ```

pub mod hot_keys;
pub mod snapshot;

// Re-export commonly used types
pub use hot_keys::{HotKeyPool, Observation, PoolStats};
pub use snapshot::{HotKeyEntry, RankedEntries, ReportLimit, Snapshot};
