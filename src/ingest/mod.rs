//! Ingestion Module
//!
//! This module connects the packet source to the pools. It runs on its own
//! blocking thread for the lifetime of the process, concurrently with the
//! reporting loop.
//!
//! ## Example
//!
//! ```
//! use keyheat::classifier::KeyClassifier;
//! use keyheat::ingest::Ingestor;
//! use keyheat::pool::{HotKeyPool, ReportLimit};
//! use std::sync::Arc;
//!
//! let keys = Arc::new(HotKeyPool::new());
//! let errors = Arc::new(HotKeyPool::new());
//! let ingestor = Ingestor::new(Arc::clone(&keys), Arc::clone(&errors), KeyClassifier::default(), false);
//!
//! ingestor.ingest(b"get a b\r\nget a\r\n");
//!
//! let top = keys.rotate().top(ReportLimit::Top(1));
//! assert_eq!(top[0].name, "a");
//! assert_eq!(top[0].hits, 2);
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{IngestStats, Ingestor};
