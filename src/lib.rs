//! # keyheat - Hot Key Analysis for memcached
//!
//! keyheat watches memcached request traffic passively, without talking to
//! the server, and reports which keys (or which families of keys) are hit
//! most often in each reporting window.
//!
//! ## Features
//!
//! - **Passive**: Reads packets from a live interface or a pcap capture
//! - **Pattern Grouping**: Collapses keys into named families with regexes
//! - **Error Accounting**: Counts malformed requests by kind
//! - **Concurrent**: Ingestion and reporting share sharded, rotatable pools
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               keyheat                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Packet    │───>│  Ingestor   │───>│  Command    │                  │
//! │  │   Source    │    │  (thread)   │    │  Parser     │                  │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘                  │
//! │                            │ classify                                   │
//! │                            ▼                                            │
//! │           ┌─────────────────────────┐  ┌─────────────────────────┐      │
//! │           │   HotKeyPool (keys)     │  │   HotKeyPool (errors)   │      │
//! │           │ ┌──────┐┌──────┐┌────┐  │  │ ┌──────┐┌──────┐┌────┐  │      │
//! │           │ │Shard0││Shard1││..15│  │  │ │Shard0││Shard1││..15│  │      │
//! │           │ └──────┘└──────┘└────┘  │  │ └──────┘└──────┘└────┘  │      │
//! │           └────────────┬────────────┘  └────────────┬────────────┘      │
//! │                        │ rotate                     │ rotate            │
//! │                        ▼                            ▼                   │
//! │                     ┌──────────────────────────────────┐                │
//! │                     │     Reporter (Tokio task)        │──> stdout/file │
//! │                     └──────────────────────────────────┘                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use keyheat::capture::PcapReader;
//! use keyheat::{HotKeyPool, Ingestor, KeyClassifier, ReportConfig, Reporter};
//! use std::fs::File;
//! use std::io::BufReader;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let keys = Arc::new(HotKeyPool::new());
//!     let errors = Arc::new(HotKeyPool::new());
//!
//!     let classifier = KeyClassifier::new([("^user_", "user")])?;
//!     let ingestor = Ingestor::new(Arc::clone(&keys), Arc::clone(&errors), classifier, false);
//!     let reporter = Reporter::start(keys, errors, ReportConfig::default());
//!
//!     let mut source = PcapReader::new(BufReader::new(File::open("memcached.pcap")?), 11211)?;
//!     ingestor.run(&mut source)?;
//!
//!     reporter.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`capture`]: Packet sources and link-layer decoding
//! - [`protocol`]: memcached text protocol request parser
//! - [`classifier`]: Regex key classification
//! - [`pool`]: Windowed, sharded hit counters
//! - [`ingest`]: Glue from payloads to pools
//! - [`report`]: Periodic report rendering and output
//! - [`config`]: JSON configuration and command-line overrides
//!
//! ## Design Highlights
//!
//! ### Rotation
//!
//! A pool swaps its whole epoch under a write lock. Recording holds the read
//! side, so a batch of observations lands entirely in one window and nothing
//! recorded is ever dropped between windows.
//!
//! ### No Reassembly
//!
//! Each captured TCP segment is parsed on its own. A command split across
//! segments shows up as a `truncated` error plus whatever the tail parses as.

pub mod capture;
pub mod classifier;
pub mod config;
pub mod ingest;
pub mod pool;
pub mod protocol;
pub mod report;

// Re-export commonly used types for convenience
pub use capture::{CaptureError, PacketSource, PcapReader};
pub use classifier::{ClassifierError, KeyClassifier};
pub use config::{Config, ConfigError, ConfigOverrides};
pub use ingest::{IngestStats, Ingestor};
pub use pool::{HotKeyEntry, HotKeyPool, Observation, ReportLimit, Snapshot};
pub use protocol::{Command, ParseError, Verb};
pub use report::{ReportConfig, Reporter};

/// The default memcached port
pub const DEFAULT_PORT: u16 = 11211;

/// The default capture interface (all interfaces)
pub const DEFAULT_INTERFACE: &str = "any";

/// The default reporting interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

/// The default number of keys per report
pub const DEFAULT_NUM_ITEMS: usize = 20;

/// The default metric namespace
pub const DEFAULT_NAMESPACE: &str = "keyheat";

/// Version of keyheat
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
