//! Payload Ingestion
//!
//! The [`Ingestor`] binds the parser, the classifier and the two pools. For
//! each captured payload it drains every pipelined command and records what
//! it finds:
//!
//! ```text
//! payload ──> parse ──┬── Ok(command) ──┬── no patterns ──> key pool (raw key)
//!   ▲                 │                 │
//!   │                 │                 └── classify ──┬── match ──> key pool (name)
//!   │                 │                                ├── unmatched, shown ──> key pool (raw key)
//!   │                 │                                └── unmatched ──> error pool "match_error"
//!   │                 └── Err(kind) ──> error pool (kind label)
//!   └──────── remainder
//! ```
//!
//! Error entries carry an empty command so that each error kind is counted
//! once regardless of the verb that produced it.

use crate::capture::{CaptureError, PacketSource};
use crate::classifier::{KeyClassifier, MATCH_ERROR};
use crate::pool::{HotKeyPool, Observation};
use crate::protocol::{commands, Command, ParseError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Command recorded alongside error entries
const NO_COMMAND: &str = "";

/// Statistics for payload ingestion
#[derive(Debug, Default)]
pub struct IngestStats {
    /// Payloads handed to the ingestor
    pub payloads: AtomicU64,
    /// Payload bytes handed to the ingestor
    pub bytes: AtomicU64,
    /// Commands parsed successfully
    pub commands: AtomicU64,
    /// Commands that failed to parse
    pub parse_errors: AtomicU64,
    /// Observations recorded into the key pool
    pub keys_recorded: AtomicU64,
    /// Keys no pattern matched
    pub unmatched: AtomicU64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn payload_seen(&self, len: usize) {
        self.payloads.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    fn command_parsed(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    fn parse_failed(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn keys_recorded(&self, count: usize) {
        self.keys_recorded
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    fn unmatched(&self, count: usize) {
        self.unmatched.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Routes parsed commands into the key and error pools.
pub struct Ingestor {
    /// Counted keys or pattern names (shared with the reporter)
    keys: Arc<HotKeyPool>,

    /// Counted parse and classification errors (shared with the reporter)
    errors: Arc<HotKeyPool>,

    /// Patterns to collapse keys with; empty means raw keys are reported
    classifier: KeyClassifier,

    /// Report unmatched keys under their raw name instead of as errors
    show_unmatched: bool,

    /// Ingestion statistics (shared)
    stats: Arc<IngestStats>,
}

impl Ingestor {
    /// Creates a new ingestor.
    ///
    /// # Arguments
    ///
    /// * `keys` - Pool receiving key observations
    /// * `errors` - Pool receiving error observations
    /// * `classifier` - Key patterns, possibly empty
    /// * `show_unmatched` - Whether unmatched keys are reported as keys
    pub fn new(
        keys: Arc<HotKeyPool>,
        errors: Arc<HotKeyPool>,
        classifier: KeyClassifier,
        show_unmatched: bool,
    ) -> Self {
        Self {
            keys,
            errors,
            classifier,
            show_unmatched,
            stats: Arc::new(IngestStats::new()),
        }
    }

    /// Returns a handle to the ingestion statistics.
    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Drains `source` until it is exhausted.
    ///
    /// Blocks the calling thread; the binary runs it on a dedicated thread.
    pub fn run<S: PacketSource + ?Sized>(&self, source: &mut S) -> Result<(), CaptureError> {
        while let Some(payload) = source.next_payload()? {
            self.ingest(&payload);
        }

        debug!(
            payloads = self.stats.payloads.load(Ordering::Relaxed),
            "Packet source exhausted"
        );
        Ok(())
    }

    /// Parses and records every command in one payload.
    pub fn ingest(&self, payload: &[u8]) {
        self.stats.payload_seen(payload.len());

        for outcome in commands(payload) {
            match outcome {
                Ok(command) => {
                    self.stats.command_parsed();
                    self.record_command(&command);
                }
                Err(e) => {
                    self.stats.parse_failed();
                    trace!(error = %e, label = e.label(), "Unparseable command");
                    self.record_error(e);
                }
            }
        }
    }

    fn record_command(&self, command: &Command) {
        if command.keys.is_empty() {
            return;
        }

        let verb = command.verb.as_str();

        if self.classifier.is_empty() {
            let batch: Vec<Observation<'_>> = command
                .keys
                .iter()
                .map(|key| Observation::new(key, verb))
                .collect();
            self.keys.record(&batch);
            self.stats.keys_recorded(batch.len());
            return;
        }

        let mut matched = Vec::with_capacity(command.keys.len());
        let mut unmatched = 0;

        for key in &command.keys {
            match self.classifier.classify(key) {
                Some(name) => matched.push(Observation::new(name, verb)),
                None if self.show_unmatched => matched.push(Observation::new(key, verb)),
                None => unmatched += 1,
            }
        }

        self.keys.record(&matched);
        self.stats.keys_recorded(matched.len());

        let misses = command.keys.len() - matched.len();
        if misses > 0 {
            self.stats.unmatched(misses);
        }
        if unmatched > 0 {
            self.errors
                .record(&vec![Observation::new(MATCH_ERROR, NO_COMMAND); unmatched]);
        }
    }

    fn record_error(&self, error: ParseError) {
        self.errors
            .record(&[Observation::new(error.label(), NO_COMMAND)]);
    }
}
