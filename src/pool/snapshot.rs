//! Closed Epochs and Ranking
//!
//! A [`Snapshot`] is the immutable result of rotating a [`HotKeyPool`]. It
//! only supports ranked extraction: the entries are moved into a binary heap
//! when ranking starts and popped in order, so a snapshot is consumed once.
//!
//! Ranking is a total order: more hits first, ties broken by name and then by
//! command, both ascending. Extracting the same snapshot twice (from a clone)
//! therefore yields the same sequence.
//!
//! [`HotKeyPool`]: crate::pool::HotKeyPool

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// A counted `(name, command)` identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HotKeyEntry {
    /// Raw key, logical pattern name or error label
    pub name: String,
    /// Request verb, empty for error entries
    pub command: String,
    /// Observations within the epoch
    pub hits: u64,
}

impl HotKeyEntry {
    pub fn new(name: impl Into<String>, command: impl Into<String>, hits: u64) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            hits,
        }
    }
}

/// How many entries to extract from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLimit {
    /// At most this many entries
    Top(usize),
    /// Every entry
    Unlimited,
}

impl ReportLimit {
    /// `Top(k)` unless `unlimited` is set.
    pub fn new(k: usize, unlimited: bool) -> Self {
        if unlimited {
            ReportLimit::Unlimited
        } else {
            ReportLimit::Top(k)
        }
    }
}

/// Heap adapter giving entries their ranking order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Ranked(HotKeyEntry);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest element first, so lower names rank higher
        self.0
            .hits
            .cmp(&other.0.hits)
            .then_with(|| other.0.name.cmp(&self.0.name))
            .then_with(|| other.0.command.cmp(&self.0.command))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The entries of one closed epoch.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<HotKeyEntry>,
    window: Duration,
}

impl Snapshot {
    pub(crate) fn new(entries: Vec<HotKeyEntry>, window: Duration) -> Self {
        Self { entries, window }
    }

    /// Number of distinct identities observed during the epoch.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of hits over all entries.
    pub fn total_hits(&self) -> u64 {
        self.entries.iter().map(|e| e.hits).sum()
    }

    /// How long the epoch was open.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Consumes the snapshot into an iterator yielding entries best first.
    ///
    /// Building the heap is O(n); each step is O(log n).
    pub fn into_ranked(self) -> RankedEntries {
        let heap: BinaryHeap<Ranked> = self.entries.into_iter().map(Ranked).collect();
        RankedEntries { heap }
    }

    /// Extracts the best entries up to `limit`.
    ///
    /// # Example
    ///
    /// ```
    /// use keyheat::pool::{HotKeyPool, Observation, ReportLimit};
    ///
    /// let pool = HotKeyPool::new();
    /// for (name, times) in [("a", 5), ("b", 3), ("c", 1)] {
    ///     for _ in 0..times {
    ///         pool.record(&[Observation::new(name, "get")]);
    ///     }
    /// }
    ///
    /// let top = pool.rotate().top(ReportLimit::Top(2));
    /// let names: Vec<_> = top.iter().map(|e| (e.name.as_str(), e.hits)).collect();
    /// assert_eq!(names, vec![("a", 5), ("b", 3)]);
    /// ```
    pub fn top(self, limit: ReportLimit) -> Vec<HotKeyEntry> {
        let ranked = self.into_ranked();
        match limit {
            ReportLimit::Top(k) => ranked.take(k).collect(),
            ReportLimit::Unlimited => ranked.collect(),
        }
    }
}

/// Iterator draining a snapshot's heap. See [`Snapshot::into_ranked`].
#[derive(Debug)]
pub struct RankedEntries {
    heap: BinaryHeap<Ranked>,
}

impl Iterator for RankedEntries {
    type Item = HotKeyEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.heap.pop().map(|Ranked(entry)| entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.heap.len(), Some(self.heap.len()))
    }
}

impl ExactSizeIterator for RankedEntries {}
