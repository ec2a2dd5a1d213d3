//! Windowed Hot Key Counter
//!
//! This module implements the counting side of the pool: a concurrent
//! multiset of `(name, command)` identities that can be swapped out for a
//! fresh, empty one in a single step.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  RwLock<Epoch>                              │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ Mutex   │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! `record` holds the read side of the epoch lock for its whole batch and
//! only locks the shards it touches, so recorders run in parallel. `rotate`
//! takes the write side, which waits for in-flight batches to finish and
//! blocks new ones until the swap is done. Every batch therefore lands
//! entirely in one epoch.

use crate::pool::snapshot::{HotKeyEntry, Snapshot};
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Instant;

/// Number of shards per epoch.
const NUM_SHARDS: usize = 16;

/// One observation of a name under a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation<'a> {
    pub name: &'a str,
    pub command: &'a str,
}

impl<'a> Observation<'a> {
    pub fn new(name: &'a str, command: &'a str) -> Self {
        Self { name, command }
    }
}

/// Hit counts keyed by command, then by name.
///
/// Commands are few, so the outer map stays tiny and lookups never need to
/// allocate an owned key for an identity that already exists.
type Counts = HashMap<String, HashMap<String, u64>>;

#[derive(Debug, Default)]
struct Shard {
    counts: Mutex<Counts>,
}

#[derive(Debug)]
struct Epoch {
    shards: Vec<Shard>,
    opened_at: Instant,
}

impl Epoch {
    fn new() -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| Shard::default()).collect(),
            opened_at: Instant::now(),
        }
    }

    #[inline]
    fn shard_for(&self, name: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    fn increment(&self, observation: &Observation<'_>) {
        let mut counts = self
            .shard_for(observation.name)
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match counts.get_mut(observation.command) {
            Some(by_name) => match by_name.get_mut(observation.name) {
                Some(hits) => *hits += 1,
                None => {
                    by_name.insert(observation.name.to_owned(), 1);
                }
            },
            None => {
                let by_name = HashMap::from([(observation.name.to_owned(), 1)]);
                counts.insert(observation.command.to_owned(), by_name);
            }
        }
    }

    fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .counts
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .values()
                    .map(HashMap::len)
                    .sum::<usize>()
            })
            .sum()
    }

    fn into_snapshot(self) -> Snapshot {
        let window = self.opened_at.elapsed();
        let mut entries = Vec::new();

        for shard in self.shards {
            let counts = shard
                .counts
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner);
            for (command, by_name) in counts {
                entries.extend(
                    by_name
                        .into_iter()
                        .map(|(name, hits)| HotKeyEntry::new(name, command.clone(), hits)),
                );
            }
        }

        Snapshot::new(entries, window)
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Observations recorded since the pool was created
    pub recorded: u64,
    /// Epochs closed since the pool was created
    pub rotations: u64,
}

/// A concurrent, rotatable hit counter.
///
/// One pool is created per reported stream (keys, errors) and shared behind
/// an `Arc` between the ingestion and reporting loops.
///
/// # Example
///
/// ```
/// use keyheat::pool::{HotKeyPool, Observation};
///
/// let pool = HotKeyPool::new();
/// pool.record(&[Observation::new("user:1", "get"), Observation::new("user:2", "get")]);
/// pool.record(&[Observation::new("user:1", "get")]);
///
/// let snapshot = pool.rotate();
/// assert_eq!(snapshot.len(), 2);
/// assert_eq!(snapshot.total_hits(), 3);
/// assert!(pool.is_empty());
/// ```
#[derive(Debug)]
pub struct HotKeyPool {
    current: RwLock<Epoch>,
    recorded: AtomicU64,
    rotations: AtomicU64,
}

impl Default for HotKeyPool {
    fn default() -> Self {
        Self::new()
    }
}

impl HotKeyPool {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Epoch::new()),
            recorded: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
        }
    }

    /// Counts each observation in the open epoch.
    ///
    /// The whole batch lands in the same epoch.
    pub fn record(&self, observations: &[Observation<'_>]) {
        if observations.is_empty() {
            return;
        }

        let epoch = self.current.read().unwrap_or_else(PoisonError::into_inner);
        for observation in observations {
            epoch.increment(observation);
        }

        self.recorded
            .fetch_add(observations.len() as u64, Ordering::Relaxed);
    }

    /// Closes the open epoch, opens an empty one and returns the closed one.
    pub fn rotate(&self) -> Snapshot {
        let closed = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, Epoch::new())
        };

        self.rotations.fetch_add(1, Ordering::Relaxed);
        closed.into_snapshot()
    }

    /// Number of distinct identities in the open epoch.
    pub fn len(&self) -> usize {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            recorded: self.recorded.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
        }
    }
}
