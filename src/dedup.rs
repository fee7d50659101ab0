//! Shared unique-line sets for merging
//!
//! Lines are stored as raw bytes so the merge output keeps the encoding of
//! its inputs. Both implementations hold a lock only for a single insert.
//! - Locked: one `Mutex<HashSet>` shared by every worker
//! - Sharded: lines hashed across independent `Mutex<HashSet>` shards

use ahash::RandomState;
use hashbrown::HashSet;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cli::MergeStrategy;

pub type LineSet = HashSet<Vec<u8>, RandomState>;

/// Insert `line` unless present. Returns true if it was new.
#[inline]
fn insert_line(set: &mut LineSet, line: &[u8]) -> bool {
    if set.contains(line) {
        false
    } else {
        set.insert(line.to_vec())
    }
}

/// A poisoned shard still holds valid data; a worker panic does not corrupt it
fn lock(set: &Mutex<LineSet>) -> MutexGuard<'_, LineSet> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Accumulator of distinct lines, safe to share across worker threads
pub trait UniqueLineSet: Send + Sync {
    /// Add a line. Returns true if it was not present before.
    fn insert(&self, line: &[u8]) -> bool;

    fn contains(&self, line: &[u8]) -> bool;

    /// Number of distinct lines
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the set, yielding its lines in no particular order
    fn into_lines(self: Box<Self>) -> Vec<Vec<u8>>;
}

/// Single lock around one set
pub struct LockedLineSet {
    set: Mutex<LineSet>,
}

impl LockedLineSet {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            set: Mutex::new(HashSet::with_capacity_and_hasher(capacity, RandomState::new())),
        }
    }
}

impl Default for LockedLineSet {
    fn default() -> Self {
        Self::new()
    }
}

impl UniqueLineSet for LockedLineSet {
    fn insert(&self, line: &[u8]) -> bool {
        insert_line(&mut lock(&self.set), line)
    }

    fn contains(&self, line: &[u8]) -> bool {
        lock(&self.set).contains(line)
    }

    fn len(&self) -> usize {
        lock(&self.set).len()
    }

    fn into_lines(self: Box<Self>) -> Vec<Vec<u8>> {
        self.set
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .collect()
    }
}

/// Sharded set for lower contention between workers
pub struct ShardedLineSet {
    shards: Vec<Mutex<LineSet>>,
    hasher: RandomState,
}

impl ShardedLineSet {
    pub fn new(num_shards: usize) -> Self {
        Self::with_capacity(num_shards, 0)
    }

    pub fn with_capacity(num_shards: usize, capacity_per_shard: usize) -> Self {
        let shards = (0..num_shards.max(1))
            .map(|_| Mutex::new(HashSet::with_capacity_and_hasher(capacity_per_shard, RandomState::new())))
            .collect();

        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, line: &[u8]) -> &Mutex<LineSet> {
        let mut hasher = self.hasher.build_hasher();
        line.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % self.shards.len()]
    }
}

impl UniqueLineSet for ShardedLineSet {
    fn insert(&self, line: &[u8]) -> bool {
        insert_line(&mut lock(self.shard(line)), line)
    }

    fn contains(&self, line: &[u8]) -> bool {
        lock(self.shard(line)).contains(line)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| lock(s).len()).sum()
    }

    fn into_lines(self: Box<Self>) -> Vec<Vec<u8>> {
        let total = self.len();
        let mut lines = Vec::with_capacity(total);
        for shard in self.shards {
            lines.extend(shard.into_inner().unwrap_or_else(PoisonError::into_inner));
        }
        lines
    }
}

/// Factory for creating line sets based on the merge strategy.
///
/// With `FanIn` only the consolidating thread touches the set, so the single
/// lock is never contended.
pub fn create_line_set(strategy: MergeStrategy, shards: usize) -> Box<dyn UniqueLineSet> {
    match strategy {
        MergeStrategy::Locked | MergeStrategy::FanIn => Box::new(LockedLineSet::new()),
        MergeStrategy::Sharded => Box::new(ShardedLineSet::new(shards)),
    }
}
