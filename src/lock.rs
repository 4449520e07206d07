//! Keyed identity lock.
//!
//! `add_lead` is a check-then-act critical section: the match lookup and the
//! resulting merge-or-insert must be atomic with respect to other calls that
//! could match the same identity, or two concurrent inserts for one person
//! race into two records. A coarse global mutex would serialize unrelated
//! scraper workers, so the lock is sharded: each normalized identity key
//! hashes to one of N shards, and a call locks every shard its keys touch.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct IdentityLocks {
    shards: Vec<Arc<Mutex<()>>>,
}

impl IdentityLocks {
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| Arc::new(Mutex::new(()))).collect(),
        }
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Locks the shard of every key, in ascending shard order so concurrent
    /// callers touching overlapping key sets cannot deadlock. The guards
    /// must be held for the whole read-match-write sequence.
    pub async fn acquire(&self, keys: &[String]) -> Vec<OwnedMutexGuard<()>> {
        let mut indices: Vec<usize> = keys.iter().map(|k| self.shard_index(k)).collect();
        indices.sort_unstable();
        indices.dedup();

        let mut guards = Vec::with_capacity(indices.len());
        for index in indices {
            guards.push(self.shards[index].clone().lock_owned().await);
        }
        guards
    }
}
