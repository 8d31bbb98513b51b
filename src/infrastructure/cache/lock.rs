//! Per-key mutual exclusion for collapsing concurrent cache misses

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};

/// Stripe count used when none is configured
pub const DEFAULT_LOCK_STRIPES: usize = 64;

/// How keys are mapped onto locks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LockStrategy {
    /// Fixed array of mutexes; a key hashes onto one of them.
    /// Memory is bounded, unrelated keys may share a stripe.
    Striped { stripes: usize },
    /// One mutex per distinct key, created on first use and never removed
    PerKey,
}

impl Default for LockStrategy {
    fn default() -> Self {
        Self::Striped {
            stripes: DEFAULT_LOCK_STRIPES,
        }
    }
}

#[derive(Debug)]
enum Locks {
    Striped {
        stripes: Box<[ReentrantMutex<()>]>,
        hasher: RandomState,
    },
    PerKey(DashMap<String, Arc<ReentrantMutex<()>>>),
}

/// Registry handing out the lock associated with a cache key
///
/// Share one registry (behind an `Arc`) between every component that must
/// observe the same per-key exclusion.
///
/// Locks are reentrant: a thread already holding a lock may take it again,
/// so a computation can look up another key even when both keys land on the
/// same stripe.
#[derive(Debug)]
pub struct KeyLockRegistry {
    locks: Locks,
}

impl Default for KeyLockRegistry {
    fn default() -> Self {
        Self::new(LockStrategy::default())
    }
}

impl KeyLockRegistry {
    /// Creates a registry using the given strategy
    pub fn new(strategy: LockStrategy) -> Self {
        match strategy {
            LockStrategy::Striped { stripes } => Self::striped(stripes),
            LockStrategy::PerKey => Self::per_key(),
        }
    }

    /// Creates a striped registry; a stripe count of zero is treated as one
    pub fn striped(stripes: usize) -> Self {
        let stripes: Vec<_> = (0..stripes.max(1)).map(|_| ReentrantMutex::new(())).collect();

        Self {
            locks: Locks::Striped {
                stripes: stripes.into_boxed_slice(),
                hasher: RandomState::new(),
            },
        }
    }

    /// Creates an unbounded registry with one lock per key
    pub fn per_key() -> Self {
        Self {
            locks: Locks::PerKey(DashMap::new()),
        }
    }

    /// Returns the strategy this registry was built with
    pub fn strategy(&self) -> LockStrategy {
        match &self.locks {
            Locks::Striped { stripes, .. } => LockStrategy::Striped {
                stripes: stripes.len(),
            },
            Locks::PerKey(_) => LockStrategy::PerKey,
        }
    }

    /// Number of lock objects currently held by the registry
    pub fn len(&self) -> usize {
        match &self.locks {
            Locks::Striped { stripes, .. } => stripes.len(),
            Locks::PerKey(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` while holding the lock for `key`.
    ///
    /// The lock is released when `f` returns or unwinds. Calling `with_lock`
    /// again from inside `f` does not block on locks this thread already holds.
    pub fn with_lock<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        match &self.locks {
            Locks::Striped { stripes, hasher } => {
                let index = (hasher.hash_one(key) as usize) % stripes.len();
                let _guard = stripes[index].lock();
                f()
            }
            Locks::PerKey(map) => {
                // Clone the Arc out so the map shard is not held while waiting
                let lock = map
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
                    .clone();
                let _guard = lock.lock();
                f()
            }
        }
    }
}
