//! Bounded-byte LRU content cache.
//!
//! Grounded in the original `cache.c` (128 fixed entries, `pthread_rwlock_t`,
//! two-phase lock for the `last_used` bump), generalized to a single-process
//! `Arc`-shared cache per DESIGN.md. Entries hold `Arc<[u8]>` bodies so a
//! `get` can release the lock before the caller streams the bytes (§9,
//! preferred strategy).

use std::{collections::HashMap, sync::RwLock};

const MAX_ENTRIES: usize = 128;
const MAX_CACHEABLE_SIZE: u64 = 1024 * 1024;

struct Entry {
    bytes: std::sync::Arc<[u8]>,
    size: u64,
    last_used: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    used: u64,
    clock: u64,
}

/// Maps absolute file paths to cached byte contents.
pub struct Cache {
    max_bytes: u64,
    inner: RwLock<Inner>,
}

impl Cache {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            inner: RwLock::new(Inner {
                entries: HashMap::with_capacity(MAX_ENTRIES.min(64)),
                used: 0,
                clock: 0,
            }),
        }
    }

    #[inline(always)]
    pub fn enabled(&self) -> bool {
        self.max_bytes > 0
    }

    /// Only files strictly under 1 MiB and non-empty are eligible.
    #[inline(always)]
    pub fn is_cacheable_size(size: u64) -> bool {
        size > 0 && size < MAX_CACHEABLE_SIZE
    }

    /// Returns the cached bytes for `path`, bumping `last_used` on hit.
    pub fn get(&self, path: &str) -> Option<std::sync::Arc<[u8]>> {
        let mut guard = self.inner.write().ok()?;
        guard.clock += 1;
        let tick = guard.clock;

        let entry = guard.entries.get_mut(path)?;
        entry.last_used = tick;
        Some(entry.bytes.clone())
    }

    /// Inserts `(path, bytes)`, evicting LRU victims as needed. No-op (and
    /// never panics) if the bytes are empty, too large, allocation fails,
    /// or the lock is poisoned — caching is always best-effort.
    pub fn put(&self, path: &str, bytes: std::sync::Arc<[u8]>) {
        let size = bytes.len() as u64;
        if size == 0 || size > self.max_bytes {
            return;
        }

        let Ok(mut guard) = self.inner.write() else {
            return;
        };

        if let Some(old) = guard.entries.remove(path) {
            guard.used -= old.size;
        }

        while guard.used + size > self.max_bytes || guard.entries.len() >= MAX_ENTRIES {
            let Some(victim) = guard
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                // Nothing left to evict but still over budget: abort the put.
                return;
            };

            if let Some(evicted) = guard.entries.remove(&victim) {
                guard.used -= evicted.size;
            }
        }

        guard.clock += 1;
        let tick = guard.clock;
        guard.used += size;
        guard.entries.insert(
            path.to_string(),
            Entry {
                bytes,
                size,
                last_used: tick,
            },
        );
    }

    /// Drops every entry, freeing all buffers.
    pub fn destroy(&self) {
        if let Ok(mut guard) = self.inner.write() {
            guard.entries.clear();
            guard.used = 0;
        }
    }

    #[cfg(test)]
    fn live_count(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    #[cfg(test)]
    fn used_bytes(&self) -> u64 {
        self.inner.read().unwrap().used
    }
}
