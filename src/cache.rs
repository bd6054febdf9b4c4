//! The two caches the planner consults on every batch: the Handle Cache
//! (path → `FileHandle`, §4.2) and the Descriptor Table (fd → `OpenState`,
//! §4.4).

use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_queue::SegQueue;
use moka::sync::Cache;
use whirlwind::ShardMap;

use crate::error::{NfsClientError, Result};
use crate::fileref::Descriptor;
use crate::nfs4::{FileHandle, OpenLifecycle, OpenState};

/// Caches the `FileHandle` a path resolved to last time, so a repeated
/// `FileRef::Path` does not have to walk the whole LOOKUP chain again.
///
/// Entries are removed on `STALE`/`BADHANDLE` (§4.2); nothing else evicts
/// them early besides the cache's own capacity policy.
pub struct HandleCache {
    inner: Cache<String, FileHandle>,
}

impl HandleCache {
    pub fn new(capacity: u64) -> Self {
        HandleCache { inner: Cache::new(capacity) }
    }

    pub fn get(&self, path: &str) -> Option<FileHandle> {
        self.inner.get(path)
    }

    pub fn insert(&self, path: String, handle: FileHandle) {
        self.inner.insert(path, handle);
    }

    /// Drops a stale entry so the next lookup re-walks the path from the
    /// nearest surviving ancestor.
    pub fn invalidate(&self, path: &str) {
        self.invalidate_because(path, "stale");
    }

    /// Drops a stale entry, recording why for the trace the executor's fold
    /// pass leaves behind.
    pub fn invalidate_because(&self, path: &str, reason: &str) {
        tracing::debug!(path, reason, "invalidating handle cache entry");
        self.inner.invalidate(path);
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        HandleCache::new(8192)
    }
}

/// Maps library-issued descriptors to their open state, and owns descriptor
/// number allocation.
///
/// Allocation recycles descriptors released by `closev` before handing out
/// new integers, so a long-running client doesn't need an ever-growing fd
/// space.
pub struct DescriptorTable {
    states: ShardMap<Descriptor, OpenState>,
    free: SegQueue<Descriptor>,
    next: AtomicU32,
}

impl DescriptorTable {
    pub fn new() -> Self {
        DescriptorTable { states: ShardMap::new(), free: SegQueue::new(), next: AtomicU32::new(1) }
    }

    /// Reserves a fresh descriptor number without yet publishing any state
    /// for it; the caller inserts once the OPEN completes.
    pub fn reserve(&self) -> Descriptor {
        if let Some(fd) = self.free.pop() {
            return fd;
        }
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn insert(&self, fd: Descriptor, state: OpenState) {
        self.states.insert(fd, state).await;
    }

    pub async fn get(&self, fd: Descriptor) -> Option<OpenState> {
        self.states.get(&fd).await.map(|entry| entry.value().clone())
    }

    pub async fn update<F>(&self, fd: Descriptor, f: F) -> bool
    where
        F: FnOnce(&mut OpenState),
    {
        if let Some(mut entry) = self.states.get_mut(&fd).await {
            f(entry.value_mut());
            true
        } else {
            false
        }
    }

    /// Removes `fd`'s state and returns its descriptor number to the free
    /// list for reuse by a later `openv`.
    pub async fn remove(&self, fd: Descriptor) -> Option<OpenState> {
        let removed = self.states.remove(&fd).await.map(|(_, state)| state);
        if removed.is_some() {
            self.free.push(fd);
        }
        removed
    }

    pub async fn contains(&self, fd: Descriptor) -> bool {
        self.states.contains_key(&fd).await
    }

    /// Fetches `fd`'s state, rejecting it unless the descriptor's lifecycle
    /// is `Opened` (§4.4's "any operation in a state other than OPENED fails
    /// with STATE_INVALID").
    pub async fn require_opened(&self, fd: Descriptor) -> Result<OpenState> {
        let state = self.get(fd).await.ok_or(NfsClientError::BadState { fd })?;
        match state.lifecycle {
            OpenLifecycle::Opened => Ok(state),
            OpenLifecycle::Unopened | OpenLifecycle::Opening | OpenLifecycle::Closing => {
                Err(NfsClientError::BadState { fd })
            }
        }
    }

    /// Moves `fd` into `Closing` before its CLOSE is sent, so a concurrent
    /// use of the same descriptor is rejected rather than racing the wire
    /// round-trip.
    pub async fn mark_closing(&self, fd: Descriptor) -> Result<()> {
        if self.update(fd, |s| s.lifecycle = OpenLifecycle::Closing).await {
            Ok(())
        } else {
            Err(NfsClientError::BadState { fd })
        }
    }

    /// Moves `fd` back to `Opened` after a CLOSE the server rejected —
    /// the descriptor never actually closed, so it stays usable.
    pub async fn revert_closing(&self, fd: Descriptor) {
        self.update(fd, |s| s.lifecycle = OpenLifecycle::Opened).await;
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        DescriptorTable::new()
    }
}
