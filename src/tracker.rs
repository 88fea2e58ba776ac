//! Most-recently-used window history.
//!
//! # Reconciliation
//!
//! The window manager reports application/window activation as events, but
//! not every focus change produces one (switching between two windows of the
//! same application may be silent).  The daemon therefore feeds the tracker
//! from two producers:
//!
//! 1. **Events**: low latency, delivered as soon as the compositor emits
//!    them.
//! 2. **A poll** (every ~500 ms) that re-queries the focused window of the
//!    frontmost process.
//!
//! Both end up in [`MruTracker::record_focus`].  Recording the window that is
//! already at the front is a no-op apart from refreshing its payload, so
//! duplicate signals from the two producers are harmless.
//!
//! # Locking
//!
//! One mutex guards the whole history.  It is held only while the list is
//! being read or rewritten; validity checks and window-manager calls always
//! run with the lock released.

use crate::error::SwitchError;
use crate::traits::WindowQuery;
use crate::window::{ProcessId, WindowHandle, WindowId};
use log::{debug, info};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Ordered window history, most recent first.
#[derive(Debug)]
pub struct MruTracker {
    capacity: usize,
    history: Mutex<Vec<WindowHandle>>,
}

impl MruTracker {
    /// Default history capacity.
    pub const DEFAULT_CAPACITY: usize = 20;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: Mutex::new(Vec::with_capacity(capacity.saturating_add(1))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WindowHandle>> {
        match self.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Move `handle` to the front of the history.
    ///
    /// An existing entry with the same id is replaced rather than
    /// duplicated.  Entries beyond the capacity fall off the tail.
    pub fn record_focus(&self, handle: WindowHandle) {
        let mut history = self.lock();
        if let Some(pos) = history.iter().position(|h| *h == handle) {
            history.remove(pos);
        } else {
            debug!("tracking new window {} ({:?})", handle.id, handle.title);
        }
        history.insert(0, handle);
        history.truncate(self.capacity);
    }

    /// Return up to `count` valid entries from the front.
    ///
    /// `is_valid` is called without the lock held.  Entries it rejects are
    /// removed from the history as a side effect, so the structure heals
    /// itself on every read.
    pub fn snapshot(
        &self,
        count: usize,
        mut is_valid: impl FnMut(&WindowHandle) -> bool,
    ) -> Vec<WindowHandle> {
        let candidates = self.lock().clone();

        let mut valid = Vec::with_capacity(count.min(candidates.len()));
        let mut stale = HashSet::new();
        for handle in candidates {
            if valid.len() >= count {
                break;
            }
            if is_valid(&handle) {
                valid.push(handle);
            } else {
                debug!("{}", SwitchError::StaleReference(handle.id));
                stale.insert(handle.id);
            }
        }

        if !stale.is_empty() {
            self.lock().retain(|h| !stale.contains(&h.id));
        }
        valid
    }

    /// Full validity pass over the history.  Returns the number of entries
    /// pruned.
    pub fn sweep(&self, is_valid: impl FnMut(&WindowHandle) -> bool) -> usize {
        let before = self.len();
        let kept = self.snapshot(usize::MAX, is_valid).len();
        before.saturating_sub(kept)
    }

    /// Drop every entry owned by `pid`, keeping the rest in order.
    /// Returns the removed entries.
    pub fn remove_all_for_process(&self, pid: ProcessId) -> Vec<WindowHandle> {
        let mut history = self.lock();
        let (removed, kept): (Vec<_>, Vec<_>) = history.drain(..).partition(|h| h.pid == pid);
        *history = kept;
        if !removed.is_empty() {
            info!("{} terminated, dropped {} window(s)", pid, removed.len());
        }
        removed
    }

    /// Drop the entry with `id`, if any.
    pub fn remove_window(&self, id: WindowId) -> bool {
        let mut history = self.lock();
        let before = history.len();
        history.retain(|h| h.id != id);
        before != history.len()
    }

    /// Entry with the native activation reference `activation`, if tracked.
    pub fn find_by_activation(&self, activation: &str) -> Option<WindowHandle> {
        self.lock()
            .iter()
            .find(|h| h.activation == activation)
            .cloned()
    }

    /// Ids currently in the history.
    pub fn ids(&self) -> HashSet<WindowId> {
        self.lock().iter().map(|h| h.id).collect()
    }

    /// Distinct owning processes, most recent first.
    pub fn processes(&self) -> Vec<ProcessId> {
        let mut seen = HashSet::new();
        self.lock()
            .iter()
            .filter(|h| seen.insert(h.pid))
            .map(|h| h.pid)
            .collect()
    }

    /// Raise and focus `handle` through `query`.
    ///
    /// History is left alone: the focus change this causes comes back as a
    /// regular focus signal.  A window that can no longer be raised is
    /// pruned.
    pub fn activate<Q: WindowQuery>(&self, query: &Q, handle: &WindowHandle) -> bool {
        match query.activate(handle) {
            Ok(()) => true,
            Err(e) => {
                debug!("activate {} failed: {}", handle.id, e);
                debug!("{}", SwitchError::StaleReference(handle.id));
                self.remove_window(handle.id);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for MruTracker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

//  Tests
