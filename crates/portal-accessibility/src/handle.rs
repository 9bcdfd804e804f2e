//! Native-handle lifecycle.
//!
//! Every qualifying element in a snapshot owns an exclusive duplicate of a
//! platform node reference. The platform requires each duplicate to be
//! released exactly once; [`HandleTable`] makes that contract structural:
//! `release` consumes the handle, and the table's slots are drained at most
//! once each.

use anyhow::Result;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Index of a handle within the owning snapshot's [`HandleTable`].
pub type HandleId = usize;

/// An opaque, non-copyable reference into platform-owned element data.
///
/// Duplicated at inspection time so it survives mutation or invalidation of
/// the live tree; released when the owning snapshot is superseded.
pub trait NativeHandle: Send {
    /// Give the handle back to the platform. Consuming `self` makes a
    /// double release unrepresentable.
    fn release(self: Box<Self>) -> Result<()>;
}

/// Owns the native handles referenced by one snapshot.
#[derive(Default)]
pub struct HandleTable {
    slots: Mutex<Vec<Option<Box<dyn NativeHandle>>>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a handle, returning its slot id.
    pub fn insert(&self, handle: Box<dyn NativeHandle>) -> HandleId {
        let mut slots = self.lock();
        slots.push(Some(handle));
        slots.len() - 1
    }

    /// Number of handles not yet released.
    pub fn live_count(&self) -> usize {
        self.lock().iter().filter(|s| s.is_some()).count()
    }

    /// Release every remaining handle. Best effort per handle: a failure is
    /// logged and does not prevent releasing the rest. Safe to call more
    /// than once; drained slots stay empty.
    pub fn release_all(&self) {
        let mut slots = self.lock();
        for (i, slot) in slots.iter_mut().enumerate() {
            if let Some(handle) = slot.take() {
                if let Err(e) = handle.release() {
                    warn!("failed to release native handle {}: {:#}", i, e);
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Option<Box<dyn NativeHandle>>>> {
        // A poisoned lock only means a panic elsewhere; the slots are still
        // valid and must still be drained.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for HandleTable {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleTable")
            .field("live", &self.live_count())
            .finish()
    }
}
