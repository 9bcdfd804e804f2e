//! Owned, indexed snapshots of the visible element tree.
//!
//! A [`Snapshot`] is an immutable arena built by one traversal of the live
//! introspection tree: elements are stored flat and linked by integer index
//! (never by direct parent/child references), so readers can hold a frozen
//! `Arc<Snapshot>` while the next build proceeds off to the side.

mod walker;

pub use walker::SnapshotBuilder;

use crate::handle::HandleTable;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Elements smaller than this (in device-independent units) are filtered out.
pub const MIN_ELEMENT_SIZE: i32 = 5;

/// Integer bounding box in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// True when the two rects share any area. Touching edges don't count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

/// What an element is for, by first-match priority:
/// clickable > checkable > editable > has text > scrollable > plain view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementKind {
    Clickable,
    Checkable,
    Input,
    Text,
    Container,
    View,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Clickable => "Clickable",
            ElementKind::Checkable => "Checkable",
            ElementKind::Input => "Input",
            ElementKind::Text => "Text",
            ElementKind::Container => "Container",
            ElementKind::View => "View",
        }
    }
}

/// Deterministic element identity: identical (rect, simplified type,
/// display text) triples always hash to the same id, which is how the rest
/// of the system tracks "the same visual element" across snapshots.
pub fn element_id(rect: &Rect, class_name: &str, display_text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    rect.hash(&mut hasher);
    class_name.hash(&mut hasher);
    display_text.hash(&mut hasher);
    hasher.finish()
}

/// One UI element that passed the visibility filter.
///
/// Lives in a [`Snapshot`] arena; `parent`/`children` are arena indices.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub id: u64,
    pub rect: Rect,
    /// Resolved via priority chain: text > content description > trailing
    /// segment of the resource id > trailing segment of the type name.
    pub display_text: String,
    /// Simplified type name (trailing segment after the last `.`).
    pub class_name: String,
    /// Full resource identifier, kept for the query surface.
    pub resource_id: Option<String>,
    pub kind: ElementKind,
    /// Stacking order of the window this element belongs to.
    pub window_layer: i32,
    /// Pre-order position within the snapshot, 1-based, no gaps.
    pub overlay_index: u32,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Slot of this element's native handle in the snapshot's handle table.
    pub handle: crate::handle::HandleId,
}

/// An immutable published arena of visible elements.
#[derive(Debug)]
pub struct Snapshot {
    pub elements: Vec<ElementNode>,
    /// Arena indices of top-level elements, in traversal order.
    pub roots: Vec<usize>,
    pub captured_at: DateTime<Utc>,
    pub walk_duration: Duration,
    handles: HandleTable,
}

impl Snapshot {
    pub(crate) fn new(
        elements: Vec<ElementNode>,
        roots: Vec<usize>,
        handles: HandleTable,
        walk_duration: Duration,
    ) -> Self {
        Self {
            elements,
            roots,
            captured_at: Utc::now(),
            walk_duration,
            handles,
        }
    }

    /// A snapshot with no elements (no foreground content).
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), HandleTable::new(), Duration::ZERO)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Arena indices in pre-order (the order `overlay_index` was assigned).
    pub fn preorder_indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.elements.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            out.push(idx);
            for &child in self.elements[idx].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Release every native handle this snapshot still owns.
    pub fn release_handles(&self) {
        self.handles.release_all();
    }

    /// Handles not yet given back to the platform.
    pub fn live_handle_count(&self) -> usize {
        self.handles.live_count()
    }
}

/// Atomically-swapped holder of the current snapshot.
///
/// Readers grab an `Arc` once and operate on a frozen view; installs are
/// totally ordered by the single-flight scheduler. The superseded
/// snapshot's handles are released only after the new one is visible, so a
/// reader never observes a partially-released snapshot as "current".
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// The currently installed snapshot. Non-blocking for practical
    /// purposes; the write critical section is a pointer swap.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install `next` as current, then release the superseded snapshot's
    /// handles. Late readers that still hold the old `Arc` keep a valid
    /// (if released) tree structure.
    pub fn install(&self, next: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(next);
        let old = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, next.clone())
        };
        old.release_handles();
        next
    }

    /// Release the current snapshot's handles unconditionally (subsystem
    /// shutdown).
    pub fn shutdown(&self) {
        self.current().release_handles();
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
