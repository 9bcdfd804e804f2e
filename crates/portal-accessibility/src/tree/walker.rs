//! Snapshot builder: one explicit-stack, pre-order pass over the live tree.
//!
//! The walk filters by visibility, classifies, resolves display text,
//! assigns stable ids and monotonic overlay indices, and duplicates each
//! qualifying node's native handle into the snapshot's handle table. A node
//! that fails the filter is still traversed for its children, which attach
//! to the nearest qualifying ancestor (or become roots). A node that fails
//! inspection is skipped with its whole subtree; siblings continue.

use super::{element_id, ElementKind, ElementNode, Rect, Snapshot, MIN_ELEMENT_SIZE};
use crate::handle::HandleTable;
use crate::source::{IntrospectionSource, UiNode};
use anyhow::Result;
use std::time::Instant;
use tracing::{debug, warn};

/// Builds owned snapshots from the live introspection tree.
///
/// Runs on the scheduler's single logical thread; never concurrently with
/// itself (the scheduler's re-entrancy guard sees to that).
pub struct SnapshotBuilder {
    screen_bounds: Rect,
    min_element_size: i32,
}

struct Pending {
    node: Box<dyn UiNode>,
    /// Arena index of the nearest qualifying ancestor, if any.
    parent: Option<usize>,
}

impl SnapshotBuilder {
    pub fn new(screen_bounds: Rect) -> Self {
        Self {
            screen_bounds,
            min_element_size: MIN_ELEMENT_SIZE,
        }
    }

    pub fn with_min_element_size(mut self, size: i32) -> Self {
        self.min_element_size = size;
        self
    }

    /// Build a fresh snapshot. No foreground content yields an empty
    /// snapshot, never an error.
    pub fn build(&self, source: &dyn IntrospectionSource) -> Snapshot {
        let start = Instant::now();
        let root = match source.active_root() {
            Ok(Some(root)) => root,
            Ok(None) => {
                debug!("no active window, publishing empty snapshot");
                return Snapshot::empty();
            }
            Err(e) => {
                warn!("failed to read introspection root: {:#}", e);
                return Snapshot::empty();
            }
        };
        // The active window sits at layer 0.
        self.build_from_root(root, 0, start)
    }

    fn build_from_root(&self, root: Box<dyn UiNode>, window_layer: i32, start: Instant) -> Snapshot {
        let mut elements: Vec<ElementNode> = Vec::new();
        let mut roots: Vec<usize> = Vec::new();
        let handles = HandleTable::new();
        let mut next_index: u32 = 1;

        let mut stack = vec![Pending {
            node: root,
            parent: None,
        }];

        while let Some(Pending { node, parent }) = stack.pop() {
            let slot = match self.inspect(node.as_ref(), parent, window_layer, &handles, &mut next_index)
            {
                Ok(Some(element)) => {
                    let idx = elements.len();
                    match parent {
                        Some(p) => elements[p].children.push(idx),
                        None => roots.push(idx),
                    }
                    elements.push(element);
                    Some(idx)
                }
                Ok(None) => None,
                Err(e) => {
                    // Single-subtree failure: skip it, keep walking siblings.
                    warn!("skipping uninspectable subtree: {:#}", e);
                    continue;
                }
            };

            // Children of a filtered-out node re-parent to the nearest
            // qualifying ancestor.
            let next_parent = slot.or(parent);

            // Reverse push so children pop in document order (pre-order).
            for i in (0..node.child_count()).rev() {
                match node.child(i) {
                    Ok(child) => stack.push(Pending {
                        node: child,
                        parent: next_parent,
                    }),
                    Err(e) => warn!("skipping uninspectable child {}: {:#}", i, e),
                }
            }
        }

        let walk_duration = start.elapsed();
        debug!(
            "snapshot built: {} elements, {} roots, {:?}",
            elements.len(),
            roots.len(),
            walk_duration
        );
        Snapshot::new(elements, roots, handles, walk_duration)
    }

    /// Inspect one node. `Ok(None)` means it failed the visibility filter
    /// (traversal continues into its children); `Err` means the node could
    /// not be read at all.
    fn inspect(
        &self,
        node: &dyn UiNode,
        parent: Option<usize>,
        window_layer: i32,
        handles: &HandleTable,
        next_index: &mut u32,
    ) -> Result<Option<ElementNode>> {
        let rect = node.bounds();
        let on_screen = rect.intersects(&self.screen_bounds);
        let has_size =
            rect.width() > self.min_element_size && rect.height() > self.min_element_size;
        if !on_screen || !has_size {
            return Ok(None);
        }

        let text = node.text().unwrap_or_default();
        let content_desc = node.content_description().unwrap_or_default();
        let class_name = node.class_name().unwrap_or_default();
        let resource_id = node.resource_id().filter(|r| !r.is_empty());
        let simple_class = trailing_segment(&class_name, '.').to_string();

        let display_text = if !text.is_empty() {
            text.clone()
        } else if !content_desc.is_empty() {
            content_desc
        } else if let Some(rid) = resource_id.as_deref() {
            trailing_segment(rid, '/').to_string()
        } else {
            simple_class.clone()
        };

        let kind = classify(node, &text);
        let id = element_id(&rect, &simple_class, &display_text);

        // Duplicate before consuming an index: a failed duplication must
        // not leave a gap in the overlay_index sequence.
        let handle = handles.insert(node.duplicate_handle()?);

        let overlay_index = *next_index;
        *next_index += 1;

        Ok(Some(ElementNode {
            id,
            rect,
            display_text,
            class_name: simple_class,
            resource_id,
            kind,
            window_layer,
            overlay_index,
            parent,
            children: Vec::new(),
            handle,
        }))
    }
}

/// First-match classification; raw text only (not the resolved display text).
fn classify(node: &dyn UiNode, text: &str) -> ElementKind {
    if node.is_clickable() {
        ElementKind::Clickable
    } else if node.is_checkable() {
        ElementKind::Checkable
    } else if node.is_editable() {
        ElementKind::Input
    } else if !text.is_empty() {
        ElementKind::Text
    } else if node.is_scrollable() {
        ElementKind::Container
    } else {
        ElementKind::View
    }
}

/// Trailing segment after the last `sep`, or the whole string if absent.
fn trailing_segment(s: &str, sep: char) -> &str {
    s.rsplit(sep).next().unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_segment_splits_on_last_separator() {
        assert_eq!(trailing_segment("android.widget.Button", '.'), "Button");
        assert_eq!(trailing_segment("com.app:id/submit", '/'), "submit");
        assert_eq!(trailing_segment("Plain", '.'), "Plain");
        assert_eq!(trailing_segment("", '.'), "");
    }
}
