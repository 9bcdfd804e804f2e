//! Seam to the highlight overlay renderer.
//!
//! The overlay itself (window management, drawing) is an external
//! collaborator; this crate only emits render commands for each snapshot
//! and reads/writes the drawing-enabled flag that screen capture toggles.

use crate::tree::{Rect, Snapshot};

/// Render surface for element highlight rectangles.
///
/// `drawing_enabled` is a single piece of mutable state normally touched
/// only from the scheduler thread; capture temporarily overrides it and
/// restores the prior value.
pub trait OverlayRenderer: Send + Sync {
    /// Drop all queued highlight rectangles.
    fn clear(&self);

    /// Queue one highlight, in pre-order.
    fn push_element(&self, rect: Rect, text: &str, class_name: &str, index: u32);

    /// Commit the queued highlights to screen.
    fn refresh(&self);

    fn set_drawing_enabled(&self, enabled: bool);
    fn drawing_enabled(&self) -> bool;
}

/// Emit one render command per element, pre-order, then commit.
pub fn render_snapshot(overlay: &dyn OverlayRenderer, snapshot: &Snapshot) {
    overlay.clear();
    for idx in snapshot.preorder_indices() {
        let el = &snapshot.elements[idx];
        overlay.push_element(el.rect, &el.display_text, &el.class_name, el.overlay_index);
    }
    overlay.refresh();
}

/// Overlay that draws nothing, for embedders running headless.
#[derive(Debug)]
pub struct NoopOverlay {
    enabled: std::sync::atomic::AtomicBool,
}

impl Default for NoopOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl NoopOverlay {
    pub fn new() -> Self {
        Self {
            enabled: std::sync::atomic::AtomicBool::new(true),
        }
    }
}

impl OverlayRenderer for NoopOverlay {
    fn clear(&self) {}
    fn push_element(&self, _rect: Rect, _text: &str, _class_name: &str, _index: u32) {}
    fn refresh(&self) {}

    fn set_drawing_enabled(&self, enabled: bool) {
        self.enabled
            .store(enabled, std::sync::atomic::Ordering::Release);
    }

    fn drawing_enabled(&self) -> bool {
        self.enabled.load(std::sync::atomic::Ordering::Acquire)
    }
}
