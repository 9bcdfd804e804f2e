//! Platform introspection seam.
//!
//! The live element tree, the window list, and focus information are owned
//! by the platform accessibility layer. This module defines the traits the
//! snapshot builder and the device-state query consume; the hosting process
//! provides the concrete implementation at construction (no global service
//! lookup).

use crate::handle::NativeHandle;
use crate::tree::Rect;
use anyhow::Result;
use serde::Serialize;

/// One element of the live, externally-owned introspection tree.
///
/// Implementations borrow platform data that may be mutated or invalidated
/// after the walk returns; anything that must outlive the walk is duplicated
/// through [`UiNode::duplicate_handle`].
pub trait UiNode {
    /// Bounding box in screen coordinates.
    fn bounds(&self) -> Rect;

    fn text(&self) -> Option<String>;
    fn content_description(&self) -> Option<String>;
    /// Fully-qualified type name (e.g. `android.widget.Button`).
    fn class_name(&self) -> Option<String>;
    /// Full resource identifier (e.g. `com.app:id/submit`).
    fn resource_id(&self) -> Option<String>;

    fn is_clickable(&self) -> bool;
    fn is_checkable(&self) -> bool;
    fn is_editable(&self) -> bool;
    fn is_scrollable(&self) -> bool;

    fn child_count(&self) -> usize;

    /// Fetch child `index`. An error means that subtree could not be
    /// inspected; the caller skips it and continues with siblings.
    fn child(&self, index: usize) -> Result<Box<dyn UiNode>>;

    /// Take an exclusive duplicate of the underlying platform reference,
    /// owned by the snapshot from then on.
    fn duplicate_handle(&self) -> Result<Box<dyn NativeHandle>>;
}

/// Stacking classification of a window in the platform window list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Application,
    /// On-screen keyboard. Presence of one means the keyboard is visible.
    InputMethod,
    System,
    Other,
}

/// One entry of the platform window list.
#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub kind: WindowKind,
}

/// Details of the currently focused element, for the device-state query.
#[derive(Debug, Clone, Serialize)]
pub struct FocusedElement {
    pub text: Option<String>,
    #[serde(rename = "className")]
    pub class_name: Option<String>,
    #[serde(rename = "resourceId")]
    pub resource_id: Option<String>,
    #[serde(skip)]
    pub is_editable: bool,
}

/// Read-only view of the platform accessibility data.
pub trait IntrospectionSource: Send + Sync {
    /// Root of the active window's tree, or `None` when no window is
    /// foregrounded (an empty snapshot, not an error).
    fn active_root(&self) -> Result<Option<Box<dyn UiNode>>>;

    /// Current platform window list.
    fn windows(&self) -> Result<Vec<WindowInfo>>;

    /// Element holding input focus (falling back to accessibility focus).
    fn focused_node(&self) -> Result<Option<FocusedElement>>;

    /// Package identity of the foreground app, if any.
    fn foreground_package(&self) -> Option<String>;

    /// Human-readable label for a package, if resolvable.
    fn app_label(&self, package: &str) -> Option<String>;
}
