//! Foreground UI introspection: periodic tree snapshots of the active
//! window's element tree, native-handle lifecycle, device/focus state,
//! and render-command emission for the highlight overlay.
//!
//! The live introspection tree is platform-owned and reached through the
//! [`source::IntrospectionSource`] trait; this crate never holds on to live
//! nodes beyond a single walk. Everything a snapshot needs to outlive the
//! walk is duplicated into an owned arena ([`tree::Snapshot`]) whose native
//! handles are released exactly once when the snapshot is superseded.

pub mod handle;
pub mod overlay;
pub mod scheduler;
pub mod source;
pub mod state;
pub mod tree;

pub use handle::{HandleId, HandleTable, NativeHandle};
pub use overlay::OverlayRenderer;
pub use scheduler::{RefreshEngine, SchedulerConfig};
pub use source::{FocusedElement, IntrospectionSource, UiNode, WindowInfo, WindowKind};
pub use state::{device_state, DeviceState};
pub use tree::{ElementKind, ElementNode, Rect, Snapshot, SnapshotBuilder, SnapshotStore};
