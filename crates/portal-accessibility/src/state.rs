//! Device-state summary: foreground app, keyboard visibility, focus.

use crate::source::{FocusedElement, IntrospectionSource, WindowKind};
use serde::Serialize;
use tracing::warn;

/// Point-in-time summary of what the device is showing.
///
/// Every field degrades independently: a failed window-list read yields
/// `keyboard_visible: false`, an unresolvable label yields `None`, and so
/// on. The query never fails as a whole.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceState {
    /// Human-readable label of the foreground app, if resolvable.
    #[serde(rename = "currentApp")]
    pub app_label: Option<String>,
    #[serde(rename = "packageName")]
    pub package_name: Option<String>,
    /// True when an input-method window is present in the window list.
    #[serde(rename = "keyboardVisible")]
    pub keyboard_visible: bool,
    /// True when the focused element accepts text input.
    #[serde(rename = "isEditable")]
    pub is_editable: bool,
    #[serde(rename = "focusedElement")]
    pub focused: Option<FocusedElement>,
}

/// Gather the current device state from the introspection source.
pub fn device_state(source: &dyn IntrospectionSource) -> DeviceState {
    let package_name = source.foreground_package();
    let app_label = package_name.as_deref().and_then(|p| source.app_label(p));

    let keyboard_visible = match source.windows() {
        Ok(windows) => windows.iter().any(|w| w.kind == WindowKind::InputMethod),
        Err(e) => {
            warn!("failed to read window list: {:#}", e);
            false
        }
    };

    let focused = match source.focused_node() {
        Ok(focused) => focused,
        Err(e) => {
            warn!("failed to read focused element: {:#}", e);
            None
        }
    };
    let is_editable = focused.as_ref().map(|f| f.is_editable).unwrap_or(false);

    DeviceState {
        app_label,
        package_name,
        keyboard_visible,
        is_editable,
        focused,
    }
}
