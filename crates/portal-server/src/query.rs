//! JSON query surface.
//!
//! Every query returns a string envelope: `{"status":"success","data":…}`
//! or `{"status":"error","error":…}`. The tree and state queries read the
//! already-published snapshot and never block on a refresh; the screenshot
//! query runs a capture under an outer deadline wide enough that callers
//! normally see the capture's own error, not a generic timeout.

use crate::service::PortalService;
use portal_accessibility::tree::Snapshot;
use serde_json::{json, Value};
use tracing::warn;

fn success(data: Value) -> String {
    json!({ "status": "success", "data": data }).to_string()
}

fn error(message: &str) -> String {
    json!({ "status": "error", "error": message }).to_string()
}

/// Bounds in the wire format: `"left, top, right, bottom"`.
fn bounds_string(el: &portal_accessibility::ElementNode) -> String {
    format!(
        "{}, {}, {}, {}",
        el.rect.left, el.rect.top, el.rect.right, el.rect.bottom
    )
}

/// Nested element forest for the current snapshot.
///
/// Children always sit at higher arena indices than their parent, so one
/// reverse pass builds every subtree before its parent needs it, with no
/// recursion however deep the UI nests.
fn tree_value(snapshot: &Snapshot) -> Value {
    let mut built: Vec<Option<Value>> = vec![None; snapshot.elements.len()];
    for idx in (0..snapshot.elements.len()).rev() {
        let el = &snapshot.elements[idx];
        let children: Vec<Value> = el
            .children
            .iter()
            .map(|&c| built[c].take().unwrap_or_default())
            .collect();
        built[idx] = Some(json!({
            "index": el.overlay_index,
            "resourceId": el.resource_id,
            "className": el.class_name,
            "text": el.display_text,
            "bounds": bounds_string(el),
            "type": el.kind.as_str(),
            "children": children,
        }));
    }
    Value::Array(
        snapshot
            .roots
            .iter()
            .map(|&r| built[r].take().unwrap_or_default())
            .collect(),
    )
}

/// The visible element forest of the current snapshot.
pub fn a11y_tree(service: &PortalService) -> String {
    success(tree_value(&service.snapshot()))
}

/// Foreground app, keyboard visibility, and focus details.
pub fn phone_state(service: &PortalService) -> String {
    match serde_json::to_value(service.device_state()) {
        Ok(state) => success(state),
        Err(e) => error(&format!("failed to serialize device state: {e}")),
    }
}

/// Combined tree and device state in one round trip.
pub fn state(service: &PortalService) -> String {
    let tree = tree_value(&service.snapshot());
    match serde_json::to_value(service.device_state()) {
        Ok(device) => success(json!({
            "a11y_tree": tree,
            "phone_state": device,
        })),
        Err(e) => error(&format!("failed to serialize device state: {e}")),
    }
}

/// Liveness check.
pub fn ping() -> String {
    success(Value::String("pong".to_string()))
}

/// One screenshot, Base64 PNG in `data`.
pub async fn screenshot(service: &PortalService) -> String {
    let deadline = service.config().query_timeout();
    match tokio::time::timeout(deadline, service.capture(true)).await {
        Err(_) => {
            warn!("screenshot query exceeded {:?} deadline", deadline);
            error("screenshot timed out")
        }
        Ok(Err(e)) => error(&format!("screenshot failed: {e}")),
        Ok(Ok(out)) => success(Value::String(out.base64_png)),
    }
}
