//! Runtime configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working setup; embedders override only what they need.

use anyhow::{Context, Result};
use portal_accessibility::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalConfig {
    /// Snapshot refresh period, milliseconds.
    pub refresh_interval_ms: u64,
    /// Minimum spacing between completed refreshes, milliseconds.
    pub min_frame_time_ms: u64,
    /// Elements with width or height at or under this are filtered out.
    pub min_element_size: i32,
    /// Whether the highlight overlay draws at all.
    pub overlay_enabled: bool,
    /// Delay between hiding the overlay and capturing, milliseconds. Gives
    /// the compositor time to present a frame without the highlights.
    pub overlay_settle_ms: u64,
    /// Budget for one capture attempt, milliseconds.
    pub capture_timeout_ms: u64,
    /// Outer budget for a screenshot query, milliseconds. Larger than the
    /// capture budget so the caller sees the capture error, not a generic
    /// query timeout.
    pub query_timeout_ms: u64,
    /// Expand limited-range (16..235) mirror frames to full range.
    pub expand_limited_range: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 250,
            min_frame_time_ms: 16,
            min_element_size: 5,
            overlay_enabled: true,
            overlay_settle_ms: 100,
            capture_timeout_ms: 5_000,
            query_timeout_ms: 10_000,
            expand_limited_range: false,
        }
    }
}

impl PortalConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
            min_frame_time: Duration::from_millis(self.min_frame_time_ms),
        }
    }

    pub fn overlay_settle(&self) -> Duration {
        Duration::from_millis(self.overlay_settle_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}
