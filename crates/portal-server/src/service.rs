//! Top-level wiring of the capture subsystem.
//!
//! All platform collaborators arrive through [`PortalDeps`] at
//! construction; the service owns the snapshot store, the refresh engine,
//! and the capture coordinator, and exposes the handful of operations the
//! query surface needs. Nothing in here reaches for process-global state.

use crate::config::PortalConfig;
use crate::coordinator::{CaptureCoordinator, CaptureRequestError};
use portal_accessibility::scheduler::RefreshEngine;
use portal_accessibility::tree::{Rect, Snapshot, SnapshotBuilder, SnapshotStore};
use portal_accessibility::{device_state, DeviceState, IntrospectionSource, OverlayRenderer};
use portal_vision::capture::select_capturer;
use portal_vision::{
    CaptureError, CaptureOutput, DisplayMirror, DisplaySpec, MirroredCapturer, ScreenCapturer,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::info;

/// Mirror seam plus the geometry to mirror, for the fallback strategy.
pub struct MirrorDeps {
    pub mirror: Arc<dyn DisplayMirror>,
    pub display: DisplaySpec,
}

/// Platform collaborators, injected once at construction.
pub struct PortalDeps {
    pub source: Arc<dyn IntrospectionSource>,
    pub overlay: Arc<dyn OverlayRenderer>,
    /// Direct compositor strategy, when the platform supports it.
    pub direct: Option<Arc<dyn ScreenCapturer>>,
    /// Mirror-surface fallback, when the platform can create one. The
    /// service builds the strategy itself so capture config (range
    /// expansion) applies to it.
    pub mirror: Option<MirrorDeps>,
    /// Full screen bounds, used as the visibility filter.
    pub screen_bounds: Rect,
}

pub struct PortalService {
    config: PortalConfig,
    source: Arc<dyn IntrospectionSource>,
    store: Arc<SnapshotStore>,
    engine: Arc<RefreshEngine>,
    /// `None` when the device supports no capture strategy; screenshot
    /// requests then fail without probing again.
    coordinator: Option<CaptureCoordinator>,
    stop: Arc<AtomicBool>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl PortalService {
    pub fn new(config: PortalConfig, deps: PortalDeps) -> Self {
        deps.overlay.set_drawing_enabled(config.overlay_enabled);

        let store = Arc::new(SnapshotStore::new());
        let builder = SnapshotBuilder::new(deps.screen_bounds)
            .with_min_element_size(config.min_element_size);
        let engine = Arc::new(RefreshEngine::new(
            builder,
            deps.source.clone(),
            store.clone(),
            deps.overlay.clone(),
            config.scheduler_config(),
        ));

        let mirrored = deps.mirror.map(|m| {
            Arc::new(
                MirroredCapturer::new(m.mirror, m.display)
                    .with_expand_limited_range(config.expand_limited_range),
            ) as Arc<dyn ScreenCapturer>
        });

        // Strategy support is probed exactly once, here.
        let coordinator = match select_capturer(deps.direct, mirrored) {
            Ok(capturer) => Some(CaptureCoordinator::new(
                capturer,
                deps.overlay.clone(),
                config.overlay_settle(),
                config.capture_timeout(),
            )),
            Err(_) => None,
        };

        Self {
            config,
            source: deps.source,
            store,
            engine,
            coordinator,
            stop: Arc::new(AtomicBool::new(false)),
            refresh_task: Mutex::new(None),
        }
    }

    /// Start the periodic refresh loop. Idempotent; a second call while
    /// running is a no-op.
    pub fn start(&self) {
        let mut task = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        self.stop.store(false, Ordering::Release);
        *task = Some(tokio::spawn(
            self.engine.clone().run(self.stop.clone()),
        ));
        info!(
            "portal service started (refresh every {}ms)",
            self.config.refresh_interval_ms
        );
    }

    /// Ask the refresh loop to stop after its current tick.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Stop refreshing and release every native handle still held.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
        self.store.shutdown();
        info!("portal service shut down");
    }

    /// The current published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    /// Build and install a snapshot right now, outside the periodic cadence.
    /// Returns `false` when skipped (busy or inside the frame-time floor).
    pub fn force_refresh(&self) -> bool {
        self.engine.tick()
    }

    /// Point-in-time device state, read fresh from the platform.
    pub fn device_state(&self) -> DeviceState {
        device_state(self.source.as_ref())
    }

    /// One coordinated screenshot.
    pub async fn capture(
        &self,
        suppress_overlay: bool,
    ) -> Result<CaptureOutput, CaptureRequestError> {
        match &self.coordinator {
            Some(coordinator) => coordinator.capture(suppress_overlay).await,
            None => Err(CaptureRequestError::Capture(CaptureError::Unsupported)),
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }
}
