//! Refresh scheduler: periodic snapshot production, single-flight.
//!
//! A fixed-period timer drives [`RefreshEngine::tick`]. Two disciplines
//! keep the load bounded without any queueing: a compare-and-swap
//! re-entrancy guard (an overlapping tick is a silent no-op) and a minimum
//! spacing floor measured from the last *completed* tick (ticks arriving
//! faster are skipped, never buffered). Stopping cancels future ticks but
//! lets in-flight work finish.

use crate::overlay::{render_snapshot, OverlayRenderer};
use crate::source::IntrospectionSource;
use crate::tree::{SnapshotBuilder, SnapshotStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Fixed tick period, independent of work duration.
    pub refresh_interval: Duration,
    /// Minimum spacing between completed work items. A rate limiter, not a
    /// queue.
    pub min_frame_time: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(250),
            min_frame_time: Duration::from_millis(16),
        }
    }
}

/// Drives snapshot builds and overlay refreshes.
pub struct RefreshEngine {
    builder: SnapshotBuilder,
    source: Arc<dyn IntrospectionSource>,
    store: Arc<SnapshotStore>,
    overlay: Arc<dyn OverlayRenderer>,
    config: SchedulerConfig,
    busy: AtomicBool,
    last_completed: Mutex<Option<Instant>>,
    last_package: Mutex<Option<String>>,
}

/// Clears the busy flag on every exit path out of `tick`.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefreshEngine {
    pub fn new(
        builder: SnapshotBuilder,
        source: Arc<dyn IntrospectionSource>,
        store: Arc<SnapshotStore>,
        overlay: Arc<dyn OverlayRenderer>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            builder,
            source,
            store,
            overlay,
            config,
            busy: AtomicBool::new(false),
            last_completed: Mutex::new(None),
            last_package: Mutex::new(None),
        }
    }

    /// One scheduler tick. Returns `true` when a snapshot was built and
    /// installed.
    ///
    /// No-op (returns `false`) when a tick is already in flight, or when
    /// less than `min_frame_time` has passed since the last completed
    /// tick. Two ticks closer together than the floor produce exactly one
    /// snapshot.
    pub fn tick(&self) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // A tick is already running; this one is dropped, not queued.
            return false;
        }
        let _busy = BusyGuard(&self.busy);

        {
            let last = self
                .last_completed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(t) = *last {
                if t.elapsed() < self.config.min_frame_time {
                    return false;
                }
            }
        }

        self.reset_overlay_on_package_change();

        let snapshot = self.builder.build(self.source.as_ref());
        let snapshot = self.store.install(snapshot);
        render_snapshot(self.overlay.as_ref(), &snapshot);

        *self
            .last_completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        true
    }

    /// The foreground app changed: drop stale highlights before the next
    /// build paints the new app's elements.
    fn reset_overlay_on_package_change(&self) {
        let current = self.source.foreground_package();
        let mut last = self
            .last_package
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last.is_some() && *last != current {
            debug!("foreground package changed, resetting overlay");
            self.overlay.clear();
            self.overlay.refresh();
        }
        if current.is_some() {
            *last = current;
        }
    }

    /// Periodic loop: Idle until first tick fires, then Scheduled/Running
    /// alternation until `stop` is raised. In-flight work is never aborted;
    /// the flag is checked between ticks.
    pub async fn run(self: Arc<Self>, stop: Arc<AtomicBool>) {
        let mut interval = tokio::time::interval(self.config.refresh_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The immediate first tick of tokio intervals would double-fire at
        // startup; swallow it so the first build lands one period in.
        interval.tick().await;

        info!(
            "refresh loop started (period {:?}, floor {:?})",
            self.config.refresh_interval, self.config.min_frame_time
        );
        loop {
            interval.tick().await;
            if stop.load(Ordering::Acquire) {
                break;
            }
            if self.tick() {
                let snap = self.store.current();
                debug!(
                    "refresh: {} elements in {:?}",
                    snap.element_count(),
                    snap.walk_duration
                );
            }
        }
        info!("refresh loop stopped");
    }
}
