//! Screenshot request coordination.
//!
//! A capture request has three phases: hide the highlight overlay and let
//! the compositor settle, run the selected capture strategy with a bounded
//! budget, and restore the overlay to exactly the state it was in before,
//! on every path including timeouts. At most one capture runs
//! at a time; a second request while one is in flight is rejected rather
//! than queued, because its frame would show the same screen anyway.

use portal_accessibility::OverlayRenderer;
use portal_vision::capture::spawn_capture;
use portal_vision::{CaptureError, CaptureOutput, ScreenCapturer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CaptureRequestError {
    /// Another capture is in flight; retry after it completes.
    #[error("a capture is already in progress")]
    Busy,
    /// The strategy did not finish within the capture budget.
    #[error("capture timed out")]
    Timeout,
    /// The capture task died without reporting a result.
    #[error("capture worker disappeared")]
    WorkerGone,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl CaptureRequestError {
    pub fn code(&self) -> &'static str {
        match self {
            CaptureRequestError::Busy => "busy",
            CaptureRequestError::Timeout => "timeout",
            CaptureRequestError::WorkerGone => "internal_error",
            CaptureRequestError::Capture(e) => e.code(),
        }
    }
}

/// Hides the overlay for the duration of a capture and restores the
/// previous drawing state when dropped.
struct OverlayPause<'a> {
    overlay: &'a dyn OverlayRenderer,
    was_enabled: bool,
}

impl<'a> OverlayPause<'a> {
    fn new(overlay: &'a dyn OverlayRenderer) -> Self {
        let was_enabled = overlay.drawing_enabled();
        overlay.set_drawing_enabled(false);
        overlay.clear();
        overlay.refresh();
        Self {
            overlay,
            was_enabled,
        }
    }
}

impl Drop for OverlayPause<'_> {
    fn drop(&mut self) {
        // The next refresh tick repaints; only the flag needs restoring.
        self.overlay.set_drawing_enabled(self.was_enabled);
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CaptureCoordinator {
    capturer: Arc<dyn ScreenCapturer>,
    overlay: Arc<dyn OverlayRenderer>,
    settle: Duration,
    timeout: Duration,
    in_flight: AtomicBool,
}

impl CaptureCoordinator {
    pub fn new(
        capturer: Arc<dyn ScreenCapturer>,
        overlay: Arc<dyn OverlayRenderer>,
        settle: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            capturer,
            overlay,
            settle,
            timeout,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one coordinated capture. `suppress_overlay` hides the highlight
    /// overlay for the duration (with a settle delay so the hidden overlay
    /// is not in the frame); pass `false` to capture it as drawn.
    pub async fn capture(
        &self,
        suppress_overlay: bool,
    ) -> Result<CaptureOutput, CaptureRequestError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("rejecting capture request, one already in flight");
            return Err(CaptureRequestError::Busy);
        }
        let _in_flight = InFlightGuard(&self.in_flight);

        let _pause = if suppress_overlay {
            let pause = OverlayPause::new(self.overlay.as_ref());
            tokio::time::sleep(self.settle).await;
            Some(pause)
        } else {
            None
        };

        let rx = spawn_capture(self.capturer.clone());
        match tokio::time::timeout(self.timeout, rx).await {
            Err(_) => {
                warn!("capture exceeded {:?} budget", self.timeout);
                Err(CaptureRequestError::Timeout)
            }
            Ok(Err(_)) => Err(CaptureRequestError::WorkerGone),
            Ok(Ok(result)) => result.map_err(CaptureRequestError::from),
        }
    }
}
