//! Mirror-surface capture, the fallback strategy.
//!
//! A user-granted projection token lets us mirror the display onto an
//! off-screen surface backed by a buffer queue. The compositor fills the
//! queue on its own schedule, so the first frame takes a while to arrive;
//! acquisition polls with a bounded retry budget instead of blocking. Both
//! halves of the mirror (the surface and the consumer) are released exactly
//! once, whether or not a frame arrived.

use super::{CaptureError, CaptureOutput, DisplaySpec, ScreenCapturer};
use crate::encode::encode_png_base64;
use crate::frame::{expand_limited_range, RawFrame};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const ACQUIRE_ATTEMPTS: u32 = 5;
/// The compositor needs one composition pass before the first frame lands.
pub const FIRST_FRAME_WAIT: Duration = Duration::from_millis(300);
pub const RETRY_WAIT: Duration = Duration::from_millis(200);

/// The display half of a mirror: keeps the projection output alive.
pub trait MirrorSurface: Send {
    fn release(self: Box<Self>);
}

/// The buffer-queue half of a mirror: yields frames as they are composed.
pub trait FrameConsumer: Send {
    /// Most recent frame if one is ready. `None` means nothing has been
    /// composed since the last acquire.
    fn acquire_latest(&mut self) -> Option<RawFrame>;

    fn release(self: Box<Self>);
}

/// Platform seam to projection-based display mirroring.
pub trait DisplayMirror: Send + Sync {
    /// Whether the user has granted a projection token.
    fn has_grant(&self) -> bool;

    /// Create a fresh mirror of the given geometry.
    fn create_surface(
        &self,
        spec: DisplaySpec,
    ) -> anyhow::Result<(Box<dyn MirrorSurface>, Box<dyn FrameConsumer>)>;
}

/// Owns both halves of a live mirror and releases each exactly once,
/// either explicitly or on drop (so an unwind cannot leak them).
struct MirrorSession {
    surface: Option<Box<dyn MirrorSurface>>,
    consumer: Option<Box<dyn FrameConsumer>>,
}

impl MirrorSession {
    fn new(surface: Box<dyn MirrorSurface>, consumer: Box<dyn FrameConsumer>) -> Self {
        Self {
            surface: Some(surface),
            consumer: Some(consumer),
        }
    }

    fn consumer_mut(&mut self) -> Option<&mut (dyn FrameConsumer + '_)> {
        match self.consumer.as_mut() {
            Some(c) => Some(c.as_mut()),
            None => None,
        }
    }

    fn release(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.release();
        }
        if let Some(surface) = self.surface.take() {
            surface.release();
        }
    }
}

impl Drop for MirrorSession {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct MirroredCapturer {
    mirror: Arc<dyn DisplayMirror>,
    display: DisplaySpec,
    /// Mirror buffers arrive in limited-range video levels on some devices;
    /// when set, channels are expanded to full range before encoding.
    expand_limited_range: bool,
}

impl MirroredCapturer {
    pub fn new(mirror: Arc<dyn DisplayMirror>, display: DisplaySpec) -> Self {
        Self {
            mirror,
            display,
            expand_limited_range: false,
        }
    }

    pub fn with_expand_limited_range(mut self, expand: bool) -> Self {
        self.expand_limited_range = expand;
        self
    }

    async fn acquire_frame(&self, consumer: &mut dyn FrameConsumer) -> Option<(RawFrame, u32)> {
        for attempt in 1..=ACQUIRE_ATTEMPTS {
            let wait = if attempt == 1 {
                FIRST_FRAME_WAIT
            } else {
                RETRY_WAIT
            };
            tokio::time::sleep(wait).await;
            if let Some(frame) = consumer.acquire_latest() {
                return Some((frame, attempt));
            }
            debug!("no frame ready on attempt {attempt}");
        }
        None
    }
}

#[async_trait]
impl ScreenCapturer for MirroredCapturer {
    async fn capture(&self) -> Result<CaptureOutput, CaptureError> {
        if !self.mirror.has_grant() {
            return Err(CaptureError::PermissionRequired);
        }

        let (surface, consumer) = self
            .mirror
            .create_surface(self.display)
            .map_err(|e| CaptureError::DisplayCreation(format!("{e:#}")))?;
        let mut session = MirrorSession::new(surface, consumer);

        let acquired = match session.consumer_mut() {
            Some(consumer) => self.acquire_frame(consumer).await,
            None => None,
        };

        // Release both halves before looking at the result; the mirror must
        // not outlive the request on any path.
        session.release();

        let (frame, attempt) = acquired.ok_or(CaptureError::AcquisitionTimeout {
            attempts: ACQUIRE_ATTEMPTS,
        })?;
        debug!(
            "mirrored capture: {}x{} frame on attempt {}",
            frame.width, frame.height, attempt
        );
        if attempt == ACQUIRE_ATTEMPTS {
            warn!("frame arrived on the last attempt, compositor is slow");
        }

        let mut image = frame.into_image()?;
        if self.expand_limited_range {
            expand_limited_range(&mut image);
        }
        let (width, height) = image.dimensions();
        let base64_png = encode_png_base64(&image)?;
        Ok(CaptureOutput {
            base64_png,
            width,
            height,
        })
    }

    fn name(&self) -> &'static str {
        "mirrored"
    }
}
