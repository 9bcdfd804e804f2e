//! Screen capture strategies and their shared surface.
//!
//! Two implementations exist: [`direct::DirectCapturer`], which asks the
//! compositor for a one-shot screenshot, and [`mirrored::MirroredCapturer`],
//! which mirrors the display to an off-screen surface and drains its buffer
//! queue. The hosting process probes platform support once at startup and
//! hands [`select_capturer`] whichever strategies are available; everything
//! downstream talks to the [`ScreenCapturer`] trait only.

pub mod direct;
pub mod mirrored;

use crate::encode::EncodeError;
use crate::frame::FrameError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Geometry of the display being captured.
#[derive(Debug, Clone, Copy)]
pub struct DisplaySpec {
    pub width: u32,
    pub height: u32,
    pub density_dpi: u32,
}

/// One successful capture, ready for the wire.
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    /// Base64 of the PNG bytes.
    pub base64_png: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user has not granted a projection token yet.
    #[error("screen capture permission not granted")]
    PermissionRequired,
    #[error("failed to create mirror surface: {0}")]
    DisplayCreation(String),
    /// The buffer queue produced no frame within the retry budget.
    #[error("no frame acquired after {attempts} attempts")]
    AcquisitionTimeout { attempts: u32 },
    #[error(transparent)]
    Direct(#[from] direct::DirectCaptureError),
    #[error(transparent)]
    BadFrame(#[from] FrameError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// No capture strategy is available on this platform.
    #[error("screen capture is not supported on this device")]
    Unsupported,
}

impl CaptureError {
    /// Stable machine-readable code for the wire envelope.
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::PermissionRequired => "permission_required",
            CaptureError::DisplayCreation(_) => "display_creation_failed",
            CaptureError::AcquisitionTimeout { .. } => "acquisition_timeout",
            CaptureError::Direct(e) => e.code(),
            CaptureError::BadFrame(_) => "bad_frame",
            CaptureError::Encode(_) => "encode_failed",
            CaptureError::Unsupported => "unsupported",
        }
    }
}

/// A strategy that can produce one encoded screenshot per call.
#[async_trait]
pub trait ScreenCapturer: Send + Sync {
    async fn capture(&self) -> Result<CaptureOutput, CaptureError>;

    /// Strategy name, for logs.
    fn name(&self) -> &'static str;
}

/// Pick the capture strategy for this process lifetime.
///
/// Direct compositor capture wins when available (no projection prompt, no
/// mirror latency); the mirrored path is the fallback. Probing happens once
/// at startup, so an unsupported device fails here, not per request.
pub fn select_capturer(
    direct: Option<Arc<dyn ScreenCapturer>>,
    mirrored: Option<Arc<dyn ScreenCapturer>>,
) -> Result<Arc<dyn ScreenCapturer>, CaptureError> {
    match direct.or(mirrored) {
        Some(capturer) => {
            info!("screen capture strategy: {}", capturer.name());
            Ok(capturer)
        }
        None => {
            error!("no screen capture strategy available");
            Err(CaptureError::Unsupported)
        }
    }
}

/// Run one capture on the runtime and hand back the result channel.
///
/// The receiver side may give up (timeout) without affecting the capture
/// task; a dropped receiver only means the result goes unobserved.
pub fn spawn_capture(
    capturer: Arc<dyn ScreenCapturer>,
) -> oneshot::Receiver<Result<CaptureOutput, CaptureError>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = capturer.capture().await;
        if tx.send(result).is_err() {
            debug!("capture finished after the requester gave up");
        }
    });
    rx
}
