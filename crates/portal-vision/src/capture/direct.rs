//! One-shot compositor screenshot.
//!
//! The cheap path: ask the compositor for the current frame directly, no
//! mirror surface and no projection prompt. Not every device exposes the
//! call, and the compositor rate-limits it; failures come back as status
//! words that map onto [`DirectCaptureError`].

use super::{CaptureError, CaptureOutput, ScreenCapturer};
use crate::encode::encode_png_base64;
use crate::frame::RawFrame;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Raw status word from a failed compositor screenshot call.
pub type CompositorStatus = i32;

pub const STATUS_INTERNAL_ERROR: CompositorStatus = 1;
pub const STATUS_NO_ACCESS: CompositorStatus = 2;
pub const STATUS_INTERVAL_TOO_SHORT: CompositorStatus = 3;
pub const STATUS_INVALID_DISPLAY: CompositorStatus = 4;
pub const STATUS_INVALID_WINDOW: CompositorStatus = 5;
pub const STATUS_SECURE_WINDOW: CompositorStatus = 6;

#[derive(Debug, Error)]
pub enum DirectCaptureError {
    #[error("compositor internal error")]
    Internal,
    #[error("process lacks screenshot access")]
    NoAccess,
    #[error("screenshot requested too soon after the previous one")]
    RateLimited,
    #[error("display id is not valid")]
    InvalidDisplay,
    #[error("window is gone or not visible")]
    InvalidWindow,
    #[error("foreground window forbids capture")]
    SecureWindow,
    #[error("unknown compositor status {0}")]
    Unknown(CompositorStatus),
}

impl DirectCaptureError {
    pub fn code(&self) -> &'static str {
        match self {
            DirectCaptureError::Internal => "internal_error",
            DirectCaptureError::NoAccess => "no_access",
            DirectCaptureError::RateLimited => "rate_limited",
            DirectCaptureError::InvalidDisplay => "invalid_display",
            DirectCaptureError::InvalidWindow => "invalid_window",
            DirectCaptureError::SecureWindow => "secure_window",
            DirectCaptureError::Unknown(_) => "internal_error",
        }
    }
}

impl From<CompositorStatus> for DirectCaptureError {
    fn from(status: CompositorStatus) -> Self {
        match status {
            STATUS_INTERNAL_ERROR => DirectCaptureError::Internal,
            STATUS_NO_ACCESS => DirectCaptureError::NoAccess,
            STATUS_INTERVAL_TOO_SHORT => DirectCaptureError::RateLimited,
            STATUS_INVALID_DISPLAY => DirectCaptureError::InvalidDisplay,
            STATUS_INVALID_WINDOW => DirectCaptureError::InvalidWindow,
            STATUS_SECURE_WINDOW => DirectCaptureError::SecureWindow,
            other => DirectCaptureError::Unknown(other),
        }
    }
}

/// Platform seam to the compositor screenshot call.
#[async_trait]
pub trait CompositorApi: Send + Sync {
    /// Capture the named display, already converted to full-range RGBA.
    async fn capture_display(&self, display_id: u32) -> Result<RawFrame, CompositorStatus>;
}

pub struct DirectCapturer {
    api: Arc<dyn CompositorApi>,
    display_id: u32,
}

impl DirectCapturer {
    pub fn new(api: Arc<dyn CompositorApi>, display_id: u32) -> Self {
        Self { api, display_id }
    }
}

#[async_trait]
impl ScreenCapturer for DirectCapturer {
    async fn capture(&self) -> Result<CaptureOutput, CaptureError> {
        let frame = self
            .api
            .capture_display(self.display_id)
            .await
            .map_err(DirectCaptureError::from)?;
        debug!(
            "direct capture: {}x{} frame from display {}",
            frame.width, frame.height, self.display_id
        );

        let image = frame.into_image()?;
        let (width, height) = image.dimensions();
        let base64_png = encode_png_base64(&image)?;
        Ok(CaptureOutput {
            base64_png,
            width,
            height,
        })
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}
