//! Screen capture pipeline: raw frame handling, dual capture strategies
//! (direct compositor screenshot with a mirror-surface fallback), and
//! PNG/Base64 wire encoding.

pub mod capture;
pub mod encode;
pub mod frame;

pub use capture::direct::{CompositorApi, DirectCaptureError, DirectCapturer};
pub use capture::mirrored::{DisplayMirror, FrameConsumer, MirrorSurface, MirroredCapturer};
pub use capture::{select_capturer, spawn_capture, CaptureError, CaptureOutput, DisplaySpec, ScreenCapturer};
pub use encode::encode_png_base64;
pub use frame::{expand_channel, expand_limited_range, RawFrame};
