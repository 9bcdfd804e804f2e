//! Raw frame buffers and pixel-format fixups.

use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame buffer too small: got {got} bytes, need {need}")]
    BufferTooSmall { got: usize, need: usize },
    #[error("unsupported pixel stride {0}, expected 4 (RGBA)")]
    UnsupportedPixelStride(usize),
    #[error("frame has zero width or height")]
    EmptyFrame,
}

/// One RGBA frame as handed over by the platform buffer queue.
///
/// `row_stride` may exceed `width * pixel_stride`: hardware buffer queues
/// pad rows to alignment boundaries, and the padding bytes are garbage that
/// must be cropped out before encoding.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per pixel.
    pub pixel_stride: usize,
    /// Bytes per buffer row, `>= width * pixel_stride`.
    pub row_stride: usize,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Convert into a tightly-packed image, dropping row padding.
    pub fn into_image(self) -> Result<RgbaImage, FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::EmptyFrame);
        }
        if self.pixel_stride != 4 {
            return Err(FrameError::UnsupportedPixelStride(self.pixel_stride));
        }
        let row_bytes = self.width as usize * self.pixel_stride;
        let need = self.row_stride * (self.height as usize - 1) + row_bytes;
        if self.data.len() < need {
            return Err(FrameError::BufferTooSmall {
                got: self.data.len(),
                need,
            });
        }

        if self.row_stride == row_bytes && self.data.len() == row_bytes * self.height as usize {
            // Already tight; reuse the buffer.
            return RgbaImage::from_raw(self.width, self.height, self.data)
                .ok_or(FrameError::EmptyFrame);
        }

        let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * self.row_stride;
            packed.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        RgbaImage::from_raw(self.width, self.height, packed).ok_or(FrameError::EmptyFrame)
    }
}

/// Map one limited-range (16..235) channel value to full range (0..255).
///
/// Values below 16 clamp to 0, above 235 to 255, and the rest scale
/// linearly. Integer math only, matching the compositor's own conversion.
pub fn expand_channel(v: u8) -> u8 {
    if v < 16 {
        0
    } else if v > 235 {
        255
    } else {
        ((v as u32 - 16) * 255 / 219) as u8
    }
}

/// Expand every color channel of a limited-range frame in place. Alpha is
/// untouched.
pub fn expand_limited_range(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        pixel.0[0] = expand_channel(pixel.0[0]);
        pixel.0[1] = expand_channel(pixel.0[1]);
        pixel.0[2] = expand_channel(pixel.0[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_channel_endpoints_and_midpoint() {
        assert_eq!(expand_channel(0), 0);
        assert_eq!(expand_channel(15), 0);
        assert_eq!(expand_channel(16), 0);
        assert_eq!(expand_channel(235), 255);
        assert_eq!(expand_channel(236), 255);
        assert_eq!(expand_channel(255), 255);
        // (125 - 16) * 255 / 219 = 126 (integer division).
        assert_eq!(expand_channel(125), 126);
    }

    #[test]
    fn expand_channel_is_monotonic() {
        let mut prev = expand_channel(0);
        for v in 1..=255u8 {
            let cur = expand_channel(v);
            assert!(cur >= prev, "not monotonic at {v}");
            prev = cur;
        }
    }

    #[test]
    fn tight_frame_converts_without_copy_artifacts() {
        let frame = RawFrame {
            width: 2,
            height: 2,
            pixel_stride: 4,
            row_stride: 8,
            data: vec![
                1, 2, 3, 4, 5, 6, 7, 8, // row 0
                9, 10, 11, 12, 13, 14, 15, 16, // row 1
            ],
        };
        let image = frame.into_image().unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 0).0, [1, 2, 3, 4]);
        assert_eq!(image.get_pixel(1, 1).0, [13, 14, 15, 16]);
    }

    #[test]
    fn padded_rows_are_cropped() {
        // 2x2 image, rows padded to 12 bytes; 0xAA marks padding.
        let frame = RawFrame {
            width: 2,
            height: 2,
            pixel_stride: 4,
            row_stride: 12,
            data: vec![
                1, 1, 1, 255, 2, 2, 2, 255, 0xAA, 0xAA, 0xAA, 0xAA, // row 0
                3, 3, 3, 255, 4, 4, 4, 255, // row 1, trailing padding omitted
            ],
        };
        let image = frame.into_image().unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [1, 1, 1, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [2, 2, 2, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [3, 3, 3, 255]);
        assert_eq!(image.get_pixel(1, 1).0, [4, 4, 4, 255]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let frame = RawFrame {
            width: 4,
            height: 4,
            pixel_stride: 4,
            row_stride: 16,
            data: vec![0; 32],
        };
        assert!(matches!(
            frame.into_image(),
            Err(FrameError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn non_rgba_stride_is_rejected() {
        let frame = RawFrame {
            width: 2,
            height: 1,
            pixel_stride: 3,
            row_stride: 6,
            data: vec![0; 6],
        };
        assert!(matches!(
            frame.into_image(),
            Err(FrameError::UnsupportedPixelStride(3))
        ));
    }

    #[test]
    fn expand_limited_range_leaves_alpha() {
        let mut image = RgbaImage::from_pixel(1, 1, image::Rgba([16, 125, 235, 128]));
        expand_limited_range(&mut image);
        assert_eq!(image.get_pixel(0, 0).0, [0, 126, 255, 128]);
    }
}
