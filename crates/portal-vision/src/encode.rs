//! PNG + Base64 wire encoding of captured frames.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("png encoding failed: {0}")]
    Png(#[from] image::ImageError),
}

/// Encode as PNG, then Base64 (standard alphabet, padded, no line breaks).
pub fn encode_png_base64(image: &RgbaImage) -> Result<String, EncodeError> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(STANDARD.encode(&png))
}
