// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of uploaded image bytes

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Maximum accepted image payload (10MB)
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Failures while turning client bytes into pixels
///
/// All variants are client-input faults and map to a 4xx response at the
/// transport layer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image data is empty")]
    Empty,

    #[error("image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("unrecognized image encoding")]
    UnsupportedFormat,

    #[error("failed to decode image: {0}")]
    Malformed(String),
}

/// A decoded image together with its true pixel dimensions
///
/// `width`/`height` always reflect the uploaded image, never the resolution
/// the detector later works at. Lives for a single request.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Decoded pixel grid
    pub pixels: DynamicImage,
    /// Original width in pixels
    pub width: u32,
    /// Original height in pixels
    pub height: u32,
}

/// Decode raw image bytes from a multipart upload
///
/// # Arguments
/// * `bytes` - Raw encoded image bytes
///
/// # Returns
/// * `Ok(DecodedImage)` - The decoded image and its original dimensions
/// * `Err(DecodeError)` - If the bytes are empty, oversized, or not a
///   recognized raster encoding
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(DecodeError::TooLarge(bytes.len(), MAX_IMAGE_SIZE));
    }

    // Detect format from magic bytes before handing to the decoder
    let format = detect_format(bytes)?;

    let pixels = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let (width, height) = (pixels.width(), pixels.height());

    Ok(DecodedImage {
        pixels,
        width,
        height,
    })
}

/// Detect image format from magic bytes
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(DecodeError::UnsupportedFormat)` - If format cannot be detected
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, DecodeError> {
    if bytes.len() < 4 {
        return Err(DecodeError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(DecodeError::UnsupportedFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    // 1x1 red PNG image (base64)
    const TINY_PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    #[test]
    fn test_decode_png() {
        let bytes = STANDARD.decode(TINY_PNG_BASE64).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.width, 1);
        assert_eq!(decoded.height, 1);
        assert_eq!(decoded.pixels.width(), 1);
        assert_eq!(decoded.pixels.height(), 1);
    }

    #[test]
    fn test_decode_reports_original_dimensions() {
        let mut bytes = Vec::new();
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(37, 19));
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.width, 37);
        assert_eq!(decoded.height, 19);
    }

    #[test]
    fn test_decode_empty() {
        let result = decode_image(&[]);
        assert!(matches!(result.unwrap_err(), DecodeError::Empty));
    }

    #[test]
    fn test_decode_too_large() {
        let oversized = vec![0u8; MAX_IMAGE_SIZE + 1];
        let result = decode_image(&oversized);
        assert!(matches!(result.unwrap_err(), DecodeError::TooLarge(_, _)));
    }

    #[test]
    fn test_decode_non_image_bytes() {
        let result = decode_image(b"this is definitely not an image");
        assert!(matches!(result.unwrap_err(), DecodeError::UnsupportedFormat));
    }

    #[test]
    fn test_decode_corrupted() {
        // PNG header but truncated data
        let result = decode_image(&[0x89, 0x50, 0x4E, 0x47, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(result.unwrap_err(), DecodeError::Malformed(_)));
    }

    #[test]
    fn test_detect_format_png() {
        let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_format(&png_header).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_detect_format_jpeg() {
        let jpeg_header = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(detect_format(&jpeg_header).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_detect_format_gif() {
        let gif87 = [0x47, 0x49, 0x46, 0x38, 0x37, 0x61];
        let gif89 = [0x47, 0x49, 0x46, 0x38, 0x39, 0x61];
        assert_eq!(detect_format(&gif87).unwrap(), ImageFormat::Gif);
        assert_eq!(detect_format(&gif89).unwrap(), ImageFormat::Gif);
    }

    #[test]
    fn test_detect_format_webp() {
        let webp_header = [
            0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50,
        ];
        assert_eq!(detect_format(&webp_header).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_detect_format_unknown() {
        let unknown = [0x00, 0x00, 0x00, 0x00];
        assert!(detect_format(&unknown).is_err());
    }
}
