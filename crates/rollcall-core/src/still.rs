//! Still-image encoding: RGB frames and image files to JPEG data URLs.
//!
//! Camera captures and uploaded files both end up as the same payload:
//! `data:image/jpeg;base64,<JPEG bytes>` at a fixed quality.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::Path;
use thiserror::Error;

/// JPEG quality used for every submitted still (0.95 on a 0–1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("not an image file: {0}")]
    NotAnImage(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode JPEG: {0}")]
    Jpeg(String),
    #[error("RGB buffer too short: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("not a data URL")]
    NotDataUrl,
}

/// A JPEG-encoded still ready for submission.
#[derive(Debug, Clone)]
pub struct StillImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl StillImage {
    /// Encode a packed RGB8 buffer (`width * height * 3` bytes) as JPEG.
    pub fn from_rgb(rgb: &[u8], width: u32, height: u32, quality: u8) -> Result<Self, EncodeError> {
        let expected = (width as usize) * (height as usize) * 3;
        if rgb.len() < expected {
            return Err(EncodeError::InvalidLength {
                expected,
                actual: rgb.len(),
            });
        }
        let buffer = RgbImage::from_raw(width, height, rgb[..expected].to_vec()).ok_or(
            EncodeError::InvalidLength {
                expected,
                actual: rgb.len(),
            },
        )?;
        Self::from_image(&DynamicImage::ImageRgb8(buffer), quality)
    }

    /// Encode an already-decoded image as JPEG. Alpha is dropped.
    pub fn from_image(img: &DynamicImage, quality: u8) -> Result<Self, EncodeError> {
        let rgb = img.to_rgb8();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
            .encode_image(&rgb)
            .map_err(|e| EncodeError::Jpeg(e.to_string()))?;

        tracing::debug!(
            width = rgb.width(),
            height = rgb.height(),
            bytes = jpeg.len(),
            quality,
            "encoded still"
        );

        Ok(Self {
            jpeg,
            width: rgb.width(),
            height: rgb.height(),
        })
    }

    /// Read an image file and re-encode it as a JPEG still.
    ///
    /// The declared media type comes from the file extension; anything that
    /// is not `image/*` is rejected before the file is opened.
    pub fn from_file(path: &Path, quality: u8) -> Result<Self, EncodeError> {
        declared_image_type(path)?;

        let bytes = std::fs::read(path).map_err(|source| EncodeError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let img = image::load_from_memory(&bytes).map_err(|e| EncodeError::Decode(e.to_string()))?;
        Self::from_image(&img, quality)
    }

    /// Render as `data:image/jpeg;base64,...`.
    pub fn to_data_url(&self) -> String {
        let mut url = String::with_capacity(JPEG_DATA_URL_PREFIX.len() + self.jpeg.len() * 4 / 3 + 4);
        url.push_str(JPEG_DATA_URL_PREFIX);
        BASE64_STANDARD.encode_string(&self.jpeg, &mut url);
        url
    }
}

/// Declared media type of a file, judged by extension.
///
/// Returns the MIME string when it names an image type.
pub fn declared_image_type(path: &Path) -> Result<&'static str, EncodeError> {
    let mime = ImageFormat::from_path(path)
        .ok()
        .map(|format| format.to_mime_type())
        .filter(|mime| mime.starts_with("image/"));

    mime.ok_or_else(|| EncodeError::NotAnImage(path.display().to_string()))
}

/// Split a base64 data URL into its media type and decoded payload.
pub fn parse_data_url(url: &str) -> Result<(&str, Vec<u8>), EncodeError> {
    let rest = url.strip_prefix("data:").ok_or(EncodeError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(EncodeError::NotDataUrl)?;
    let media_type = meta.strip_suffix(";base64").ok_or(EncodeError::NotDataUrl)?;
    let bytes = BASE64_STANDARD
        .decode(payload)
        .map_err(|e| EncodeError::Decode(e.to_string()))?;
    Ok((media_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let v = (i % 256) as u8;
                [v, 255 - v, 128]
            })
            .collect()
    }

    #[test]
    fn test_from_rgb_produces_jpeg() {
        let still = StillImage::from_rgb(&gradient(16, 8), 16, 8, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!((still.width, still.height), (16, 8));
        // JPEG SOI marker
        assert_eq!(&still.jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_from_rgb_short_buffer() {
        let result = StillImage::from_rgb(&[0u8; 10], 4, 4, DEFAULT_JPEG_QUALITY);
        assert!(matches!(
            result,
            Err(EncodeError::InvalidLength { expected: 48, actual: 10 })
        ));
    }

    #[test]
    fn test_data_url_shape() {
        let still = StillImage::from_rgb(&gradient(8, 8), 8, 8, DEFAULT_JPEG_QUALITY).unwrap();
        let url = still.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let (media_type, bytes) = parse_data_url(&url).unwrap();
        assert_eq!(media_type, "image/jpeg");
        assert_eq!(bytes, still.jpeg);
    }

    #[test]
    fn test_parse_data_url_rejects_plain_text() {
        assert!(matches!(parse_data_url("hello"), Err(EncodeError::NotDataUrl)));
        assert!(matches!(
            parse_data_url("data:image/png,rawbytes"),
            Err(EncodeError::NotDataUrl)
        ));
    }

    #[test]
    fn test_declared_image_type() {
        assert_eq!(declared_image_type(Path::new("a/b/face.jpg")).unwrap(), "image/jpeg");
        assert_eq!(declared_image_type(Path::new("face.PNG")).unwrap(), "image/png");
        assert!(matches!(
            declared_image_type(Path::new("notes.txt")),
            Err(EncodeError::NotAnImage(_))
        ));
        assert!(declared_image_type(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_from_file_rejects_non_image_without_reading() {
        // The path does not exist; the extension check must fail first.
        let result = StillImage::from_file(Path::new("/nonexistent/roster.csv"), 95);
        assert!(matches!(result, Err(EncodeError::NotAnImage(_))));
    }

    #[test]
    fn test_from_file_reencodes_png() {
        let dir = std::env::temp_dir().join(format!("rollcall-still-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("face.png");
        let img = RgbImage::from_raw(4, 4, gradient(4, 4)).unwrap();
        img.save(&path).unwrap();

        let still = StillImage::from_file(&path, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!((still.width, still.height), (4, 4));
        assert!(still.to_data_url().starts_with("data:image/jpeg;base64,"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_from_file_undecodable() {
        let dir = std::env::temp_dir().join(format!("rollcall-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let result = StillImage::from_file(&path, DEFAULT_JPEG_QUALITY);
        assert!(matches!(result, Err(EncodeError::Decode(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
