//! Raster decoding for image previews.
//!
//! Every function here degrades to `None` instead of returning an error: a
//! stylesheet pointing at a corrupt or unsupported file must never break the
//! editing session, it just shows nothing.

use base64::Engine;
use image::{ImageFormat, ImageReader};
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Preview shown when a referenced image cannot be located
pub const PLACEHOLDER_PNG: &[u8] = include_bytes!("../assets/nopreview.png");

const BASE64_MARKER: &str = "base64,";

/// A decoded image ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageSource {
    /// The `WxH` label shown next to the preview
    pub fn dimensions_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Decode raw bytes, sniffing the container format from its signature
pub fn decode(bytes: Vec<u8>) -> Option<ImageSource> {
    let reader = match ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format() {
        Ok(reader) => reader,
        Err(e) => {
            log::debug!("Failed to read image header: {e}");
            return None;
        }
    };

    let Some(format) = reader.format() else {
        log::debug!("Unrecognized image format ({} bytes)", bytes.len());
        return None;
    };

    let decoded = match reader.decode() {
        Ok(image) => image,
        Err(e) => {
            log::debug!("Failed to decode {format:?} image: {e}");
            return None;
        }
    };

    let (width, height) = (decoded.width(), decoded.height());
    Some(ImageSource {
        bytes,
        format,
        width,
        height,
    })
}

/// Read and decode an image file. No extension check is made.
pub fn load_file(path: &Path) -> Option<ImageSource> {
    match fs::read(path) {
        Ok(bytes) => decode(bytes),
        Err(e) => {
            log::debug!("Failed to read image {}: {e}", path.display());
            None
        }
    }
}

/// Payload of a `data:` URI: the base64 text after the first `base64,`
pub fn decode_data_uri(text: &str) -> Option<Vec<u8>> {
    let index = text.find(BASE64_MARKER)?;
    let payload: String = text[index + BASE64_MARKER.len()..]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    match base64::engine::general_purpose::STANDARD.decode(payload.as_bytes()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::debug!("Malformed base64 in data URI: {e}");
            None
        }
    }
}

pub fn placeholder() -> Option<ImageSource> {
    decode(PLACEHOLDER_PNG.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let image = if matches!(format, ImageFormat::Png | ImageFormat::Ico) {
            image
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        };
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_sniffs_format() {
        for format in [
            ImageFormat::Png,
            ImageFormat::Bmp,
            ImageFormat::Jpeg,
            ImageFormat::Gif,
            ImageFormat::Ico,
        ] {
            let source = decode(encode(7, 3, format)).unwrap_or_else(|| panic!("{format:?} should decode"));
            assert_eq!(source.format, format);
            assert_eq!((source.width, source.height), (7, 3));
            assert_eq!(source.dimensions_label(), "7x3");
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"not an image at all".to_vec()).is_none());
        assert!(decode(Vec::new()).is_none());
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let mut bytes = encode(16, 16, ImageFormat::Png);
        bytes.truncate(bytes.len() / 2);
        assert!(decode(bytes).is_none());
    }

    #[test]
    fn test_data_uri_payload() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"hello");
        let uri = format!("data:image/png;base64,{payload}");
        assert_eq!(decode_data_uri(&uri).as_deref(), Some(&b"hello"[..]));

        let wrapped = format!("data:image/png;base64,{}\n  {}", &payload[..4], &payload[4..]);
        assert_eq!(decode_data_uri(&wrapped).as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_data_uri_without_marker_or_with_bad_payload() {
        assert!(decode_data_uri("data:image/svg+xml;utf8,<svg/>").is_none());
        assert!(decode_data_uri("data:image/png;base64,@@@@").is_none());
    }

    #[test]
    fn test_placeholder_decodes() {
        let source = placeholder().expect("bundled placeholder must decode");
        assert_eq!(source.format, ImageFormat::Png);
        assert_eq!((source.width, source.height), (32, 32));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/definitely/not/here.png")).is_none());
    }
}
