use anyhow::{Context, Result};
use base64::Engine;
use image::{codecs::jpeg::JpegEncoder, DynamicImage};

pub const JPEG_QUALITY: u8 = 80;
pub const JPEG_MIME: &str = "image/jpeg";

/// One still extracted from the live feed, already encoded for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl EncodedFrame {
    pub fn encode_jpeg(image: &DynamicImage) -> Result<Self> {
        let rgb = image.to_rgb8();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
            .encode_image(&rgb)
            .context("failed to encode frame as JPEG")?;
        Ok(Self {
            bytes,
            mime: JPEG_MIME,
        })
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decodes a frame pushed by the webview, accepting a bare base64 payload or a
/// `data:` URL.
pub fn decode_pushed_frame(payload: &str) -> Result<DynamicImage> {
    let data = match payload.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => payload,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .context("frame payload is not valid base64")?;
    image::load_from_memory(&bytes).context("frame payload is not a supported image")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([120, 40, 200])))
    }

    #[test]
    fn encodes_jpeg_with_soi_marker() {
        let frame = EncodedFrame::encode_jpeg(&sample_image()).unwrap();
        assert_eq!(frame.mime, "image/jpeg");
        assert_eq!(&frame.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn decodes_data_url_and_bare_base64() {
        let frame = EncodedFrame::encode_jpeg(&sample_image()).unwrap();
        let bare = frame.to_base64();
        let url = format!("data:image/jpeg;base64,{bare}");

        let from_bare = decode_pushed_frame(&bare).unwrap();
        let from_url = decode_pushed_frame(&url).unwrap();
        assert_eq!((from_bare.width(), from_bare.height()), (32, 24));
        assert_eq!((from_url.width(), from_url.height()), (32, 24));
    }

    #[test]
    fn rejects_garbage_payload() {
        assert!(decode_pushed_frame("%%%").is_err());
        assert!(decode_pushed_frame("aGVsbG8=").is_err());
    }
}
