//! JPEG snapshots carried as data URLs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage};

use super::CameraError;

const JPEG_PREFIX: &str = "data:image/jpeg;base64,";

/// Encoded still image, stored inline in the record.
#[derive(Clone, PartialEq, Eq)]
pub struct Photo {
    data_url: String,
    width: u32,
    height: u32,
}

impl Photo {
    /// Encode a frame at its own resolution.
    pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Self, CameraError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(CameraError::NotReady);
        }

        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        encoder
            .encode_image(frame)
            .map_err(|e| CameraError::Encode(e.to_string()))?;

        Ok(Self {
            data_url: format!("{JPEG_PREFIX}{}", STANDARD.encode(&bytes)),
            width: frame.width(),
            height: frame.height(),
        })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn into_data_url(self) -> String {
        self.data_url
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of the encoded payload in bytes.
    pub fn encoded_len(&self) -> usize {
        self.data_url.len()
    }
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Photo")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data_url.len())
            .finish()
    }
}

/// Decode a stored `data:image/...;base64,` URL for display.
pub fn decode_data_url(url: &str) -> Result<RgbaImage, CameraError> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| CameraError::Encode("not a data URL".to_string()))?;
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(CameraError::Encode(format!("unsupported data URL header: {header}")));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| CameraError::Encode(e.to_string()))?;
    let image = image::load_from_memory(&bytes).map_err(|e| CameraError::Encode(e.to_string()))?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    #[test]
    fn test_encode_keeps_native_resolution() {
        let photo = Photo::encode_jpeg(&gradient(64, 48), 100).unwrap();
        assert!(photo.data_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!((photo.width(), photo.height()), (64, 48));

        let decoded = decode_data_url(photo.data_url()).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_empty_frame_not_ready() {
        assert_eq!(Photo::encode_jpeg(&RgbImage::new(0, 0), 90), Err(CameraError::NotReady));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let frame = gradient(128, 128);
        let high = Photo::encode_jpeg(&frame, 100).unwrap();
        let low = Photo::encode_jpeg(&frame, 20).unwrap();
        assert!(low.encoded_len() < high.encoded_len());
    }

    #[test]
    fn test_decode_rejects_other_urls() {
        assert!(decode_data_url("https://example.com/a.jpg").is_err());
        assert!(decode_data_url("data:text/plain;base64,aGk=").is_err());
    }
}
