//! System camera through nokhwa.

use image::RgbImage;
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType};

use super::{CameraDevice, CameraError, Resolution, StreamConstraints, VideoStream};

const FRAME_RATE: u32 = 30;

pub struct NativeCamera {
    index: u32,
}

impl NativeCamera {
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

impl CameraDevice for NativeCamera {
    fn name(&self) -> String {
        format!("camera {}", self.index)
    }

    fn open(&mut self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, CameraError> {
        // Desktop backends do not report facing; only resolution is negotiated.
        let requested = match constraints.ideal {
            Some(ideal) => RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
                nokhwa::utils::Resolution::new(ideal.width, ideal.height),
                FrameFormat::MJPEG,
                FRAME_RATE,
            ))),
            None => RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        };

        let mut camera = Camera::new(CameraIndex::Index(self.index), requested).map_err(map_error)?;
        let res = camera.resolution();
        constraints.check(Resolution::new(res.width(), res.height()))?;

        camera.open_stream().map_err(map_error)?;
        Ok(Box::new(NativeStream { camera: Some(camera) }))
    }
}

struct NativeStream {
    camera: Option<Camera>,
}

impl VideoStream for NativeStream {
    fn resolution(&self) -> Option<Resolution> {
        let res = self.camera.as_ref()?.resolution();
        (res.width() > 0 && res.height() > 0).then(|| Resolution::new(res.width(), res.height()))
    }

    fn grab_frame(&mut self) -> Result<RgbImage, CameraError> {
        let camera = self.camera.as_mut().ok_or(CameraError::NotReady)?;
        let frame = camera.frame().map_err(map_error)?;
        let decoded = frame.decode_image::<RgbFormat>().map_err(map_error)?;
        let (width, height) = (decoded.width(), decoded.height());
        RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| CameraError::Stream("frame buffer size mismatch".to_string()))
    }

    fn stop(&mut self) {
        if let Some(mut camera) = self.camera.take()
            && let Err(e) = camera.stop_stream()
        {
            tracing::warn!("Failed to stop camera stream: {e}");
        }
    }
}

fn map_error(e: nokhwa::NokhwaError) -> CameraError {
    let text = e.to_string();
    let lower = text.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") {
        CameraError::PermissionDenied
    } else if lower.contains("not found") || lower.contains("no device") {
        CameraError::NotFound
    } else {
        CameraError::Stream(text)
    }
}
