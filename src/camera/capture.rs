//! Capture lifecycle of one photo field.

use image::RgbImage;

use super::{CameraDevice, CameraError, Photo, Resolution, StreamConstraints, VideoStream};
use crate::config::CameraConfig;

/// What the widget is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Off,
    Live,
    Captured,
    Failed(String),
}

/// Owns the device for one photo field.
///
/// The stream is released after a snapshot, on cancel and on drop.
pub struct CameraCapture {
    device: Box<dyn CameraDevice>,
    preferred: StreamConstraints,
    jpeg_quality: u8,
    stream: Option<Box<dyn VideoStream>>,
    state: CaptureState,
    photo: Option<Photo>,
}

impl CameraCapture {
    pub fn new(device: Box<dyn CameraDevice>, config: &CameraConfig) -> Self {
        Self {
            device,
            preferred: StreamConstraints::preferred(config),
            jpeg_quality: config.jpeg_quality,
            stream: None,
            state: CaptureState::Off,
            photo: None,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.stream.as_ref().and_then(|s| s.resolution())
    }

    /// Open the camera: preferred constraints, then one unconstrained try.
    ///
    /// A cancelled picker ends the attempt without the retry.
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.photo = None;

        let opened = match self.device.open(&self.preferred) {
            Ok(stream) => Ok(stream),
            Err(CameraError::Cancelled) => Err(CameraError::Cancelled),
            Err(e) => {
                tracing::warn!("Camera '{}' rejected preferred constraints ({e}), retrying unconstrained", self.device.name());
                self.device.open(&StreamConstraints::any())
            }
        };

        match opened {
            Ok(stream) => {
                if let Some(res) = stream.resolution() {
                    tracing::debug!("Camera '{}' streaming at {res}", self.device.name());
                }
                self.stream = Some(stream);
                self.state = CaptureState::Live;
                Ok(())
            }
            Err(CameraError::Cancelled) => {
                self.state = CaptureState::Off;
                Err(CameraError::Cancelled)
            }
            Err(e) => {
                tracing::warn!("Camera '{}' unavailable: {e}", self.device.name());
                self.state = CaptureState::Failed(e.user_message());
                Err(e)
            }
        }
    }

    /// Current frame for the live preview.
    pub fn preview_frame(&mut self) -> Option<RgbImage> {
        let stream = self.stream.as_mut()?;
        match stream.grab_frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::debug!("Preview frame unavailable: {e}");
                None
            }
        }
    }

    /// Snapshot the current frame at native resolution and release the device.
    ///
    /// A stream without metadata yet stays live so the user can try again.
    pub fn capture(&mut self) -> Result<Photo, CameraError> {
        let stream = self.stream.as_mut().ok_or(CameraError::NotReady)?;
        if stream.resolution().is_none() {
            return Err(CameraError::NotReady);
        }

        let frame = stream.grab_frame()?;
        let photo = Photo::encode_jpeg(&frame, self.jpeg_quality)?;
        self.release();

        tracing::info!("Photo captured: {}x{}, {} bytes", photo.width(), photo.height(), photo.encoded_len());
        self.photo = Some(photo.clone());
        self.state = CaptureState::Captured;
        Ok(photo)
    }

    /// Discard the photo and open the camera again.
    pub fn retake(&mut self) -> Result<(), CameraError> {
        self.photo = None;
        self.state = CaptureState::Off;
        self.start()
    }

    /// Close the camera without a photo.
    pub fn cancel(&mut self) {
        self.release();
        self.state = if self.photo.is_some() {
            CaptureState::Captured
        } else {
            CaptureState::Off
        };
    }

    /// Forget the photo (form cleared).
    pub fn reset(&mut self) {
        self.release();
        self.photo = None;
        self.state = CaptureState::Off;
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        opens: Vec<StreamConstraints>,
        stops: usize,
    }

    struct FakeStream {
        log: Rc<RefCell<Log>>,
        resolution: Option<Resolution>,
    }

    impl VideoStream for FakeStream {
        fn resolution(&self) -> Option<Resolution> {
            self.resolution
        }

        fn grab_frame(&mut self) -> Result<RgbImage, CameraError> {
            let res = self.resolution.ok_or(CameraError::NotReady)?;
            Ok(RgbImage::new(res.width, res.height))
        }

        fn stop(&mut self) {
            self.log.borrow_mut().stops += 1;
        }
    }

    /// Answers each `open` with the next scripted result.
    struct ScriptedDevice {
        log: Rc<RefCell<Log>>,
        script: Vec<Result<Option<Resolution>, CameraError>>,
    }

    impl CameraDevice for ScriptedDevice {
        fn name(&self) -> String {
            "scripted".to_string()
        }

        fn open(&mut self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, CameraError> {
            self.log.borrow_mut().opens.push(constraints.clone());
            let next = if self.script.is_empty() {
                Err(CameraError::NotFound)
            } else {
                self.script.remove(0)
            };
            next.map(|resolution| {
                Box::new(FakeStream {
                    log: self.log.clone(),
                    resolution,
                }) as Box<dyn VideoStream>
            })
        }
    }

    fn capture_with(script: Vec<Result<Option<Resolution>, CameraError>>) -> (CameraCapture, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let device = ScriptedDevice {
            log: log.clone(),
            script,
        };
        let config = CameraConfig {
            jpeg_quality: 80,
            ..Default::default()
        };
        (CameraCapture::new(Box::new(device), &config), log)
    }

    const HD: Option<Resolution> = Some(Resolution { width: 32, height: 24 });

    #[test]
    fn test_preferred_constraints_succeed_first() {
        let (mut capture, log) = capture_with(vec![Ok(HD)]);
        capture.start().unwrap();

        assert_eq!(capture.state(), &CaptureState::Live);
        assert_eq!(log.borrow().opens.len(), 1);
        assert!(!log.borrow().opens[0].is_unconstrained());
    }

    #[test]
    fn test_fallback_attempted_exactly_once() {
        let (mut capture, log) = capture_with(vec![
            Err(CameraError::ConstraintsUnsatisfiable("4k".into())),
            Err(CameraError::PermissionDenied),
            Ok(HD),
        ]);

        let err = capture.start().unwrap_err();
        assert_eq!(err, CameraError::PermissionDenied);
        assert_eq!(log.borrow().opens.len(), 2);
        assert!(log.borrow().opens[1].is_unconstrained());
        assert_eq!(
            capture.state(),
            &CaptureState::Failed(CameraError::PermissionDenied.user_message())
        );
    }

    #[test]
    fn test_fallback_success_goes_live() {
        let (mut capture, log) = capture_with(vec![Err(CameraError::ConstraintsUnsatisfiable("4k".into())), Ok(HD)]);
        capture.start().unwrap();
        assert!(capture.is_live());
        assert_eq!(log.borrow().opens.len(), 2);
    }

    #[test]
    fn test_cancel_skips_fallback() {
        let (mut capture, log) = capture_with(vec![Err(CameraError::Cancelled), Ok(HD)]);
        assert_eq!(capture.start(), Err(CameraError::Cancelled));
        assert_eq!(log.borrow().opens.len(), 1);
        assert_eq!(capture.state(), &CaptureState::Off);
    }

    #[test]
    fn test_capture_releases_device() {
        let (mut capture, log) = capture_with(vec![Ok(HD)]);
        capture.start().unwrap();

        let photo = capture.capture().unwrap();
        assert_eq!((photo.width(), photo.height()), (32, 24));
        assert_eq!(capture.state(), &CaptureState::Captured);
        assert!(!capture.is_live());
        assert_eq!(log.borrow().stops, 1);
        assert!(capture.photo().is_some());
    }

    #[test]
    fn test_capture_before_metadata_stays_live() {
        let (mut capture, log) = capture_with(vec![Ok(None)]);
        capture.start().unwrap();

        assert_eq!(capture.capture(), Err(CameraError::NotReady));
        assert!(capture.is_live());
        assert_eq!(log.borrow().stops, 0);
    }

    #[test]
    fn test_capture_without_stream() {
        let (mut capture, _) = capture_with(vec![]);
        assert_eq!(capture.capture(), Err(CameraError::NotReady));
    }

    #[test]
    fn test_retake_reopens() {
        let (mut capture, log) = capture_with(vec![Ok(HD), Ok(HD)]);
        capture.start().unwrap();
        capture.capture().unwrap();

        capture.retake().unwrap();
        assert!(capture.photo().is_none());
        assert!(capture.is_live());
        assert_eq!(log.borrow().opens.len(), 2);
    }

    #[test]
    fn test_drop_and_cancel_release_device() {
        let (mut capture, log) = capture_with(vec![Ok(HD), Ok(HD)]);
        capture.start().unwrap();
        capture.cancel();
        assert_eq!(log.borrow().stops, 1);
        assert_eq!(capture.state(), &CaptureState::Off);

        capture.start().unwrap();
        drop(capture);
        assert_eq!(log.borrow().stops, 2);
    }
}
