//! Still images chosen from disk, for machines without a usable camera.

use std::path::PathBuf;

use image::RgbImage;

use super::{CameraDevice, CameraError, Resolution, StreamConstraints, VideoStream};

type Picker = Box<dyn FnMut() -> Option<PathBuf>>;

/// Treats a picked image file as a one-frame stream.
///
/// An image rejected by the minimum resolution is kept, so the
/// unconstrained retry does not ask for a file again.
pub struct FileCamera {
    picker: Picker,
    pending: Option<RgbImage>,
}

impl FileCamera {
    pub fn with_picker(picker: impl FnMut() -> Option<PathBuf> + 'static) -> Self {
        Self {
            picker: Box::new(picker),
            pending: None,
        }
    }

    /// Native "open file" dialog filtered to photos.
    pub fn with_dialog() -> Self {
        Self::with_picker(|| {
            rfd::FileDialog::new()
                .set_title("Selecionar foto")
                .add_filter("Imagens", &["jpg", "jpeg", "png"])
                .pick_file()
        })
    }

    fn load(&mut self) -> Result<RgbImage, CameraError> {
        if let Some(image) = self.pending.take() {
            return Ok(image);
        }

        let path = (self.picker)().ok_or(CameraError::Cancelled)?;
        let image = image::open(&path).map_err(|e| match e {
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => CameraError::NotFound,
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                CameraError::PermissionDenied
            }
            other => CameraError::Stream(format!("{}: {other}", path.display())),
        })?;
        Ok(image.to_rgb8())
    }
}

impl CameraDevice for FileCamera {
    fn name(&self) -> String {
        "arquivo".to_string()
    }

    fn open(&mut self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, CameraError> {
        let image = self.load()?;
        let resolution = Resolution::new(image.width(), image.height());

        if let Err(e) = constraints.check(resolution) {
            self.pending = Some(image);
            return Err(e);
        }
        Ok(Box::new(StillStream { image: Some(image) }))
    }
}

struct StillStream {
    image: Option<RgbImage>,
}

impl VideoStream for StillStream {
    fn resolution(&self) -> Option<Resolution> {
        self.image.as_ref().map(|i| Resolution::new(i.width(), i.height()))
    }

    fn grab_frame(&mut self) -> Result<RgbImage, CameraError> {
        self.image.clone().ok_or(CameraError::NotReady)
    }

    fn stop(&mut self) {
        self.image = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraCapture;
    use crate::config::CameraConfig;
    use std::cell::Cell;
    use std::rc::Rc;

    fn write_png(dir: &std::path::Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("foto.png");
        RgbImage::new(width, height).save(&path).unwrap();
        path
    }

    #[test]
    fn test_small_image_accepted_by_fallback_without_second_pick() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 40, 30);
        let picks = Rc::new(Cell::new(0));
        let counter = picks.clone();

        let device = FileCamera::with_picker(move || {
            counter.set(counter.get() + 1);
            Some(path.clone())
        });
        let mut capture = CameraCapture::new(Box::new(device), &CameraConfig::default());

        capture.start().unwrap();
        assert_eq!(picks.get(), 1);
        let photo = capture.capture().unwrap();
        assert_eq!((photo.width(), photo.height()), (40, 30));
    }

    #[test]
    fn test_dismissed_picker_is_cancel() {
        let mut device = FileCamera::with_picker(|| None);
        assert!(matches!(device.open(&StreamConstraints::any()), Err(CameraError::Cancelled)));
    }

    #[test]
    fn test_missing_file() {
        let mut device = FileCamera::with_picker(|| Some(PathBuf::from("/nonexistent/foto.jpg")));
        assert!(matches!(device.open(&StreamConstraints::any()), Err(CameraError::NotFound)));
    }
}
