//! Camera device abstraction.

use image::RgbImage;

use super::CameraError;
use crate::config::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both sides at least as large as `min`.
    pub fn covers(&self, min: &Resolution) -> bool {
        self.width >= min.width && self.height >= min.height
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Rear camera, pointing away from the operator.
    Environment,
    User,
}

/// What to ask the device for. `None` fields are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: Option<Facing>,
    pub ideal: Option<Resolution>,
    pub min: Option<Resolution>,
}

impl StreamConstraints {
    /// Document-grade request built from configuration.
    pub fn preferred(config: &CameraConfig) -> Self {
        Self {
            facing: config.rear_facing.then_some(Facing::Environment),
            ideal: Some(Resolution::new(config.preferred_width, config.preferred_height)),
            min: Some(Resolution::new(config.min_width, config.min_height)),
        }
    }

    /// Any video source.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.facing.is_none() && self.ideal.is_none() && self.min.is_none()
    }

    /// Check a delivered resolution against the minimum.
    pub fn check(&self, actual: Resolution) -> Result<(), CameraError> {
        match self.min {
            Some(min) if !actual.covers(&min) => Err(CameraError::ConstraintsUnsatisfiable(format!(
                "{actual} below minimum {min}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Open video stream. Dropping it must not be relied on to release the
/// device; call [`VideoStream::stop`].
pub trait VideoStream {
    /// Frame size, or `None` while the stream has not produced metadata.
    fn resolution(&self) -> Option<Resolution>;

    /// Current frame at native resolution.
    fn grab_frame(&mut self) -> Result<RgbImage, CameraError>;

    /// Release the device.
    fn stop(&mut self);
}

pub trait CameraDevice {
    fn name(&self) -> String;

    fn open(&mut self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, CameraError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_constraints_from_config() {
        let constraints = StreamConstraints::preferred(&CameraConfig::default());
        assert_eq!(constraints.facing, Some(Facing::Environment));
        assert_eq!(constraints.ideal, Some(Resolution::new(4096, 2160)));
        assert_eq!(constraints.min, Some(Resolution::new(1280, 720)));
        assert!(StreamConstraints::any().is_unconstrained());
    }

    #[test]
    fn test_check_minimum() {
        let constraints = StreamConstraints::preferred(&CameraConfig::default());
        assert!(constraints.check(Resolution::new(1920, 1080)).is_ok());
        assert!(matches!(
            constraints.check(Resolution::new(640, 480)),
            Err(CameraError::ConstraintsUnsatisfiable(_))
        ));
        assert!(StreamConstraints::any().check(Resolution::new(1, 1)).is_ok());
    }
}
