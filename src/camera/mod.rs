//! Photo evidence capture.
//!
//! A [`CameraDevice`] opens a [`VideoStream`] for a set of constraints;
//! [`CameraCapture`] drives one capture attempt: preferred constraints
//! first, one unconstrained retry, snapshot, JPEG encode, release.

pub mod capture;
pub mod device;
pub mod encode;
pub mod file;
#[cfg(feature = "native-camera")]
pub mod native;

pub use capture::{CameraCapture, CaptureState};
pub use device::{CameraDevice, Facing, Resolution, StreamConstraints, VideoStream};
pub use encode::{Photo, decode_data_url};
pub use file::FileCamera;

use thiserror::Error;

use crate::config::CameraConfig;

/// Camera acquisition and snapshot errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera found")]
    NotFound,

    #[error("constraints not satisfiable: {0}")]
    ConstraintsUnsatisfiable(String),

    #[error("camera not ready")]
    NotReady,

    #[error("video stream error: {0}")]
    Stream(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    /// The user dismissed the source picker.
    #[error("capture cancelled")]
    Cancelled,
}

impl CameraError {
    /// Sentence shown under the capture widget.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Permissão da câmera negada. Habilite o acesso à câmera nas configurações do sistema.".to_string()
            }
            Self::NotFound => "Nenhuma câmera encontrada no dispositivo.".to_string(),
            Self::NotReady => "A câmera ainda não está pronta. Por favor, aguarde.".to_string(),
            Self::Encode(_) => "Não foi possível gerar a foto. Tente novamente.".to_string(),
            Self::Cancelled => "Captura cancelada.".to_string(),
            Self::ConstraintsUnsatisfiable(_) | Self::Stream(_) => {
                "Câmera não disponível. Verifique as permissões.".to_string()
            }
        }
    }
}

/// Device used by the capture widgets.
///
/// With the `native-camera` feature this is the system camera; otherwise
/// photos are taken from image files chosen by the operator.
pub fn default_device(config: &CameraConfig) -> Box<dyn CameraDevice> {
    #[cfg(feature = "native-camera")]
    {
        Box::new(native::NativeCamera::new(config.device_index))
    }
    #[cfg(not(feature = "native-camera"))]
    {
        let _ = config;
        Box::new(FileCamera::with_dialog())
    }
}
