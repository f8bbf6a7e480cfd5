use crate::alert::{AlertAction, AlertInfo};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShutterError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Session queue closed")]
    QueueClosed,

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl ShutterError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Camera-level cause, if this error carries one
    pub fn camera_error(&self) -> Option<&CameraError> {
        match self {
            ShutterError::Camera(e) => Some(e),
            _ => None,
        }
    }
}

/// Failures of a single camera-session operation attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera access not authorized")]
    PermissionDenied,

    #[error("No capture device available")]
    NoDeviceAvailable,

    #[error("Could not create input for device {device}: {details}")]
    InputConstructionFailed { device: String, details: String },

    #[error("Session refused input for device {device}")]
    InputAttachFailed { device: String },

    #[error("Session refused {output} output")]
    OutputAttachFailed { output: String },

    #[error("Photo capture failed: {details}")]
    CaptureFailed { details: String },

    #[error("Capture session is not running")]
    SessionNotRunning,
}

impl CameraError {
    /// User-facing alert for this failure.
    ///
    /// `SessionNotRunning` is a caller mistake rather than a user-visible
    /// failure and has no alert.
    pub fn alert(&self) -> Option<AlertInfo> {
        match self {
            CameraError::PermissionDenied => Some(
                AlertInfo::new(
                    "Camera Access",
                    "This app does not have permission to use the camera, please change your privacy settings",
                    "Settings",
                )
                .with_primary_action(AlertAction::OpenSettings),
            ),
            CameraError::NoDeviceAvailable
            | CameraError::InputConstructionFailed { .. }
            | CameraError::InputAttachFailed { .. }
            | CameraError::OutputAttachFailed { .. } => Some(AlertInfo::new(
                "Camera Error",
                "Camera configuration failed. Either your device camera is not available or other application is using it",
                "Accept",
            )),
            CameraError::CaptureFailed { .. } => {
                Some(AlertInfo::new("Error", "Couldn't take picture", "Ok"))
            }
            CameraError::SessionNotRunning => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Receiver lagged behind by {skipped} events")]
    Lagged { skipped: u64 },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ShutterError>;
