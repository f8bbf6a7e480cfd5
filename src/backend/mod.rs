//! Seams to the platform camera subsystem.
//!
//! The session controller only talks to hardware through these traits. The
//! `simulated` module provides an in-process implementation used by tests and
//! the terminal front end.

mod simulated;

pub use simulated::{
    SimulatedBackend, SimulatedDiscovery, SimulatedPermissions, SimulatedSession,
    SimulatedSessionProbe,
};

use crate::device::DeviceHandle;
use crate::photo::{Orientation, PixelFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::mpsc;

/// Failure reported by a backend primitive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Camera access authorization as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    Undetermined,
    Restricted,
}

impl FromStr for AuthorizationStatus {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "authorized" => Ok(AuthorizationStatus::Authorized),
            "denied" => Ok(AuthorizationStatus::Denied),
            "undetermined" => Ok(AuthorizationStatus::Undetermined),
            "restricted" => Ok(AuthorizationStatus::Restricted),
            other => Err(BackendError::new(format!(
                "unknown authorization status '{}'",
                other
            ))),
        }
    }
}

/// Capture quality preset applied to the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPreset {
    Photo,
    High,
    Medium,
    Low,
}

/// Speed/quality trade-off for still photo processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPrioritization {
    Speed,
    Balanced,
    Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizationMode {
    Off,
    Standard,
    Auto,
}

/// Outputs the controller can attach to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Photo,
    Metadata,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Photo => write!(f, "photo"),
            OutputKind::Metadata => write!(f, "metadata"),
        }
    }
}

/// Device input created for one device; identified by `id` within a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub id: u64,
    pub device: DeviceHandle,
}

/// Still-photo output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoOutputSettings {
    pub high_resolution_capture: bool,
    pub max_quality_prioritization: QualityPrioritization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoCodec {
    Jpeg,
}

/// Per-request capture settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSettings {
    pub codec: PhotoCodec,
    pub quality_prioritization: QualityPrioritization,
}

impl Default for PhotoSettings {
    fn default() -> Self {
        Self {
            codec: PhotoCodec::Jpeg,
            quality_prioritization: QualityPrioritization::Balanced,
        }
    }
}

/// Processed photo as handed back by the backend
#[derive(Debug, Clone)]
pub struct RawPhoto {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub orientation: Orientation,
}

/// Machine-readable code symbologies the scan output can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    Qr,
    Ean13,
    Code128,
}

/// One object detected by the metadata output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataObject {
    pub code_type: CodeType,
    pub payload: Option<String>,
}

impl MetadataObject {
    pub fn qr<S: Into<String>>(payload: S) -> Self {
        Self {
            code_type: CodeType::Qr,
            payload: Some(payload.into()),
        }
    }
}

/// Channel on which the metadata output reports each batch of detections
pub type MetadataSink = mpsc::UnboundedSender<Vec<MetadataObject>>;

/// Camera permission subsystem
#[async_trait::async_trait]
pub trait PermissionProvider: Send + Sync {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Prompt the user; resolves once they answer
    async fn request_access(&self) -> bool;
}

/// Device discovery subsystem
pub trait DeviceDiscovery: Send + Sync {
    /// Currently available video devices
    fn devices(&self) -> Vec<DeviceHandle>;
}

/// Capture session primitive.
///
/// Not safe for concurrent reconfiguration; the controller owns it from a
/// single task.
#[async_trait::async_trait]
pub trait CaptureSession: Send {
    fn begin_configuration(&mut self);
    fn commit_configuration(&mut self);
    fn set_preset(&mut self, preset: SessionPreset);

    fn create_input(&mut self, device: &DeviceHandle) -> Result<DeviceInput, BackendError>;
    fn has_input(&self, input: &DeviceInput) -> bool;
    fn can_add_input(&self, input: &DeviceInput) -> bool;
    fn add_input(&mut self, input: &DeviceInput);
    fn remove_input(&mut self, input: &DeviceInput);

    fn has_output(&self, kind: OutputKind) -> bool;
    fn can_add_output(&self, kind: OutputKind) -> bool;
    fn add_photo_output(&mut self, settings: PhotoOutputSettings);
    fn add_metadata_output(&mut self, code_types: &[CodeType], sink: MetadataSink);
    fn set_max_quality_prioritization(&mut self, prioritization: QualityPrioritization);
    fn supports_video_stabilization(&self) -> bool;
    fn set_video_stabilization(&mut self, mode: StabilizationMode);

    fn start_running(&mut self);
    fn stop_running(&mut self);
    fn is_running(&self) -> bool;

    async fn capture_photo(&mut self, settings: PhotoSettings) -> Result<RawPhoto, BackendError>;
}
