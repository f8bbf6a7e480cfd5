use crate::backend::{QualityPrioritization, SessionPreset};
use crate::config::ShutterConfig;
use crate::device::{DeviceHandle, DevicePosition};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Unconfigured,
    Configuring,
    Running,
    Stopped,
    PermissionDenied,
    ConfigurationFailed,
}

impl SessionState {
    /// Failure states that need a fresh `configure()` to leave
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            SessionState::PermissionDenied | SessionState::ConfigurationFailed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unconfigured => "unconfigured",
            SessionState::Configuring => "configuring",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
            SessionState::PermissionDenied => "permission denied",
            SessionState::ConfigurationFailed => "configuration failed",
        };
        write!(f, "{}", name)
    }
}

/// Outputs attached during configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSet {
    pub still_photo: bool,
    pub qr_scan: bool,
}

impl Default for OutputSet {
    fn default() -> Self {
        Self {
            still_photo: true,
            qr_scan: true,
        }
    }
}

/// Desired session setup; changed only through `reconfigure()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub preset: SessionPreset,
    pub preferred_position: DevicePosition,
    pub outputs: OutputSet,
    pub high_resolution_capture: bool,
    pub max_quality_prioritization: QualityPrioritization,
    /// Prioritization requested for each individual photo
    pub capture_quality: QualityPrioritization,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preset: SessionPreset::Photo,
            preferred_position: DevicePosition::Back,
            outputs: OutputSet::default(),
            high_resolution_capture: true,
            max_quality_prioritization: QualityPrioritization::Quality,
            capture_quality: QualityPrioritization::Balanced,
        }
    }
}

impl From<&ShutterConfig> for SessionConfig {
    fn from(config: &ShutterConfig) -> Self {
        Self {
            preset: config.session.preset,
            preferred_position: config.session.preferred_position,
            outputs: OutputSet {
                still_photo: config.session.photo_output,
                qr_scan: config.session.qr_scan,
            },
            high_resolution_capture: config.session.high_resolution_capture,
            max_quality_prioritization: config.session.max_quality_prioritization,
            capture_quality: config.capture.quality_prioritization,
        }
    }
}

/// Observable controller state as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub is_running: bool,
    pub is_camera_unavailable: bool,
    pub is_capture_button_disabled: bool,
    pub should_show_alert: bool,
    pub active_device: Option<DeviceHandle>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Unconfigured,
            is_running: false,
            is_camera_unavailable: true,
            is_capture_button_disabled: true,
            should_show_alert: false,
            active_device: None,
        }
    }
}
