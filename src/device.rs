use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical placement of a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    Front,
    Back,
    Unspecified,
}

impl DevicePosition {
    /// Position to switch to from this one.
    ///
    /// Unspecified devices are treated like front cameras and switch to back.
    pub fn opposite(&self) -> DevicePosition {
        match self {
            DevicePosition::Front | DevicePosition::Unspecified => DevicePosition::Back,
            DevicePosition::Back => DevicePosition::Front,
        }
    }

    /// Front cameras deliver mirrored photos to match the preview
    pub fn is_front(&self) -> bool {
        matches!(self, DevicePosition::Front)
    }
}

impl fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePosition::Front => write!(f, "front"),
            DevicePosition::Back => write!(f, "back"),
            DevicePosition::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Hardware classification of a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    WideAngle,
    Dual,
    TrueDepth,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::WideAngle => write!(f, "wide-angle"),
            DeviceType::Dual => write!(f, "dual"),
            DeviceType::TrueDepth => write!(f, "true-depth"),
        }
    }
}

/// Opaque reference to a physical capture device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle {
    pub id: String,
    pub name: String,
    pub position: DevicePosition,
    pub device_type: DeviceType,
}

impl DeviceHandle {
    pub fn new<I, N>(id: I, name: N, position: DevicePosition, device_type: DeviceType) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            device_type,
        }
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} {})",
            self.name, self.id, self.position, self.device_type
        )
    }
}

/// Device picked for a fresh configuration.
///
/// Wide-angle at the preferred position wins, then wide-angle at the
/// opposite position. Other device types are never used as a default.
pub fn select_default_device(
    devices: &[DeviceHandle],
    preferred: DevicePosition,
) -> Option<DeviceHandle> {
    let wide_at = |position: DevicePosition| {
        devices
            .iter()
            .find(|d| d.position == position && d.device_type == DeviceType::WideAngle)
    };

    wide_at(preferred)
        .or_else(|| wide_at(preferred.opposite()))
        .cloned()
}

/// Device on the opposite side of `current`.
///
/// Prefers a wide-angle camera and falls back to any camera at that position.
pub fn select_opposite_device(
    devices: &[DeviceHandle],
    current: DevicePosition,
) -> Option<DeviceHandle> {
    let target = current.opposite();

    devices
        .iter()
        .find(|d| d.position == target && d.device_type == DeviceType::WideAngle)
        .or_else(|| devices.iter().find(|d| d.position == target))
        .cloned()
}
