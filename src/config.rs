use crate::backend::{AuthorizationStatus, QualityPrioritization, SessionPreset};
use crate::device::{DeviceHandle, DevicePosition, DeviceType};
use crate::photo::PixelFormat;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShutterConfig {
    pub session: SessionSettings,
    pub capture: CaptureConfig,
    pub events: EventConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionSettings {
    /// Session quality preset
    #[serde(default = "default_preset")]
    pub preset: SessionPreset,

    /// Camera position to try first when configuring
    #[serde(default = "default_preferred_position")]
    pub preferred_position: DevicePosition,

    /// Attach the still-photo output
    #[serde(default = "default_photo_output")]
    pub photo_output: bool,

    /// Attach the QR metadata output (best effort)
    #[serde(default = "default_qr_scan")]
    pub qr_scan: bool,

    /// Enable high-resolution still capture on the photo output
    #[serde(default = "default_high_resolution_capture")]
    pub high_resolution_capture: bool,

    /// Highest processing quality the photo output may use
    #[serde(default = "default_max_quality_prioritization")]
    pub max_quality_prioritization: QualityPrioritization,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Directory the front end writes delivered photos to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Quality prioritization requested for each photo
    #[serde(default = "default_capture_quality")]
    pub quality_prioritization: QualityPrioritization,

    /// Write a JSON sidecar next to each saved photo
    #[serde(default = "default_save_metadata")]
    pub save_metadata: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EventConfig {
    /// Broadcast channel capacity
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Log every published event at debug level
    #[serde(default = "default_debug_logging")]
    pub debug_logging: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulationConfig {
    /// Authorization status reported before any prompt
    #[serde(default = "default_authorization")]
    pub authorization: AuthorizationStatus,

    /// Answer given to the permission prompt
    #[serde(default = "default_grant_on_prompt")]
    pub grant_on_prompt: bool,

    /// Time the simulated user takes to answer the prompt
    #[serde(default = "default_prompt_delay_ms")]
    pub prompt_delay_ms: u64,

    /// Resolution of synthesized photos (width, height)
    #[serde(default = "default_photo_resolution")]
    pub photo_resolution: (u32, u32),

    /// Payload format of synthesized photos
    #[serde(default = "default_photo_format")]
    pub photo_format: PixelFormat,

    /// Make the session refuse the metadata output
    #[serde(default)]
    pub refuse_metadata_output: bool,

    /// Devices reported by discovery
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceHandle>,
}

impl ShutterConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("shutter.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("session.preset", "photo")?
            .set_default("session.preferred_position", "back")?
            .set_default("session.photo_output", default_photo_output())?
            .set_default("session.qr_scan", default_qr_scan())?
            .set_default(
                "session.high_resolution_capture",
                default_high_resolution_capture(),
            )?
            .set_default("session.max_quality_prioritization", "quality")?
            .set_default("capture.output_dir", default_output_dir())?
            .set_default("capture.quality_prioritization", "balanced")?
            .set_default("capture.save_metadata", default_save_metadata())?
            .set_default("events.bus_capacity", default_bus_capacity() as i64)?
            .set_default("events.debug_logging", default_debug_logging())?
            .set_default("simulation.authorization", "authorized")?
            .set_default("simulation.grant_on_prompt", default_grant_on_prompt())?
            .set_default(
                "simulation.prompt_delay_ms",
                default_prompt_delay_ms() as i64,
            )?
            .set_default(
                "simulation.photo_resolution",
                vec![default_photo_resolution().0, default_photo_resolution().1],
            )?
            .set_default("simulation.photo_format", "Jpeg")?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with SHUTTER_ prefix
            .add_source(
                Environment::with_prefix("SHUTTER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ShutterConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.output_dir.trim().is_empty() {
            return Err(ConfigError::Message(
                "Capture output_dir must not be empty".to_string(),
            ));
        }

        if self.events.bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        let (width, height) = self.simulation.photo_resolution;
        if width == 0 || height == 0 {
            return Err(ConfigError::Message(
                "Simulated photo resolution must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for device in &self.simulation.devices {
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::Message(format!(
                    "Duplicate simulated device id '{}'",
                    device.id
                )));
            }
        }

        Ok(())
    }

    /// Render as TOML, e.g. for `--print-config`
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for ShutterConfig {
    fn default() -> Self {
        Self {
            session: SessionSettings {
                preset: default_preset(),
                preferred_position: default_preferred_position(),
                photo_output: default_photo_output(),
                qr_scan: default_qr_scan(),
                high_resolution_capture: default_high_resolution_capture(),
                max_quality_prioritization: default_max_quality_prioritization(),
            },
            capture: CaptureConfig {
                output_dir: default_output_dir(),
                quality_prioritization: default_capture_quality(),
                save_metadata: default_save_metadata(),
            },
            events: EventConfig {
                bus_capacity: default_bus_capacity(),
                debug_logging: default_debug_logging(),
            },
            simulation: SimulationConfig {
                authorization: default_authorization(),
                grant_on_prompt: default_grant_on_prompt(),
                prompt_delay_ms: default_prompt_delay_ms(),
                photo_resolution: default_photo_resolution(),
                photo_format: default_photo_format(),
                refuse_metadata_output: false,
                devices: default_devices(),
            },
        }
    }
}

// Default value functions
fn default_preset() -> SessionPreset {
    SessionPreset::Photo
}
fn default_preferred_position() -> DevicePosition {
    DevicePosition::Back
}
fn default_photo_output() -> bool {
    true
}
fn default_qr_scan() -> bool {
    true
}
fn default_high_resolution_capture() -> bool {
    true
}
fn default_max_quality_prioritization() -> QualityPrioritization {
    QualityPrioritization::Quality
}

fn default_output_dir() -> String {
    "./photos".to_string()
}
fn default_capture_quality() -> QualityPrioritization {
    QualityPrioritization::Balanced
}
fn default_save_metadata() -> bool {
    false
}

fn default_bus_capacity() -> usize {
    64
}
fn default_debug_logging() -> bool {
    false
}

fn default_authorization() -> AuthorizationStatus {
    AuthorizationStatus::Authorized
}
fn default_grant_on_prompt() -> bool {
    true
}
fn default_prompt_delay_ms() -> u64 {
    250
}
fn default_photo_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_photo_format() -> PixelFormat {
    PixelFormat::Jpeg
}
fn default_devices() -> Vec<DeviceHandle> {
    vec![
        DeviceHandle::new(
            "back-wide",
            "Back Camera",
            DevicePosition::Back,
            DeviceType::WideAngle,
        ),
        DeviceHandle::new(
            "back-dual",
            "Back Dual Camera",
            DevicePosition::Back,
            DeviceType::Dual,
        ),
        DeviceHandle::new(
            "front-wide",
            "Front Camera",
            DevicePosition::Front,
            DeviceType::WideAngle,
        ),
    ]
}
