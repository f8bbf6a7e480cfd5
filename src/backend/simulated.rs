use super::{
    AuthorizationStatus, BackendError, CaptureSession, CodeType, DeviceDiscovery, DeviceInput,
    MetadataObject, MetadataSink, OutputKind, PermissionProvider, PhotoOutputSettings,
    PhotoSettings, QualityPrioritization, RawPhoto, SessionPreset, StabilizationMode,
};
use crate::config::SimulationConfig;
use crate::device::DeviceHandle;
use crate::photo::{Orientation, PixelFormat};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Permission subsystem with a scripted prompt answer
pub struct SimulatedPermissions {
    status: Mutex<AuthorizationStatus>,
    grant_on_prompt: bool,
    prompt_delay: Duration,
    prompts: AtomicU32,
}

impl SimulatedPermissions {
    pub fn new(status: AuthorizationStatus, grant_on_prompt: bool) -> Self {
        Self::with_prompt_delay(status, grant_on_prompt, Duration::ZERO)
    }

    pub fn with_prompt_delay(
        status: AuthorizationStatus,
        grant_on_prompt: bool,
        prompt_delay: Duration,
    ) -> Self {
        Self {
            status: Mutex::new(status),
            grant_on_prompt,
            prompt_delay,
            prompts: AtomicU32::new(0),
        }
    }

    pub fn set_status(&self, status: AuthorizationStatus) {
        *self.status.lock() = status;
    }

    /// Number of times the user was prompted
    pub fn prompt_count(&self) -> u32 {
        self.prompts.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl PermissionProvider for SimulatedPermissions {
    fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.lock()
    }

    async fn request_access(&self) -> bool {
        self.prompts.fetch_add(1, Ordering::Relaxed);
        debug!("Simulated permission prompt shown");

        if !self.prompt_delay.is_zero() {
            tokio::time::sleep(self.prompt_delay).await;
        }

        let granted = self.grant_on_prompt;
        *self.status.lock() = if granted {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };

        debug!("Simulated permission prompt answered: granted={}", granted);
        granted
    }
}

/// Device discovery over a mutable device list
pub struct SimulatedDiscovery {
    devices: Mutex<Vec<DeviceHandle>>,
}

impl SimulatedDiscovery {
    pub fn new(devices: Vec<DeviceHandle>) -> Self {
        Self {
            devices: Mutex::new(devices),
        }
    }

    /// Replace the device list, e.g. to model a camera being unplugged
    pub fn set_devices(&self, devices: Vec<DeviceHandle>) {
        *self.devices.lock() = devices;
    }
}

impl DeviceDiscovery for SimulatedDiscovery {
    fn devices(&self) -> Vec<DeviceHandle> {
        self.devices.lock().clone()
    }
}

/// Observable and injectable state of a simulated capture session
#[derive(Debug)]
struct SimState {
    inputs: Vec<DeviceInput>,
    outputs: Vec<OutputKind>,
    preset: Option<SessionPreset>,
    running: bool,
    configuring: bool,
    next_input_id: u64,
    photo_output: Option<PhotoOutputSettings>,
    metadata_sink: Option<MetadataSink>,
    metadata_types: Vec<CodeType>,
    stabilization: Option<StabilizationMode>,
    supports_stabilization: bool,
    capture_calls: u32,
    last_photo_settings: Option<PhotoSettings>,
    inputs_at_commit: Vec<usize>,
    start_calls: u32,
    stop_calls: u32,

    photo_format: PixelFormat,
    photo_resolution: (u32, u32),
    photo_orientation: Orientation,

    fail_input_construction: HashSet<String>,
    refuse_inputs: HashSet<String>,
    refuse_photo_output: bool,
    refuse_metadata_output: bool,
    fail_capture: Option<String>,
    fail_start: bool,
    ignore_stop: bool,
}

impl SimState {
    fn new(photo_format: PixelFormat, photo_resolution: (u32, u32)) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            preset: None,
            running: false,
            configuring: false,
            next_input_id: 1,
            photo_output: None,
            metadata_sink: None,
            metadata_types: Vec::new(),
            stabilization: None,
            supports_stabilization: true,
            capture_calls: 0,
            last_photo_settings: None,
            inputs_at_commit: Vec::new(),
            start_calls: 0,
            stop_calls: 0,
            photo_format,
            photo_resolution,
            photo_orientation: Orientation::Right,
            fail_input_construction: HashSet::new(),
            refuse_inputs: HashSet::new(),
            refuse_photo_output: false,
            refuse_metadata_output: false,
            fail_capture: None,
            fail_start: false,
            ignore_stop: false,
        }
    }
}

/// In-process capture session.
///
/// Accepts a single video input at a time, like a non multi-cam session.
pub struct SimulatedSession {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedSession {
    pub fn new(photo_format: PixelFormat, photo_resolution: (u32, u32)) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new(photo_format, photo_resolution))),
        }
    }

    /// Handle for inspecting the session and injecting failures
    pub fn probe(&self) -> SimulatedSessionProbe {
        SimulatedSessionProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedSession {
    fn default() -> Self {
        Self::new(PixelFormat::Jpeg, (640, 480))
    }
}

#[async_trait::async_trait]
impl CaptureSession for SimulatedSession {
    fn begin_configuration(&mut self) {
        self.state.lock().configuring = true;
    }

    fn commit_configuration(&mut self) {
        let mut state = self.state.lock();
        state.configuring = false;
        let inputs = state.inputs.len();
        state.inputs_at_commit.push(inputs);
        trace!("Simulated session committed with {} input(s)", inputs);
    }

    fn set_preset(&mut self, preset: SessionPreset) {
        self.state.lock().preset = Some(preset);
    }

    fn create_input(&mut self, device: &DeviceHandle) -> Result<DeviceInput, BackendError> {
        let mut state = self.state.lock();
        if state.fail_input_construction.contains(&device.id) {
            return Err(BackendError::new(format!(
                "device {} is busy",
                device.id
            )));
        }

        let id = state.next_input_id;
        state.next_input_id += 1;
        Ok(DeviceInput {
            id,
            device: device.clone(),
        })
    }

    fn has_input(&self, input: &DeviceInput) -> bool {
        self.state.lock().inputs.iter().any(|i| i.id == input.id)
    }

    fn can_add_input(&self, input: &DeviceInput) -> bool {
        let state = self.state.lock();
        state.inputs.is_empty() && !state.refuse_inputs.contains(&input.device.id)
    }

    fn add_input(&mut self, input: &DeviceInput) {
        let mut state = self.state.lock();
        if !state.inputs.iter().any(|i| i.id == input.id) {
            state.inputs.push(input.clone());
        }
    }

    fn remove_input(&mut self, input: &DeviceInput) {
        self.state.lock().inputs.retain(|i| i.id != input.id);
    }

    fn has_output(&self, kind: OutputKind) -> bool {
        self.state.lock().outputs.contains(&kind)
    }

    fn can_add_output(&self, kind: OutputKind) -> bool {
        let state = self.state.lock();
        let refused = match kind {
            OutputKind::Photo => state.refuse_photo_output,
            OutputKind::Metadata => state.refuse_metadata_output,
        };
        !refused && !state.outputs.contains(&kind)
    }

    fn add_photo_output(&mut self, settings: PhotoOutputSettings) {
        let mut state = self.state.lock();
        if !state.outputs.contains(&OutputKind::Photo) {
            state.outputs.push(OutputKind::Photo);
        }
        state.photo_output = Some(settings);
    }

    fn add_metadata_output(&mut self, code_types: &[CodeType], sink: MetadataSink) {
        let mut state = self.state.lock();
        if !state.outputs.contains(&OutputKind::Metadata) {
            state.outputs.push(OutputKind::Metadata);
        }
        state.metadata_types = code_types.to_vec();
        state.metadata_sink = Some(sink);
    }

    fn set_max_quality_prioritization(&mut self, prioritization: QualityPrioritization) {
        if let Some(settings) = self.state.lock().photo_output.as_mut() {
            settings.max_quality_prioritization = prioritization;
        }
    }

    fn supports_video_stabilization(&self) -> bool {
        self.state.lock().supports_stabilization
    }

    fn set_video_stabilization(&mut self, mode: StabilizationMode) {
        self.state.lock().stabilization = Some(mode);
    }

    fn start_running(&mut self) {
        let mut state = self.state.lock();
        state.start_calls += 1;
        if state.fail_start {
            warn!("Simulated session refused to start");
            return;
        }
        state.running = true;
    }

    fn stop_running(&mut self) {
        let mut state = self.state.lock();
        state.stop_calls += 1;
        if state.ignore_stop {
            warn!("Simulated session ignored stop request");
            return;
        }
        state.running = false;
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    async fn capture_photo(&mut self, settings: PhotoSettings) -> Result<RawPhoto, BackendError> {
        let (format, (width, height), orientation, seed) = {
            let mut state = self.state.lock();
            state.capture_calls += 1;
            state.last_photo_settings = Some(settings);

            if let Some(reason) = state.fail_capture.clone() {
                return Err(BackendError::new(reason));
            }
            if !state.outputs.contains(&OutputKind::Photo) {
                return Err(BackendError::new("no photo output attached"));
            }

            (
                state.photo_format,
                state.photo_resolution,
                state.photo_orientation,
                (state.capture_calls % 256) as u8,
            )
        };

        let frame = synthesize_frame(width, height, seed);
        let data = match format {
            PixelFormat::Rgb24 => frame.into_raw(),
            PixelFormat::Jpeg => {
                let quality = match settings.quality_prioritization {
                    QualityPrioritization::Speed => 60,
                    QualityPrioritization::Balanced => 80,
                    QualityPrioritization::Quality => 95,
                };
                let mut buf = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                encoder
                    .encode_image(&frame)
                    .map_err(|e| BackendError::new(format!("JPEG encoding failed: {}", e)))?;
                buf
            }
        };

        trace!(
            "Simulated photo {}x{} ({:?}, {} bytes)",
            width,
            height,
            format,
            data.len()
        );

        Ok(RawPhoto {
            data,
            width,
            height,
            format,
            orientation,
        })
    }
}

/// Gradient test pattern; `seed` tints the blue channel per capture
fn synthesize_frame(width: u32, height: u32, seed: u8) -> RgbImage {
    let width = width.max(1);
    let height = height.max(1);
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            seed,
        ])
    })
}

/// Test and demo handle onto a `SimulatedSession`
#[derive(Clone)]
pub struct SimulatedSessionProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedSessionProbe {
    pub fn input_devices(&self) -> Vec<DeviceHandle> {
        self.state
            .lock()
            .inputs
            .iter()
            .map(|i| i.device.clone())
            .collect()
    }

    pub fn input_count(&self) -> usize {
        self.state.lock().inputs.len()
    }

    pub fn output_count(&self, kind: OutputKind) -> usize {
        self.state
            .lock()
            .outputs
            .iter()
            .filter(|o| **o == kind)
            .count()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn is_configuring(&self) -> bool {
        self.state.lock().configuring
    }

    pub fn preset(&self) -> Option<SessionPreset> {
        self.state.lock().preset
    }

    pub fn photo_output(&self) -> Option<PhotoOutputSettings> {
        self.state.lock().photo_output
    }

    pub fn metadata_types(&self) -> Vec<CodeType> {
        self.state.lock().metadata_types.clone()
    }

    pub fn stabilization(&self) -> Option<StabilizationMode> {
        self.state.lock().stabilization
    }

    pub fn capture_calls(&self) -> u32 {
        self.state.lock().capture_calls
    }

    pub fn last_photo_settings(&self) -> Option<PhotoSettings> {
        self.state.lock().last_photo_settings
    }

    /// Input count observed at every configuration commit, oldest first
    pub fn inputs_at_commit(&self) -> Vec<usize> {
        self.state.lock().inputs_at_commit.clone()
    }

    pub fn start_calls(&self) -> u32 {
        self.state.lock().start_calls
    }

    pub fn stop_calls(&self) -> u32 {
        self.state.lock().stop_calls
    }

    pub fn set_photo_format(&self, format: PixelFormat, resolution: (u32, u32)) {
        let mut state = self.state.lock();
        state.photo_format = format;
        state.photo_resolution = resolution;
    }

    pub fn set_photo_orientation(&self, orientation: Orientation) {
        self.state.lock().photo_orientation = orientation;
    }

    pub fn fail_input_construction(&self, device_id: &str) {
        self.state
            .lock()
            .fail_input_construction
            .insert(device_id.to_string());
    }

    pub fn refuse_input(&self, device_id: &str) {
        self.state.lock().refuse_inputs.insert(device_id.to_string());
    }

    pub fn refuse_photo_output(&self, refuse: bool) {
        self.state.lock().refuse_photo_output = refuse;
    }

    pub fn refuse_metadata_output(&self, refuse: bool) {
        self.state.lock().refuse_metadata_output = refuse;
    }

    pub fn set_supports_stabilization(&self, supported: bool) {
        self.state.lock().supports_stabilization = supported;
    }

    pub fn fail_capture<S: Into<String>>(&self, reason: S) {
        self.state.lock().fail_capture = Some(reason.into());
    }

    pub fn clear_capture_failure(&self) {
        self.state.lock().fail_capture = None;
    }

    pub fn fail_start(&self, fail: bool) {
        self.state.lock().fail_start = fail;
    }

    pub fn ignore_stop(&self, ignore: bool) {
        self.state.lock().ignore_stop = ignore;
    }

    /// Report a batch of detected codes through the metadata output.
    ///
    /// Returns false when no metadata output is attached.
    pub fn emit_metadata(&self, objects: Vec<MetadataObject>) -> bool {
        let state = self.state.lock();
        match &state.metadata_sink {
            Some(sink) => sink.send(objects).is_ok(),
            None => false,
        }
    }
}

/// All three simulated collaborators wired from configuration
pub struct SimulatedBackend {
    pub permissions: Arc<SimulatedPermissions>,
    pub discovery: Arc<SimulatedDiscovery>,
    pub session: SimulatedSession,
    pub probe: SimulatedSessionProbe,
}

impl SimulatedBackend {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let permissions = Arc::new(SimulatedPermissions::with_prompt_delay(
            config.authorization,
            config.grant_on_prompt,
            Duration::from_millis(config.prompt_delay_ms),
        ));
        let discovery = Arc::new(SimulatedDiscovery::new(config.devices.clone()));
        let session = SimulatedSession::new(config.photo_format, config.photo_resolution);
        let probe = session.probe();

        if config.refuse_metadata_output {
            probe.refuse_metadata_output(true);
        }

        debug!(
            "Simulated backend with {} device(s), authorization {:?}",
            config.devices.len(),
            config.authorization
        );

        Self {
            permissions,
            discovery,
            session,
            probe,
        }
    }
}
