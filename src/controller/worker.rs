use super::publisher::Publisher;
use super::scan::spawn_scan_forwarder;
use super::types::{SessionConfig, SessionState};
use crate::backend::{
    AuthorizationStatus, CaptureSession, CodeType, DeviceDiscovery, DeviceInput, OutputKind,
    PermissionProvider, PhotoCodec, PhotoOutputSettings, PhotoSettings, StabilizationMode,
};
use crate::device::{select_default_device, select_opposite_device, DeviceHandle, DevicePosition};
use crate::error::CameraError;
use crate::events::ShutterEvent;
use crate::photo::CapturedImage;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

pub(crate) type CaptureReply = oneshot::Sender<Result<CapturedImage, CameraError>>;

/// Work items on the session queue
pub(crate) enum Command {
    CheckPermission,
    Configure,
    Start,
    Stop {
        on_stopped: Option<Box<dyn FnOnce() + Send>>,
        reply: Option<oneshot::Sender<bool>>,
    },
    SwitchDevice,
    Capture {
        id: Uuid,
        reply: CaptureReply,
    },
    Reconfigure(SessionConfig),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::CheckPermission => "check_permission",
            Command::Configure => "configure",
            Command::Start => "start",
            Command::Stop { .. } => "stop",
            Command::SwitchDevice => "switch_device",
            Command::Capture { .. } => "capture",
            Command::Reconfigure(_) => "reconfigure",
            Command::Flush(_) => "flush",
            Command::Shutdown(_) => "shutdown",
        }
    }
}

/// Owner of the capture session; runs every command in submission order
pub(crate) struct SessionWorker {
    config: SessionConfig,
    permissions: Arc<dyn PermissionProvider>,
    discovery: Arc<dyn DeviceDiscovery>,
    session: Box<dyn CaptureSession>,
    publisher: Arc<Publisher>,
    commands: mpsc::UnboundedReceiver<Command>,
    video_input: Option<DeviceInput>,
    is_configured: bool,
    is_session_running: bool,
    scan_task: Option<JoinHandle<()>>,
}

impl SessionWorker {
    pub(crate) fn new(
        config: SessionConfig,
        permissions: Arc<dyn PermissionProvider>,
        discovery: Arc<dyn DeviceDiscovery>,
        session: Box<dyn CaptureSession>,
        publisher: Arc<Publisher>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            config,
            permissions,
            discovery,
            session,
            publisher,
            commands,
            video_input: None,
            is_configured: false,
            is_session_running: false,
            scan_task: None,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("Session queue started");

        while let Some(command) = self.commands.recv().await {
            trace!("Session queue running {}", command.name());

            match command {
                Command::CheckPermission => self.check_permission().await,
                Command::Configure => self.configure().await,
                Command::Start => self.start(),
                Command::Stop { on_stopped, reply } => {
                    let halted = self.stop();
                    if halted {
                        if let Some(callback) = on_stopped {
                            callback();
                        }
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(halted);
                    }
                }
                Command::SwitchDevice => self.switch_device(),
                Command::Capture { id, reply } => {
                    let result = self.capture(id).await;
                    if reply.send(result).is_err() {
                        debug!("Capture {} requester went away before delivery", id);
                    }
                }
                Command::Reconfigure(config) => self.reconfigure(config),
                Command::Flush(ack) => {
                    let _ = ack.send(());
                }
                Command::Shutdown(ack) => {
                    self.teardown();
                    let _ = ack.send(());
                    return;
                }
            }
        }

        self.teardown();
    }

    fn teardown(&mut self) {
        if self.is_session_running {
            self.stop();
        }
        if let Some(task) = self.scan_task.take() {
            task.abort();
        }
        debug!("Session queue stopped");
    }

    async fn check_permission(&mut self) {
        match self.permissions.authorization_status() {
            AuthorizationStatus::Authorized => {
                debug!("Camera access authorized");
                if self.publisher.state() == SessionState::PermissionDenied {
                    self.publisher.transition(SessionState::Unconfigured);
                }
            }
            AuthorizationStatus::Undetermined => {
                // Awaiting here holds back every queued command until the user answers
                info!("Requesting camera access");
                if self.permissions.request_access().await {
                    info!("Camera access granted");
                    if self.publisher.state() == SessionState::PermissionDenied {
                        self.publisher.transition(SessionState::Unconfigured);
                    }
                } else {
                    self.deny_access();
                }
            }
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => self.deny_access(),
        }
    }

    fn deny_access(&mut self) {
        warn!("Camera access not authorized");
        if self.is_session_running {
            self.session.stop_running();
            self.is_session_running = self.session.is_running();
        }
        self.publisher.transition(SessionState::PermissionDenied);
        self.publisher.set_running(false);
        if let Some(alert) = CameraError::PermissionDenied.alert() {
            self.publisher.raise_alert(alert);
        }
    }

    async fn configure(&mut self) {
        match self.permissions.authorization_status() {
            AuthorizationStatus::Authorized => {
                if self.publisher.state() == SessionState::PermissionDenied {
                    self.publisher.transition(SessionState::Unconfigured);
                }
            }
            AuthorizationStatus::Undetermined => {
                self.check_permission().await;
            }
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                if self.publisher.state() != SessionState::PermissionDenied {
                    self.deny_access();
                }
            }
        }

        if self.publisher.state() == SessionState::PermissionDenied {
            debug!("Skipping configuration without camera access");
            return;
        }

        let was_running = self.is_session_running;
        if !was_running {
            self.publisher.transition(SessionState::Configuring);
        }

        self.session.begin_configuration();
        let result = self.attach_graph();
        self.session.commit_configuration();

        match result {
            Ok(device) => {
                info!("Session configured with {}", device);
                self.is_configured = true;
                self.publisher.set_active_device(Some(device));
                if was_running {
                    debug!("Session already running; attach checks left it unchanged");
                } else {
                    self.start();
                }
            }
            Err(e) => {
                error!("Session configuration failed: {}", e);
                self.is_configured = false;
                if self.is_session_running {
                    self.session.stop_running();
                    self.is_session_running = self.session.is_running();
                }
                self.publisher.transition(SessionState::ConfigurationFailed);
                self.publisher.set_running(false);
                if let Some(alert) = e.alert() {
                    self.publisher.raise_alert(alert);
                }
            }
        }
    }

    /// Wire input and outputs; caller brackets this in begin/commit
    fn attach_graph(&mut self) -> Result<DeviceHandle, CameraError> {
        self.session.set_preset(self.config.preset);

        let attached = self
            .video_input
            .as_ref()
            .filter(|input| self.session.has_input(input))
            .map(|input| input.device.clone());

        let device = match attached {
            Some(device) => device,
            None => self.attach_default_input()?,
        };

        if self.config.outputs.still_photo {
            self.attach_photo_output()?;
        }

        if self.config.outputs.qr_scan && !self.attach_scan_output() {
            warn!("Could not add metadata output; QR scanning disabled");
        }

        Ok(device)
    }

    fn attach_default_input(&mut self) -> Result<DeviceHandle, CameraError> {
        let devices = self.discovery.devices();
        let device = select_default_device(&devices, self.config.preferred_position)
            .ok_or(CameraError::NoDeviceAvailable)?;

        let input =
            self.session
                .create_input(&device)
                .map_err(|e| CameraError::InputConstructionFailed {
                    device: device.id.clone(),
                    details: e.message,
                })?;

        if !self.session.can_add_input(&input) {
            return Err(CameraError::InputAttachFailed {
                device: device.id.clone(),
            });
        }

        self.session.add_input(&input);
        self.video_input = Some(input);
        Ok(device)
    }

    fn attach_photo_output(&mut self) -> Result<(), CameraError> {
        if self.session.has_output(OutputKind::Photo) {
            return Ok(());
        }

        if !self.session.can_add_output(OutputKind::Photo) {
            return Err(CameraError::OutputAttachFailed {
                output: OutputKind::Photo.to_string(),
            });
        }

        self.session.add_photo_output(PhotoOutputSettings {
            high_resolution_capture: self.config.high_resolution_capture,
            max_quality_prioritization: self.config.max_quality_prioritization,
        });
        Ok(())
    }

    fn attach_scan_output(&mut self) -> bool {
        if self.session.has_output(OutputKind::Metadata) {
            return true;
        }

        if !self.session.can_add_output(OutputKind::Metadata) {
            return false;
        }

        let (sink, detections) = mpsc::unbounded_channel();
        self.session.add_metadata_output(&[CodeType::Qr], sink);
        if let Some(previous) = self.scan_task.take() {
            previous.abort();
        }
        self.scan_task = Some(spawn_scan_forwarder(
            detections,
            self.publisher.events().clone(),
        ));
        true
    }

    fn start(&mut self) {
        if self.is_session_running {
            debug!("Session is already running");
            return;
        }

        if !self.is_configured {
            debug!(
                "Ignoring start in state {}; session not configured",
                self.publisher.state()
            );
            return;
        }

        if self.publisher.state() == SessionState::PermissionDenied {
            debug!("Ignoring start without camera access");
            return;
        }

        self.session.start_running();
        self.is_session_running = self.session.is_running();

        if self.is_session_running {
            self.publisher.transition(SessionState::Running);
            self.publisher.set_running(true);
        } else {
            warn!("Capture session did not start");
            self.publisher.transition(SessionState::Stopped);
            self.publisher.set_running(false);
        }
    }

    /// Returns whether the session is confirmed halted afterwards
    fn stop(&mut self) -> bool {
        if !self.is_session_running {
            debug!("Session is not running");
            return !self.session.is_running();
        }

        self.session.stop_running();
        self.is_session_running = self.session.is_running();

        if self.is_session_running {
            warn!("Capture session did not confirm stop");
            return false;
        }

        self.publisher.transition(SessionState::Stopped);
        self.publisher.set_running(false);
        true
    }

    fn switch_device(&mut self) {
        self.swap_input();
        // Re-enable whatever the outcome; a halted session keeps it disabled
        if !self.publisher.finish_switch() {
            self.publisher
                .set_capture_button_disabled(!self.is_session_running);
        }
    }

    fn swap_input(&mut self) {
        let current = match (&self.video_input, self.is_configured) {
            (Some(input), true) => input.clone(),
            _ => {
                warn!("Device switch requested without a configured input");
                return;
            }
        };

        let devices = self.discovery.devices();
        let Some(target) = select_opposite_device(&devices, current.device.position) else {
            warn!(
                "No device available opposite to {}",
                current.device.position
            );
            return;
        };

        let replacement = match self.session.create_input(&target) {
            Ok(input) => input,
            Err(e) => {
                warn!("Could not create input for {}: {}", target, e);
                return;
            }
        };

        self.session.begin_configuration();
        self.session.remove_input(&current);

        let switched = if self.session.can_add_input(&replacement) {
            self.session.add_input(&replacement);
            self.video_input = Some(replacement);
            true
        } else {
            self.session.add_input(&current);
            false
        };

        if self.session.has_output(OutputKind::Photo) {
            if self.session.supports_video_stabilization() {
                self.session
                    .set_video_stabilization(StabilizationMode::Auto);
            }
            self.session
                .set_max_quality_prioritization(self.config.max_quality_prioritization);
        }

        self.session.commit_configuration();

        if switched {
            info!("Switched camera from {} to {}", current.device, target);
            self.publisher.set_active_device(Some(target.clone()));
            self.publisher.events().emit(ShutterEvent::DeviceSwitched {
                from: current.device,
                to: target,
            });
        } else {
            self.publisher
                .events()
                .emit(ShutterEvent::DeviceSwitchFailed {
                    kept: current.device,
                    reason: format!("session refused input for {}", target.id),
                });
        }
    }

    async fn capture(&mut self, id: Uuid) -> Result<CapturedImage, CameraError> {
        if !self.is_session_running || self.publisher.state() != SessionState::Running {
            debug!("Capture {} rejected: session not running", id);
            return Err(CameraError::SessionNotRunning);
        }

        let result = self.capture_running(id).await;

        match &result {
            Ok(image) => {
                self.publisher.events().emit(ShutterEvent::PhotoCaptured {
                    capture_id: id,
                    position: image.position,
                    mirrored: image.mirrored,
                    byte_len: image.byte_len(),
                });
            }
            Err(e) => {
                error!("Capture {} failed: {}", id, e);
                self.publisher.events().emit(ShutterEvent::CaptureFailed {
                    capture_id: id,
                    error: e.to_string(),
                });
                if let Some(alert) = e.alert() {
                    self.publisher.raise_alert(alert);
                }
            }
        }

        result
    }

    async fn capture_running(&mut self, id: Uuid) -> Result<CapturedImage, CameraError> {
        if !self.session.has_output(OutputKind::Photo) {
            return Err(CameraError::CaptureFailed {
                details: "photo output not attached".to_string(),
            });
        }

        let position = self
            .video_input
            .as_ref()
            .map(|input| input.device.position)
            .unwrap_or(DevicePosition::Unspecified);

        let settings = PhotoSettings {
            codec: PhotoCodec::Jpeg,
            quality_prioritization: self.config.capture_quality,
        };

        let raw = self
            .session
            .capture_photo(settings)
            .await
            .map_err(|e| CameraError::CaptureFailed { details: e.message })?;

        let image = CapturedImage {
            id,
            timestamp: SystemTime::now(),
            data: Arc::new(raw.data),
            width: raw.width,
            height: raw.height,
            format: raw.format,
            orientation: raw.orientation,
            position,
            mirrored: false,
        };

        if position.is_front() {
            image.into_mirrored()
        } else {
            Ok(image)
        }
    }

    fn reconfigure(&mut self, config: SessionConfig) {
        info!("Applying new session configuration");
        self.config = config;

        if !self.is_configured {
            return;
        }

        self.session.begin_configuration();
        self.session.set_preset(self.config.preset);
        if self.session.has_output(OutputKind::Photo) {
            self.session
                .set_max_quality_prioritization(self.config.max_quality_prioritization);
        }
        if self.config.outputs.qr_scan && !self.attach_scan_output() {
            warn!("Could not add metadata output; QR scanning disabled");
        }
        self.session.commit_configuration();
    }
}
