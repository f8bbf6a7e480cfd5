use super::photos::PhotoWriter;
use super::types::{AppCommand, AppStats, ShutdownReason};
use crate::backend::{SimulatedBackend, SimulatedSessionProbe};
use crate::config::ShutterConfig;
use crate::controller::{SessionConfig, SessionController, SessionControllerBuilder};
use crate::error::Result;
use crate::events::EventBus;
use crate::keyboard_input::KeyboardInputHandler;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Front end wiring the session controller to a terminal
pub struct CameraApp {
    pub(super) config: ShutterConfig,
    pub(super) controller: Arc<SessionController>,
    pub(super) probe: SimulatedSessionProbe,
    pub(super) writer: PhotoWriter,
    pub(super) stats: Arc<Mutex<AppStats>>,

    // Input
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,
    pub(super) command_sender: mpsc::UnboundedSender<AppCommand>,
    pub(super) command_receiver: Option<mpsc::UnboundedReceiver<AppCommand>>,

    // Lifecycle management
    pub(super) reporter_task: Option<JoinHandle<()>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl CameraApp {
    /// Build the simulated backend and session controller from configuration
    pub async fn new(config: ShutterConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = if config.events.debug_logging {
            EventBus::with_debug_logging(config.events.bus_capacity)
        } else {
            EventBus::new(config.events.bus_capacity)
        };

        let backend = SimulatedBackend::from_config(&config.simulation);
        let probe = backend.probe.clone();

        let controller = SessionControllerBuilder::new()
            .config(SessionConfig::from(&config))
            .permissions(backend.permissions)
            .discovery(backend.discovery)
            .session(backend.session)
            .event_bus(event_bus)
            .build()?;

        let writer = PhotoWriter::new(&config.capture.output_dir, config.capture.save_metadata);
        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        debug!("Camera app created, photos go to {}", config.capture.output_dir);

        Ok(Self {
            config,
            controller: Arc::new(controller),
            probe,
            writer,
            stats: Arc::new(Mutex::new(AppStats::default())),
            keyboard_handler: None,
            keyboard_enabled: false,
            command_sender,
            command_receiver: Some(command_receiver),
            reporter_task: None,
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Enable or disable the keyboard input handler
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Simulated session handle, e.g. to emit QR detections in a demo
    pub fn probe(&self) -> &SimulatedSessionProbe {
        &self.probe
    }

    pub fn config(&self) -> &ShutterConfig {
        &self.config
    }

    pub async fn stats(&self) -> AppStats {
        self.stats.lock().await.clone()
    }

    /// Sender for injecting commands into the run loop
    pub fn command_sender(&self) -> mpsc::UnboundedSender<AppCommand> {
        self.command_sender.clone()
    }
}
