use super::handle::SessionController;
use super::types::SessionConfig;
use crate::backend::{CaptureSession, DeviceDiscovery, PermissionProvider};
use crate::error::{Result, ShutterError};
use crate::events::EventBus;
use std::sync::Arc;

/// Builder for a session controller
pub struct SessionControllerBuilder {
    config: Option<SessionConfig>,
    permissions: Option<Arc<dyn PermissionProvider>>,
    discovery: Option<Arc<dyn DeviceDiscovery>>,
    session: Option<Box<dyn CaptureSession>>,
    event_bus: Option<EventBus>,
}

impl SessionControllerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            permissions: None,
            discovery: None,
            session: None,
            event_bus: None,
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn permissions(mut self, permissions: Arc<dyn PermissionProvider>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn discovery(mut self, discovery: Arc<dyn DeviceDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn session<S: CaptureSession + 'static>(mut self, session: S) -> Self {
        self.session = Some(Box::new(session));
        self
    }

    /// Bus to publish on; a 64-slot bus is created when not given
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Spawn the controller's session queue; needs a running tokio runtime
    pub fn build(self) -> Result<SessionController> {
        let permissions = self
            .permissions
            .ok_or_else(|| ShutterError::system("Permission provider must be specified"))?;
        let discovery = self
            .discovery
            .ok_or_else(|| ShutterError::system("Device discovery must be specified"))?;
        let session = self
            .session
            .ok_or_else(|| ShutterError::system("Capture session must be specified"))?;

        tokio::runtime::Handle::try_current().map_err(|_| {
            ShutterError::system("Session controller must be built inside a tokio runtime")
        })?;

        Ok(SessionController::spawn(
            self.config.unwrap_or_default(),
            permissions,
            discovery,
            session,
            self.event_bus.unwrap_or_else(|| EventBus::new(64)),
        ))
    }
}

impl Default for SessionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
