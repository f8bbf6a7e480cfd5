use super::reporter::spawn_reporter;
use super::CameraApp;
use crate::error::Result;
use crate::keyboard_input::KeyboardInputHandler;
use std::sync::Arc;
use tracing::{error, info};

impl CameraApp {
    /// Start presenting events, ask for camera access and configure the session.
    ///
    /// Permission and configuration are queued; a pending prompt holds back
    /// every command issued afterwards.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting camera front end");

        // Subscribe before anything is queued so no alert is missed
        self.reporter_task = Some(spawn_reporter(
            Arc::clone(&self.controller),
            self.cancellation_token.clone(),
        ));

        self.controller.check_permission()?;
        self.controller.configure()?;

        if self.keyboard_enabled {
            let handler = KeyboardInputHandler::new(self.command_sender.clone());
            handler.start().await.map_err(|e| {
                error!("Failed to start keyboard handler: {}", e);
                e
            })?;
            self.keyboard_handler = Some(handler);
        }

        info!("Camera front end started");
        Ok(())
    }
}
