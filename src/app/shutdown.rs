use super::{CameraApp, ShutdownReason};
use crate::error::{Result, ShutterError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

impl CameraApp {
    /// Stop input, halt the camera and close the session queue
    pub async fn shutdown(&mut self, reason: &ShutdownReason) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let mut exit_code = match reason {
            ShutdownReason::Error(_) => 1,
            _ => 0,
        };

        if let Some(keyboard_handler) = self.keyboard_handler.take() {
            match timeout(Duration::from_secs(2), keyboard_handler.stop()).await {
                Ok(Ok(())) => debug!("Keyboard handler stopped"),
                Ok(Err(e)) => {
                    error!("Error stopping keyboard handler: {}", e);
                    exit_code = 1;
                }
                Err(_) => {
                    error!("Keyboard handler stop timeout");
                    exit_code = 1;
                }
            }
        }

        match timeout(Duration::from_secs(5), self.controller.stop()).await {
            Ok(Ok(true)) => debug!("Camera stopped"),
            Ok(Ok(false)) => warn!("Camera did not confirm stop before shutdown"),
            Ok(Err(ShutterError::QueueClosed)) => debug!("Session queue already closed"),
            Ok(Err(e)) => {
                error!("Error stopping camera: {}", e);
                exit_code = 1;
            }
            Err(_) => {
                error!("Camera stop timeout");
                exit_code = 1;
            }
        }

        if let Err(e) = self.controller.shutdown().await {
            error!("Error shutting down session controller: {}", e);
            exit_code = 1;
        }

        if let Some(reporter) = self.reporter_task.take() {
            if timeout(Duration::from_secs(1), reporter).await.is_err() {
                warn!("Event reporter did not stop in time");
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}
