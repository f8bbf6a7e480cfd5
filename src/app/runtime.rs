use super::{AppCommand, CameraApp, ShutdownReason};
use crate::controller::SessionState;
use crate::error::{Result, ShutterError};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

impl CameraApp {
    /// Run the interactive loop until quit or a termination signal
    pub async fn run(&mut self) -> Result<i32> {
        info!("Camera is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| ShutterError::system("Shutdown sender already taken"))?;
        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| ShutterError::system("Shutdown receiver already taken"))?;
        let mut commands = self
            .command_receiver
            .take()
            .ok_or_else(|| ShutterError::system("Command receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender).await;

        let reason = loop {
            tokio::select! {
                reason = &mut shutdown_receiver => {
                    break reason.unwrap_or_else(|_| {
                        ShutdownReason::Error("Shutdown channel closed unexpectedly".to_string())
                    });
                }
                command = commands.recv() => {
                    let Some(command) = command else {
                        break ShutdownReason::UserRequest;
                    };
                    match self.execute(command).await {
                        Ok(true) => {}
                        Ok(false) => break ShutdownReason::UserRequest,
                        Err(ShutterError::QueueClosed) => {
                            break ShutdownReason::Error("Session queue closed".to_string());
                        }
                        Err(e) => {
                            error!("Command '{}' failed: {}", command, e);
                            self.stats.lock().await.command_errors += 1;
                        }
                    }
                }
            }
        };

        info!("Shutdown initiated: {:?}", reason);
        let exit_code = self.shutdown(&reason).await?;

        info!("Camera front end shutdown complete");
        Ok(exit_code)
    }

    /// Run commands in order, then shut down.
    ///
    /// Each step waits for the session queue to drain before the next one.
    pub async fn run_script(&mut self, commands: Vec<AppCommand>) -> Result<i32> {
        info!("Running script with {} step(s)", commands.len());

        for command in commands {
            info!("Script step: {}", command);
            match self.execute(command).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    error!("Script step '{}' failed: {}", command, e);
                    self.stats.lock().await.command_errors += 1;
                }
            }
            self.controller.flush().await?;
        }

        let stats = self.stats().await;
        let exit_code = self.shutdown(&ShutdownReason::ScriptFinished).await?;

        info!(
            "Script finished: {} photo(s) saved, {} capture failure(s)",
            stats.photos_saved, stats.capture_failures
        );
        if stats.capture_failures > 0 || stats.command_errors > 0 {
            Ok(1)
        } else {
            Ok(exit_code)
        }
    }

    /// Apply one command; returns false when the front end should quit
    pub(super) async fn execute(&self, command: AppCommand) -> Result<bool> {
        debug!("Executing {}", command);

        match command {
            AppCommand::Configure => self.controller.configure()?,
            AppCommand::Start => self.controller.start()?,
            AppCommand::Stop => self.stop_camera().await?,
            AppCommand::ToggleRunning => {
                let snapshot = self.controller.snapshot();
                if snapshot.is_running {
                    self.stop_camera().await?;
                } else if snapshot.state == SessionState::Stopped {
                    self.controller.start()?;
                } else {
                    // Not configured yet, or a failure that needs a fresh attempt
                    self.controller.configure()?;
                }
            }
            AppCommand::Capture => self.capture().await?,
            AppCommand::Switch => self.controller.switch_device()?,
            AppCommand::Quit => return Ok(false),
        }

        Ok(true)
    }

    async fn stop_camera(&self) -> Result<()> {
        if !self.controller.stop().await? {
            warn!("Camera did not confirm it stopped");
        }
        Ok(())
    }

    async fn capture(&self) -> Result<()> {
        match self.controller.capture_photo().await {
            Ok(image) => {
                self.writer.save(&image).await?;
                self.stats.lock().await.photos_saved += 1;
                Ok(())
            }
            Err(e) => match e.camera_error() {
                Some(cause) => {
                    warn!("Capture failed: {}", cause);
                    self.stats.lock().await.capture_failures += 1;
                    Ok(())
                }
                None => Err(e),
            },
        }
    }

    /// Set up signal handlers for graceful shutdown
    async fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }
}
