use crate::app::AppCommand;
use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Map a key press to a front-end command
pub fn command_for_key(code: KeyCode) -> Option<AppCommand> {
    match code {
        KeyCode::Char('c') | KeyCode::Char(' ') => Some(AppCommand::Capture),
        KeyCode::Char('s') => Some(AppCommand::Switch),
        KeyCode::Char('p') => Some(AppCommand::ToggleRunning),
        KeyCode::Char('q') | KeyCode::Esc => Some(AppCommand::Quit),
        _ => None,
    }
}

/// Raw-mode keyboard reader driving the camera from a terminal
pub struct KeyboardInputHandler {
    commands: mpsc::UnboundedSender<AppCommand>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(commands: mpsc::UnboundedSender<AppCommand>) -> Self {
        Self {
            commands,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Keyboard controls: c capture, s switch camera, p stop/start, q quit");

        let commands = self.commands.clone();
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        // Ignore releases and repeats
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let Some(command) = command_for_key(key_event.code) else {
                            debug!("Key pressed: {:?}", key_event.code);
                            continue;
                        };

                        debug!("Key {:?} -> {}", key_event.code, command);
                        if commands.send(command).is_err() {
                            debug!("Command receiver closed");
                            break;
                        }
                        if command == AppCommand::Quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Let the reader notice the cancellation and leave raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}
