use super::publisher::Publisher;
use super::types::{SessionConfig, SessionSnapshot, SessionState};
use super::worker::{Command, SessionWorker};
use crate::alert::AlertInfo;
use crate::backend::{CaptureSession, DeviceDiscovery, PermissionProvider};
use crate::error::{CameraError, Result, ShutterError};
use crate::events::{EventBus, ShutterEvent};
use crate::photo::CapturedImage;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Camera session lifecycle controller.
///
/// Commands are queued onto a single worker task that owns the capture
/// session, so they run one at a time in submission order. Observers read
/// the published snapshot or subscribe to events; nothing else touches the
/// session.
pub struct SessionController {
    commands: mpsc::UnboundedSender<Command>,
    publisher: Arc<Publisher>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Spawn the session queue on the current tokio runtime
    pub(crate) fn spawn(
        config: SessionConfig,
        permissions: Arc<dyn PermissionProvider>,
        discovery: Arc<dyn DeviceDiscovery>,
        session: Box<dyn CaptureSession>,
        events: EventBus,
    ) -> Self {
        let publisher = Arc::new(Publisher::new(events));
        let (commands, receiver) = mpsc::unbounded_channel();

        let worker = SessionWorker::new(
            config,
            permissions,
            discovery,
            session,
            Arc::clone(&publisher),
            receiver,
        );
        let task = tokio::spawn(worker.run());

        Self {
            commands,
            publisher,
            worker: tokio::sync::Mutex::new(Some(task)),
        }
    }

    fn submit(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ShutterError::QueueClosed)
    }

    /// Query camera authorization, prompting the user when undecided.
    ///
    /// The prompt runs on the session queue; later commands wait for the answer.
    pub fn check_permission(&self) -> Result<()> {
        self.submit(Command::CheckPermission)
    }

    /// Attach the default device and outputs, then start the session
    pub fn configure(&self) -> Result<()> {
        self.submit(Command::Configure)
    }

    pub fn start(&self) -> Result<()> {
        self.submit(Command::Start)
    }

    /// Stop the session; `on_stopped` runs once the session confirms it halted
    pub fn stop_with<F>(&self, on_stopped: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Command::Stop {
            on_stopped: Some(Box::new(on_stopped)),
            reply: None,
        })
    }

    /// Stop the session and wait for the outcome.
    ///
    /// Resolves to `true` once the session is confirmed halted.
    pub async fn stop(&self) -> Result<bool> {
        let (reply, outcome) = oneshot::channel();
        self.submit(Command::Stop {
            on_stopped: None,
            reply: Some(reply),
        })?;
        outcome.await.map_err(|_| ShutterError::QueueClosed)
    }

    /// Swap to the camera on the opposite side.
    ///
    /// The capture button is disabled right away and stays disabled until
    /// every queued swap has finished, successful or not.
    pub fn switch_device(&self) -> Result<()> {
        let before = self.publisher.snapshot().is_capture_button_disabled;
        self.publisher.begin_switch();

        self.submit(Command::SwitchDevice).map_err(|e| {
            if !self.publisher.finish_switch() {
                self.publisher.set_capture_button_disabled(before);
            }
            e
        })
    }

    /// Queue a single photo capture
    pub fn capture_photo(&self) -> PendingCapture {
        let id = Uuid::new_v4();
        let (reply, receiver) = oneshot::channel();

        match self.submit(Command::Capture { id, reply }) {
            Ok(()) => {
                debug!("Capture {} queued", id);
                PendingCapture {
                    id,
                    receiver: Some(receiver),
                }
            }
            Err(_) => PendingCapture { id, receiver: None },
        }
    }

    /// Replace the session configuration between other queued operations
    pub fn reconfigure(&self, config: SessionConfig) -> Result<()> {
        self.submit(Command::Reconfigure(config))
    }

    /// Wait until every previously submitted command has run
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.submit(Command::Flush(ack))?;
        done.await.map_err(|_| ShutterError::QueueClosed)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.publisher.snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.publisher.state()
    }

    /// Receiver that observes every snapshot change
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.publisher.watch()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutterEvent> {
        self.publisher.events().subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        self.publisher.events()
    }

    /// Consume the pending alert, clearing the alert flag
    pub fn take_alert(&self) -> Option<AlertInfo> {
        self.publisher.take_alert()
    }

    /// Stop the session and close the queue
    pub async fn shutdown(&self) -> Result<()> {
        let Some(task) = self.worker.lock().await.take() else {
            debug!("Session controller already shut down");
            return Ok(());
        };

        info!("Shutting down session controller");
        let (ack, done) = oneshot::channel();
        if self.submit(Command::Shutdown(ack)).is_ok() {
            let _ = done.await;
        }

        match tokio::time::timeout(Duration::from_secs(3), task).await {
            Ok(Ok(())) => {
                info!("Session queue completed");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Session queue task failed: {}", e);
                Err(ShutterError::component("session_queue".to_string(), e.to_string()))
            }
            Err(_) => {
                warn!("Session queue did not finish within timeout");
                Err(ShutterError::system("Session queue shutdown timeout"))
            }
        }
    }
}

/// Result of a queued capture; resolves to exactly one photo or error
pub struct PendingCapture {
    id: Uuid,
    receiver: Option<oneshot::Receiver<std::result::Result<CapturedImage, CameraError>>>,
}

impl PendingCapture {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Future for PendingCapture {
    type Output = Result<CapturedImage>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(Err(ShutterError::QueueClosed));
        };

        match Pin::new(receiver).poll(cx) {
            Poll::Ready(Ok(Ok(image))) => Poll::Ready(Ok(image)),
            Poll::Ready(Ok(Err(e))) => Poll::Ready(Err(ShutterError::Camera(e))),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ShutterError::QueueClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
