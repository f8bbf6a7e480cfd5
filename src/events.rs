use crate::alert::AlertInfo;
use crate::controller::SessionState;
use crate::device::{DeviceHandle, DevicePosition};
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Events published by the session controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShutterEvent {
    /// The session moved to a new lifecycle state
    StateChanged {
        from: SessionState,
        to: SessionState,
        timestamp: SystemTime,
    },
    /// The underlying session started or stopped running
    RunningChanged { running: bool, timestamp: SystemTime },
    /// The capture trigger was enabled or disabled
    CaptureButtonChanged { disabled: bool },
    /// A user-facing failure needs to be shown
    AlertRaised { alert: AlertInfo },
    /// A photo was delivered to its requester
    PhotoCaptured {
        capture_id: Uuid,
        position: DevicePosition,
        mirrored: bool,
        byte_len: usize,
    },
    /// A capture request failed
    CaptureFailed { capture_id: Uuid, error: String },
    /// The active device was replaced
    DeviceSwitched { from: DeviceHandle, to: DeviceHandle },
    /// The replacement device was refused and the original input restored
    DeviceSwitchFailed {
        kept: DeviceHandle,
        reason: String,
    },
    /// The scan output recognized a QR code
    CodeScanned {
        payload: String,
        timestamp: SystemTime,
    },
}

impl ShutterEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ShutterEvent::StateChanged { from, to, .. } => {
                format!("Session state {:?} -> {:?}", from, to)
            }
            ShutterEvent::RunningChanged { running, .. } => {
                format!(
                    "Session {}",
                    if *running { "running" } else { "halted" }
                )
            }
            ShutterEvent::CaptureButtonChanged { disabled } => {
                format!(
                    "Capture button {}",
                    if *disabled { "disabled" } else { "enabled" }
                )
            }
            ShutterEvent::AlertRaised { alert } => {
                format!("Alert: {} - {}", alert.title, alert.message)
            }
            ShutterEvent::PhotoCaptured {
                capture_id,
                position,
                mirrored,
                byte_len,
            } => format!(
                "Photo {} from {} camera ({} bytes{})",
                capture_id,
                position,
                byte_len,
                if *mirrored { ", mirrored" } else { "" }
            ),
            ShutterEvent::CaptureFailed { capture_id, error } => {
                format!("Photo {} failed: {}", capture_id, error)
            }
            ShutterEvent::DeviceSwitched { from, to } => {
                format!("Switched from {} to {}", from.name, to.name)
            }
            ShutterEvent::DeviceSwitchFailed { kept, reason } => {
                format!("Device switch failed ({}), kept {}", reason, kept.name)
            }
            ShutterEvent::CodeScanned { payload, .. } => format!("Scanned QR: {}", payload),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ShutterEvent::StateChanged { .. } => "state_changed",
            ShutterEvent::RunningChanged { .. } => "running_changed",
            ShutterEvent::CaptureButtonChanged { .. } => "capture_button_changed",
            ShutterEvent::AlertRaised { .. } => "alert_raised",
            ShutterEvent::PhotoCaptured { .. } => "photo_captured",
            ShutterEvent::CaptureFailed { .. } => "capture_failed",
            ShutterEvent::DeviceSwitched { .. } => "device_switched",
            ShutterEvent::DeviceSwitchFailed { .. } => "device_switch_failed",
            ShutterEvent::CodeScanned { .. } => "code_scanned",
        }
    }
}

/// Broadcast bus carrying controller events to observers
pub struct EventBus {
    sender: broadcast::Sender<ShutterEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutterEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Fails when nobody is subscribed.
    pub fn publish(&self, event: ShutterEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            ShutterEvent::AlertRaised { alert } => {
                warn!("Alert raised: {} - {}", alert.title, alert.message);
            }
            ShutterEvent::CodeScanned { payload, .. } => {
                info!("Scanned QR:\n{}", payload);
            }
            ShutterEvent::DeviceSwitchFailed { reason, .. } => {
                warn!("Device switch failed: {}", reason);
            }
            _ => {}
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish, treating a bus without subscribers as success
    pub fn emit(&self, event: ShutterEvent) {
        if let Err(e) = self.publish(event) {
            trace!("Event dropped: {}", e);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&ShutterEvent) -> bool),
}

impl EventFilter {
    pub fn matches(&self, event: &ShutterEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<ShutterEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<ShutterEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<ShutterEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        trace!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<ShutterEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertInfo;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus
            .publish(ShutterEvent::RunningChanged {
                running: true,
                timestamp: SystemTime::now(),
            })
            .unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            ShutterEvent::RunningChanged { running, .. } => assert!(running),
            _ => panic!("Unexpected event type"),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(10);
        assert!(!event_bus.has_subscribers());
        assert!(event_bus
            .publish(ShutterEvent::CaptureButtonChanged { disabled: true })
            .is_err());

        // emit swallows the missing-subscriber error
        event_bus.emit(ShutterEvent::CaptureButtonChanged { disabled: true });
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let mut receiver = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::EventTypes(vec!["code_scanned"]),
            "scanner".to_string(),
        );

        event_bus.emit(ShutterEvent::CaptureButtonChanged { disabled: false });
        event_bus.emit(ShutterEvent::CodeScanned {
            payload: "https://example.org".to_string(),
            timestamp: SystemTime::now(),
        });

        let received = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        match received {
            ShutterEvent::CodeScanned { payload, .. } => {
                assert_eq!(payload, "https://example.org")
            }
            _ => panic!("Unexpected event type"),
        }
        assert!(receiver.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_event_properties() {
        let event = ShutterEvent::AlertRaised {
            alert: AlertInfo::new("Error", "Couldn't take picture", "Ok"),
        };
        assert_eq!(event.event_type(), "alert_raised");
        assert!(event.description().contains("Couldn't take picture"));

        let event = ShutterEvent::StateChanged {
            from: SessionState::Configuring,
            to: SessionState::Running,
            timestamp: SystemTime::now(),
        };
        assert!(event.description().contains("Running"));
    }
}
