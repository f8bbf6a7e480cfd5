use super::types::{SessionSnapshot, SessionState};
use crate::alert::AlertInfo;
use crate::device::DeviceHandle;
use crate::events::{EventBus, ShutterEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::{debug, info};

/// Fan-out of controller state to observers.
///
/// Snapshot changes go to the `watch` channel, discrete happenings to the
/// event bus. The pending alert is held until taken exactly once.
/// Queued device switches keep the capture button disabled until the
/// last of them has run.
pub(crate) struct Publisher {
    snapshot: watch::Sender<SessionSnapshot>,
    pending_alert: Mutex<Option<AlertInfo>>,
    pending_switches: AtomicUsize,
    events: EventBus,
}

impl Publisher {
    pub(crate) fn new(events: EventBus) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            snapshot,
            pending_alert: Mutex::new(None),
            pending_switches: AtomicUsize::new(0),
            events,
        }
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    pub(crate) fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub(crate) fn transition(&self, to: SessionState) {
        let mut from = None;
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.state == to {
                return false;
            }
            from = Some(snapshot.state);
            snapshot.state = to;
            true
        });

        if let Some(from) = from {
            info!("Session state {} -> {}", from, to);
            self.events.emit(ShutterEvent::StateChanged {
                from,
                to,
                timestamp: SystemTime::now(),
            });
        }
    }

    /// Disable the capture button for a switch about to be queued
    pub(crate) fn begin_switch(&self) {
        self.pending_switches.fetch_add(1, Ordering::SeqCst);
        self.set_capture_button_disabled(true);
    }

    /// Retire one queued switch; true while others are still waiting
    pub(crate) fn finish_switch(&self) -> bool {
        let previous = self
            .pending_switches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        previous > 1
    }

    fn switch_pending(&self) -> bool {
        self.pending_switches.load(Ordering::SeqCst) > 0
    }

    /// Mirror the session's running flag into the observable fields
    pub(crate) fn set_running(&self, running: bool) {
        let disabled = !running || self.switch_pending();
        let mut running_changed = false;
        let mut button_changed = false;
        self.snapshot.send_if_modified(|snapshot| {
            running_changed = snapshot.is_running != running;
            button_changed = snapshot.is_capture_button_disabled != disabled;
            let unavailable_changed = snapshot.is_camera_unavailable == running;

            snapshot.is_running = running;
            snapshot.is_camera_unavailable = !running;
            snapshot.is_capture_button_disabled = disabled;
            running_changed || button_changed || unavailable_changed
        });

        if running_changed {
            self.events.emit(ShutterEvent::RunningChanged {
                running,
                timestamp: SystemTime::now(),
            });
        }
        if button_changed {
            self.events
                .emit(ShutterEvent::CaptureButtonChanged { disabled });
        }
    }

    pub(crate) fn set_capture_button_disabled(&self, disabled: bool) {
        let changed = self.snapshot.send_if_modified(|snapshot| {
            if snapshot.is_capture_button_disabled == disabled {
                return false;
            }
            snapshot.is_capture_button_disabled = disabled;
            true
        });

        if changed {
            debug!("Capture button disabled={}", disabled);
            self.events
                .emit(ShutterEvent::CaptureButtonChanged { disabled });
        }
    }

    pub(crate) fn set_active_device(&self, device: Option<DeviceHandle>) {
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.active_device == device {
                return false;
            }
            snapshot.active_device = device;
            true
        });
    }

    pub(crate) fn raise_alert(&self, alert: AlertInfo) {
        *self.pending_alert.lock() = Some(alert.clone());
        self.snapshot
            .send_modify(|snapshot| snapshot.should_show_alert = true);
        self.events.emit(ShutterEvent::AlertRaised { alert });
    }

    pub(crate) fn take_alert(&self) -> Option<AlertInfo> {
        let alert = self.pending_alert.lock().take();
        if alert.is_some() {
            self.snapshot
                .send_modify(|snapshot| snapshot.should_show_alert = false);
        }
        alert
    }
}
