use crate::alert::AlertInfo;
use crate::controller::SessionController;
use crate::error::EventBusError;
use crate::events::{EventFilter, EventReceiver, ShutterEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Event types shown to the user
const REPORTED_EVENTS: &[&str] = &[
    "alert_raised",
    "running_changed",
    "device_switched",
    "code_scanned",
];

/// One-line rendering of an alert dialog
pub fn render_alert(alert: &AlertInfo) -> String {
    let mut line = format!(
        "[{}] {} ({})",
        alert.title, alert.message, alert.primary_button_title
    );
    if let Some(secondary) = &alert.secondary_button_title {
        line.push_str(&format!(" / ({})", secondary));
    }
    line
}

/// Spawn the task that presents controller events and dismisses alerts
pub(super) fn spawn_reporter(
    controller: Arc<SessionController>,
    cancellation_token: CancellationToken,
) -> JoinHandle<()> {
    let mut receiver = EventReceiver::new(
        controller.subscribe(),
        EventFilter::EventTypes(REPORTED_EVENTS.to_vec()),
        "reporter".to_string(),
    );

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancellation_token.cancelled() => break,
                event = receiver.recv() => event,
            };

            match event {
                Ok(ShutterEvent::AlertRaised { .. }) => {
                    // The pending alert is the latest one; older ones were replaced
                    let Some(alert) = controller.take_alert() else {
                        continue;
                    };
                    warn!("{}", render_alert(&alert));
                    if alert.offers_settings() {
                        info!("Grant camera access in the system settings, then press 'p'");
                    }
                }
                Ok(ShutterEvent::RunningChanged { running, .. }) => {
                    if running {
                        info!("Camera ready");
                    } else {
                        info!("Camera unavailable");
                    }
                }
                Ok(ShutterEvent::DeviceSwitched { to, .. }) => {
                    info!("Now using {}", to);
                }
                Ok(ShutterEvent::CodeScanned { payload, .. }) => {
                    debug!("Scanned payload of {} bytes", payload.len());
                }
                Ok(_) => {}
                Err(EventBusError::Lagged { .. }) => continue,
                Err(_) => break,
            }
        }
        debug!("Event reporter stopped");
    })
}
