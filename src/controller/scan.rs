use crate::backend::{CodeType, MetadataObject};
use crate::events::{EventBus, ShutterEvent};
use std::time::SystemTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Payload of the first object in a detection batch, if it is a QR code.
///
/// Later objects in the same batch are ignored.
pub fn first_qr_payload(objects: &[MetadataObject]) -> Option<String> {
    let first = objects.first()?;
    if first.code_type != CodeType::Qr {
        return None;
    }
    first.payload.clone()
}

/// Forward scan detections to the event bus until the output goes away
pub(crate) fn spawn_scan_forwarder(
    mut detections: mpsc::UnboundedReceiver<Vec<MetadataObject>>,
    events: EventBus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(batch) = detections.recv().await {
            trace!("Metadata batch with {} object(s)", batch.len());
            if let Some(payload) = first_qr_payload(&batch) {
                events.emit(ShutterEvent::CodeScanned {
                    payload,
                    timestamp: SystemTime::now(),
                });
            }
        }
        debug!("Metadata output closed");
    })
}
