use super::*;
use crate::alert::AlertAction;
use crate::backend::{
    AuthorizationStatus, CodeType, MetadataObject, OutputKind, QualityPrioritization,
    SessionPreset, SimulatedDiscovery, SimulatedPermissions, SimulatedSession,
    SimulatedSessionProbe, StabilizationMode,
};
use crate::device::{DeviceHandle, DevicePosition, DeviceType};
use crate::error::{CameraError, ShutterError};
use crate::events::ShutterEvent;
use crate::photo::{Orientation, PixelFormat};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::time::timeout;

struct Harness {
    controller: SessionController,
    permissions: Arc<SimulatedPermissions>,
    discovery: Arc<SimulatedDiscovery>,
    probe: SimulatedSessionProbe,
}

fn back_camera() -> DeviceHandle {
    DeviceHandle::new(
        "back-wide",
        "Back Camera",
        DevicePosition::Back,
        DeviceType::WideAngle,
    )
}

fn front_camera() -> DeviceHandle {
    DeviceHandle::new(
        "front-wide",
        "Front Camera",
        DevicePosition::Front,
        DeviceType::WideAngle,
    )
}

fn harness_with(
    status: AuthorizationStatus,
    grant_on_prompt: bool,
    devices: Vec<DeviceHandle>,
    config: SessionConfig,
) -> Harness {
    let permissions = Arc::new(SimulatedPermissions::new(status, grant_on_prompt));
    let discovery = Arc::new(SimulatedDiscovery::new(devices));
    let session = SimulatedSession::new(PixelFormat::Jpeg, (64, 48));
    let probe = session.probe();

    let controller = SessionControllerBuilder::new()
        .config(config)
        .permissions(permissions.clone())
        .discovery(discovery.clone())
        .session(session)
        .build()
        .unwrap();

    Harness {
        controller,
        permissions,
        discovery,
        probe,
    }
}

fn harness() -> Harness {
    harness_with(
        AuthorizationStatus::Authorized,
        true,
        vec![back_camera(), front_camera()],
        SessionConfig::default(),
    )
}

async fn running_harness() -> Harness {
    let h = harness();
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();
    assert_eq!(h.controller.state(), SessionState::Running);
    h
}

fn drain(receiver: &mut broadcast::Receiver<ShutterEvent>) -> Vec<ShutterEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

fn count_alerts(events: &[ShutterEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ShutterEvent::AlertRaised { .. }))
        .count()
}

#[tokio::test]
async fn test_configure_attaches_and_starts() {
    let h = running_harness().await;

    let snapshot = h.controller.snapshot();
    assert!(snapshot.is_running);
    assert!(!snapshot.is_camera_unavailable);
    assert!(!snapshot.is_capture_button_disabled);
    assert_eq!(snapshot.active_device, Some(back_camera()));

    assert!(h.probe.is_running());
    assert!(!h.probe.is_configuring());
    assert_eq!(h.probe.input_devices(), vec![back_camera()]);
    assert_eq!(h.probe.preset(), Some(SessionPreset::Photo));

    let photo_output = h.probe.photo_output().unwrap();
    assert!(photo_output.high_resolution_capture);
    assert_eq!(
        photo_output.max_quality_prioritization,
        QualityPrioritization::Quality
    );
    assert_eq!(h.probe.metadata_types(), vec![CodeType::Qr]);
}

#[tokio::test]
async fn test_configure_emits_state_sequence() {
    let h = harness();
    let mut events = h.controller.subscribe();

    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    let transitions: Vec<(SessionState, SessionState)> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            ShutterEvent::StateChanged { from, to, .. } => Some((from, to)),
            _ => None,
        })
        .collect();

    assert_eq!(
        transitions,
        vec![
            (SessionState::Unconfigured, SessionState::Configuring),
            (SessionState::Configuring, SessionState::Running),
        ]
    );
}

#[tokio::test]
async fn test_configure_twice_does_not_duplicate_graph() {
    let h = harness();

    h.controller.configure().unwrap();
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.probe.input_count(), 1);
    assert_eq!(h.probe.output_count(OutputKind::Photo), 1);
    assert_eq!(h.probe.output_count(OutputKind::Metadata), 1);
    assert_eq!(h.probe.start_calls(), 1);
    assert_eq!(h.controller.state(), SessionState::Running);
}

#[tokio::test]
async fn test_configure_after_stop_restarts_with_same_graph() {
    let h = running_harness().await;

    assert!(h.controller.stop().await.unwrap());
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::Running);
    assert_eq!(h.probe.input_count(), 1);
    assert_eq!(h.probe.output_count(OutputKind::Photo), 1);
    assert_eq!(h.probe.start_calls(), 2);
}

#[tokio::test]
async fn test_running_flag_tracks_session_through_start_stop() {
    let h = running_harness().await;

    let sequence = ["stop", "start", "start", "stop", "stop", "start", "stop"];
    for step in sequence {
        match step {
            "start" => h.controller.start().unwrap(),
            _ => h.controller.stop_with(|| {}).unwrap(),
        }
        h.controller.flush().await.unwrap();

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.is_running, h.probe.is_running(), "after {}", step);
        assert_eq!(snapshot.is_capture_button_disabled, !h.probe.is_running());
    }

    assert_eq!(h.controller.state(), SessionState::Stopped);
    assert_eq!(h.probe.start_calls(), 3);
    assert_eq!(h.probe.stop_calls(), 3);
}

#[tokio::test]
async fn test_start_before_configure_is_ignored() {
    let h = harness();

    h.controller.start().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::Unconfigured);
    assert_eq!(h.probe.start_calls(), 0);
}

#[tokio::test]
async fn test_stop_callback_runs_after_halt() {
    let h = running_harness().await;
    let probe = h.probe.clone();
    let (tx, rx) = oneshot::channel();

    h.controller
        .stop_with(move || {
            let _ = tx.send(probe.is_running());
        })
        .unwrap();

    let running_when_called = timeout(Duration::from_millis(500), rx)
        .await
        .unwrap()
        .unwrap();
    assert!(!running_when_called);
    assert!(h.controller.snapshot().is_camera_unavailable);
}

#[tokio::test]
async fn test_stop_not_confirmed_skips_callback() {
    let h = running_harness().await;
    h.probe.ignore_stop(true);

    let (tx, mut rx) = oneshot::channel::<()>();
    h.controller
        .stop_with(move || {
            let _ = tx.send(());
        })
        .unwrap();
    h.controller.flush().await.unwrap();

    assert!(rx.try_recv().is_err());
    assert!(!h.controller.stop().await.unwrap());
    assert_eq!(h.controller.state(), SessionState::Running);
    assert!(h.controller.snapshot().is_running);
}

#[tokio::test]
async fn test_no_devices_fails_configuration() {
    let h = harness_with(
        AuthorizationStatus::Authorized,
        true,
        Vec::new(),
        SessionConfig::default(),
    );
    let mut events = h.controller.subscribe();

    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, SessionState::ConfigurationFailed);
    assert!(!snapshot.is_running);
    assert!(snapshot.is_capture_button_disabled);
    assert!(snapshot.should_show_alert);
    assert_eq!(h.probe.start_calls(), 0);
    assert_eq!(count_alerts(&drain(&mut events)), 1);

    let alert = h.controller.take_alert().unwrap();
    assert_eq!(alert.title, "Camera Error");
    assert!(h.controller.take_alert().is_none());
    assert!(!h.controller.snapshot().should_show_alert);
}

#[tokio::test]
async fn test_non_wide_angle_devices_are_not_defaults() {
    let h = harness_with(
        AuthorizationStatus::Authorized,
        true,
        vec![DeviceHandle::new(
            "front-depth",
            "TrueDepth Camera",
            DevicePosition::Front,
            DeviceType::TrueDepth,
        )],
        SessionConfig::default(),
    );

    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::ConfigurationFailed);
}

#[tokio::test]
async fn test_configuration_recovers_on_fresh_configure() {
    let h = harness();
    h.probe.fail_input_construction("back-wide");

    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();
    assert_eq!(h.controller.state(), SessionState::ConfigurationFailed);
    assert_eq!(h.probe.input_count(), 0);

    // Back camera disappears; the front camera becomes the default
    h.discovery.set_devices(vec![front_camera()]);
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Running);
    assert_eq!(snapshot.active_device, Some(front_camera()));
}

#[tokio::test]
async fn test_refused_photo_output_is_fatal() {
    let h = harness();
    h.probe.refuse_photo_output(true);

    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::ConfigurationFailed);
    assert!(!h.probe.is_running());

    h.probe.refuse_photo_output(false);
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::Running);
    assert_eq!(h.probe.input_count(), 1);
}

#[tokio::test]
async fn test_failed_reconfiguration_halts_running_session() {
    let h = harness_with(
        AuthorizationStatus::Authorized,
        true,
        vec![back_camera()],
        SessionConfig {
            outputs: OutputSet {
                still_photo: false,
                qr_scan: false,
            },
            ..SessionConfig::default()
        },
    );
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();
    assert!(h.probe.is_running());

    h.probe.refuse_photo_output(true);
    h.controller.reconfigure(SessionConfig::default()).unwrap();
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, SessionState::ConfigurationFailed);
    assert_eq!(snapshot.is_running, h.probe.is_running());
    assert!(!h.probe.is_running());
    assert_eq!(h.probe.input_count(), 1);
}

#[tokio::test]
async fn test_refused_scan_output_is_tolerated() {
    let h = harness();
    h.probe.refuse_metadata_output(true);
    let mut events = h.controller.subscribe();

    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::Running);
    assert_eq!(h.probe.output_count(OutputKind::Metadata), 0);
    assert_eq!(count_alerts(&drain(&mut events)), 0);
}

#[tokio::test]
async fn test_undetermined_then_denied_alerts_once() {
    let h = harness_with(
        AuthorizationStatus::Undetermined,
        false,
        vec![back_camera()],
        SessionConfig::default(),
    );
    let mut events = h.controller.subscribe();

    h.controller.check_permission().unwrap();
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, SessionState::PermissionDenied);
    assert!(snapshot.is_camera_unavailable);
    assert!(snapshot.is_capture_button_disabled);
    assert_eq!(h.permissions.prompt_count(), 1);
    assert_eq!(h.probe.start_calls(), 0);
    assert_eq!(h.probe.input_count(), 0);
    assert_eq!(count_alerts(&drain(&mut events)), 1);

    let alert = h.controller.take_alert().unwrap();
    assert_eq!(alert.primary_action, Some(AlertAction::OpenSettings));
}

#[tokio::test]
async fn test_prompt_holds_back_queued_configure() {
    let permissions = Arc::new(SimulatedPermissions::with_prompt_delay(
        AuthorizationStatus::Undetermined,
        true,
        Duration::from_millis(50),
    ));
    let session = SimulatedSession::default();
    let probe = session.probe();
    let controller = SessionControllerBuilder::new()
        .permissions(permissions.clone())
        .discovery(Arc::new(SimulatedDiscovery::new(vec![back_camera()])))
        .session(session)
        .build()
        .unwrap();

    controller.check_permission().unwrap();
    controller.configure().unwrap();

    // Prompt still open: nothing may have touched the session yet
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(probe.inputs_at_commit().len(), 0);

    controller.flush().await.unwrap();
    assert_eq!(controller.state(), SessionState::Running);
    assert_eq!(permissions.prompt_count(), 1);
}

#[tokio::test]
async fn test_configure_prompts_when_permission_undetermined() {
    let h = harness_with(
        AuthorizationStatus::Undetermined,
        true,
        vec![back_camera()],
        SessionConfig::default(),
    );

    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.permissions.prompt_count(), 1);
    assert_eq!(h.controller.state(), SessionState::Running);
}

#[tokio::test]
async fn test_denied_recovers_after_authorization() {
    let h = harness_with(
        AuthorizationStatus::Denied,
        false,
        vec![back_camera()],
        SessionConfig::default(),
    );

    h.controller.check_permission().unwrap();
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();
    assert_eq!(h.controller.state(), SessionState::PermissionDenied);
    assert_eq!(h.permissions.prompt_count(), 0);
    assert!(h.controller.take_alert().unwrap().offers_settings());

    h.permissions.set_status(AuthorizationStatus::Authorized);
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::Running);
    assert!(h.controller.take_alert().is_none());
}

#[tokio::test]
async fn test_revoked_access_halts_running_session() {
    let h = running_harness().await;

    h.permissions.set_status(AuthorizationStatus::Denied);
    h.controller.check_permission().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::PermissionDenied);
    assert!(!h.probe.is_running());
    assert_eq!(h.probe.stop_calls(), 1);
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.is_running, h.probe.is_running());
    assert!(snapshot.is_capture_button_disabled);
    assert!(h.controller.take_alert().unwrap().offers_settings());

    h.controller.start().unwrap();
    h.controller.flush().await.unwrap();
    assert_eq!(h.controller.state(), SessionState::PermissionDenied);
    assert!(!h.probe.is_running());

    h.permissions.set_status(AuthorizationStatus::Authorized);
    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::Running);
    assert!(h.probe.is_running());
    assert!(h.controller.snapshot().is_running);
    assert_eq!(h.probe.input_count(), 1);
}

#[tokio::test]
async fn test_switch_device_swaps_input() {
    let h = running_harness().await;
    let mut events = h.controller.subscribe();

    h.controller.switch_device().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.probe.input_devices(), vec![front_camera()]);
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.active_device, Some(front_camera()));
    assert_eq!(snapshot.state, SessionState::Running);
    assert!(!snapshot.is_capture_button_disabled);
    assert_eq!(h.probe.stabilization(), Some(StabilizationMode::Auto));

    let switched = drain(&mut events)
        .into_iter()
        .any(|e| matches!(e, ShutterEvent::DeviceSwitched { ref to, .. } if to.id == "front-wide"));
    assert!(switched);

    h.controller.switch_device().unwrap();
    h.controller.flush().await.unwrap();
    assert_eq!(h.probe.input_devices(), vec![back_camera()]);
}

#[tokio::test]
async fn test_switch_skips_unsupported_stabilization() {
    let h = running_harness().await;
    h.probe.set_supports_stabilization(false);
    h.probe.set_photo_orientation(Orientation::Up);

    h.controller.switch_device().unwrap();
    let image = h.controller.capture_photo().await.unwrap();

    assert_eq!(h.probe.stabilization(), None);
    assert_eq!(image.orientation, Orientation::UpMirrored);
}

#[tokio::test]
async fn test_switch_failure_restores_original_input() {
    let h = running_harness().await;
    h.probe.refuse_input("front-wide");
    let mut events = h.controller.subscribe();

    h.controller.switch_device().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.probe.input_devices(), vec![back_camera()]);
    assert!(h.probe.inputs_at_commit().iter().all(|count| *count == 1));
    assert_eq!(h.controller.state(), SessionState::Running);
    assert!(h.probe.is_running());

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.active_device, Some(back_camera()));
    assert!(!snapshot.is_capture_button_disabled);

    let failed = drain(&mut events)
        .into_iter()
        .any(|e| matches!(e, ShutterEvent::DeviceSwitchFailed { .. }));
    assert!(failed);
}

#[tokio::test]
async fn test_switch_disables_button_until_done() {
    let h = running_harness().await;
    let mut watcher = h.controller.watch();
    watcher.borrow_and_update();

    h.controller.switch_device().unwrap();
    assert!(h.controller.snapshot().is_capture_button_disabled);

    h.controller.flush().await.unwrap();
    assert!(!h.controller.snapshot().is_capture_button_disabled);
    assert!(watcher.has_changed().unwrap());
}

fn button_enabled_before_switch(events: &[ShutterEvent], switches: usize) -> bool {
    let mut seen = 0;
    for event in events {
        match event {
            ShutterEvent::DeviceSwitched { .. } => seen += 1,
            ShutterEvent::CaptureButtonChanged { disabled: false } if seen < switches => {
                return true
            }
            _ => {}
        }
    }
    false
}

#[tokio::test]
async fn test_restart_queued_before_switch_keeps_button_disabled() {
    let h = running_harness().await;
    let mut events = h.controller.subscribe();

    h.controller.stop_with(|| {}).unwrap();
    h.controller.start().unwrap();
    h.controller.switch_device().unwrap();
    h.controller.flush().await.unwrap();

    let events = drain(&mut events);
    assert!(!button_enabled_before_switch(&events, 1));
    assert_eq!(h.probe.input_devices(), vec![front_camera()]);

    let snapshot = h.controller.snapshot();
    assert!(snapshot.is_running);
    assert!(!snapshot.is_capture_button_disabled);
}

#[tokio::test]
async fn test_back_to_back_switches_hold_button_until_last() {
    let h = running_harness().await;
    let mut events = h.controller.subscribe();

    h.controller.switch_device().unwrap();
    h.controller.switch_device().unwrap();
    h.controller.flush().await.unwrap();

    let events = drain(&mut events);
    assert!(!button_enabled_before_switch(&events, 2));
    let enabled = events
        .iter()
        .filter(|e| matches!(e, ShutterEvent::CaptureButtonChanged { disabled: false }))
        .count();
    assert_eq!(enabled, 1);
    assert_eq!(h.probe.input_devices(), vec![back_camera()]);
    assert!(!h.controller.snapshot().is_capture_button_disabled);
}

#[tokio::test]
async fn test_switch_without_opposite_device_keeps_input() {
    let h = harness_with(
        AuthorizationStatus::Authorized,
        true,
        vec![back_camera()],
        SessionConfig::default(),
    );
    h.controller.configure().unwrap();
    h.controller.switch_device().unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.probe.input_devices(), vec![back_camera()]);
    assert!(!h.controller.snapshot().is_capture_button_disabled);
}

#[tokio::test]
async fn test_switch_before_configure_keeps_button_disabled() {
    let h = harness();

    h.controller.switch_device().unwrap();
    h.controller.flush().await.unwrap();

    assert!(h.controller.snapshot().is_capture_button_disabled);
    assert_eq!(h.probe.input_count(), 0);
}

#[tokio::test]
async fn test_capture_requires_running_session() {
    let h = harness();

    let result = h.controller.capture_photo().await;
    assert!(matches!(
        result,
        Err(ShutterError::Camera(CameraError::SessionNotRunning))
    ));

    h.controller.configure().unwrap();
    h.controller.flush().await.unwrap();
    assert!(h.controller.stop().await.unwrap());

    let result = h.controller.capture_photo().await;
    assert!(matches!(
        result,
        Err(ShutterError::Camera(CameraError::SessionNotRunning))
    ));
    assert_eq!(h.probe.capture_calls(), 0);
}

#[tokio::test]
async fn test_capture_queued_behind_configure() {
    let h = harness();

    h.controller.configure().unwrap();
    let image = h.controller.capture_photo().await.unwrap();

    assert_eq!(image.position, DevicePosition::Back);
    assert_eq!(h.probe.capture_calls(), 1);
}

#[tokio::test]
async fn test_back_capture_is_not_mirrored() {
    let h = running_harness().await;
    let mut events = h.controller.subscribe();

    let pending = h.controller.capture_photo();
    let id = pending.id();
    let image = pending.await.unwrap();

    assert_eq!(image.id, id);
    assert_eq!(image.format, PixelFormat::Jpeg);
    assert_eq!(&image.data[..2], &[0xFF, 0xD8]);
    assert_eq!(image.orientation, Orientation::Right);
    assert!(!image.mirrored);

    let settings = h.probe.last_photo_settings().unwrap();
    assert_eq!(
        settings.quality_prioritization,
        QualityPrioritization::Balanced
    );

    let delivered = drain(&mut events).into_iter().any(|e| {
        matches!(e, ShutterEvent::PhotoCaptured { capture_id, mirrored: false, .. } if capture_id == id)
    });
    assert!(delivered);
}

#[tokio::test]
async fn test_front_capture_is_mirrored() {
    let h = running_harness().await;
    h.probe.set_photo_format(PixelFormat::Rgb24, (4, 2));

    let back = h.controller.capture_photo().await.unwrap();
    assert!(!back.mirrored);
    assert_eq!(back.data[0], 0);

    h.controller.switch_device().unwrap();
    let front = h.controller.capture_photo().await.unwrap();

    assert_eq!(front.position, DevicePosition::Front);
    assert!(front.mirrored);
    assert_eq!(front.orientation, Orientation::Right);
    // Rightmost column of the gradient now comes first
    assert_eq!(front.data[0], (3 * 255 / 4) as u8);
    assert_eq!(front.byte_len(), 4 * 2 * 3);
}

#[tokio::test]
async fn test_front_jpeg_capture_gets_mirrored_orientation() {
    let h = harness_with(
        AuthorizationStatus::Authorized,
        true,
        vec![back_camera(), front_camera()],
        SessionConfig {
            preferred_position: DevicePosition::Front,
            ..SessionConfig::default()
        },
    );
    h.controller.configure().unwrap();

    let image = h.controller.capture_photo().await.unwrap();
    assert_eq!(image.position, DevicePosition::Front);
    assert!(image.orientation.is_mirrored());
    assert!(image.mirrored);
}

#[tokio::test]
async fn test_capture_failure_keeps_session_running() {
    let h = running_harness().await;
    h.probe.fail_capture("sensor timeout");

    let result = h.controller.capture_photo().await;
    match result {
        Err(ShutterError::Camera(CameraError::CaptureFailed { details })) => {
            assert_eq!(details, "sensor timeout")
        }
        other => panic!("Unexpected capture result: {:?}", other.map(|i| i.id)),
    }

    assert_eq!(h.controller.state(), SessionState::Running);
    let alert = h.controller.take_alert().unwrap();
    assert_eq!(alert.message, "Couldn't take picture");

    h.probe.clear_capture_failure();
    assert!(h.controller.capture_photo().await.is_ok());
}

#[tokio::test]
async fn test_capture_without_photo_output_skips_backend() {
    let h = harness_with(
        AuthorizationStatus::Authorized,
        true,
        vec![back_camera()],
        SessionConfig {
            outputs: OutputSet {
                still_photo: false,
                qr_scan: false,
            },
            ..SessionConfig::default()
        },
    );
    h.controller.configure().unwrap();

    let result = h.controller.capture_photo().await;
    assert!(matches!(
        result,
        Err(ShutterError::Camera(CameraError::CaptureFailed { .. }))
    ));
    assert_eq!(h.probe.capture_calls(), 0);
}

#[tokio::test]
async fn test_qr_detection_is_observer_only() {
    let h = running_harness().await;
    let mut events = h.controller.subscribe();
    let before = h.controller.snapshot();

    assert!(h.probe.emit_metadata(vec![
        MetadataObject::qr("https://example.org"),
        MetadataObject::qr("ignored"),
    ]));

    let scanned = timeout(Duration::from_millis(500), async {
        loop {
            if let Ok(ShutterEvent::CodeScanned { payload, .. }) = events.recv().await {
                return payload;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(scanned, "https://example.org");
    assert_eq!(h.controller.snapshot(), before);

    assert!(h.probe.emit_metadata(vec![MetadataObject {
        code_type: CodeType::Ean13,
        payload: Some("4006381333931".to_string()),
    }]));
    assert!(timeout(Duration::from_millis(50), events.recv()).await.is_err());
}

#[tokio::test]
async fn test_reconfigure_applies_preset() {
    let h = running_harness().await;

    h.controller
        .reconfigure(SessionConfig {
            preset: SessionPreset::High,
            max_quality_prioritization: QualityPrioritization::Speed,
            ..SessionConfig::default()
        })
        .unwrap();
    h.controller.flush().await.unwrap();

    assert_eq!(h.probe.preset(), Some(SessionPreset::High));
    assert_eq!(
        h.probe.photo_output().unwrap().max_quality_prioritization,
        QualityPrioritization::Speed
    );
    assert_eq!(h.controller.state(), SessionState::Running);
}

#[tokio::test]
async fn test_shutdown_stops_session_and_closes_queue() {
    let h = running_harness().await;

    h.controller.shutdown().await.unwrap();

    assert!(!h.probe.is_running());
    assert!(matches!(
        h.controller.configure(),
        Err(ShutterError::QueueClosed)
    ));
    assert!(matches!(
        h.controller.capture_photo().await,
        Err(ShutterError::QueueClosed)
    ));

    // Second shutdown is a no-op
    h.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_builder_validation() {
    let result = SessionControllerBuilder::new()
        .discovery(Arc::new(SimulatedDiscovery::new(Vec::new())))
        .session(SimulatedSession::default())
        .build();

    match result {
        Err(ShutterError::System { message }) => {
            assert!(message.contains("Permission provider must be specified"))
        }
        _ => panic!("Expected system error for missing permission provider"),
    }
}

#[test]
fn test_builder_requires_runtime() {
    let result = SessionControllerBuilder::new()
        .permissions(Arc::new(SimulatedPermissions::new(
            AuthorizationStatus::Authorized,
            true,
        )))
        .discovery(Arc::new(SimulatedDiscovery::new(Vec::new())))
        .session(SimulatedSession::default())
        .build();

    assert!(matches!(result, Err(ShutterError::System { .. })));
}

#[test]
fn test_session_config_from_shutter_config() {
    let mut config = crate::config::ShutterConfig::default();
    config.session.qr_scan = false;
    config.session.preferred_position = DevicePosition::Front;

    let session_config = SessionConfig::from(&config);
    assert!(!session_config.outputs.qr_scan);
    assert!(session_config.outputs.still_photo);
    assert_eq!(session_config.preferred_position, DevicePosition::Front);
    assert_eq!(
        session_config.capture_quality,
        QualityPrioritization::Balanced
    );
    assert!(SessionState::ConfigurationFailed.is_terminal_failure());
    assert!(!SessionState::Stopped.is_terminal_failure());
}
