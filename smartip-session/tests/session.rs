mod common;

use std::time::Duration;

use common::{eventually, session, MockDevice, INFO_PATH, POWER_PATH, VOLUME_PATH};
use rstest::rstest;
use smartip_session::{
    DeviceEndpoint, DeviceEvent, PowerState, SessionConfig, SessionEngine, SessionError,
};

const INFO_BODY: &str = r#"{"fwId":"2.1.3","hwId":"4430-A","model":"4430","category":"SAM_2WAY","technology":"SmartIP","apiVer":"v1","confirmFwUpdate":false,"upgradeId":7}"#;

// ============================================================================
// Volume
// ============================================================================

#[rstest]
#[case(-200.0, -130.0, r#"{"level":-130.0}"#)]
#[case(12.0, 0.0, r#"{"level":0.0}"#)]
#[case(-42.37, -42.37, r#"{"level":-42.4}"#)]
#[case(-65.0, -65.0, r#"{"level":-65.0}"#)]
fn test_set_volume_clamps_and_tracks_percent(
    #[case] requested: f64,
    #[case] expected_db: f64,
    #[case] expected_body: &str,
) {
    let device = MockDevice::new();
    let session = session(&device);

    assert!(session.set_volume_db(requested));
    session.shutdown();

    assert_eq!(device.puts_to(VOLUME_PATH), vec![expected_body.to_string()]);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.level_db, Some(expected_db));
    assert_eq!(snapshot.level_percent(), Some((expected_db + 130.0) / 130.0));
}

#[test]
fn test_rapid_volume_requests_coalesce_into_one_write() {
    let device = MockDevice::new();
    let session = session(&device);

    // Park the worker inside an unrelated request
    device.hold();
    assert!(session.poll_device_info());
    assert!(eventually(|| device.count("GET", INFO_PATH) == 1));

    assert!(session.set_volume_db(-30.0));
    assert!(session.set_volume_db(-25.0));
    assert!(session.set_volume_db(-20.0));
    assert_eq!(session.pending_commands(), 1);

    device.release();
    session.shutdown();

    assert_eq!(device.puts_to(VOLUME_PATH), vec![r#"{"level":-20.0}"#.to_string()]);
    assert_eq!(session.level_db(), Some(-20.0));
}

#[test]
fn test_volume_request_during_write_is_not_lost() {
    let device = MockDevice::new();
    let session = session(&device);

    device.hold();
    assert!(session.set_volume_db(-30.0));
    assert!(eventually(|| device.count("PUT", VOLUME_PATH) == 1));

    // The first write is in flight, so this needs a write of its own
    assert!(session.set_volume_db(-10.0));
    device.release();
    session.shutdown();

    assert_eq!(
        device.puts_to(VOLUME_PATH),
        vec![r#"{"level":-30.0}"#.to_string(), r#"{"level":-10.0}"#.to_string()]
    );
    assert_eq!(session.level_db(), Some(-10.0));
}

#[test]
fn test_set_volume_percent_maps_onto_db_range() {
    let device = MockDevice::new();
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.set_volume_percent(0.5));
    session.shutdown();

    assert_eq!(device.puts_to(VOLUME_PATH), vec![r#"{"level":-65.0}"#.to_string()]);
    let received: Vec<_> = events.try_iter().collect();
    assert!(received.contains(&DeviceEvent::LevelDb(-65.0)));
    assert!(received.contains(&DeviceEvent::LevelPercent(0.5)));
}

#[test]
fn test_nan_volume_is_rejected() {
    let device = MockDevice::new();
    let session = session(&device);

    assert!(!session.set_volume_db(f64::NAN));
    assert!(!session.set_volume_percent(f64::NAN));
    session.shutdown();

    assert!(device.requests().is_empty());
}

#[test]
fn test_rejected_volume_write_leaves_level_untouched() {
    let device = MockDevice::new();
    device.reply_put(VOLUME_PATH, 202);
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.set_volume_db(-12.0));
    session.shutdown();

    assert_eq!(session.level_db(), None);
    // A non-200 reply still proves the device is there
    assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![DeviceEvent::Responding(true)]);
}

// ============================================================================
// Mute
// ============================================================================

#[test]
fn test_set_and_toggle_mute() {
    let device = MockDevice::new();
    let session = session(&device);

    assert!(session.set_mute(true));
    assert!(session.toggle_mute());
    assert!(session.toggle_mute());
    session.shutdown();

    assert_eq!(
        device.puts_to(VOLUME_PATH),
        vec![
            r#"{"mute":true}"#.to_string(),
            r#"{"mute":false}"#.to_string(),
            r#"{"mute":true}"#.to_string(),
        ]
    );
    assert!(session.mute());
}

// ============================================================================
// Polling and change detection
// ============================================================================

#[test]
fn test_identical_polls_emit_nothing_after_the_first() {
    let device = MockDevice::new();
    device.set_power("STANDBY");
    device.reply_get(INFO_PATH, INFO_BODY);
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.poll_power_and_audio());
    assert!(session.poll_device_info());
    let first: Vec<_> = events.timeout_iter(Duration::from_secs(1)).take(5).collect();
    assert_eq!(first.len(), 5);

    assert!(session.poll_power_and_audio());
    assert!(session.poll_device_info());
    session.shutdown();

    assert_eq!(device.count("GET", POWER_PATH), 2);
    assert_eq!(device.count("GET", INFO_PATH), 2);
    assert_eq!(events.try_iter().count(), 0);
}

#[test]
fn test_first_power_poll_events() {
    let device = MockDevice::new();
    device.set_power("STANDBY");
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.poll_power_and_audio());
    session.shutdown();

    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![
            DeviceEvent::Responding(true),
            DeviceEvent::PowerState(PowerState::Standby),
            DeviceEvent::AllocatedPower(15.4),
            DeviceEvent::Poe15W(true),
        ]
    );

    let snapshot = session.snapshot();
    assert_eq!(snapshot.power_state, PowerState::Standby);
    assert_eq!(snapshot.allocated_power, 15.4);
    assert!(snapshot.poe_15w);
}

#[test]
fn test_device_info_is_parsed_and_published() {
    let device = MockDevice::new();
    device.reply_get(INFO_PATH, INFO_BODY);
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.poll_device_info());
    session.shutdown();

    let info = session.device_info().unwrap();
    assert_eq!(info.model, "4430");
    assert_eq!(info.firmware_id, "2.1.3");
    assert_eq!(info.upgrade_id, 7);
    assert!(events.try_iter().any(|e| e == DeviceEvent::DeviceInfo(info.clone())));
}

#[test]
fn test_malformed_device_info_changes_nothing() {
    let device = MockDevice::new();
    device.reply_get(INFO_PATH, "<html>busy</html>");
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.poll_device_info());
    assert!(session.poll_device_info());
    session.shutdown();

    assert!(session.device_info().is_none());
    // The device answered, so only reachability changes
    assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![DeviceEvent::Responding(true)]);
}

#[test]
fn test_reformatted_device_info_is_republished() {
    let device = MockDevice::new();
    device.reply_get(INFO_PATH, INFO_BODY);
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.poll_device_info());
    let is_info = |e: &DeviceEvent| matches!(e, DeviceEvent::DeviceInfo(_));
    let first = events.wait_for(is_info, Duration::from_secs(1)).unwrap();

    // Same record, different bytes on the wire
    device.reply_get(INFO_PATH, &INFO_BODY.replace(",", ", "));
    assert!(session.poll_device_info());
    let second = events.wait_for(is_info, Duration::from_secs(1)).unwrap();
    session.shutdown();

    assert_eq!(first, second);
    assert_eq!(device.count("GET", INFO_PATH), 2);
}

#[test]
fn test_unrecognised_power_state_stays_unknown() {
    let device = MockDevice::new();
    device.set_power("HIBERNATE");
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.poll_power_and_audio());
    session.shutdown();

    assert_eq!(session.power_state(), PowerState::Unknown);
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![
            DeviceEvent::Responding(true),
            DeviceEvent::AllocatedPower(15.4),
            DeviceEvent::Poe15W(true),
        ]
    );
    assert_eq!(device.count("GET", VOLUME_PATH), 0);
}

#[test]
fn test_responding_transitions() {
    let device = MockDevice::new();
    device.set_power("STANDBY");
    device.set_offline(true);
    let session = session(&device);
    let events = session.subscribe();

    // Initially false, so a failure is not a change
    assert!(session.poll_power_and_audio());
    assert!(eventually(|| device.count("GET", POWER_PATH) == 1));
    assert!(events.recv_timeout(Duration::from_millis(50)).is_none());

    device.set_offline(false);
    assert!(session.poll_power_and_audio());
    assert_eq!(
        events.recv_timeout(Duration::from_secs(2)),
        Some(DeviceEvent::Responding(true))
    );
    assert!(eventually(|| device.count("GET", POWER_PATH) == 2));
    let _ = events.timeout_iter(Duration::from_millis(50)).count();

    device.set_offline(true);
    assert!(session.poll_power_and_audio());
    assert_eq!(
        events.recv_timeout(Duration::from_secs(2)),
        Some(DeviceEvent::Responding(false))
    );
    assert!(!session.is_responding());

    device.set_offline(false);
    device.fail_get(POWER_PATH, 404);
    assert!(session.poll_power_and_audio());
    assert_eq!(
        events.recv_timeout(Duration::from_secs(2)),
        Some(DeviceEvent::Responding(true))
    );
    session.shutdown();
    assert!(session.is_responding());
}

#[rstest]
#[case("ACTIVE", 1)]
#[case("STANDBY", 0)]
#[case("SLEEP", 0)]
#[case("BOOT", 0)]
fn test_audio_follow_up_only_when_active(#[case] power: &str, #[case] audio_polls: usize) {
    let device = MockDevice::new();
    device.set_power(power);
    device.set_audio(-18.5, false);
    let session = session(&device);

    assert!(session.poll_power_and_audio());
    assert!(eventually(|| device.count("GET", POWER_PATH) == 1));
    std::thread::sleep(Duration::from_millis(50));
    session.shutdown();

    assert_eq!(device.count("GET", VOLUME_PATH), audio_polls);
    if audio_polls == 1 {
        assert_eq!(session.level_db(), Some(-18.5));
        assert!(!session.mute());
    }
}

#[test]
fn test_poller_refreshes_on_its_own() {
    let device = MockDevice::new();
    device.set_power("ACTIVE");
    device.set_audio(-40.0, true);
    let session = session(&device);

    session.start_polling_every(Duration::from_millis(20)).unwrap();
    assert!(session.is_polling());
    assert!(eventually(|| device.count("GET", POWER_PATH) >= 3));
    assert!(eventually(|| session.mute()));

    session.stop_polling();
    assert!(!session.is_polling());
    session.shutdown();

    assert_eq!(session.level_db(), Some(-40.0));
    assert!(device.count("GET", VOLUME_PATH) >= 1);
}

// ============================================================================
// Power and profiles
// ============================================================================

#[rstest]
#[case(PowerState::Unknown)]
#[case(PowerState::Sleep)]
fn test_report_only_power_states_are_rejected(#[case] state: PowerState) {
    let device = MockDevice::new();
    let session = session(&device);

    assert!(!session.set_power(state));
    assert_eq!(session.pending_commands(), 0);
    session.shutdown();

    assert!(device.requests().is_empty());
    assert_eq!(session.power_state(), PowerState::Unknown);
}

#[test]
fn test_set_power_applies_after_success() {
    let device = MockDevice::new();
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.set_power(PowerState::Active));
    session.shutdown();

    assert_eq!(device.puts_to(POWER_PATH), vec![r#"{"state":"ACTIVE"}"#.to_string()]);
    assert_eq!(session.power_state(), PowerState::Active);
    assert!(events
        .try_iter()
        .any(|e| e == DeviceEvent::PowerState(PowerState::Active)));
}

#[test]
fn test_failed_power_write_keeps_previous_state() {
    let device = MockDevice::new();
    device.reply_put(POWER_PATH, 500);
    let session = session(&device);

    assert!(session.set_power(PowerState::Standby));
    session.shutdown();

    assert_eq!(session.power_state(), PowerState::Unknown);
}

#[test]
fn test_restore_profile() {
    let device = MockDevice::new();
    let session = session(&device);
    let events = session.subscribe();

    assert!(session.restore_profile(3, true));
    session.shutdown();

    assert_eq!(
        device.puts_to("public/v1/profile/restore"),
        vec![r#"{"id":3,"startup":true}"#.to_string()]
    );
    assert!(events.try_iter().any(|e| e == DeviceEvent::ProfileRestored(3)));
}

// ============================================================================
// Custom requests and endpoint
// ============================================================================

#[test]
fn test_custom_requests_return_through_reply() {
    let device = MockDevice::new();
    device.reply_get("public/v1/device/led", r#"{"ledIntensity":50}"#);
    let session = session(&device);

    let body = session
        .custom_get("/public/v1/device/led")
        .unwrap()
        .wait_timeout(Duration::from_secs(2))
        .unwrap();
    assert_eq!(body, r#"{"ledIntensity":50}"#);

    session
        .custom_put("public/v1/device/led", r#"{"ledIntensity":10}"#)
        .unwrap()
        .wait()
        .unwrap();

    let missing = session.custom_get("public/v1/nothing").unwrap().wait();
    assert!(matches!(
        missing,
        Err(SessionError::Api(smartip_session::ApiError::DeviceError { status: 404, .. }))
    ));
    session.shutdown();

    assert_eq!(
        device.puts_to("public/v1/device/led"),
        vec![r#"{"ledIntensity":10}"#.to_string()]
    );
}

#[test]
fn test_endpoint_change_applies_in_queue_order() {
    let device = MockDevice::new();
    device.set_power("STANDBY");
    let session = session(&device);

    assert!(session.poll_power_and_audio());
    assert!(session.set_host("192.168.1.51"));
    assert!(session.poll_power_and_audio());
    session.shutdown();

    let hosts: Vec<_> = device.requests().into_iter().map(|r| r.host).collect();
    assert_eq!(hosts, vec!["192.168.1.50", "192.168.1.51"]);
    assert_eq!(session.endpoint().host(), "192.168.1.51");
}

#[test]
fn test_set_endpoint_with_credentials() {
    let device = MockDevice::new();
    let session = session(&device);

    let endpoint = DeviceEndpoint::with_credentials("10.0.0.9", 9001, "installer", "secret");
    assert!(session.set_endpoint(endpoint.clone()));
    assert_eq!(session.endpoint(), endpoint);
    session.shutdown();
}

// ============================================================================
// Queue and lifecycle
// ============================================================================

#[test]
fn test_dispose_drains_then_rejects() {
    let device = MockDevice::new();
    device.set_power("STANDBY");
    let session = session(&device);

    device.hold();
    for _ in 0..5 {
        assert!(session.set_mute(true));
    }
    session.dispose();
    assert!(session.is_closed());

    assert!(!session.set_mute(false));
    assert!(!session.poll_power_and_audio());
    assert!(matches!(session.custom_get("device/info"), Err(SessionError::Closed)));

    device.release();
    session.shutdown();

    assert_eq!(device.puts_to(VOLUME_PATH).len(), 5);
    assert_eq!(device.count("GET", POWER_PATH), 0);
}

#[test]
fn test_full_queue_rejects_commands() {
    let device = MockDevice::new();
    let config = SessionConfig::new("192.168.1.50")
        .with_queue_capacity(2)
        .with_command_cooldown(Duration::ZERO);
    let session = SessionEngine::with_transport(config, device.clone()).unwrap();

    device.hold();
    assert!(session.set_mute(true));
    assert!(eventually(|| device.requests().len() == 1));

    assert!(session.set_mute(false));
    assert!(session.poll_device_info());
    assert!(!session.toggle_mute());
    assert!(matches!(session.custom_get("device/info"), Err(SessionError::QueueFull)));

    device.release();
    session.shutdown();
    assert_eq!(device.requests().len(), 3);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = SessionConfig::new("192.168.1.50").with_queue_capacity(0);
    assert!(matches!(
        SessionEngine::with_transport(config, MockDevice::new()),
        Err(SessionError::Config(_))
    ));
}

#[test]
fn test_cooldown_paces_commands() {
    let device = MockDevice::new();
    let config = SessionConfig::new("192.168.1.50").with_command_cooldown(Duration::from_millis(40));
    let session = SessionEngine::with_transport(config, device.clone()).unwrap();

    let start = std::time::Instant::now();
    for _ in 0..3 {
        assert!(session.set_mute(true));
    }
    session.shutdown();

    assert!(start.elapsed() >= Duration::from_millis(120));
    assert_eq!(device.requests().len(), 3);
}

#[test]
fn test_shutdown_is_idempotent_and_stops_polling() {
    let device = MockDevice::new();
    device.set_power("STANDBY");
    let session = session(&device);

    session.start_polling().unwrap();
    session.shutdown();
    session.shutdown();

    assert!(!session.is_polling());
    assert!(matches!(session.start_polling(), Ok(())));
    assert!(eventually(|| !session.is_polling()));
}

#[test]
fn test_flush_waits_for_follow_up_audio_poll() {
    let device = MockDevice::new();
    device.set_power("ACTIVE");
    device.set_audio(-33.0, true);
    let session = session(&device);

    assert!(session.poll_power_and_audio());
    session.flush().unwrap().wait().unwrap();
    session.flush().unwrap().wait().unwrap();

    assert_eq!(device.count("GET", VOLUME_PATH), 1);
    assert_eq!(session.level_db(), Some(-33.0));
    assert!(session.mute());
    session.shutdown();
}
