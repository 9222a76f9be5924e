//! End-to-end session tests over a scripted transport
//!
//! Live events go through the real processing thread, so assertions about
//! their effects poll with a deadline instead of assuming delivery timing.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use bluesync_sdk::{BlueSession, Device, SdkError, SyncEvent};
use bluesync_transport::{Interface, MockTransport, ObjectEvent, ObjectPath, PropertyMap};

const ADAPTER_PATH: &str = "/org/bluez/hci0";
const DEVICE_PATH: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF";
const SERVICE_PATH: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0019";
const CHAR_PATH: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0019/char001a";

const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";
const HEART_RATE: &str = "0000180d-0000-1000-8000-00805f9b34fb";
const HEART_RATE_MEASUREMENT: &str = "00002a37-0000-1000-8000-00805f9b34fb";

fn device_props(connected: bool) -> PropertyMap {
    PropertyMap::from([
        ("Address".to_string(), json!(ADDRESS)),
        ("Alias".to_string(), json!("Polar H10")),
        ("Connected".to_string(), json!(connected)),
    ])
}

fn seeded_transport() -> Arc<MockTransport> {
    let transport = Arc::new(MockTransport::new());
    transport.push_object(ADAPTER_PATH, vec![(Interface::Adapter, PropertyMap::new())]);
    transport.push_object(DEVICE_PATH, vec![(Interface::Device, device_props(false))]);
    transport
}

fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_device_resolution_from_startup_enumeration() {
    let transport = seeded_transport();
    let session = BlueSession::new(transport.clone()).unwrap();

    let device = session.device(ADDRESS).unwrap();
    assert_eq!(device.address().to_string(), ADDRESS);
    assert_eq!(device.path().as_str(), DEVICE_PATH);
    assert_eq!(device.alias().as_deref(), Some("Polar H10"));
    assert!(!device.is_connected());
    assert!(device.is_alive());

    session.shutdown().unwrap();
}

#[test]
fn test_unknown_device_is_not_found() {
    let session = BlueSession::new(seeded_transport()).unwrap();

    assert!(matches!(
        session.device("11:22:33:44:55:66"),
        Err(SdkError::NotFound(_))
    ));
    assert!(matches!(
        session.device("garbage"),
        Err(SdkError::NotFound(_))
    ));

    session.shutdown().unwrap();
}

#[test]
fn test_repeated_resolution_shares_one_handle_and_one_bind() {
    let transport = seeded_transport();
    let session = BlueSession::new(transport.clone()).unwrap();

    let first = session.device(ADDRESS).unwrap();
    // Delimiter and case variants name the same device.
    let second = session.device("aa_bb_cc_dd_ee_ff").unwrap();

    assert!(Device::same_handle(&first, &second));
    assert_eq!(transport.bind_count(), 1);

    session.shutdown().unwrap();
}

#[test]
fn test_removal_kills_handle_and_lookup() {
    let transport = seeded_transport();
    let session = BlueSession::new(transport.clone()).unwrap();
    let device = session.device(ADDRESS).unwrap();

    transport.emit(ObjectEvent::InterfacesRemoved {
        path: ObjectPath::new(DEVICE_PATH),
        interfaces: vec![Interface::Device],
    });
    wait_until("device removal", || !device.is_alive());

    assert!(matches!(
        device.connect(),
        Err(SdkError::ObjectRemoved(_))
    ));
    assert!(matches!(session.device(ADDRESS), Err(SdkError::NotFound(_))));

    session.shutdown().unwrap();
}

#[test]
fn test_rediscovery_at_new_path_keeps_address_working() {
    let transport = seeded_transport();
    let session = BlueSession::new(transport.clone()).unwrap();
    let stale = session.device(ADDRESS).unwrap();

    // The device drops off and is re-announced with a different object path.
    transport.emit(ObjectEvent::InterfacesRemoved {
        path: ObjectPath::new(DEVICE_PATH),
        interfaces: vec![Interface::Device],
    });
    transport.emit(ObjectEvent::InterfacesAdded {
        path: ObjectPath::new("/org/bluez/hci1/dev_AA_BB_CC_DD_EE_FF"),
        interfaces: vec![(Interface::Device, device_props(true))],
    });
    wait_until("re-announced device", || {
        session
            .device(ADDRESS)
            .map(|d| d.path().as_str() == "/org/bluez/hci1/dev_AA_BB_CC_DD_EE_FF")
            .unwrap_or(false)
    });

    let fresh = session.device(ADDRESS).unwrap();
    assert!(!Device::same_handle(&stale, &fresh));
    assert!(!stale.is_alive());
    assert!(fresh.is_connected());

    session.shutdown().unwrap();
}

#[test]
fn test_gatt_traversal_from_scrambled_feed() {
    let transport = seeded_transport();
    let session = BlueSession::new(transport.clone()).unwrap();

    // Characteristic announced before its service.
    transport.emit(ObjectEvent::InterfacesAdded {
        path: ObjectPath::new(CHAR_PATH),
        interfaces: vec![(
            Interface::GattCharacteristic,
            PropertyMap::from([
                ("UUID".to_string(), json!(HEART_RATE_MEASUREMENT)),
                ("Service".to_string(), json!(SERVICE_PATH)),
            ]),
        )],
    });
    transport.emit(ObjectEvent::InterfacesAdded {
        path: ObjectPath::new(SERVICE_PATH),
        interfaces: vec![(
            Interface::GattService,
            PropertyMap::from([
                ("UUID".to_string(), json!(HEART_RATE)),
                ("Device".to_string(), json!(DEVICE_PATH)),
            ]),
        )],
    });

    let device = session.device(ADDRESS).unwrap();
    wait_until("service to appear under the device", || {
        device
            .service(HEART_RATE)
            .and_then(|s| s.characteristic(HEART_RATE_MEASUREMENT))
            .is_some()
    });

    let characteristic = device
        .service(HEART_RATE)
        .and_then(|s| s.characteristic(HEART_RATE_MEASUREMENT))
        .unwrap();
    characteristic.start_notify().unwrap();

    let log = transport.call_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].member, "StartNotify");
    assert_eq!(log[0].path.as_str(), CHAR_PATH);
    assert_eq!(log[0].interface, Interface::GattCharacteristic);

    // Absent lookups stay quiet rather than erroring.
    assert!(device.service("0000180f-0000-1000-8000-00805f9b34fb").is_none());

    session.shutdown().unwrap();
}

#[test]
fn test_property_change_refreshes_snapshot() {
    let transport = seeded_transport();
    let session = BlueSession::new(transport.clone()).unwrap();
    let device = session.device(ADDRESS).unwrap();
    assert!(!device.is_connected());

    transport.emit(ObjectEvent::PropertiesChanged {
        path: ObjectPath::new(DEVICE_PATH),
        interface: Interface::Device,
        changed: PropertyMap::from([("Connected".to_string(), json!(true))]),
    });
    wait_until("connected flag to flip", || device.is_connected());

    session.shutdown().unwrap();
}

#[test]
fn test_adapter_resolution_and_pass_through() {
    let transport = seeded_transport();
    let session = BlueSession::new(transport.clone()).unwrap();

    assert_eq!(session.adapter_ids(), vec!["hci0".to_string()]);

    let adapter = session.adapter("hci0").unwrap();
    adapter.start_discovery().unwrap();
    adapter.stop_discovery().unwrap();

    let members: Vec<_> = transport
        .call_log()
        .into_iter()
        .map(|record| record.member)
        .collect();
    assert_eq!(members, vec!["StartDiscovery", "StopDiscovery"]);

    assert!(matches!(
        session.adapter("hci7"),
        Err(SdkError::NotFound(_))
    ));

    session.shutdown().unwrap();
}

#[test]
fn test_session_events_reach_subscribers() {
    let transport = seeded_transport();
    let session = BlueSession::new(transport.clone()).unwrap();
    let mut events = session.subscribe_events();

    transport.emit(ObjectEvent::InterfacesAdded {
        path: ObjectPath::new("/org/bluez/hci0/dev_11_22_33_44_55_66"),
        interfaces: vec![(
            Interface::Device,
            PropertyMap::from([("Address".to_string(), json!("11:22:33:44:55:66"))]),
        )],
    });

    wait_until("observed event", || {
        matches!(
            events.try_recv(),
            Ok(SyncEvent::DeviceObserved { ref address, .. })
                if address.to_string() == "11:22:33:44:55:66"
        )
    });

    session.shutdown().unwrap();
}

#[test]
fn test_shutdown_invalidates_outstanding_handles() {
    let transport = seeded_transport();
    let session = BlueSession::new(transport.clone()).unwrap();
    let device = session.device(ADDRESS).unwrap();

    session.shutdown().unwrap();

    assert!(!device.is_alive());
    assert!(matches!(
        device.disconnect(),
        Err(SdkError::ObjectRemoved(_))
    ));
}
