//! Out-of-order convergence of the reconciliation pipeline
//!
//! For every ordering of a set of add-notifications describing one adapter,
//! one device, one service, one characteristic, and one descriptor, the final
//! registry state must be identical: full hierarchy, all owner references
//! correct, no orphans left behind.

use proptest::prelude::*;

use bluesync_core::{Address, Synchronizer, SynchronizerConfig, Uuid};
use bluesync_transport::{Interface, ObjectEvent, ObjectPath, PropertyMap};

const ADAPTER_PATH: &str = "/org/bluez/hci0";
const DEVICE_PATH: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF";
const SERVICE_PATH: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0019";
const CHAR_PATH: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0019/char001a";
const DESC_PATH: &str = "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0019/char001a/desc001c";

const SERVICE_UUID: &str = "0000180d-0000-1000-8000-00805f9b34fb";
const CHAR_UUID: &str = "00002a37-0000-1000-8000-00805f9b34fb";
const DESC_UUID: &str = "00002902-0000-1000-8000-00805f9b34fb";

fn added(path: &str, interface: Interface, props: PropertyMap) -> ObjectEvent {
    ObjectEvent::InterfacesAdded {
        path: ObjectPath::new(path),
        interfaces: vec![(interface, props)],
    }
}

fn full_hierarchy() -> Vec<ObjectEvent> {
    vec![
        added(ADAPTER_PATH, Interface::Adapter, PropertyMap::new()),
        added(
            DEVICE_PATH,
            Interface::Device,
            PropertyMap::from([(
                "Address".to_string(),
                serde_json::json!("AA:BB:CC:DD:EE:FF"),
            )]),
        ),
        added(
            SERVICE_PATH,
            Interface::GattService,
            PropertyMap::from([
                ("UUID".to_string(), serde_json::json!(SERVICE_UUID)),
                ("Device".to_string(), serde_json::json!(DEVICE_PATH)),
            ]),
        ),
        added(
            CHAR_PATH,
            Interface::GattCharacteristic,
            PropertyMap::from([
                ("UUID".to_string(), serde_json::json!(CHAR_UUID)),
                ("Service".to_string(), serde_json::json!(SERVICE_PATH)),
            ]),
        ),
        added(
            DESC_PATH,
            Interface::GattDescriptor,
            PropertyMap::from([
                ("UUID".to_string(), serde_json::json!(DESC_UUID)),
                ("Characteristic".to_string(), serde_json::json!(CHAR_PATH)),
            ]),
        ),
    ]
}

/// Assert the fully-converged graph shape
fn assert_converged(sync: &Synchronizer) {
    let registry = sync.registry();
    let address = Address::parse("AA:BB:CC:DD:EE:FF").unwrap();

    let adapter = registry.adapter_by_id("hci0").expect("adapter missing");
    assert_eq!(adapter.path(), &ObjectPath::new(ADAPTER_PATH));

    let device = registry.lookup_by_address(&address).expect("device missing");
    assert_eq!(device.path(), &ObjectPath::new(DEVICE_PATH));

    let service = device
        .child(&Uuid::new(SERVICE_UUID))
        .expect("service not reachable from device");
    assert_eq!(
        service.owner_path(),
        Some(&ObjectPath::new(DEVICE_PATH)),
        "service owner back-reference wrong"
    );

    let characteristic = service
        .child(&Uuid::new(CHAR_UUID))
        .expect("characteristic not reachable from service");
    assert_eq!(
        characteristic.owner_path(),
        Some(&ObjectPath::new(SERVICE_PATH))
    );

    let descriptor = characteristic
        .child(&Uuid::new(DESC_UUID))
        .expect("descriptor not reachable from characteristic");
    assert_eq!(descriptor.owner_path(), Some(&ObjectPath::new(CHAR_PATH)));

    assert_eq!(registry.entity_count(), 5);
    assert_eq!(registry.orphan_count(), 0, "orphans left behind");
}

proptest! {
    #[test]
    fn converges_under_any_notification_order(
        order in Just(full_hierarchy()).prop_shuffle()
    ) {
        let sync = Synchronizer::new(SynchronizerConfig::default());
        for event in order {
            sync.apply(event);
        }
        assert_converged(&sync);
    }

    #[test]
    fn replaying_every_notification_twice_is_idempotent(
        order in Just(full_hierarchy()).prop_shuffle()
    ) {
        let sync = Synchronizer::new(SynchronizerConfig::default());
        for event in &order {
            sync.apply(event.clone());
        }
        for event in order {
            sync.apply(event);
        }
        assert_converged(&sync);
    }
}

#[test]
fn reverse_order_is_repaired() {
    let sync = Synchronizer::new(SynchronizerConfig::default());
    let mut events = full_hierarchy();
    events.reverse();
    for event in events {
        sync.apply(event);
    }
    assert_converged(&sync);
}

#[test]
fn characteristic_before_service_is_never_lost() {
    let sync = Synchronizer::new(SynchronizerConfig::default());
    let events = full_hierarchy();

    // device, characteristic, service: the characteristic waits on the
    // service and must become reachable once the service arrives.
    sync.apply(events[1].clone());
    sync.apply(events[3].clone());
    assert_eq!(sync.registry().orphan_count(), 1);

    sync.apply(events[2].clone());

    let address = Address::parse("AA:BB:CC:DD:EE:FF").unwrap();
    let device = sync.registry().lookup_by_address(&address).unwrap();
    let service = device.child(&Uuid::new(SERVICE_UUID)).unwrap();
    assert!(service.child(&Uuid::new(CHAR_UUID)).is_some());
}

#[test]
fn service_referencing_future_device_scenario() {
    // Service referencing a device path that does not exist yet, then the
    // device, then a characteristic for that service.
    let sync = Synchronizer::new(SynchronizerConfig::default());
    let events = full_hierarchy();

    sync.apply(events[2].clone());
    sync.apply(events[1].clone());
    sync.apply(events[3].clone());

    let address = Address::parse("AA:BB:CC:DD:EE:FF").unwrap();
    let device = sync.registry().lookup_by_address(&address).unwrap();
    let service = device.child(&Uuid::new(SERVICE_UUID)).unwrap();
    assert!(service.child(&Uuid::new(CHAR_UUID)).is_some());
}
