//! Translation of raw structural notifications into registry operations
//!
//! The reconciler is a stateless transformer over the [`EntityRegistry`]:
//! each notification is classified by the capability interfaces it names and
//! turned into upserts, attachments, or removals. Resolution failures (an
//! owner reference that does not exist yet) are not errors — they produce
//! orphans that the registry repairs retroactively. Genuinely inconsistent
//! notifications are reported as [`SyncEvent::SyncError`] and processing
//! continues; no single bad notification halts the synchronizer.
//!
//! `apply` returns the events to emit rather than emitting them itself, so
//! the caller can deliver them with no registry lock held.

use std::sync::Arc;

use tracing::{debug, warn};

use bluesync_transport::{Interface, ObjectEvent, ObjectPath, PropertyMap};

use crate::event::SyncEvent;
use crate::model::{Address, Uuid};
use crate::path::{self, PathComponents};
use crate::registry::{DeviceUpsert, EntityRegistry, Removal};

/// Property key carrying a service's owning-device path
const PROP_OWNER_DEVICE: &str = "Device";
/// Property key carrying a characteristic's owning-service path
const PROP_OWNER_SERVICE: &str = "Service";
/// Property key carrying a descriptor's owning-characteristic path
const PROP_OWNER_CHARACTERISTIC: &str = "Characteristic";
/// Property key carrying a device's address
const PROP_ADDRESS: &str = "Address";
/// Property key carrying a GATT entity's UUID
const PROP_UUID: &str = "UUID";

/// Applies structural notifications to the entity registry
#[derive(Clone)]
pub struct Reconciler {
    registry: Arc<EntityRegistry>,
}

impl Reconciler {
    /// Create a reconciler over the given registry
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        Self { registry }
    }

    /// Reconcile one notification, returning the events to emit
    pub fn apply(&self, event: ObjectEvent) -> Vec<SyncEvent> {
        match event {
            ObjectEvent::InterfacesAdded { path, interfaces } => {
                self.apply_added(&path, interfaces)
            }
            ObjectEvent::InterfacesRemoved { path, interfaces } => {
                self.apply_removed(&path, &interfaces)
            }
            ObjectEvent::PropertiesChanged {
                path,
                interface,
                changed,
            } => self.apply_properties(&path, interface, changed),
        }
    }

    /// Handle "interfaces added" at one path
    ///
    /// Capabilities within a single notification are processed parents
    /// before children to minimize orphan creation; correctness does not
    /// depend on it, since ordering across notifications is out of our
    /// control anyway.
    fn apply_added(
        &self,
        target: &ObjectPath,
        mut interfaces: Vec<(Interface, PropertyMap)>,
    ) -> Vec<SyncEvent> {
        let components = path::split_path(target);
        let mut pending = Vec::new();

        for kind in Interface::ALL {
            let Some(idx) = interfaces.iter().position(|(i, _)| *i == kind) else {
                continue;
            };
            let (_, props) = interfaces.swap_remove(idx);

            match kind {
                Interface::Adapter => self.add_adapter(target, &components, props, &mut pending),
                Interface::Device => self.add_device(target, &components, props, &mut pending),
                Interface::GattService => self.add_child(
                    kind,
                    target,
                    props,
                    PROP_OWNER_DEVICE,
                    &mut pending,
                ),
                Interface::GattCharacteristic => self.add_child(
                    kind,
                    target,
                    props,
                    PROP_OWNER_SERVICE,
                    &mut pending,
                ),
                Interface::GattDescriptor => self.add_child(
                    kind,
                    target,
                    props,
                    PROP_OWNER_CHARACTERISTIC,
                    &mut pending,
                ),
            }
        }

        pending
    }

    fn add_adapter(
        &self,
        target: &ObjectPath,
        components: &PathComponents,
        props: PropertyMap,
        pending: &mut Vec<SyncEvent>,
    ) {
        let id = match components.adapter() {
            Some(id) if components.is_adapter_path() => id,
            _ => {
                pending.push(violation(format!(
                    "adapter announced at unrecognizable path {target}"
                )));
                return;
            }
        };
        self.registry.upsert_adapter(id, props);
    }

    fn add_device(
        &self,
        target: &ObjectPath,
        components: &PathComponents,
        props: PropertyMap,
        pending: &mut Vec<SyncEvent>,
    ) {
        // Prefer the address the property bag carries; fall back to the one
        // embedded in the path segment.
        let address = props
            .get(PROP_ADDRESS)
            .and_then(|v| v.as_str())
            .and_then(Address::parse)
            .or_else(|| components.device().and_then(path::address_from_segment));

        let Some(address) = address else {
            pending.push(violation(format!(
                "device announced at {target} with no recoverable address"
            )));
            return;
        };

        match self
            .registry
            .upsert_device(target.clone(), address.clone(), props.clone())
        {
            DeviceUpsert::Created(_) => {
                debug!(%address, path = %target, "device observed");
                pending.push(SyncEvent::DeviceObserved {
                    address,
                    properties: props,
                });
            }
            DeviceUpsert::Refreshed(_) => {
                // Property refresh only; the observed event already fired
                // for this path.
            }
        }
    }

    /// Shared handling for the three GATT child capabilities
    ///
    /// The owner reference carried in the property bag wins; a sparse bag
    /// falls back to the path-prefix parent. A missing owner entity is not a
    /// failure — the registry holds the child as an orphan.
    fn add_child(
        &self,
        kind: Interface,
        target: &ObjectPath,
        props: PropertyMap,
        owner_key: &str,
        pending: &mut Vec<SyncEvent>,
    ) {
        let Some(uuid) = props.get(PROP_UUID).and_then(|v| v.as_str()).map(Uuid::new) else {
            pending.push(violation(format!(
                "{kind} announced at {target} without a UUID"
            )));
            return;
        };

        let owner = props
            .get(owner_key)
            .and_then(|v| v.as_str())
            .map(ObjectPath::new)
            .or_else(|| target.parent());

        let Some(owner) = owner else {
            pending.push(violation(format!(
                "{kind} announced at {target} with no resolvable owner"
            )));
            return;
        };

        match kind {
            Interface::GattService => {
                self.registry.attach_service(target.clone(), owner, uuid, props);
            }
            Interface::GattCharacteristic => {
                self.registry
                    .attach_characteristic(target.clone(), owner, uuid, props);
            }
            Interface::GattDescriptor => {
                self.registry
                    .attach_descriptor(target.clone(), owner, uuid, props);
            }
            // add_child is only called for the three GATT kinds.
            Interface::Adapter | Interface::Device => unreachable!(),
        }
    }

    /// Handle "interfaces removed" at one path
    fn apply_removed(&self, target: &ObjectPath, interfaces: &[Interface]) -> Vec<SyncEvent> {
        let components = path::split_path(target);
        let mut pending = Vec::new();

        for &kind in interfaces {
            // Removal of a device/adapter capability at a path that does not
            // parse as one is a protocol-consistency violation; report it and
            // keep going rather than silently dropping it.
            let shape_ok = match kind {
                Interface::Device => components.is_device_path(),
                Interface::Adapter => components.is_adapter_path(),
                _ => true,
            };
            if !shape_ok {
                pending.push(violation(format!(
                    "removal of {kind} at unrecognizable path {target}"
                )));
            }

            match self.registry.remove(target, kind) {
                Removal::Removed(entity) => {
                    if let Some(address) = entity.address() {
                        pending.push(SyncEvent::DeviceVanished {
                            address: address.clone(),
                        });
                    }
                }
                Removal::UnknownPath => {
                    if shape_ok {
                        pending.push(violation(format!(
                            "removal of {kind} at unknown path {target}"
                        )));
                    }
                }
                Removal::KindMismatch { found } => {
                    pending.push(violation(format!(
                        "removal of {kind} at {target} which holds {found}"
                    )));
                }
            }
        }

        pending
    }

    /// Refresh an entity's property snapshot from a change notification
    fn apply_properties(
        &self,
        target: &ObjectPath,
        interface: Interface,
        changed: PropertyMap,
    ) -> Vec<SyncEvent> {
        match self.registry.lookup_by_path(target) {
            Some(entity) if entity.interface() == interface => {
                entity.merge_properties(changed);
            }
            Some(entity) => {
                return vec![violation(format!(
                    "property change for {interface} at {target} which holds {}",
                    entity.interface()
                ))];
            }
            None => {
                // Expected during discovery races; the snapshot arrives with
                // the eventual "interfaces added".
                debug!(path = %target, %interface, "property change for unknown path dropped");
            }
        }
        Vec::new()
    }
}

fn violation(description: String) -> SyncEvent {
    warn!(%description, "protocol consistency violation");
    SyncEvent::SyncError { description }
}
