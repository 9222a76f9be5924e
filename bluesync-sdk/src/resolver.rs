//! Single-flight handle resolution
//!
//! `getAdapter`/`getDevice` answers are point-in-time: an identifier with no
//! live entity fails with [`SdkError::NotFound`] immediately — callers that
//! want "wait until available" semantics subscribe to device-observed events
//! themselves.
//!
//! Resolution is race-free and idempotent. Each path has at most one slot; a
//! slot's binding runs at most once, concurrent callers block on it and share
//! its outcome (the same handle instance, or the same failure). The resolver
//! holds its slot lock only to check-and-reserve: the blocking bind call runs
//! with no lock held, so other identifiers stay resolvable meanwhile.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::debug;

use bluesync_core::{Address, EntityRef, EntityRegistry};
use bluesync_transport::{Interface, ObjectPath, ObjectTransport};

use crate::adapter::Adapter;
use crate::device::Device;
use crate::error::SdkError;

/// One reservation per path; completed slots double as the handle cache
type Slot<T> = Arc<OnceLock<Result<T, SdkError>>>;

/// Resolves identifiers to canonical, cached entity handles
pub struct HandleResolver {
    registry: Arc<EntityRegistry>,
    transport: Arc<dyn ObjectTransport>,
    adapter_slots: Mutex<HashMap<ObjectPath, Slot<Adapter>>>,
    device_slots: Mutex<HashMap<ObjectPath, Slot<Device>>>,
}

impl HandleResolver {
    pub(crate) fn new(registry: Arc<EntityRegistry>, transport: Arc<dyn ObjectTransport>) -> Self {
        Self {
            registry,
            transport,
            adapter_slots: Mutex::new(HashMap::new()),
            device_slots: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve an adapter handle by short-id (e.g. `hci0`)
    pub fn get_adapter(&self, id: &str) -> Result<Adapter, SdkError> {
        let id = id.trim();
        let entity = self
            .registry
            .adapter_by_id(id)
            .ok_or_else(|| SdkError::NotFound(id.to_string()))?;

        let path = entity.path().clone();
        let transport = Arc::clone(&self.transport);
        let bind_entity = entity.clone();
        let bind_path = path.clone();
        let id = id.to_string();

        resolve_slot(&self.adapter_slots, &path, &entity, Adapter::entity, move || {
            debug!(adapter = %id, path = %bind_path, "binding adapter handle");
            transport.bind(&bind_path, Interface::Adapter)?;
            Ok(Adapter::new(id, bind_entity, transport))
        })
    }

    /// Resolve a device handle by address, in any accepted delimiter form
    pub fn get_device(&self, identifier: &str) -> Result<Device, SdkError> {
        let address = Address::parse(identifier.trim())
            .ok_or_else(|| SdkError::NotFound(identifier.to_string()))?;
        let entity = self
            .registry
            .lookup_by_address(&address)
            .ok_or_else(|| SdkError::NotFound(address.to_string()))?;

        let path = entity.path().clone();
        let transport = Arc::clone(&self.transport);
        let bind_entity = entity.clone();
        let bind_path = path.clone();

        resolve_slot(&self.device_slots, &path, &entity, Device::entity, move || {
            debug!(%address, path = %bind_path, "binding device handle");
            transport.bind(&bind_path, Interface::Device)?;
            Ok(Device::new(address, bind_entity, transport))
        })
    }
}

/// Check-and-reserve, bind outside the lock, then install or clear
///
/// `entity_of` exposes a handle's underlying entity so a completed slot left
/// over from a superseded entity at the same path (removal followed by
/// re-announcement) is replaced instead of served stale.
fn resolve_slot<T, F>(
    slots: &Mutex<HashMap<ObjectPath, Slot<T>>>,
    path: &ObjectPath,
    entity: &EntityRef,
    entity_of: impl Fn(&T) -> &EntityRef,
    bind: F,
) -> Result<T, SdkError>
where
    T: Clone,
    F: FnOnce() -> Result<T, SdkError>,
{
    let slot = {
        let mut slots = slots.lock();
        let stale = |existing: &Slot<T>| {
            matches!(
                existing.get(),
                Some(Ok(handle)) if !Arc::ptr_eq(entity_of(handle), entity)
            )
        };
        match slots.get(path) {
            Some(existing) if !stale(existing) => Arc::clone(existing),
            _ => {
                let fresh: Slot<T> = Arc::new(OnceLock::new());
                slots.insert(path.clone(), Arc::clone(&fresh));
                fresh
            }
        }
    };

    // Exactly one caller runs the bind; the rest block here and share it.
    let result = slot.get_or_init(bind).clone();

    if result.is_err() {
        // Clear the reservation so a later call may retry, but only if no
        // newer slot has replaced ours meanwhile.
        let mut slots = slots.lock();
        if let Some(existing) = slots.get(path) {
            if Arc::ptr_eq(existing, &slot) {
                slots.remove(path);
            }
        }
    }

    result
}
