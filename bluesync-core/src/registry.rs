//! The entity registry: the live, path- and address-indexed object graph
//!
//! The registry is the single shared mutable resource of the synchronizer.
//! All mutation goes through one mutex (the reconciler and the handle
//! resolver's create-path both count as writers), and no entity ever escapes
//! registry ownership — callers only hold [`EntityRef`]s.
//!
//! The service does not order parent and child announcements, so a child may
//! arrive before its structural owner exists. Such children are held in an
//! orphan area keyed by the owner path they are waiting for and spliced into
//! the owner's child map, in arrival order, once the owner is created. An
//! entity is never lost: once created it stays reachable either directly by
//! path or through its owner's child map.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use bluesync_transport::{Interface, ObjectPath, PropertyMap};

use crate::model::{Address, Entity, EntityDetail, EntityRef, Uuid};
use crate::path;

/// Outcome of a device upsert
#[derive(Debug, Clone)]
pub enum DeviceUpsert {
    /// A device entity was created at this path (first announcement, or
    /// re-discovery superseding an older path)
    Created(EntityRef),
    /// The path was already known; only the property snapshot was refreshed
    Refreshed(EntityRef),
}

impl DeviceUpsert {
    /// The upserted entity, regardless of outcome
    pub fn entity(&self) -> &EntityRef {
        match self {
            DeviceUpsert::Created(e) | DeviceUpsert::Refreshed(e) => e,
        }
    }
}

/// Outcome of a removal request
#[derive(Debug, Clone)]
pub enum Removal {
    /// The entity was found, marked dead, and dropped from every index
    Removed(EntityRef),
    /// No entity is registered at the path
    UnknownPath,
    /// The path is registered, but under a different capability
    KindMismatch {
        /// Capability the registered entity actually has
        found: Interface,
    },
}

#[derive(Default)]
struct Inner {
    by_path: HashMap<ObjectPath, EntityRef>,
    by_address: HashMap<Address, ObjectPath>,
    /// Children waiting for a parent, keyed by the awaited parent path
    orphans: HashMap<ObjectPath, Vec<EntityRef>>,
}

/// Owned, explicitly-lifetimed store of the live object graph
///
/// Constructed once per synchronizer instance; torn down with [`clear`] on
/// shutdown.
///
/// [`clear`]: EntityRegistry::clear
#[derive(Default)]
pub struct EntityRegistry {
    inner: Mutex<Inner>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Upserts
    // ========================================================================

    /// Create-or-refresh an adapter by short-id; idempotent
    pub fn upsert_adapter(&self, id: &str, props: PropertyMap) -> EntityRef {
        let path = path::adapter_path(id);
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.by_path.get(&path) {
            existing.refresh_properties(props);
            return existing.clone();
        }

        let entity = Entity::new(
            path.clone(),
            EntityDetail::Adapter { id: id.to_string() },
            props,
        );
        debug!(adapter = id, %path, "adapter registered");
        inner.by_path.insert(path, entity.clone());
        adopt_orphans(&mut inner, &entity);
        entity
    }

    /// Create-or-refresh a device by path, updating the address index
    ///
    /// If the address is already mapped to a different path the new path
    /// wins (this models device re-discovery): the superseded entity is
    /// marked dead and dropped, and the old path is no longer resolvable.
    pub fn upsert_device(
        &self,
        device_path: ObjectPath,
        address: Address,
        props: PropertyMap,
    ) -> DeviceUpsert {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.by_path.get(&device_path).cloned() {
            if existing.address() == Some(&address) {
                existing.refresh_properties(props);
                // The address index is refreshed whenever the path mapping is
                // touched, even on a pure property refresh.
                inner.by_address.insert(address, device_path);
                return DeviceUpsert::Refreshed(existing);
            }
            // Same path re-announced under a new address: treat as recreate.
            existing.mark_dead();
            inner.by_path.remove(&device_path);
            if let Some(old_address) = existing.address() {
                if inner.by_address.get(old_address) == Some(&device_path) {
                    let old_address = old_address.clone();
                    inner.by_address.remove(&old_address);
                }
            }
        }

        // Last writer wins on the address index; drop the superseded path.
        if let Some(old_path) = inner.by_address.get(&address).cloned() {
            if old_path != device_path {
                if let Some(old_entity) = inner.by_path.remove(&old_path) {
                    old_entity.mark_dead();
                    debug!(%address, %old_path, "device re-discovered at a new path");
                }
            }
        }

        let entity = Entity::new(
            device_path.clone(),
            EntityDetail::Device {
                address: address.clone(),
            },
            props,
        );
        debug!(%address, path = %device_path, "device registered");
        inner.by_path.insert(device_path.clone(), entity.clone());
        inner.by_address.insert(address, device_path);
        adopt_orphans(&mut inner, &entity);
        DeviceUpsert::Created(entity)
    }

    // ========================================================================
    // Child attachment
    // ========================================================================

    /// Attach a GATT service under its owning device
    pub fn attach_service(
        &self,
        service_path: ObjectPath,
        owner: ObjectPath,
        uuid: Uuid,
        props: PropertyMap,
    ) -> EntityRef {
        self.attach(service_path, owner, uuid, props, |uuid, owner| {
            EntityDetail::Service { uuid, owner }
        })
    }

    /// Attach a GATT characteristic under its owning service
    pub fn attach_characteristic(
        &self,
        char_path: ObjectPath,
        owner: ObjectPath,
        uuid: Uuid,
        props: PropertyMap,
    ) -> EntityRef {
        self.attach(char_path, owner, uuid, props, |uuid, owner| {
            EntityDetail::Characteristic { uuid, owner }
        })
    }

    /// Attach a GATT descriptor under its owning characteristic
    pub fn attach_descriptor(
        &self,
        desc_path: ObjectPath,
        owner: ObjectPath,
        uuid: Uuid,
        props: PropertyMap,
    ) -> EntityRef {
        self.attach(desc_path, owner, uuid, props, |uuid, owner| {
            EntityDetail::Descriptor { uuid, owner }
        })
    }

    /// Shared attach path for the three GATT child kinds
    ///
    /// When the owner is not yet present the child goes into the orphan
    /// holding area; it is spliced in retroactively once the owner appears.
    fn attach(
        &self,
        child_path: ObjectPath,
        owner: ObjectPath,
        uuid: Uuid,
        props: PropertyMap,
        make_detail: impl FnOnce(Uuid, ObjectPath) -> EntityDetail,
    ) -> EntityRef {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.by_path.get(&child_path) {
            // Replay of the same announcement: property refresh only, no
            // duplicate children.
            existing.refresh_properties(props);
            return existing.clone();
        }

        let detail = make_detail(uuid.clone(), owner.clone());
        let entity = Entity::new(child_path.clone(), detail, props);
        inner.by_path.insert(child_path.clone(), entity.clone());

        // Grandchildren may have arrived first and be waiting on us.
        adopt_orphans(&mut inner, &entity);

        match inner.by_path.get(&owner) {
            Some(parent) => {
                parent.attach_child(uuid, entity.clone());
                debug!(path = %child_path, %owner, "child attached");
            }
            None => {
                debug!(path = %child_path, %owner, "owner not present yet, holding orphan");
                inner.orphans.entry(owner).or_default().push(entity.clone());
            }
        }

        entity
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Mark the entity at `path` dead and drop it from every index
    ///
    /// Children are left as-is: they stay registered, orphaned against a
    /// vanished parent, until their own removal notifications arrive.
    pub fn remove(&self, target: &ObjectPath, interface: Interface) -> Removal {
        let mut inner = self.inner.lock();

        let Some(entity) = inner.by_path.get(target).cloned() else {
            return Removal::UnknownPath;
        };
        if entity.interface() != interface {
            return Removal::KindMismatch {
                found: entity.interface(),
            };
        }

        entity.mark_dead();
        inner.by_path.remove(target);

        if let Some(address) = entity.address() {
            if inner.by_address.get(address) == Some(target) {
                let address = address.clone();
                inner.by_address.remove(&address);
            }
        }

        // Detach from the owner's child map so traversal stops finding us.
        if let (Some(owner), Some(uuid)) = (entity.owner_path(), entity.uuid()) {
            if let Some(parent) = inner.by_path.get(owner) {
                parent.detach_child(uuid);
            }
        }

        // If we were still waiting for a parent, stop waiting.
        inner.orphans.retain(|_, waiting| {
            waiting.retain(|child| !Arc::ptr_eq(child, &entity));
            !waiting.is_empty()
        });

        debug!(path = %target, interface = %interface, "entity removed");
        Removal::Removed(entity)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Entity at a path, if one is live there
    pub fn lookup_by_path(&self, target: &ObjectPath) -> Option<EntityRef> {
        self.inner.lock().by_path.get(target).cloned()
    }

    /// Device entity for a canonical address, if one is live
    pub fn lookup_by_address(&self, address: &Address) -> Option<EntityRef> {
        let inner = self.inner.lock();
        let target = inner.by_address.get(address)?;
        inner.by_path.get(target).cloned()
    }

    /// Adapter entity for a short-id, if one is live
    pub fn adapter_by_id(&self, id: &str) -> Option<EntityRef> {
        self.lookup_by_path(&path::adapter_path(id))
    }

    /// All live adapter entities
    pub fn adapters(&self) -> Vec<EntityRef> {
        self.filtered(Interface::Adapter)
    }

    /// All live device entities
    pub fn devices(&self) -> Vec<EntityRef> {
        self.filtered(Interface::Device)
    }

    fn filtered(&self, interface: Interface) -> Vec<EntityRef> {
        self.inner
            .lock()
            .by_path
            .values()
            .filter(|e| e.interface() == interface)
            .cloned()
            .collect()
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.inner.lock().by_path.len()
    }

    /// Number of children still waiting for a parent
    pub fn orphan_count(&self) -> usize {
        self.inner.lock().orphans.values().map(Vec::len).sum()
    }

    /// Tear down the graph: mark every entity dead and drop all indices
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        for entity in inner.by_path.values() {
            entity.mark_dead();
        }
        for waiting in inner.orphans.values() {
            for entity in waiting {
                entity.mark_dead();
            }
        }
        inner.by_path.clear();
        inner.by_address.clear();
        inner.orphans.clear();
    }
}

/// Splice children that were waiting on `parent`, in arrival order
fn adopt_orphans(inner: &mut Inner, parent: &EntityRef) {
    let Some(waiting) = inner.orphans.remove(parent.path()) else {
        return;
    };
    for child in waiting {
        if !child.is_alive() {
            continue;
        }
        if let Some(uuid) = child.uuid() {
            debug!(path = %child.path(), parent = %parent.path(), "orphan spliced in");
            parent.attach_child(uuid.clone(), child);
        }
    }
}
