//! Entity model for the synchronized object graph
//!
//! Entities are owned exclusively by the [`EntityRegistry`]; everything
//! handed to callers is a shared reference ([`EntityRef`]) whose usable
//! lifetime is bounded by entity destruction. Destruction is signalled by a
//! live/dead flag rather than by dropping the allocation, so a caller racing
//! a removal observes a clean failure instead of stale state.
//!
//! Ownership always points parent → child (UUID-keyed maps). The reverse
//! direction is a non-owning path back-reference, which keeps the graph
//! acyclic without weak pointers.
//!
//! [`EntityRegistry`]: crate::registry::EntityRegistry

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use bluesync_transport::{Interface, ObjectPath, PropertyMap};

// ============================================================================
// Identifiers
// ============================================================================

/// A device address in canonical colon-separated uppercase form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Parse an address in any accepted delimiter form (`:`, `-`, `_`)
    ///
    /// Returns `None` unless the input is six two-digit hex octets. The
    /// stored form is always uppercase and colon-separated.
    pub fn parse(raw: &str) -> Option<Self> {
        let octets: Vec<&str> = raw.split([':', '-', '_']).collect();
        if octets.len() != 6 {
            return None;
        }
        for octet in &octets {
            if octet.len() != 2 || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
        }
        Some(Self(octets.join(":").to_ascii_uppercase()))
    }

    /// The canonical address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A GATT UUID, normalized to lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uuid(String);

impl Uuid {
    /// Create a UUID from any string-like value, normalizing case
    pub fn new(uuid: impl AsRef<str>) -> Self {
        Self(uuid.as_ref().to_ascii_lowercase())
    }

    /// The normalized UUID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Shared reference to a registry-owned entity
pub type EntityRef = Arc<Entity>;

/// Variant-specific identity of an entity
///
/// GATT entities carry a non-owning back-reference to the path of their
/// structural owner (service → device, characteristic → service,
/// descriptor → characteristic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDetail {
    /// A radio adapter with its short-id (e.g. `hci0`)
    Adapter { id: String },
    /// A remote device; the address is the stable external identifier
    Device { address: Address },
    /// A GATT service owned by a device
    Service { uuid: Uuid, owner: ObjectPath },
    /// A GATT characteristic owned by a service
    Characteristic { uuid: Uuid, owner: ObjectPath },
    /// A GATT descriptor owned by a characteristic
    Descriptor { uuid: Uuid, owner: ObjectPath },
}

impl EntityDetail {
    /// The capability interface this entity was classified from
    pub fn interface(&self) -> Interface {
        match self {
            EntityDetail::Adapter { .. } => Interface::Adapter,
            EntityDetail::Device { .. } => Interface::Device,
            EntityDetail::Service { .. } => Interface::GattService,
            EntityDetail::Characteristic { .. } => Interface::GattCharacteristic,
            EntityDetail::Descriptor { .. } => Interface::GattDescriptor,
        }
    }

    /// Owner path back-reference, for the three GATT child kinds
    pub fn owner_path(&self) -> Option<&ObjectPath> {
        match self {
            EntityDetail::Service { owner, .. }
            | EntityDetail::Characteristic { owner, .. }
            | EntityDetail::Descriptor { owner, .. } => Some(owner),
            _ => None,
        }
    }

    /// GATT UUID, for the three GATT child kinds
    pub fn uuid(&self) -> Option<&Uuid> {
        match self {
            EntityDetail::Service { uuid, .. }
            | EntityDetail::Characteristic { uuid, .. }
            | EntityDetail::Descriptor { uuid, .. } => Some(uuid),
            _ => None,
        }
    }
}

/// One node of the synchronized object graph
///
/// Created on the first "interfaces added" notification naming its
/// capability, mutated in place as later notifications refresh properties or
/// attach children, and marked dead on removal.
pub struct Entity {
    path: ObjectPath,
    detail: EntityDetail,
    alive: AtomicBool,
    props: RwLock<PropertyMap>,
    children: RwLock<HashMap<Uuid, EntityRef>>,
}

impl Entity {
    /// Create a live entity with an initial property snapshot
    pub(crate) fn new(path: ObjectPath, detail: EntityDetail, props: PropertyMap) -> EntityRef {
        Arc::new(Self {
            path,
            detail,
            alive: AtomicBool::new(true),
            props: RwLock::new(props),
            children: RwLock::new(HashMap::new()),
        })
    }

    /// The immutable service-assigned path
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Variant-specific identity
    pub fn detail(&self) -> &EntityDetail {
        &self.detail
    }

    /// The capability interface this entity represents
    pub fn interface(&self) -> Interface {
        self.detail.interface()
    }

    /// Whether the entity still exists in the remote object model
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dead(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Clone of the live property snapshot
    pub fn properties(&self) -> PropertyMap {
        self.props.read().clone()
    }

    /// A single property from the live snapshot
    pub fn property(&self, key: &str) -> Option<serde_json::Value> {
        self.props.read().get(key).cloned()
    }

    /// Replace the property snapshot (full re-announcement)
    pub(crate) fn refresh_properties(&self, props: PropertyMap) {
        *self.props.write() = props;
    }

    /// Merge changed keys into the property snapshot
    pub(crate) fn merge_properties(&self, changed: PropertyMap) {
        let mut props = self.props.write();
        for (key, value) in changed {
            props.insert(key, value);
        }
    }

    /// Child entity by UUID, if attached and still live
    pub fn child(&self, uuid: &Uuid) -> Option<EntityRef> {
        let child = self.children.read().get(uuid).cloned()?;
        if child.is_alive() {
            Some(child)
        } else {
            None
        }
    }

    /// All live children, unordered
    pub fn children(&self) -> Vec<EntityRef> {
        self.children
            .read()
            .values()
            .filter(|c| c.is_alive())
            .cloned()
            .collect()
    }

    pub(crate) fn attach_child(&self, uuid: Uuid, child: EntityRef) {
        self.children.write().insert(uuid, child);
    }

    pub(crate) fn detach_child(&self, uuid: &Uuid) {
        self.children.write().remove(uuid);
    }

    // ------------------------------------------------------------------
    // Variant accessors
    // ------------------------------------------------------------------

    /// Device address, for device entities
    pub fn address(&self) -> Option<&Address> {
        match &self.detail {
            EntityDetail::Device { address } => Some(address),
            _ => None,
        }
    }

    /// GATT UUID, for service/characteristic/descriptor entities
    pub fn uuid(&self) -> Option<&Uuid> {
        self.detail.uuid()
    }

    /// Non-owning back-reference to the structural owner's path
    pub fn owner_path(&self) -> Option<&ObjectPath> {
        self.detail.owner_path()
    }

    /// Adapter short-id, for adapter entities
    pub fn adapter_id(&self) -> Option<&str> {
        match &self.detail {
            EntityDetail::Adapter { id } => Some(id),
            _ => None,
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("path", &self.path)
            .field("detail", &self.detail)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_delimiters() {
        let canonical = Address::parse("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(Address::parse("aa-bb-cc-dd-ee-ff"), Some(canonical.clone()));
        assert_eq!(Address::parse("AA_BB_CC_DD_EE_FF"), Some(canonical.clone()));
        assert_eq!(canonical.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_address_parse_rejects_malformed() {
        assert_eq!(Address::parse(""), None);
        assert_eq!(Address::parse("AA:BB:CC:DD:EE"), None);
        assert_eq!(Address::parse("AA:BB:CC:DD:EE:FF:00"), None);
        assert_eq!(Address::parse("GG:BB:CC:DD:EE:FF"), None);
        assert_eq!(Address::parse("AAA:BB:CC:DD:EE:F"), None);
    }

    #[test]
    fn test_uuid_normalizes_case() {
        let uuid = Uuid::new("0000180D-0000-1000-8000-00805F9B34FB");
        assert_eq!(uuid.as_str(), "0000180d-0000-1000-8000-00805f9b34fb");
        assert_eq!(uuid, Uuid::new("0000180d-0000-1000-8000-00805f9b34fb"));
    }

    #[test]
    fn test_entity_dead_children_hidden() {
        let device = Entity::new(
            ObjectPath::new("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF"),
            EntityDetail::Device {
                address: Address::parse("AA:BB:CC:DD:EE:FF").unwrap(),
            },
            PropertyMap::new(),
        );
        let uuid = Uuid::new("180d");
        let service = Entity::new(
            ObjectPath::new("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0019"),
            EntityDetail::Service {
                uuid: uuid.clone(),
                owner: device.path().clone(),
            },
            PropertyMap::new(),
        );

        device.attach_child(uuid.clone(), service.clone());
        assert!(device.child(&uuid).is_some());

        service.mark_dead();
        assert!(device.child(&uuid).is_none());
        assert!(device.children().is_empty());
    }

    #[test]
    fn test_merge_properties_keeps_unrelated_keys() {
        let entity = Entity::new(
            ObjectPath::new("/org/bluez/hci0"),
            EntityDetail::Adapter { id: "hci0".into() },
            PropertyMap::from([("Powered".to_string(), serde_json::json!(false))]),
        );

        entity.merge_properties(PropertyMap::from([(
            "Discovering".to_string(),
            serde_json::json!(true),
        )]));

        assert_eq!(entity.property("Powered"), Some(serde_json::json!(false)));
        assert_eq!(entity.property("Discovering"), Some(serde_json::json!(true)));
    }
}
