//! Device handle with GATT traversal
//!
//! Traversal lookups (service by UUID, and from there characteristic and
//! descriptor) return `None` rather than an error when absent: GATT
//! discovery may legitimately still be in progress. Callers that need to
//! wait for `services_resolved` own their own bounded-retry policy; the
//! handle only exposes the snapshot flag.

use std::fmt;
use std::sync::Arc;

use bluesync_core::{Address, EntityRef, Uuid};
use bluesync_transport::{Interface, ObjectPath, ObjectTransport, PropertyMap};

use crate::error::SdkError;
use crate::gatt::Service;

struct DeviceInner {
    address: Address,
    entity: EntityRef,
    transport: Arc<dyn ObjectTransport>,
}

/// Handle for a remote device
///
/// Cheap to clone; clones of one resolved handle share identity
/// (see [`same_handle`](Device::same_handle)).
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    pub(crate) fn new(
        address: Address,
        entity: EntityRef,
        transport: Arc<dyn ObjectTransport>,
    ) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                address,
                entity,
                transport,
            }),
        }
    }

    pub(crate) fn entity(&self) -> &EntityRef {
        &self.inner.entity
    }

    /// Canonical device address
    pub fn address(&self) -> &Address {
        &self.inner.address
    }

    /// Path of the underlying remote object
    pub fn path(&self) -> &ObjectPath {
        self.inner.entity.path()
    }

    /// Whether the device still exists in the remote model
    pub fn is_alive(&self) -> bool {
        self.inner.entity.is_alive()
    }

    /// Whether two handles refer to the same resolved instance
    pub fn same_handle(a: &Device, b: &Device) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    // ========================================================================
    // Snapshot reads
    // ========================================================================

    /// Clone of the device's live property snapshot
    pub fn properties(&self) -> PropertyMap {
        self.inner.entity.properties()
    }

    /// Friendly name, per the latest snapshot
    pub fn alias(&self) -> Option<String> {
        self.inner
            .entity
            .property("Alias")
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Whether the device is connected, per the latest snapshot
    pub fn is_connected(&self) -> bool {
        self.inner
            .entity
            .property("Connected")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Whether GATT discovery has completed, per the latest snapshot
    pub fn services_resolved(&self) -> bool {
        self.inner
            .entity
            .property("ServicesResolved")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    // ========================================================================
    // Pass-through operations
    // ========================================================================

    /// Connect to the device
    pub fn connect(&self) -> Result<(), SdkError> {
        self.call("Connect")
    }

    /// Disconnect from the device
    pub fn disconnect(&self) -> Result<(), SdkError> {
        self.call("Disconnect")
    }

    /// Initiate pairing with the device
    pub fn pair(&self) -> Result<(), SdkError> {
        self.call("Pair")
    }

    /// Subscribe to property changes for this device
    ///
    /// Changes flow back through the notification feed and refresh the
    /// snapshot behind this handle.
    pub fn watch_properties(&self) -> Result<(), SdkError> {
        self.ensure_alive()?;
        self.inner
            .transport
            .watch_properties(self.path(), Interface::Device)?;
        Ok(())
    }

    fn call(&self, member: &str) -> Result<(), SdkError> {
        self.ensure_alive()?;
        self.inner
            .transport
            .call(self.path(), Interface::Device, member, vec![])?;
        Ok(())
    }

    fn ensure_alive(&self) -> Result<(), SdkError> {
        if self.inner.entity.is_alive() {
            Ok(())
        } else {
            Err(SdkError::ObjectRemoved(self.path().clone()))
        }
    }

    // ========================================================================
    // GATT traversal
    // ========================================================================

    /// Service with the given UUID, if discovered
    pub fn service(&self, uuid: &str) -> Option<Service> {
        let entity = self.inner.entity.child(&Uuid::new(uuid))?;
        Some(Service::new(entity, Arc::clone(&self.inner.transport)))
    }

    /// All services discovered so far, unordered
    pub fn services(&self) -> Vec<Service> {
        self.inner
            .entity
            .children()
            .into_iter()
            .map(|entity| Service::new(entity, Arc::clone(&self.inner.transport)))
            .collect()
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("address", &self.inner.address)
            .field("path", self.path())
            .field("alive", &self.is_alive())
            .finish()
    }
}
