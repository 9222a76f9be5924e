//! Adapter handle
//!
//! A thin capability object bound to one adapter path. Operations are
//! pass-through calls to the transport; the handle itself holds no state
//! machine. Once the underlying entity is removed every operation fails with
//! [`SdkError::ObjectRemoved`] instead of acting on stale state.

use std::fmt;
use std::sync::Arc;

use bluesync_core::EntityRef;
use bluesync_transport::{Interface, ObjectPath, ObjectTransport, PropertyMap};

use crate::error::SdkError;

struct AdapterInner {
    id: String,
    entity: EntityRef,
    transport: Arc<dyn ObjectTransport>,
}

/// Handle for a radio adapter
///
/// Cheap to clone; clones of one resolved handle share identity
/// (see [`same_handle`](Adapter::same_handle)).
#[derive(Clone)]
pub struct Adapter {
    inner: Arc<AdapterInner>,
}

impl Adapter {
    pub(crate) fn new(id: String, entity: EntityRef, transport: Arc<dyn ObjectTransport>) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                id,
                entity,
                transport,
            }),
        }
    }

    pub(crate) fn entity(&self) -> &EntityRef {
        &self.inner.entity
    }

    /// Adapter short-id (e.g. `hci0`)
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Path of the underlying remote object
    pub fn path(&self) -> &ObjectPath {
        self.inner.entity.path()
    }

    /// Whether the adapter still exists in the remote model
    pub fn is_alive(&self) -> bool {
        self.inner.entity.is_alive()
    }

    /// Whether two handles refer to the same resolved instance
    pub fn same_handle(a: &Adapter, b: &Adapter) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Clone of the adapter's live property snapshot
    pub fn properties(&self) -> PropertyMap {
        self.inner.entity.properties()
    }

    /// Whether the radio is powered, per the latest snapshot
    pub fn is_powered(&self) -> bool {
        self.inner
            .entity
            .property("Powered")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Start device discovery on this adapter
    pub fn start_discovery(&self) -> Result<(), SdkError> {
        self.call("StartDiscovery", vec![])
    }

    /// Stop device discovery on this adapter
    pub fn stop_discovery(&self) -> Result<(), SdkError> {
        self.call("StopDiscovery", vec![])
    }

    /// Power the radio on or off
    pub fn set_powered(&self, powered: bool) -> Result<(), SdkError> {
        self.call("SetPowered", vec![serde_json::json!(powered)])
    }

    fn call(&self, member: &str, args: Vec<serde_json::Value>) -> Result<(), SdkError> {
        self.ensure_alive()?;
        self.inner
            .transport
            .call(self.path(), Interface::Adapter, member, args)?;
        Ok(())
    }

    fn ensure_alive(&self) -> Result<(), SdkError> {
        if self.inner.entity.is_alive() {
            Ok(())
        } else {
            Err(SdkError::ObjectRemoved(self.path().clone()))
        }
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("id", &self.inner.id)
            .field("path", self.path())
            .field("alive", &self.is_alive())
            .finish()
    }
}
