//! GATT service, characteristic, and descriptor handles
//!
//! These handles are built on traversal from a [`Device`](crate::Device)
//! and are not cached: the identity contract (same-instance caching) applies
//! to resolved adapter and device handles only. Operations are pass-through
//! calls; value reads decode the transport's reply into raw bytes.

use std::sync::Arc;

use bluesync_core::{EntityRef, Uuid};
use bluesync_transport::{Interface, ObjectPath, ObjectTransport};

use crate::error::SdkError;

/// Handle for a GATT service
#[derive(Clone)]
pub struct Service {
    entity: EntityRef,
    transport: Arc<dyn ObjectTransport>,
}

impl Service {
    pub(crate) fn new(entity: EntityRef, transport: Arc<dyn ObjectTransport>) -> Self {
        Self { entity, transport }
    }

    /// Service UUID
    pub fn uuid(&self) -> Option<Uuid> {
        self.entity.uuid().cloned()
    }

    /// Path of the underlying remote object
    pub fn path(&self) -> &ObjectPath {
        self.entity.path()
    }

    /// Whether the service still exists in the remote model
    pub fn is_alive(&self) -> bool {
        self.entity.is_alive()
    }

    /// Characteristic with the given UUID, if discovered
    pub fn characteristic(&self, uuid: &str) -> Option<Characteristic> {
        let entity = self.entity.child(&Uuid::new(uuid))?;
        Some(Characteristic {
            entity,
            transport: Arc::clone(&self.transport),
        })
    }

    /// All characteristics discovered so far, unordered
    pub fn characteristics(&self) -> Vec<Characteristic> {
        self.entity
            .children()
            .into_iter()
            .map(|entity| Characteristic {
                entity,
                transport: Arc::clone(&self.transport),
            })
            .collect()
    }
}

/// Handle for a GATT characteristic
#[derive(Clone)]
pub struct Characteristic {
    entity: EntityRef,
    transport: Arc<dyn ObjectTransport>,
}

impl Characteristic {
    /// Characteristic UUID
    pub fn uuid(&self) -> Option<Uuid> {
        self.entity.uuid().cloned()
    }

    /// Path of the underlying remote object
    pub fn path(&self) -> &ObjectPath {
        self.entity.path()
    }

    /// Whether the characteristic still exists in the remote model
    pub fn is_alive(&self) -> bool {
        self.entity.is_alive()
    }

    /// Read the characteristic's value
    pub fn read_value(&self) -> Result<Vec<u8>, SdkError> {
        ensure_alive(&self.entity)?;
        let reply = self.transport.call(
            self.path(),
            Interface::GattCharacteristic,
            "ReadValue",
            vec![],
        )?;
        bytes_from_reply(&reply)
    }

    /// Write a value to the characteristic
    pub fn write_value(&self, value: &[u8]) -> Result<(), SdkError> {
        ensure_alive(&self.entity)?;
        self.transport.call(
            self.path(),
            Interface::GattCharacteristic,
            "WriteValue",
            vec![serde_json::json!(value)],
        )?;
        Ok(())
    }

    /// Enable value-change notifications
    pub fn start_notify(&self) -> Result<(), SdkError> {
        ensure_alive(&self.entity)?;
        self.transport.call(
            self.path(),
            Interface::GattCharacteristic,
            "StartNotify",
            vec![],
        )?;
        Ok(())
    }

    /// Disable value-change notifications
    pub fn stop_notify(&self) -> Result<(), SdkError> {
        ensure_alive(&self.entity)?;
        self.transport.call(
            self.path(),
            Interface::GattCharacteristic,
            "StopNotify",
            vec![],
        )?;
        Ok(())
    }

    /// Descriptor with the given UUID, if discovered
    pub fn descriptor(&self, uuid: &str) -> Option<Descriptor> {
        let entity = self.entity.child(&Uuid::new(uuid))?;
        Some(Descriptor {
            entity,
            transport: Arc::clone(&self.transport),
        })
    }

    /// All descriptors discovered so far, unordered
    pub fn descriptors(&self) -> Vec<Descriptor> {
        self.entity
            .children()
            .into_iter()
            .map(|entity| Descriptor {
                entity,
                transport: Arc::clone(&self.transport),
            })
            .collect()
    }
}

/// Handle for a GATT descriptor
#[derive(Clone)]
pub struct Descriptor {
    entity: EntityRef,
    transport: Arc<dyn ObjectTransport>,
}

impl Descriptor {
    /// Descriptor UUID
    pub fn uuid(&self) -> Option<Uuid> {
        self.entity.uuid().cloned()
    }

    /// Path of the underlying remote object
    pub fn path(&self) -> &ObjectPath {
        self.entity.path()
    }

    /// Whether the descriptor still exists in the remote model
    pub fn is_alive(&self) -> bool {
        self.entity.is_alive()
    }

    /// Read the descriptor's value
    pub fn read_value(&self) -> Result<Vec<u8>, SdkError> {
        ensure_alive(&self.entity)?;
        let reply = self.transport.call(
            self.path(),
            Interface::GattDescriptor,
            "ReadValue",
            vec![],
        )?;
        bytes_from_reply(&reply)
    }

    /// Write a value to the descriptor
    pub fn write_value(&self, value: &[u8]) -> Result<(), SdkError> {
        ensure_alive(&self.entity)?;
        self.transport.call(
            self.path(),
            Interface::GattDescriptor,
            "WriteValue",
            vec![serde_json::json!(value)],
        )?;
        Ok(())
    }
}

fn ensure_alive(entity: &EntityRef) -> Result<(), SdkError> {
    if entity.is_alive() {
        Ok(())
    } else {
        Err(SdkError::ObjectRemoved(entity.path().clone()))
    }
}

/// Decode a value reply into raw bytes
fn bytes_from_reply(reply: &serde_json::Value) -> Result<Vec<u8>, SdkError> {
    let array = reply
        .as_array()
        .ok_or_else(|| SdkError::MalformedReply(format!("expected byte array, got {reply}")))?;
    array
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| SdkError::MalformedReply(format!("non-byte element {v}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_from_reply() {
        assert_eq!(
            bytes_from_reply(&serde_json::json!([1, 2, 255])).unwrap(),
            vec![1, 2, 255]
        );
        assert!(bytes_from_reply(&serde_json::json!("nope")).is_err());
        assert!(bytes_from_reply(&serde_json::json!([256])).is_err());
        assert!(bytes_from_reply(&serde_json::json!([-1])).is_err());
    }
}
