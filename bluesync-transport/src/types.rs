//! Core wire types for the object-management feed

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A hierarchical object path assigned by the remote service
///
/// Paths are opaque to callers but encode ancestry by segment prefix, e.g.
/// `/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0019/char001a`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Create an object path from any string-like value
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The raw path string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parent path, if this path has more than one segment
    ///
    /// Returns `None` for the root and for single-segment paths.
    pub fn parent(&self) -> Option<ObjectPath> {
        let idx = self.0.rfind('/')?;
        if idx == 0 {
            return None;
        }
        Some(ObjectPath(self.0[..idx].to_string()))
    }

    /// Iterate over the non-empty path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The closed set of capability interfaces a remote object may expose
///
/// Presence of an interface in a notification drives entity classification.
/// Interfaces the feed may carry that are not in this set (battery, media
/// control, ...) are filtered out by the transport implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interface {
    /// A radio adapter (`org.bluez.Adapter1`)
    Adapter,
    /// A remote device (`org.bluez.Device1`)
    Device,
    /// A GATT service on a device (`org.bluez.GattService1`)
    GattService,
    /// A GATT characteristic within a service (`org.bluez.GattCharacteristic1`)
    GattCharacteristic,
    /// A GATT descriptor within a characteristic (`org.bluez.GattDescriptor1`)
    GattDescriptor,
}

impl Interface {
    /// All capability interfaces, parents before children
    ///
    /// Processing interfaces of one notification in this order minimizes
    /// orphan creation when a single path announces several capabilities.
    pub const ALL: [Interface; 5] = [
        Interface::Adapter,
        Interface::Device,
        Interface::GattService,
        Interface::GattCharacteristic,
        Interface::GattDescriptor,
    ];

    /// The well-known interface name used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Interface::Adapter => "org.bluez.Adapter1",
            Interface::Device => "org.bluez.Device1",
            Interface::GattService => "org.bluez.GattService1",
            Interface::GattCharacteristic => "org.bluez.GattCharacteristic1",
            Interface::GattDescriptor => "org.bluez.GattDescriptor1",
        }
    }

    /// Classify a wire interface name, ignoring names outside the closed set
    pub fn from_name(name: &str) -> Option<Interface> {
        match name {
            "org.bluez.Adapter1" => Some(Interface::Adapter),
            "org.bluez.Device1" => Some(Interface::Device),
            "org.bluez.GattService1" => Some(Interface::GattService),
            "org.bluez.GattCharacteristic1" => Some(Interface::GattCharacteristic),
            "org.bluez.GattDescriptor1" => Some(Interface::GattDescriptor),
            _ => None,
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property bag attached to one capability interface at one path
pub type PropertyMap = HashMap<String, serde_json::Value>;

/// One entry of the one-shot startup enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    /// Path of the remote object
    pub path: ObjectPath,
    /// Capability interfaces the object exposes, with their property bags
    pub interfaces: Vec<(Interface, PropertyMap)>,
}

/// A structural notification delivered by the transport
///
/// The service does not guarantee ordering between parent and child
/// announcements; consumers must tolerate any interleaving.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEvent {
    /// One or more capability interfaces appeared at a path
    InterfacesAdded {
        path: ObjectPath,
        interfaces: Vec<(Interface, PropertyMap)>,
    },
    /// One or more capability interfaces vanished from a path
    InterfacesRemoved {
        path: ObjectPath,
        interfaces: Vec<Interface>,
    },
    /// A property snapshot refresh for one capability at one path
    PropertiesChanged {
        path: ObjectPath,
        interface: Interface,
        changed: PropertyMap,
    },
}

impl ObjectEvent {
    /// The path this event concerns
    pub fn path(&self) -> &ObjectPath {
        match self {
            ObjectEvent::InterfacesAdded { path, .. }
            | ObjectEvent::InterfacesRemoved { path, .. }
            | ObjectEvent::PropertiesChanged { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_parent() {
        let path = ObjectPath::new("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF");
        assert_eq!(
            path.parent(),
            Some(ObjectPath::new("/org/bluez/hci0"))
        );
        assert_eq!(ObjectPath::new("/org").parent(), None);
    }

    #[test]
    fn test_object_path_segments() {
        let path = ObjectPath::new("/org/bluez/hci0");
        let segments: Vec<_> = path.segments().collect();
        assert_eq!(segments, vec!["org", "bluez", "hci0"]);
    }

    #[test]
    fn test_interface_name_round_trip() {
        for iface in Interface::ALL {
            assert_eq!(Interface::from_name(iface.name()), Some(iface));
        }
    }

    #[test]
    fn test_interface_from_unknown_name() {
        assert_eq!(Interface::from_name("org.bluez.MediaControl1"), None);
        assert_eq!(Interface::from_name(""), None);
    }

    #[test]
    fn test_interface_order_is_parent_first() {
        assert_eq!(Interface::ALL[0], Interface::Adapter);
        assert_eq!(Interface::ALL[4], Interface::GattDescriptor);
    }
}
