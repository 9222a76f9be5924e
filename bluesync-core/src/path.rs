//! Pure parsing of hierarchical object paths
//!
//! Paths assigned by the remote service encode ancestry by prefix:
//!
//! ```text
//! /org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0019/char001a/desc001c
//!  └ root ──┘ └id┘ └── device ────────┘ └ service ┘ └ char ─┘
//! ```
//!
//! Parsing is a pure, total function: a path that does not match the
//! expected hierarchical shape yields a components tuple with trailing
//! identifiers empty, never an error. Device segments embed the address with
//! `_` standing in for the address's canonical `:` delimiter; the
//! segment/address codec here round-trips that substitution losslessly.

use bluesync_transport::ObjectPath;

use crate::model::Address;

/// Root prefix all service-assigned paths share
const ROOT_SEGMENTS: [&str; 2] = ["org", "bluez"];

/// Prefix marking a device path segment
const DEVICE_SEGMENT_PREFIX: &str = "dev_";

/// The up-to-four ordered segment identifiers of a hierarchical path
///
/// A descriptor is identified by the path itself; it contributes no fifth
/// component. Absent trailing identifiers are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathComponents {
    adapter: String,
    device: String,
    service: String,
    characteristic: String,
}

impl PathComponents {
    /// Adapter short-id segment (e.g. `hci0`), if present
    pub fn adapter(&self) -> Option<&str> {
        non_empty(&self.adapter)
    }

    /// Device segment (e.g. `dev_AA_BB_CC_DD_EE_FF`), if present
    pub fn device(&self) -> Option<&str> {
        non_empty(&self.device)
    }

    /// Service segment (e.g. `service0019`), if present
    pub fn service(&self) -> Option<&str> {
        non_empty(&self.service)
    }

    /// Characteristic segment (e.g. `char001a`), if present
    pub fn characteristic(&self) -> Option<&str> {
        non_empty(&self.characteristic)
    }

    /// Whether the path names an adapter and nothing deeper
    pub fn is_adapter_path(&self) -> bool {
        self.adapter().is_some() && self.device().is_none()
    }

    /// Whether the path names a device and nothing deeper
    pub fn is_device_path(&self) -> bool {
        self.device().is_some() && self.service().is_none()
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Split a hierarchical path into its ordered segment identifiers
///
/// Total: any shape mismatch (wrong root, missing segments) simply leaves
/// the remaining identifiers empty.
pub fn split_path(path: &ObjectPath) -> PathComponents {
    let mut components = PathComponents::default();
    let mut segments = path.segments();

    for expected in ROOT_SEGMENTS {
        if segments.next() != Some(expected) {
            return components;
        }
    }

    if let Some(adapter) = segments.next() {
        components.adapter = adapter.to_string();
    }
    if let Some(device) = segments.next() {
        if !device.starts_with(DEVICE_SEGMENT_PREFIX) {
            return components;
        }
        components.device = device.to_string();
    }
    if let Some(service) = segments.next() {
        components.service = service.to_string();
    }
    if let Some(characteristic) = segments.next() {
        components.characteristic = characteristic.to_string();
    }

    components
}

/// Recover a canonical address from a device path segment
///
/// `dev_AA_BB_CC_DD_EE_FF` → `AA:BB:CC:DD:EE:FF`. Returns `None` when the
/// segment is not a well-formed device segment.
pub fn address_from_segment(segment: &str) -> Option<Address> {
    let raw = segment.strip_prefix(DEVICE_SEGMENT_PREFIX)?;
    Address::parse(raw)
}

/// Encode a canonical address as a device path segment
///
/// `AA:BB:CC:DD:EE:FF` → `dev_AA_BB_CC_DD_EE_FF`. The inverse of
/// [`address_from_segment`] for every valid address.
pub fn segment_from_address(address: &Address) -> String {
    format!(
        "{}{}",
        DEVICE_SEGMENT_PREFIX,
        address.as_str().replace(':', "_")
    )
}

/// The path the service assigns to an adapter with the given short-id
pub fn adapter_path(id: &str) -> ObjectPath {
    ObjectPath::new(format!("/{}/{}/{}", ROOT_SEGMENTS[0], ROOT_SEGMENTS[1], id))
}
