//! # bluesync-sdk
//!
//! High-level handles over a locally mirrored Bluetooth object graph.
//!
//! The SDK sits on top of [`bluesync_core`]'s synchronizer and exposes the
//! mirrored hierarchy as typed handles:
//!
//! ```text
//! BlueSession
//!    ├── Adapter            (hci0, hci1, ...)
//!    └── Device             (by address)
//!          └── Service      (by UUID)
//!                └── Characteristic
//!                      └── Descriptor
//! ```
//!
//! Adapter and device handles are canonical: resolving the same live object
//! twice yields the same instance, and a single in-flight bind is shared by
//! concurrent resolvers. GATT handles are lightweight views obtained by
//! traversal and make no instance-identity promise.
//!
//! All handles observe removal. A handle to a removed object stays usable
//! for inspection (`is_alive` reports false) but refuses remote operations
//! with [`SdkError::ObjectRemoved`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bluesync_sdk::BlueSession;
//!
//! let session = BlueSession::new(transport)?;
//!
//! let device = session.device("AA:BB:CC:DD:EE:FF")?;
//! if !device.is_connected() {
//!     device.connect()?;
//! }
//!
//! if let Some(service) = device.service("0000180d-0000-1000-8000-00805f9b34fb") {
//!     for characteristic in service.characteristics() {
//!         println!("char {:?}", characteristic.uuid());
//!     }
//! }
//! ```

mod adapter;
mod device;
mod error;
mod gatt;
mod resolver;
mod session;

pub use adapter::Adapter;
pub use device::Device;
pub use error::SdkError;
pub use gatt::{Characteristic, Descriptor, Service};
pub use resolver::HandleResolver;
pub use session::BlueSession;

// Re-exported so downstream code can match on session events and name
// addresses without depending on the core crate directly.
pub use bluesync_core::{Address, SyncEvent, SynchronizerConfig, Uuid};

#[cfg(feature = "test-support")]
pub use bluesync_transport::MockTransport;
