//! Wire-level vocabulary and collaborator boundary for bluesync
//!
//! The remote service publishes its object model over an object-management
//! IPC protocol as a flat stream of "interfaces added" / "interfaces removed"
//! notifications keyed by hierarchical path strings. This crate defines the
//! types that cross that boundary and the [`ObjectTransport`] trait that the
//! rest of bluesync consumes; it deliberately does *not* implement any
//! connection management, message framing, or signal matching.
//!
//! # Architecture
//!
//! ```text
//! remote service ──(IPC)──▶ ObjectTransport impl ──▶ ObjectEvent stream
//!                                               └──▶ bind / call / watch
//! ```
//!
//! Enable the `test-support` feature to get [`MockTransport`], a scripted
//! in-memory transport used by the synchronizer and SDK test suites.

pub mod transport;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use transport::{ObjectTransport, Result, TransportError};
pub use types::{Interface, ManagedObject, ObjectEvent, ObjectPath, PropertyMap};

#[cfg(any(test, feature = "test-support"))]
pub use mock::MockTransport;
