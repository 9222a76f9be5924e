//! The `ObjectTransport` trait and its error type
//!
//! Implementations own the actual IPC session (connection setup, method-call
//! framing, signal subscription). bluesync treats the transport purely as a
//! collaborator: it enumerates once at startup, consumes the event feed, and
//! issues bind / call / watch requests against paths.

use std::sync::mpsc::Receiver;

use thiserror::Error;

use crate::types::{Interface, ManagedObject, ObjectEvent, ObjectPath};

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors at the collaborator boundary
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// A bind targeted a remote object that no longer exists
    #[error("no remote object bound at {path}")]
    NotBound {
        /// Path the bind targeted
        path: ObjectPath,
    },

    /// The underlying IPC session is gone
    #[error("transport disconnected")]
    Disconnected,

    /// Any other transport-level failure
    #[error("transport failure: {0}")]
    Failure(String),
}

/// The external object-management collaborator
///
/// All methods are synchronous; `bind` is the only one expected to block for
/// a meaningful amount of time (it round-trips to the remote service).
/// Implementations must be shareable across threads.
pub trait ObjectTransport: Send + Sync {
    /// One-shot enumeration of the full current object set
    ///
    /// Consumed once at startup and replayed through the same "added"
    /// handling path as live notifications.
    fn managed_objects(&self) -> Result<Vec<ManagedObject>>;

    /// Subscribe to the structural notification feed
    ///
    /// The returned receiver yields events in delivery order. Dropping the
    /// receiver ends the subscription.
    fn subscribe(&self) -> Result<Receiver<ObjectEvent>>;

    /// Bind a capability handle to the named interface at a path
    ///
    /// Fails with [`TransportError::NotBound`] if the remote object no
    /// longer exists.
    fn bind(&self, path: &ObjectPath, interface: Interface) -> Result<()>;

    /// Subscribe to property changes for one capability at one path
    ///
    /// Changes arrive as [`ObjectEvent::PropertiesChanged`] on the feed.
    fn watch_properties(&self, path: &ObjectPath, interface: Interface) -> Result<()>;

    /// Invoke a method on the named capability at a path
    fn call(
        &self,
        path: &ObjectPath,
        interface: Interface,
        member: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value>;
}
