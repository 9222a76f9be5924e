use thiserror::Error;

use bluesync_core::CoreError;
use bluesync_transport::{ObjectPath, TransportError};

/// Errors surfaced by the SDK facade
///
/// `Clone` so racing resolvers can hand the same failure to every caller
/// that shared one binding attempt.
#[derive(Error, Debug, Clone)]
pub enum SdkError {
    /// No live entity is registered for the identifier at call time
    ///
    /// A point-in-time answer; expected during discovery races.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The entity behind this handle was removed from the remote model
    #[error("Object at {0} was removed")]
    ObjectRemoved(ObjectPath),

    /// Binding or a pass-through call failed at the transport boundary
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error from the synchronizer core
    #[error("Synchronizer error: {0}")]
    Core(#[from] CoreError),

    /// The transport replied with a value of an unexpected shape
    #[error("Malformed reply: {0}")]
    MalformedReply(String),
}
