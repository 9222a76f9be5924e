//! Error types for the synchronizer core

use thiserror::Error;

use bluesync_transport::TransportError;

/// Result type for synchronizer operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors the synchronizer core can return
///
/// Structural/indexing inconsistencies are absorbed and reported as
/// [`SyncEvent::SyncError`](crate::event::SyncEvent::SyncError) events, not
/// as `Err` values — the synchronizer must keep running. These variants
/// cover the operations that return synchronously to a specific caller.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// No live entity is registered for the identifier at call time
    ///
    /// A point-in-time answer, expected during discovery races. Callers
    /// wanting "wait until available" semantics must poll or subscribe to
    /// device-observed events themselves.
    #[error("not found: {0}")]
    NotFound(String),

    /// Error at the transport collaborator boundary
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The processing thread is already running
    #[error("synchronizer is already running")]
    AlreadyRunning,

    /// Joining the processing thread failed
    #[error("shutdown failed")]
    ShutdownFailed,
}
