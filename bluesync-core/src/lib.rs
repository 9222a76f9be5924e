//! bluesync object-graph synchronizer
//!
//! Mirrors a remote hierarchical object model — adapters, devices, GATT
//! services, characteristics, descriptors — from an unordered stream of
//! "interfaces added" / "interfaces removed" notifications into a live,
//! path- and address-indexed entity graph.
//!
//! # Architecture
//!
//! ```text
//! ObjectEvent feed → Reconciler → EntityRegistry → SyncEvent subscribers
//!                                 (path index,     (device observed,
//!                                  address index,   sync errors)
//!                                  orphan repair)
//! ```
//!
//! The synchronizer tolerates three failure modes simultaneously:
//! out-of-order delivery (a child's creation can arrive before its
//! parent's), partial state (properties referencing not-yet-existing
//! siblings), and concurrent consumer access through shared entity
//! references.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bluesync_core::{Synchronizer, SynchronizerConfig, SyncEvent};
//!
//! let mut sync = Synchronizer::new(SynchronizerConfig::default());
//! let mut events = sync.subscribe_events();
//!
//! sync.replay(transport.managed_objects()?);
//! sync.start_processing(transport.subscribe()?)?;
//!
//! while let Ok(event) = events.blocking_recv() {
//!     if let SyncEvent::DeviceObserved { address, .. } = event {
//!         println!("observed {address}");
//!     }
//! }
//! ```

// Core modules
pub mod event;
pub mod manager;
pub mod model;
pub mod path;
pub mod reconciler;
pub mod registry;

// Error types
pub mod error;

// Logging infrastructure
pub mod logging;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{CoreError, Result};
pub use event::{EventBus, SyncEvent};
pub use manager::{Synchronizer, SynchronizerConfig};
pub use model::{Address, Entity, EntityDetail, EntityRef, Uuid};
pub use path::{split_path, PathComponents};
pub use registry::{DeviceUpsert, EntityRegistry, Removal};

pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::error::{CoreError, Result};
    pub use crate::event::SyncEvent;
    pub use crate::manager::{Synchronizer, SynchronizerConfig};
    pub use crate::model::{Address, EntityRef, Uuid};
    pub use crate::registry::EntityRegistry;
    pub use bluesync_transport::{Interface, ObjectEvent, ObjectPath, PropertyMap};
}
