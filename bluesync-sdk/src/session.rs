//! The top-level session facade
//!
//! `BlueSession` wires the pieces together and owns their lifecycle:
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   BlueSession                   │
//! │                                                 │
//! │  Transport ──feed──▶ Synchronizer ──▶ Registry  │
//! │      ▲                                   │      │
//! │      └──────── HandleResolver ◀──────────┘      │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Construction enumerates the current remote object set, replays it into the
//! registry, and starts the processing thread over the live notification
//! feed. From then on handle lookups answer from local mirrored state;
//! only the first bind per object round-trips through the transport.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use bluesync_core::{Address, SyncEvent, Synchronizer, SynchronizerConfig};
use bluesync_transport::ObjectTransport;

use crate::adapter::Adapter;
use crate::device::Device;
use crate::error::SdkError;
use crate::resolver::HandleResolver;

/// A running synchronization session over one transport
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use bluesync_sdk::BlueSession;
///
/// let session = BlueSession::new(transport)?;
///
/// let device = session.device("AA:BB:CC:DD:EE:FF")?;
/// device.connect()?;
///
/// session.shutdown()?;
/// ```
pub struct BlueSession {
    synchronizer: Synchronizer,
    resolver: HandleResolver,
}

impl BlueSession {
    /// Start a session: enumerate, replay, and begin live processing
    pub fn new(transport: Arc<dyn ObjectTransport>) -> Result<Self, SdkError> {
        Self::with_config(transport, SynchronizerConfig::default())
    }

    /// Start a session with explicit synchronizer configuration
    pub fn with_config(
        transport: Arc<dyn ObjectTransport>,
        config: SynchronizerConfig,
    ) -> Result<Self, SdkError> {
        let mut synchronizer = Synchronizer::new(config);

        // Subscribe before replaying so nothing delivered in between is lost;
        // reconciliation is idempotent, so the overlap is harmless.
        let feed = transport.subscribe()?;
        synchronizer.replay(transport.managed_objects()?);
        synchronizer.start_processing(feed).map_err(SdkError::Core)?;

        let resolver = HandleResolver::new(
            Arc::clone(synchronizer.registry()),
            Arc::clone(&transport),
        );

        info!(
            entities = synchronizer.registry().entity_count(),
            "session started"
        );
        Ok(Self {
            synchronizer,
            resolver,
        })
    }

    /// Resolve an adapter handle by short-id (e.g. `hci0`)
    ///
    /// Repeated calls for the same live adapter return the same handle
    /// instance. Fails with [`SdkError::NotFound`] if no such adapter is
    /// currently mirrored.
    pub fn adapter(&self, id: &str) -> Result<Adapter, SdkError> {
        self.resolver.get_adapter(id)
    }

    /// Resolve a device handle by address
    ///
    /// Accepts `:`, `-`, or `_` as octet delimiters, case-insensitively.
    /// Repeated calls for the same live device return the same handle
    /// instance. Fails with [`SdkError::NotFound`] if the address does not
    /// parse or no such device is currently mirrored.
    pub fn device(&self, address: &str) -> Result<Device, SdkError> {
        self.resolver.get_device(address)
    }

    /// Short-ids of all currently mirrored adapters
    pub fn adapter_ids(&self) -> Vec<String> {
        self.synchronizer
            .registry()
            .adapters()
            .iter()
            .filter_map(|entity| entity.adapter_id().map(str::to_string))
            .collect()
    }

    /// Addresses of all currently mirrored devices
    pub fn device_addresses(&self) -> Vec<Address> {
        self.synchronizer
            .registry()
            .devices()
            .iter()
            .filter_map(|entity| entity.address().cloned())
            .collect()
    }

    /// Subscribe to session events (device observed / vanished / sync errors)
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.synchronizer.subscribe_events()
    }

    /// Stop processing and tear down the mirrored graph
    ///
    /// Outstanding handles survive shutdown but report themselves dead and
    /// refuse remote operations.
    pub fn shutdown(self) -> Result<(), SdkError> {
        self.synchronizer.shutdown().map_err(SdkError::Core)
    }
}
