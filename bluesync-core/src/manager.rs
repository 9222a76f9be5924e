//! Synchronizer lifecycle: startup replay and feed processing
//!
//! One logical stream of structural notifications is processed by a single
//! reconciliation path — no two notifications are reconciled concurrently.
//! The startup enumeration is replayed through the same "added" handling as
//! live notifications, so out-of-order repair covers both.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use bluesync_transport::{ManagedObject, ObjectEvent};

use crate::error::{CoreError, Result};
use crate::event::{EventBus, SyncEvent};
use crate::reconciler::Reconciler;
use crate::registry::EntityRegistry;

/// How often the processing thread re-checks the stop flag while idle
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for [`Synchronizer`]
#[derive(Debug, Clone)]
pub struct SynchronizerConfig {
    /// Number of undelivered events buffered per subscriber
    pub event_buffer_size: usize,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
        }
    }
}

/// Owns the entity registry and drives reconciliation over it
///
/// # Example
///
/// ```rust,ignore
/// use bluesync_core::{Synchronizer, SynchronizerConfig};
///
/// let mut sync = Synchronizer::new(SynchronizerConfig::default());
/// let mut events = sync.subscribe_events();
///
/// sync.replay(transport.managed_objects()?);
/// sync.start_processing(transport.subscribe()?)?;
///
/// while let Ok(event) = events.blocking_recv() {
///     println!("sync event: {:?}", event);
/// }
/// ```
pub struct Synchronizer {
    registry: Arc<EntityRegistry>,
    reconciler: Reconciler,
    events: EventBus,
    stop: Arc<AtomicBool>,
    processing_thread: Option<thread::JoinHandle<()>>,
}

impl Synchronizer {
    /// Create a synchronizer with an empty registry
    pub fn new(config: SynchronizerConfig) -> Self {
        let registry = Arc::new(EntityRegistry::new());
        Self {
            reconciler: Reconciler::new(Arc::clone(&registry)),
            registry,
            events: EventBus::new(config.event_buffer_size),
            stop: Arc::new(AtomicBool::new(false)),
            processing_thread: None,
        }
    }

    /// The registry this synchronizer owns
    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// Subscribe to synchronizer events
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Replay a one-shot enumeration through the "added" handling path
    pub fn replay(&self, objects: Vec<ManagedObject>) {
        let count = objects.len();
        for object in objects {
            self.apply(ObjectEvent::InterfacesAdded {
                path: object.path,
                interfaces: object.interfaces,
            });
        }
        info!(objects = count, "startup enumeration replayed");
    }

    /// Reconcile a single notification immediately
    ///
    /// Useful for tests and for callers that drive the feed themselves
    /// instead of using [`start_processing`](Self::start_processing).
    pub fn apply(&self, event: ObjectEvent) {
        let pending = self.reconciler.apply(event);
        // Emission happens here, with no registry lock held.
        self.events.emit_all(pending);
    }

    /// Spawn the processing thread over a notification feed
    ///
    /// Only one processing thread can be active at a time.
    pub fn start_processing(&mut self, feed: Receiver<ObjectEvent>) -> Result<()> {
        if self.processing_thread.is_some() {
            return Err(CoreError::AlreadyRunning);
        }

        let reconciler = self.reconciler.clone();
        let events = self.events.clone();
        let stop = Arc::clone(&self.stop);

        let handle = thread::spawn(move || {
            debug!("notification processing started");
            loop {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                match feed.recv_timeout(STOP_POLL_INTERVAL) {
                    Ok(event) => {
                        let pending = reconciler.apply(event);
                        events.emit_all(pending);
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("notification processing stopped");
        });

        self.processing_thread = Some(handle);
        Ok(())
    }

    /// Whether the processing thread is running
    pub fn is_processing(&self) -> bool {
        self.processing_thread.is_some()
    }

    /// Stop processing and tear down the graph
    ///
    /// Joins the processing thread, then marks every entity dead and drops
    /// all indices so outstanding handles fail cleanly.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.processing_thread.take() {
            handle.join().map_err(|_| CoreError::ShutdownFailed)?;
        }
        self.registry.clear();
        Ok(())
    }
}
