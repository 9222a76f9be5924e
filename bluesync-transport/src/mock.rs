//! Scripted in-memory transport for tests
//!
//! `MockTransport` lets test code seed the startup enumeration, inject live
//! events, and observe every bind/call the code under test issues. Binds can
//! be delayed (to widen race windows in concurrency tests) or failed per
//! path.

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::transport::{ObjectTransport, Result, TransportError};
use crate::types::{Interface, ManagedObject, ObjectEvent, ObjectPath, PropertyMap};

/// A recorded pass-through method invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub path: ObjectPath,
    pub interface: Interface,
    pub member: String,
    pub args: Vec<serde_json::Value>,
}

#[derive(Default)]
struct Script {
    objects: Vec<ManagedObject>,
    event_senders: Vec<Sender<ObjectEvent>>,
    bind_calls: Vec<(ObjectPath, Interface)>,
    calls: Vec<CallRecord>,
    failing_binds: HashSet<ObjectPath>,
    bind_delay: Option<Duration>,
}

/// Scripted transport used by the synchronizer and SDK test suites
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<Script>,
    bind_count: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the startup enumeration with one object
    pub fn push_object(&self, path: impl Into<ObjectPath>, interfaces: Vec<(Interface, PropertyMap)>) {
        self.script.lock().objects.push(ManagedObject {
            path: path.into(),
            interfaces,
        });
    }

    /// Deliver a live event to every active subscriber
    pub fn emit(&self, event: ObjectEvent) {
        let senders = self.script.lock().event_senders.clone();
        for tx in senders {
            let _ = tx.send(event.clone());
        }
    }

    /// Make every `bind` sleep for `delay` before returning
    pub fn set_bind_delay(&self, delay: Duration) {
        self.script.lock().bind_delay = Some(delay);
    }

    /// Make binds against `path` fail with `NotBound`
    pub fn fail_bind(&self, path: impl Into<ObjectPath>) {
        self.script.lock().failing_binds.insert(path.into());
    }

    /// Number of `bind` invocations observed so far
    pub fn bind_count(&self) -> usize {
        self.bind_count.load(Ordering::SeqCst)
    }

    /// Every `bind` invocation observed so far
    pub fn bind_calls(&self) -> Vec<(ObjectPath, Interface)> {
        self.script.lock().bind_calls.clone()
    }

    /// Every pass-through method invocation observed so far
    pub fn call_log(&self) -> Vec<CallRecord> {
        self.script.lock().calls.clone()
    }
}

impl ObjectTransport for MockTransport {
    fn managed_objects(&self) -> Result<Vec<ManagedObject>> {
        Ok(self.script.lock().objects.clone())
    }

    fn subscribe(&self) -> Result<Receiver<ObjectEvent>> {
        let (tx, rx) = mpsc::channel();
        self.script.lock().event_senders.push(tx);
        Ok(rx)
    }

    fn bind(&self, path: &ObjectPath, interface: Interface) -> Result<()> {
        let delay = {
            let mut script = self.script.lock();
            script.bind_calls.push((path.clone(), interface));
            script.bind_delay
        };
        self.bind_count.fetch_add(1, Ordering::SeqCst);

        // Sleep outside the script lock so emit()/observers stay usable.
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if self.script.lock().failing_binds.contains(path) {
            return Err(TransportError::NotBound { path: path.clone() });
        }
        Ok(())
    }

    fn watch_properties(&self, _path: &ObjectPath, _interface: Interface) -> Result<()> {
        Ok(())
    }

    fn call(
        &self,
        path: &ObjectPath,
        interface: Interface,
        member: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        self.script.lock().calls.push(CallRecord {
            path: path.clone(),
            interface,
            member: member.to_string(),
            args,
        });
        Ok(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_binds() {
        let mock = MockTransport::new();
        let path = ObjectPath::new("/org/bluez/hci0");

        assert!(mock.bind(&path, Interface::Adapter).is_ok());
        assert_eq!(mock.bind_count(), 1);
        assert_eq!(mock.bind_calls(), vec![(path, Interface::Adapter)]);
    }

    #[test]
    fn test_mock_failing_bind() {
        let mock = MockTransport::new();
        let path = ObjectPath::new("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF");
        mock.fail_bind(path.clone());

        let err = mock.bind(&path, Interface::Device).unwrap_err();
        assert!(matches!(err, TransportError::NotBound { .. }));
        // Failed binds still count as attempts.
        assert_eq!(mock.bind_count(), 1);
    }

    #[test]
    fn test_mock_event_fan_out() {
        let mock = MockTransport::new();
        let rx1 = mock.subscribe().unwrap();
        let rx2 = mock.subscribe().unwrap();

        let event = ObjectEvent::InterfacesRemoved {
            path: ObjectPath::new("/org/bluez/hci0"),
            interfaces: vec![Interface::Adapter],
        };
        mock.emit(event.clone());

        assert_eq!(rx1.try_recv().unwrap(), event);
        assert_eq!(rx2.try_recv().unwrap(), event);
    }
}
