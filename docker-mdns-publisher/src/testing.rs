//! In-memory announcer and runtime for unit tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::{self, StreamExt};
use shared::protocol::LABEL_PUBLISH;
use shared::types::{ContainerDescriptor, ContainerId, NormalizedRecord, RuntimeEvent};
use crate::mdns::{instance_name, service_domain, AnnounceError, Announcer};
use crate::runtime::{ContainerRuntime, EventStream, RuntimeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeHandle {
    pub serial: u64,
    pub fullname: String,
    pub server: String,
}

impl fmt::Display for FakeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.fullname, self.serial)
    }
}

#[derive(Debug, Default)]
struct AnnouncerState {
    next_serial: u64,
    registered: Vec<(NormalizedRecord, u32)>,
    live: Vec<FakeHandle>,
    unregistered: Vec<FakeHandle>,
    rejections: HashMap<String, AnnounceError>,
    close_count: u32,
    fail_close: bool,
}

/// Records every call; clones share state so tests can inspect an announcer
/// the engine owns.
#[derive(Debug, Clone, Default)]
pub struct FakeAnnouncer {
    state: Arc<Mutex<AnnouncerState>>,
}

impl FakeAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `register` fail with `error` for records on `server`
    pub fn reject(&self, server: &str, error: AnnounceError) {
        self.state.lock().unwrap().rejections.insert(server.to_string(), error);
    }

    /// Drop a live registration behind the engine's back
    pub fn forget(&self, server: &str) {
        self.state.lock().unwrap().live.retain(|h| h.server != server);
    }

    pub fn fail_close(&self) {
        self.state.lock().unwrap().fail_close = true;
    }

    pub fn registered(&self) -> Vec<NormalizedRecord> {
        self.state.lock().unwrap().registered.iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn ttl_of(&self, server: &str) -> Option<u32> {
        self.state
            .lock()
            .unwrap()
            .registered
            .iter()
            .find(|(r, _)| r.server_name == server)
            .map(|(_, ttl)| *ttl)
    }

    pub fn live(&self) -> Vec<FakeHandle> {
        self.state.lock().unwrap().live.clone()
    }

    pub fn unregistered(&self) -> Vec<FakeHandle> {
        self.state.lock().unwrap().unregistered.clone()
    }

    pub fn close_count(&self) -> u32 {
        self.state.lock().unwrap().close_count
    }
}

impl Announcer for FakeAnnouncer {
    type Handle = FakeHandle;

    fn register(&mut self, record: &NormalizedRecord, ttl_secs: u32) -> Result<FakeHandle, AnnounceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.rejections.get(&record.server_name) {
            return Err(error.clone());
        }

        let fullname = format!("{}.{}", instance_name(record), service_domain(&record.service_type));
        if let Some(live) = state.live.iter().find(|h| h.fullname == fullname) {
            return Err(if live.server == record.server_name {
                AnnounceError::DuplicateName(fullname)
            } else {
                AnnounceError::NonUniqueName(fullname)
            });
        }

        state.next_serial += 1;
        let handle = FakeHandle {
            serial: state.next_serial,
            fullname,
            server: record.server_name.clone(),
        };
        state.registered.push((record.clone(), ttl_secs));
        state.live.push(handle.clone());
        Ok(handle)
    }

    fn unregister(&mut self, handle: FakeHandle) -> Result<(), AnnounceError> {
        let mut state = self.state.lock().unwrap();
        let Some(pos) = state.live.iter().position(|h| *h == handle) else {
            return Err(AnnounceError::UnknownHandle(handle.fullname));
        };
        state.live.remove(pos);
        state.unregistered.push(handle);
        Ok(())
    }

    fn close(&mut self) -> Result<(), AnnounceError> {
        let mut state = self.state.lock().unwrap();
        state.close_count += 1;
        if state.fail_close {
            return Err(AnnounceError::Daemon("already shut down".to_string()));
        }
        Ok(())
    }
}

pub type EventSender = mpsc::UnboundedSender<Result<RuntimeEvent, RuntimeError>>;

/// A runtime whose containers are a map and whose event stream is a channel.
pub struct FakeRuntime {
    containers: Mutex<HashMap<ContainerId, ContainerDescriptor>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<Result<RuntimeEvent, RuntimeError>>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeRuntime {
    pub fn new() -> (Self, EventSender) {
        let (tx, rx) = mpsc::unbounded();
        let runtime = Self {
            containers: Mutex::new(HashMap::new()),
            events: Mutex::new(Some(rx)),
            calls: Mutex::new(Vec::new()),
        };
        (runtime, tx)
    }

    pub fn add(&self, container: ContainerDescriptor) {
        self.containers.lock().unwrap().insert(container.id.clone(), container);
    }

    /// Names of the trait methods called so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerDescriptor>, RuntimeError> {
        self.calls.lock().unwrap().push("list_containers");
        let mut listed: Vec<ContainerDescriptor> = self
            .containers
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.labels.contains_key(label))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listed)
    }

    async fn get_container(&self, id: &ContainerId) -> Result<ContainerDescriptor, RuntimeError> {
        self.calls.lock().unwrap().push("get_container");
        self.containers
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(id.clone()))
    }

    fn events(&self) -> EventStream {
        self.calls.lock().unwrap().push("events");
        match self.events.lock().unwrap().take() {
            Some(rx) => rx.boxed(),
            None => stream::empty().boxed(),
        }
    }
}

/// A container publishing `hosts` via the `mdns.publish` label
pub fn container(id: &str, hosts: &str) -> ContainerDescriptor {
    ContainerDescriptor {
        id: ContainerId::new(id),
        name: Some(format!("{id}-name")),
        labels: HashMap::from([(LABEL_PUBLISH.to_string(), hosts.to_string())]),
    }
}
