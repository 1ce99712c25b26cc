//! In-memory port implementations shared by the unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use megabridge_domain::attribute::AttributeValue;
use megabridge_domain::capability::{Capability, CapabilityProfile, OnOffCommand};
use megabridge_domain::device::DeviceDescriptor;
use megabridge_domain::error::{BridgeError, ConfigError, NotFoundError};
use megabridge_domain::id::RegistryHandle;

use crate::ports::{
    CommandHandlers, Connection, DeviceRegistry, MqttClient, MqttConnector, RegisteredDevice,
    TransportEvent,
};

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Collects formatted log lines so tests can assert on emitted warnings.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events into the capture until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_owned)
            .collect()
    }

    pub fn has_warning(&self, message: &str) -> bool {
        self.lines()
            .iter()
            .any(|line| line.contains("WARN") && line.contains(message))
    }
}

pub struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(Arc::clone(&self.0))
    }
}

// ---------------------------------------------------------------------------
// MQTT
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ClientLogInner {
    published: Vec<(String, String)>,
    subscribed: Vec<String>,
    disconnects: usize,
    fail_publish: bool,
}

/// Shared view of everything a [`FakeClient`] was asked to do.
#[derive(Clone, Default)]
pub struct ClientLog(Arc<Mutex<ClientLogInner>>);

impl ClientLog {
    fn lock(&self) -> MutexGuard<'_, ClientLogInner> {
        self.0.lock().unwrap()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.lock().published.clone()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.lock().subscribed.clone()
    }

    pub fn disconnects(&self) -> usize {
        self.lock().disconnects
    }

    pub fn fail_publishes(&self) {
        self.lock().fail_publish = true;
    }
}

#[derive(Default)]
pub struct FakeClient {
    log: ClientLog,
    disconnected: bool,
}

impl FakeClient {
    pub fn log(&self) -> ClientLog {
        self.log.clone()
    }
}

impl MqttClient for FakeClient {
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), BridgeError>> + Send {
        self.log.lock().subscribed.push(topic.to_owned());
        async { Ok(()) }
    }

    fn publish(
        &self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let mut log = self.log.lock();
        let result = if log.fail_publish {
            Err(BridgeError::Connectivity("broker went away".into()))
        } else {
            log.published.push((topic.to_owned(), payload.to_owned()));
            Ok(())
        };
        async move { result }
    }

    fn disconnect(&mut self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        if !self.disconnected {
            self.disconnected = true;
            self.log.lock().disconnects += 1;
        }
        async { Ok(()) }
    }
}

/// Connector handing out a [`FakeClient`] and a scripted event stream.
pub struct FakeConnector {
    log: ClientLog,
    events: Mutex<Option<mpsc::Receiver<TransportEvent>>>,
    malformed_url: bool,
}

impl FakeConnector {
    pub fn new() -> (Self, mpsc::Sender<TransportEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let connector = Self {
            log: ClientLog::default(),
            events: Mutex::new(Some(rx)),
            malformed_url: false,
        };
        (connector, tx)
    }

    pub fn malformed_url() -> Self {
        Self {
            log: ClientLog::default(),
            events: Mutex::new(None),
            malformed_url: true,
        }
    }

    pub fn log(&self) -> ClientLog {
        self.log.clone()
    }
}

impl MqttConnector for FakeConnector {
    type Client = FakeClient;

    fn connect(
        &self,
    ) -> impl Future<Output = Result<Connection<Self::Client>, BridgeError>> + Send {
        let result = if self.malformed_url {
            Err(ConfigError::InvalidBrokerUrl {
                url: "http//broken".to_string(),
                reason: "not a valid URL",
            }
            .into())
        } else {
            match self.events.lock().unwrap().take() {
                Some(events) => Ok(Connection {
                    client: FakeClient {
                        log: self.log.clone(),
                        disconnected: false,
                    },
                    events,
                }),
                None => Err(BridgeError::Connectivity("already connected".into())),
            }
        };
        async move { result }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct FakeDevice {
    handle: RegistryHandle,
    descriptor: DeviceDescriptor,
    profile: CapabilityProfile,
    attributes: HashMap<String, AttributeValue>,
    handlers: Option<CommandHandlers>,
}

#[derive(Default)]
struct RegistryState {
    devices: Vec<FakeDevice>,
    writes: Vec<(RegistryHandle, String, AttributeValue)>,
    calls: Vec<&'static str>,
}

/// Registry double that records every call. Clones share state.
#[derive(Clone, Default)]
pub struct FakeRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl FakeRegistry {
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap()
    }

    /// Pre-populate a device, as if persisted by a previous run.
    pub fn with_device(
        &self,
        profile: CapabilityProfile,
        descriptor: DeviceDescriptor,
        attributes: Vec<(&str, AttributeValue)>,
    ) -> RegistryHandle {
        let handle = RegistryHandle::new();
        self.lock().devices.push(FakeDevice {
            handle,
            descriptor,
            profile,
            attributes: attributes
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
            handlers: None,
        });
        handle
    }

    pub fn writes(&self) -> Vec<(RegistryHandle, String, AttributeValue)> {
        self.lock().writes.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn device_count(&self) -> usize {
        self.lock().devices.len()
    }

    /// Simulate the host invoking a command on a device.
    pub fn press(&self, unique_id: &str, command: OnOffCommand) {
        let handlers = self
            .lock()
            .devices
            .iter()
            .find(|d| d.descriptor.unique_id == unique_id)
            .and_then(|d| d.handlers.clone());
        handlers
            .expect("device has command handlers")
            .invoke(command);
    }
}

fn not_found(handle: RegistryHandle) -> BridgeError {
    NotFoundError {
        entity: "RegistryDevice",
        id: handle.to_string(),
    }
    .into()
}

impl DeviceRegistry for FakeRegistry {
    fn wait_ready(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        self.lock().calls.push("wait_ready");
        async { Ok(()) }
    }

    fn clear_selection(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        self.lock().calls.push("clear_selection");
        async { Ok(()) }
    }

    fn create(
        &self,
        profile: CapabilityProfile,
        descriptor: DeviceDescriptor,
    ) -> impl Future<Output = Result<RegistryHandle, BridgeError>> + Send {
        let handle = self.with_device(profile, descriptor, Vec::new());
        self.lock().calls.push("create");
        async move { Ok(handle) }
    }

    fn attach_command_handlers(
        &self,
        handle: RegistryHandle,
        handlers: CommandHandlers,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let result = match self.lock().devices.iter_mut().find(|d| d.handle == handle) {
            Some(device) => {
                device.handlers = Some(handlers);
                Ok(())
            }
            None => Err(not_found(handle)),
        };
        async move { result }
    }

    fn find<P>(
        &self,
        predicate: P,
    ) -> impl Future<Output = Result<Option<RegisteredDevice>, BridgeError>> + Send
    where
        P: Fn(&DeviceDescriptor) -> bool + Send,
    {
        let found = self
            .lock()
            .devices
            .iter()
            .find(|d| predicate(&d.descriptor))
            .map(|d| RegisteredDevice {
                handle: d.handle,
                descriptor: d.descriptor.clone(),
            });
        async move { Ok(found) }
    }

    fn has_capability(
        &self,
        handle: RegistryHandle,
        capability: Capability,
    ) -> impl Future<Output = Result<bool, BridgeError>> + Send {
        let result = self
            .lock()
            .devices
            .iter()
            .find(|d| d.handle == handle)
            .map(|d| d.profile.supports(capability))
            .ok_or_else(|| not_found(handle));
        async move { result }
    }

    fn read_attribute(
        &self,
        handle: RegistryHandle,
        name: &str,
    ) -> impl Future<Output = Result<Option<AttributeValue>, BridgeError>> + Send {
        let result = self
            .lock()
            .devices
            .iter()
            .find(|d| d.handle == handle)
            .map(|d| d.attributes.get(name).copied())
            .ok_or_else(|| not_found(handle));
        async move { result }
    }

    fn write_attribute(
        &self,
        handle: RegistryHandle,
        name: &str,
        value: AttributeValue,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let mut guard = self.lock();
        let state = &mut *guard;
        let result = match state.devices.iter_mut().find(|d| d.handle == handle) {
            Some(device) => {
                device.attributes.insert(name.to_owned(), value);
                state.writes.push((handle, name.to_owned(), value));
                Ok(())
            }
            None => Err(not_found(handle)),
        };
        drop(guard);
        async move { result }
    }

    fn register_all(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        self.lock().calls.push("register_all");
        async { Ok(()) }
    }

    fn deregister_all(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        self.lock().calls.push("deregister_all");
        async { Ok(()) }
    }

    fn shutdown(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        self.lock().calls.push("shutdown");
        async { Ok(()) }
    }
}
