//! Shared fakes for the integration suite: a scheme-keyed test server, a
//! counting test service, and a server opener the planner resolves through.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use runvisor::{
    MemoryOpener, MemoryRegistry, RegistryRef, ServeError, ServeOptions, Server, ServerOpener,
    ServerRef, Service, ServiceOptions, Status, StopOptions,
};

/// URL the fixtures mount the source registry under.
pub const SRC_URL: &str = "mem://definitions";

/// In-memory transport server: hooks run around a status flip.
pub struct TestServer {
    id: String,
    name: String,
    scheme: String,
    status: RwLock<Status>,
    needs_restart: AtomicBool,
    serves: AtomicUsize,
}

impl TestServer {
    pub fn new(scheme: &str) -> Arc<Self> {
        Arc::new(Self {
            id: format!("srv-{scheme}"),
            name: format!("server-{scheme}"),
            scheme: scheme.to_string(),
            status: RwLock::new(Status::Stopped),
            needs_restart: AtomicBool::new(false),
            serves: AtomicUsize::new(0),
        })
    }

    pub fn set_needs_restart(&self, value: bool) {
        self.needs_restart.store(value, Ordering::SeqCst);
    }

    /// How many times `serve` completed.
    pub fn serve_count(&self) -> usize {
        self.serves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Server for TestServer {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn serve(&self, opts: ServeOptions) -> Result<(), ServeError> {
        opts.run_before().await?;
        *self.status.write().unwrap() = Status::Ready;
        self.needs_restart.store(false, Ordering::SeqCst);
        self.serves.fetch_add(1, Ordering::SeqCst);
        opts.run_after().await?;
        Ok(())
    }

    async fn stop(&self, _opts: StopOptions) -> Result<(), ServeError> {
        *self.status.write().unwrap() = Status::Stopped;
        Ok(())
    }

    fn status(&self) -> Status {
        *self.status.read().unwrap()
    }

    fn needs_restart(&self) -> bool {
        self.needs_restart.load(Ordering::SeqCst)
    }
}

/// Counting service: records starts/stops, optionally fails its next stop.
pub struct TestService {
    id: String,
    name: String,
    scheme: String,
    options: ServiceOptions,
    server: RwLock<Option<ServerRef>>,
    status: RwLock<Status>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_start: AtomicBool,
    fail_stop: AtomicBool,
}

impl TestService {
    pub fn new(name: &str, scheme: &str, options: ServiceOptions) -> Arc<Self> {
        Arc::new(Self {
            id: format!("svc-{name}"),
            name: name.to_string(),
            scheme: scheme.to_string(),
            options,
            server: RwLock::new(None),
            status: RwLock::new(Status::Stopped),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            fail_start: AtomicBool::new(false),
            fail_stop: AtomicBool::new(false),
        })
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn set_fail_start(&self, value: bool) {
        self.fail_start.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_stop(&self, value: bool) {
        self.fail_stop.store(value, Ordering::SeqCst);
    }
}

#[async_trait]
impl Service for TestService {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn server_scheme(&self) -> &str {
        &self.scheme
    }

    fn options(&self) -> ServiceOptions {
        self.options.clone()
    }

    fn server(&self) -> Option<ServerRef> {
        self.server.read().unwrap().clone()
    }

    fn bind_server(&self, server: ServerRef) {
        *self.server.write().unwrap() = Some(server);
    }

    async fn start(&self) -> Result<(), ServeError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ServeError::ServiceFailed {
                name: self.name.clone(),
                reason: "start rigged to fail".to_string(),
            });
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.status.write().unwrap() = Status::Ready;
        Ok(())
    }

    async fn stop(&self, _opts: StopOptions) -> Result<(), ServeError> {
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(ServeError::ServiceFailed {
                name: self.name.clone(),
                reason: "stop rigged to fail".to_string(),
            });
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.status.write().unwrap() = Status::Stopped;
        Ok(())
    }

    async fn on_serve(&self) -> Result<(), ServeError> {
        Ok(())
    }

    fn status(&self) -> Status {
        *self.status.read().unwrap()
    }
}

/// Opener handing out one [`TestServer`] per scheme; schemes can be rigged
/// to fail planning.
#[derive(Default)]
pub struct TestServerOpener {
    created: Mutex<HashMap<String, Arc<TestServer>>>,
    fail_schemes: Mutex<HashSet<String>>,
}

impl TestServerOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_scheme(&self, scheme: &str) {
        self.fail_schemes.lock().unwrap().insert(scheme.to_string());
    }

    /// The server created for a scheme, if planning reached it.
    pub fn server(&self, scheme: &str) -> Option<Arc<TestServer>> {
        self.created.lock().unwrap().get(scheme).cloned()
    }
}

#[async_trait]
impl ServerOpener for TestServerOpener {
    async fn open(&self, _registry: RegistryRef, scheme: &str) -> Result<ServerRef, ServeError> {
        if self.fail_schemes.lock().unwrap().contains(scheme) {
            return Err(ServeError::OpenFailed {
                scheme: scheme.to_string(),
                reason: "rigged to fail".to_string(),
            });
        }
        let srv = TestServer::new(scheme);
        self.created
            .lock()
            .unwrap()
            .insert(scheme.to_string(), Arc::clone(&srv));
        Ok(srv)
    }
}

/// Registries plus openers wired the way most tests want them.
pub struct Fixture {
    pub shared: Arc<MemoryRegistry>,
    pub source: Arc<MemoryRegistry>,
    pub registries: Arc<MemoryOpener>,
    pub servers: Arc<TestServerOpener>,
}

pub fn fixture() -> Fixture {
    let shared = MemoryRegistry::new();
    let source = MemoryRegistry::new();
    let registries = MemoryOpener::new();
    registries.insert(SRC_URL, source.clone() as RegistryRef);
    Fixture {
        shared,
        source,
        registries,
        servers: TestServerOpener::new(),
    }
}

/// Polls `cond` for up to a second.
pub async fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
