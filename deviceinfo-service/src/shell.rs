//! In-process host for running DeviceInfo as a standalone service.
//!
//! [`LocalShell`] stands in for the plugin host. The capability provider
//! runs on its own worker thread and is reached through a
//! [`LocalConnection`], so termination and release follow the same path
//! as an out-of-process provider.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::capabilities::{CapabilitySet, LocalProvider};
use crate::host::{CapabilityProvider, RemoteConnection, Shell, ShellError, SubSystems, Subsystem};

/// Provider name served by [`LocalShell`].
pub const LOCAL_PROVIDER: &str = "DeviceInfoImplementation";

/// Subsystem readiness with a fixed set of active subsystems.
#[derive(Debug)]
pub struct LocalSubSystems {
    active: HashSet<Subsystem>,
    build_tree_hash: String,
}

impl LocalSubSystems {
    pub fn new(build_tree_hash: impl Into<String>) -> Self {
        Self {
            active: [Subsystem::Platform, Subsystem::Network].into_iter().collect(),
            build_tree_hash: build_tree_hash.into(),
        }
    }
}

impl SubSystems for LocalSubSystems {
    fn is_active(&self, subsystem: Subsystem) -> bool {
        self.active.contains(&subsystem)
    }

    fn build_tree_hash(&self) -> String {
        self.build_tree_hash.clone()
    }
}

type Registry = Mutex<HashMap<u32, Arc<LocalConnection>>>;

/// Connection to a provider worker thread.
///
/// Terminating the connection also removes it from the shell's registry.
pub struct LocalConnection {
    id: u32,
    terminated: AtomicBool,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    registry: Weak<Registry>,
}

impl LocalConnection {
    fn new(
        id: u32,
        shutdown: mpsc::Sender<()>,
        worker: JoinHandle<()>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            id,
            terminated: AtomicBool::new(false),
            shutdown: Mutex::new(Some(shutdown)),
            worker: Mutex::new(Some(worker)),
            registry,
        }
    }
}

impl RemoteConnection for LocalConnection {
    fn id(&self) -> u32 {
        self.id
    }

    fn terminate(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(shutdown) = self.shutdown.lock().take() {
            // The worker may have exited already.
            let _ = shutdown.send(());
        }

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!(connection_id = self.id, "Provider worker panicked");
            }
        }

        if let Some(registry) = self.registry.upgrade() {
            // Dropped after the lock is released.
            let removed = registry.lock().remove(&self.id);
            drop(removed);
        }

        debug!(connection_id = self.id, "Provider connection terminated");
    }
}

impl Drop for LocalConnection {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Settings for a [`LocalShell`].
#[derive(Debug, Clone)]
pub struct LocalShellConfig {
    pub callsign: String,
    pub config_line: String,
    pub web_prefix: String,
    pub version: String,
    pub build_tree_hash: String,
    pub capabilities: CapabilitySet,
}

/// Standalone plugin host.
pub struct LocalShell {
    config: LocalShellConfig,
    sub_systems: Arc<LocalSubSystems>,
    connections: Arc<Registry>,
    next_connection_id: AtomicU32,
}

impl LocalShell {
    pub fn new(config: LocalShellConfig) -> Self {
        let sub_systems = Arc::new(LocalSubSystems::new(config.build_tree_hash.clone()));
        Self {
            config,
            sub_systems,
            connections: Arc::new(Mutex::new(HashMap::new())),
            next_connection_id: AtomicU32::new(1),
        }
    }

    /// Number of provider connections still registered.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    fn spawn_provider(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<(Box<dyn CapabilityProvider>, u32), ShellError> {
        let capabilities = self.config.capabilities.clone();
        let delay = Duration::from_millis(capabilities.startup_delay_ms);

        let (ready_tx, ready_rx) = mpsc::channel::<LocalProvider>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let worker = std::thread::Builder::new()
            .name(format!("{}-provider", self.config.callsign.to_lowercase()))
            .spawn(move || {
                std::thread::sleep(delay);
                if ready_tx.send(LocalProvider::new(capabilities)).is_err() {
                    // Nobody waited for us.
                    return;
                }
                // Serve until terminated or the connection is dropped.
                let _ = shutdown_rx.recv();
            })
            .map_err(|e| ShellError::Spawn {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let provider = match ready_rx.recv_timeout(timeout) {
            Ok(provider) => provider,
            Err(_) => {
                drop(shutdown_tx);
                return Err(ShellError::Timeout {
                    name: name.to_string(),
                    timeout_ms: timeout.as_millis(),
                });
            }
        };

        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let connection = Arc::new(LocalConnection::new(
            id,
            shutdown_tx,
            worker,
            Arc::downgrade(&self.connections),
        ));
        self.connections.lock().insert(id, connection);

        info!(provider = %name, connection_id = id, "Capability provider started");
        let provider: Box<dyn CapabilityProvider> = Box::new(provider);
        Ok((provider, id))
    }
}

impl Shell for LocalShell {
    fn callsign(&self) -> String {
        self.config.callsign.clone()
    }

    fn config_line(&self) -> String {
        self.config.config_line.clone()
    }

    fn web_prefix(&self) -> String {
        self.config.web_prefix.clone()
    }

    fn version(&self) -> String {
        self.config.version.clone()
    }

    fn sub_systems(&self) -> Option<Arc<dyn SubSystems>> {
        Some(self.sub_systems.clone())
    }

    fn remote_connection(&self, id: u32) -> Option<Arc<dyn RemoteConnection>> {
        self.connections
            .lock()
            .get(&id)
            .map(|connection| connection.clone() as Arc<dyn RemoteConnection>)
    }

    fn root(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<(Box<dyn CapabilityProvider>, u32), ShellError> {
        if name != LOCAL_PROVIDER {
            return Err(ShellError::UnknownProvider {
                name: name.to_string(),
            });
        }
        self.spawn_provider(name, timeout)
    }
}
