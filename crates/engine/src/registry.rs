//! In-memory registry of interpreter processes, keyed by shebang.
//!
//! At most one process per shebang. An entry is created in `Starting`
//! when the launcher is asked to spawn, promoted to `Ready` by the
//! registration callback, and removed when the process exits or fails
//! a liveness probe. Shared via `Arc` between the callback server, the
//! reaper, and the scheduler.

use std::collections::HashMap;

use folio_remote::messages::RegisterInfo;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lifecycle of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Spawned, registration callback not yet received. Not pushed to,
    /// not pinged.
    Starting,
    /// Registered and serving RPC calls.
    Ready,
}

/// One interpreter process known to the engine.
#[derive(Debug, Clone)]
pub struct InterpreterProcess {
    pub shebang: String,
    pub status: ProcessStatus,
    /// RPC address; meaningful only once `Ready`.
    pub host: String,
    pub port: u16,
    /// Process identity, assigned by the process at registration.
    pub uuid: Option<Uuid>,
}

/// Registry of interpreter processes.
#[derive(Default)]
pub struct ProcessRegistry {
    inner: RwLock<HashMap<String, InterpreterProcess>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a process for `shebang` is being spawned.
    ///
    /// Overwrites any existing entry: a `starting` call means the
    /// previous process (if any) is being replaced.
    pub async fn starting(&self, shebang: &str) {
        let mut inner = self.inner.write().await;
        inner.insert(
            shebang.to_string(),
            InterpreterProcess {
                shebang: shebang.to_string(),
                status: ProcessStatus::Starting,
                host: String::new(),
                port: 0,
                uuid: None,
            },
        );
    }

    /// Promote an entry to `Ready` from a registration callback.
    ///
    /// Only updates an entry that already exists; a registration for a
    /// shebang the engine never spawned is dropped. Returns whether
    /// the registration was applied.
    pub async fn handle_register_event(&self, info: &RegisterInfo) -> bool {
        let mut inner = self.inner.write().await;
        match inner.get_mut(&info.shebang) {
            Some(entry) => {
                entry.status = ProcessStatus::Ready;
                entry.host = info.host.clone();
                entry.port = info.port;
                entry.uuid = Some(info.process_uuid);
                true
            }
            None => {
                tracing::warn!(shebang = %info.shebang, process_uuid = %info.process_uuid,
                    "Registration for unknown shebang dropped");
                false
            }
        }
    }

    /// Remove and return the entry for `shebang`.
    pub async fn remove(&self, shebang: &str) -> Option<InterpreterProcess> {
        self.inner.write().await.remove(shebang)
    }

    /// Snapshot of the entry for `shebang`.
    pub async fn get(&self, shebang: &str) -> Option<InterpreterProcess> {
        self.inner.read().await.get(shebang).cloned()
    }

    /// All registered shebangs.
    pub async fn shebangs(&self) -> Vec<String> {
        self.inner.read().await.keys().cloned().collect()
    }
}
