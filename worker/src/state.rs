// worker/src/state.rs

use common::{ChunkStore, WorkerRole, WorkerStats};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub role: WorkerRole,
    pub hostname: String,
    // store compartido con el splitter y el resto de los workers
    pub store: Arc<dyn ChunkStore>,
    pub metrics: Arc<WorkerMetrics>,
}

impl AppState {
    pub fn new(role: WorkerRole, store: Arc<dyn ChunkStore>) -> Self {
        let hostname = hostname::get()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Self {
            role,
            hostname,
            store,
            metrics: Arc::new(WorkerMetrics::default()),
        }
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            role: self.role,
            hostname: self.hostname.clone(),
            requests: self.metrics.requests.load(Ordering::Relaxed),
            succeeded: self.metrics.succeeded.load(Ordering::Relaxed),
            failed: self.metrics.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkerMetrics {
    pub requests: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
}

impl WorkerMetrics {
    pub fn started(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn finished(&self, success: bool) {
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}
