//! 90-second TTL cache for workload-analysis responses, keyed by user.
//!
//! Backs `GET /schedule/workload-analysis` only. Never read by the
//! Planner or PersistenceProtocol — those always see live data.

use std::time::Duration;

use moka::sync::Cache;
use ssc_backend_scheduler::workload_analyzer::Warning;
use uuid::Uuid;

const TTL: Duration = Duration::from_secs(90);

#[derive(Clone)]
pub struct WorkloadCache {
    inner: Cache<Uuid, Vec<Warning>>,
}

impl WorkloadCache {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().time_to_live(TTL).max_capacity(10_000).build(),
        }
    }

    pub fn get(&self, user_id: Uuid) -> Option<Vec<Warning>> {
        self.inner.get(&user_id)
    }

    pub fn set(&self, user_id: Uuid, warnings: Vec<Warning>) {
        self.inner.insert(user_id, warnings);
    }

    pub fn invalidate(&self, user_id: Uuid) {
        self.inner.invalidate(&user_id);
    }
}

impl Default for WorkloadCache {
    fn default() -> Self {
        Self::new()
    }
}
