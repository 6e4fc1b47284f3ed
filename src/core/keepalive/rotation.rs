use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::core::error::{KeepaliveError, KeepaliveResult};

/// Round-robin credential selection with one counter per task code.
///
/// The map lock is only written the first time a task code is seen; after that,
/// callers share a read lock and race on the task's own atomic counter.
#[derive(Default)]
pub struct CredentialRotator {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl CredentialRotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next<'a>(&self, task_code: &str, pool: &'a [String]) -> KeepaliveResult<&'a str> {
        if pool.is_empty() {
            return Err(KeepaliveError::EmptyPool);
        }
        let ticket = self.counter(task_code).fetch_add(1, Ordering::Relaxed);
        let index = (ticket % pool.len() as u64) as usize;
        Ok(pool[index].as_str())
    }

    /// Current position for `task_code`, zero if never rotated.
    #[cfg(test)]
    pub fn position(&self, task_code: &str) -> u64 {
        let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
        counters
            .get(task_code)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn counter(&self, task_code: &str) -> Arc<AtomicU64> {
        {
            let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(counter) = counters.get(task_code) {
                return counter.clone();
            }
        }
        let mut counters = self.counters.write().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(task_code.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }
}
