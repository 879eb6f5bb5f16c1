//! # Serialized update gate.
//!
//! [`UpdateGate`] runs at most one operation per key at a time. Later calls for
//! the same key queue behind the current one (FIFO, tokio's fair mutex) and run
//! after it settles, whether it succeeded or failed. Different keys never wait
//! on each other.
//!
//! ```text
//! run("db", op1) ──► slot("db") locked ──► op1 ───────► unlock ──► op2 ──► unlock, slot dropped
//! run("db", op2) ──► queued on slot("db") ─────────────────────┘
//! run("api", op3) ─► slot("api") locked ──► op3 ──► unlock, slot dropped
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, MutexGuard, PoisonError};

use tokio::sync::Mutex;

type Slot = Arc<Mutex<()>>;

/// Per-key async serializer.
#[derive(Debug)]
pub struct UpdateGate<K> {
    slots: std::sync::Mutex<HashMap<K, Slot>>,
}

impl<K> Default for UpdateGate<K> {
    fn default() -> Self {
        Self {
            slots: std::sync::Mutex::new(HashMap::new()),
        }
    }
}

impl<K> UpdateGate<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `op` once every earlier operation for `key` has settled.
    ///
    /// Dropping the returned future (while queued or running) releases the key.
    pub async fn run<F, T>(&self, key: K, op: F) -> T
    where
        F: Future<Output = T>,
    {
        let lease = Lease::acquire(self, key);
        let _held = lease.slot.lock().await;
        op.await
    }

    /// An operation for `key` is running or queued.
    pub fn is_busy(&self, key: &K) -> bool {
        self.slots().contains_key(key)
    }

    /// Number of keys with running or queued operations.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<K, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reference to a key's slot; the last lease out removes the entry.
struct Lease<'a, K: Eq + Hash + Clone> {
    gate: &'a UpdateGate<K>,
    key: K,
    slot: Slot,
}

impl<'a, K: Eq + Hash + Clone> Lease<'a, K> {
    fn acquire(gate: &'a UpdateGate<K>, key: K) -> Self {
        let slot = gate.slots().entry(key.clone()).or_default().clone();
        Self { gate, key, slot }
    }
}

impl<K: Eq + Hash + Clone> Drop for Lease<'_, K> {
    fn drop(&mut self) {
        let mut slots = self.gate.slots();
        // The map and this lease are the only owners left.
        if slots
            .get(&self.key)
            .is_some_and(|s| Arc::ptr_eq(s, &self.slot) && Arc::strong_count(s) == 2)
        {
            slots.remove(&self.key);
        }
    }
}
