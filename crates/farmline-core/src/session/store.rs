//! Volatile session storage.
//!
//! The store maps gateway session ids to [`SessionRecord`]s. Reads of an
//! unknown id yield a fresh record at the language prompt rather than an
//! error, so a terminated (deleted) session restarts cleanly on its next
//! request. Per-id mutual exclusion is exposed via [`SessionStore::lock`]:
//! channel adapters hold the guard across their read-step-write sequence so
//! two concurrent requests for the same session cannot interleave and lose an
//! update. Different session ids never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use super::SessionRecord;

/// Volatile mapping from session id to conversation state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Acquire the per-session mutex. Callers hold the returned guard across
    /// read, engine step, and write/delete for the same id.
    async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()>;

    /// Read the record for `session_id`, defaulting to a fresh session at the
    /// language prompt when the id is unknown.
    async fn read(&self, session_id: &str) -> SessionRecord;

    /// Persist a record under its own session id.
    async fn write(&self, record: SessionRecord);

    /// Remove a record. Removing an absent id is a no-op.
    async fn delete(&self, session_id: &str);

    /// Evict sessions idle for longer than `ttl`. Returns the eviction count.
    async fn sweep_idle(&self, ttl: Duration) -> usize;

    /// Number of active sessions.
    async fn active_count(&self) -> usize;
}

/// In-memory store backed by a `RwLock<HashMap>`.
///
/// The lock registry hands out one `Arc<Mutex<()>>` per session id; its outer
/// lock is held only long enough to fetch or insert the entry, so unrelated
/// sessions never serialize behind each other.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        // Fast path: the mutex already exists.
        if let Some(mutex) = self.locks.read().await.get(session_id).cloned() {
            return mutex.lock_owned().await;
        }
        let mutex = {
            let mut locks = self.locks.write().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }

    async fn read(&self, session_id: &str) -> SessionRecord {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| SessionRecord::new(session_id))
    }

    async fn write(&self, mut record: SessionRecord) {
        record.touch();
        let mut sessions = self.sessions.write().await;
        sessions.insert(record.session_id.clone(), record);
    }

    async fn delete(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
    }

    async fn sweep_idle(&self, ttl: Duration) -> usize {
        let evicted: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|r| r.touched_at.elapsed() > ttl)
                .map(|r| r.session_id.clone())
                .collect()
        };
        if !evicted.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &evicted {
                sessions.remove(id);
            }
        }
        // Drop lock registry entries for sessions that no longer exist,
        // whether evicted just now or deleted earlier by a terminal step.
        // A guard held elsewhere keeps its Arc alive, so that entry must
        // stay to preserve exclusion.
        let live: std::collections::HashSet<String> =
            self.sessions.read().await.keys().cloned().collect();
        {
            let mut locks = self.locks.write().await;
            locks.retain(|id, mutex| live.contains(id) || Arc::strong_count(mutex) > 1);
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted idle sessions");
        }
        evicted.len()
    }

    async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
