//! In-memory session store
//!
//! `DashMap::remove` takes the shard write lock, so of several concurrent
//! `consume_once` calls for the same key exactly one observes the entry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use authbroker_common::auth::pkce::PkceChallenge;
use authbroker_common::time::{Clock, SystemClock};
use authbroker_core::SessionStore;
use authbroker_domain::{BrokerError, Result, SessionId};
use dashmap::DashMap;
use tracing::trace;

use crate::errors::InfraError;

struct StoredSession {
    payload: String,
    expires_at: Instant,
}

/// Process-local session store
pub struct InMemorySessionStore<C: Clock = SystemClock> {
    entries: DashMap<String, StoredSession>,
    clock: C,
}

impl InMemorySessionStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemorySessionStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemorySessionStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { entries: DashMap::new(), clock }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn decode(payload: &str) -> Result<PkceChallenge> {
        serde_json::from_str(payload).map_err(|e| InfraError::from(e).into())
    }
}

#[async_trait]
impl<C: Clock + 'static> SessionStore for InMemorySessionStore<C> {
    async fn save(&self, id: &SessionId, challenge: &PkceChallenge, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(challenge).map_err(InfraError::from)?;
        let expires_at = self.clock.now() + ttl;
        self.entries.insert(id.store_key(), StoredSession { payload, expires_at });
        trace!(session_id = %id, ttl_secs = ttl.as_secs(), "Session stored");
        Ok(())
    }

    async fn consume_once(&self, id: &SessionId) -> Result<PkceChallenge> {
        let (_, entry) = self.entries.remove(&id.store_key()).ok_or(BrokerError::SessionNotFound)?;
        if entry.expires_at <= self.clock.now() {
            return Err(BrokerError::SessionNotFound);
        }
        Self::decode(&entry.payload)
    }

    async fn exists(&self, id: &SessionId) -> Result<bool> {
        let now = self.clock.now();
        Ok(self.entries.get(&id.store_key()).is_some_and(|entry| entry.expires_at > now))
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        self.entries.remove(&id.store_key());
        Ok(())
    }

    async fn ttl_remaining(&self, id: &SessionId) -> Result<Duration> {
        let now = self.clock.now();
        self.entries
            .get(&id.store_key())
            .map(|entry| entry.expires_at.saturating_duration_since(now))
            .filter(|remaining| !remaining.is_zero())
            .ok_or(BrokerError::SessionNotFound)
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        Ok(before.saturating_sub(self.entries.len()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
