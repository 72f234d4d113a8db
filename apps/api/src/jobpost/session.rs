//! Conversation sessions, the store seam, and per-session turn locks.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;
use uuid::{Uuid, Version};

use crate::jobpost::draft::JobPostDraft;

/// Terminal result of a conversation, kept so re-confirmation does not resubmit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionOutcome {
    Published { resource_id: String, message: String },
    Unpublished { reason: String, message: String },
}

impl CompletionOutcome {
    pub fn message(&self) -> &str {
        match self {
            CompletionOutcome::Published { message, .. } => message,
            CompletionOutcome::Unpublished { message, .. } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: Uuid,
    pub company_id: String,
    pub company_name: Option<String>,
    pub draft: JobPostDraft,
    pub turn_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_complete: bool,
    #[serde(default)]
    pub outcome: Option<CompletionOutcome>,
}

impl ConversationSession {
    pub fn new(session_id: Uuid, company_id: String, company_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            company_id,
            company_name,
            draft: JobPostDraft::default(),
            turn_count: 0,
            created_at: now,
            updated_at: now,
            is_complete: false,
            outcome: None,
        }
    }

    /// Drops the draft and terminal state. Identity, company, creation time and
    /// the attempted-turn count carry over.
    pub fn restart(&mut self) {
        self.draft = JobPostDraft::default();
        self.updated_at = Utc::now();
        self.is_complete = false;
        self.outcome = None;
    }

    pub fn record_turn(&mut self) {
        self.turn_count += 1;
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self, outcome: CompletionOutcome) {
        self.is_complete = true;
        self.outcome = Some(outcome);
        self.updated_at = Utc::now();
    }
}

/// Parses a client-supplied session id, accepting only UUID v4.
pub fn parse_session_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim())
        .ok()
        .filter(|id| id.get_version() == Some(Version::Random))
}

// ────────────────────────────────────────────────────────────────────────────
// Store seam
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Session encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Claim on a session's turn that is visible to every process sharing a store.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnLease {
    pub session_id: Uuid,
    /// Identifies the holder, so an expired lease re-taken by another process is
    /// never released by the old one.
    pub token: String,
}

/// Persistence for conversation sessions. The store owns sessions; callers get
/// copies and must `save` them back.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: Uuid) -> Result<Option<ConversationSession>, SessionStoreError>;
    async fn save(&self, session: &ConversationSession) -> Result<(), SessionStoreError>;
    async fn delete(&self, session_id: Uuid) -> Result<(), SessionStoreError>;

    /// Claims the turn lease for a session. `None` means another process holds it.
    /// A store private to one process has nothing to coordinate: `SessionLocks`
    /// already serializes its turns.
    async fn claim_turn(&self, session_id: Uuid) -> Result<Option<TurnLease>, SessionStoreError> {
        Ok(Some(TurnLease {
            session_id,
            token: String::new(),
        }))
    }

    async fn release_turn(&self, _lease: &TurnLease) -> Result<(), SessionStoreError> {
        Ok(())
    }
}

/// Gives a store lease back when the turn ends. Dropped without `release` (a
/// cancelled request), it releases from a spawned task; the store's lease TTL
/// covers a process that dies mid-turn.
pub struct LeaseGuard {
    store: Arc<dyn SessionStore>,
    lease: Option<TurnLease>,
}

impl LeaseGuard {
    pub fn new(store: Arc<dyn SessionStore>, lease: TurnLease) -> Self {
        Self {
            store,
            lease: Some(lease),
        }
    }

    pub async fn release(mut self) {
        if let Some(lease) = self.lease.take() {
            release_lease(self.store.as_ref(), &lease).await;
        }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        let store = Arc::clone(&self.store);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { release_lease(store.as_ref(), &lease).await });
        }
    }
}

async fn release_lease(store: &dyn SessionStore, lease: &TurnLease) {
    if let Err(e) = store.release_turn(lease).await {
        warn!(
            "Failed to release turn lease for session {}: {e}; it will expire",
            lease.session_id
        );
    }
}

/// In-process reference store. Sessions live until deleted or the process exits.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<Uuid, ConversationSession>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<ConversationSession>, SessionStoreError> {
        Ok(self.sessions.get(&session_id).map(|s| s.value().clone()))
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), SessionStoreError> {
        self.sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> Result<(), SessionStoreError> {
        self.sessions.remove(&session_id);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-session turn locks
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("A turn is already in progress for session {0}")]
pub struct TurnInProgress(pub Uuid);

/// One mutex per session id. Unrelated sessions never contend; a second turn
/// on a busy session is rejected instead of queued.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, session_id: Uuid) -> Result<TurnGuard, TurnInProgress> {
        // The shard lock is held while cloning, so a concurrent release cannot
        // remove the entry between lookup and clone.
        let lock = self
            .inner
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock
            .try_lock_owned()
            .map_err(|_| TurnInProgress(session_id))?;
        Ok(TurnGuard {
            session_id,
            locks: Arc::clone(&self.inner),
            guard: Some(guard),
        })
    }

    pub fn active(&self) -> usize {
        self.inner.len()
    }
}

/// Held for the duration of one turn. Released on drop, including when the
/// request future is cancelled.
pub struct TurnGuard {
    session_id: Uuid,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map still references the mutex: nobody is waiting on it.
        self.locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
