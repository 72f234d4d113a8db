//! Redis-backed session store. Sessions are JSON blobs that expire after a TTL,
//! so abandoned conversations clean themselves up.
//!
//! Turns are serialized across replicas with a lease key taken by `SET NX PX`
//! and released only by the holder's token.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{Client as RedisClient, Script};
use tracing::debug;
use uuid::Uuid;

use crate::jobpost::session::{ConversationSession, SessionStore, SessionStoreError, TurnLease};

const KEY_PREFIX: &str = "jobpost:session:";
const LEASE_PREFIX: &str = "jobpost:turn:";

/// Deletes the lease only if it still carries the caller's token.
static RELEASE_LEASE: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"if redis.call("GET", KEYS[1]) == ARGV[1] then
  return redis.call("DEL", KEYS[1])
end
return 0"#,
    )
});

pub struct RedisSessionStore {
    client: RedisClient,
    ttl_secs: u64,
    lease_ms: u64,
}

impl RedisSessionStore {
    /// `lease_ttl` should outlast the longest turn; the request timeout is the
    /// natural bound.
    pub fn new(client: RedisClient, ttl_secs: u64, lease_ttl: Duration) -> Self {
        Self {
            client,
            ttl_secs,
            lease_ms: lease_ttl.as_millis().max(1) as u64,
        }
    }

    fn key(session_id: Uuid) -> String {
        format!("{KEY_PREFIX}{session_id}")
    }

    fn lease_key(session_id: Uuid) -> String {
        format!("{LEASE_PREFIX}{session_id}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<ConversationSession>, SessionStoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::key(session_id))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), SessionStoreError> {
        let json = serde_json::to_string(session)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(Self::key(session.session_id))
            .arg(json)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(
            "Saved session {} (turn {}, ttl {}s)",
            session.session_id, session.turn_count, self.ttl_secs
        );
        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> Result<(), SessionStoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("DEL")
            .arg(Self::key(session_id))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn claim_turn(&self, session_id: Uuid) -> Result<Option<TurnLease>, SessionStoreError> {
        let token = Uuid::new_v4().to_string();
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let claimed: Option<String> = redis::cmd("SET")
            .arg(Self::lease_key(session_id))
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(self.lease_ms)
            .query_async(&mut conn)
            .await?;
        if claimed.is_none() {
            debug!("Turn lease for session {session_id} is held elsewhere");
        }
        Ok(claimed.map(|_| TurnLease { session_id, token }))
    }

    async fn release_turn(&self, lease: &TurnLease) -> Result<(), SessionStoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let released: i64 = RELEASE_LEASE
            .key(Self::lease_key(lease.session_id))
            .arg(&lease.token)
            .invoke_async(&mut conn)
            .await?;
        if released == 0 {
            debug!(
                "Turn lease for session {} had already expired",
                lease.session_id
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_namespaced() {
        let id = Uuid::nil();
        assert_eq!(
            RedisSessionStore::key(id),
            "jobpost:session:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_lease_key_is_separate_from_session_key() {
        let id = Uuid::nil();
        assert_eq!(
            RedisSessionStore::lease_key(id),
            "jobpost:turn:00000000-0000-0000-0000-000000000000"
        );
        assert_ne!(RedisSessionStore::lease_key(id), RedisSessionStore::key(id));
    }

    #[test]
    fn test_lease_ttl_in_millis() {
        let client = RedisClient::open("redis://127.0.0.1:6379").unwrap();
        let store = RedisSessionStore::new(client, 60, Duration::from_secs(30));
        assert_eq!(store.lease_ms, 30_000);
    }

    #[test]
    fn test_session_json_survives_encoding() {
        let session = ConversationSession::new(Uuid::new_v4(), "company-9".to_string(), Some("Acme".to_string()));
        let json = serde_json::to_string(&session).unwrap();
        let back: ConversationSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
