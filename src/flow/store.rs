/// Ephemeral storage for pending linking flows
///
/// Keyed by the opaque `state` token. Entries are single-use and expire
/// after a TTL. In production this could move to Redis; the interface is
/// deliberately small so the backing store is swappable.
use crate::link::DiscordAccount;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A pending linking attempt
#[derive(Debug, Clone)]
pub struct FlowState {
    pub code_verifier: String,
    pub discord: DiscordAccount,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of attempting to consume a state token
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// Token matched a pending flow; the caller now owns it exclusively
    Pending(FlowState),
    /// Token belonged to a flow whose exchange already completed
    Replayed,
    /// Token unknown or expired
    NotFound,
}

#[derive(Clone)]
pub struct FlowStateStore {
    inner: Arc<RwLock<Inner>>,
    ttl: Duration,
}

struct Inner {
    pending: HashMap<String, FlowState>,
    /// State tokens whose exchange completed, kept until their TTL so a
    /// replayed callback is distinguishable from a forged one
    completed: HashMap<String, DateTime<Utc>>,
}

impl FlowStateStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                pending: HashMap::new(),
                completed: HashMap::new(),
            })),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Store a new pending flow under its state token
    pub async fn insert(&self, state: String, code_verifier: String, discord: DiscordAccount) {
        let now = Utc::now();
        let flow = FlowState {
            code_verifier,
            discord,
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut inner = self.inner.write().await;
        Self::evict_expired(&mut inner, now);
        inner.pending.insert(state, flow);
    }

    /// Look at a pending flow without consuming it
    pub async fn peek(&self, state: &str) -> Option<FlowState> {
        let now = Utc::now();
        let inner = self.inner.read().await;
        inner
            .pending
            .get(state)
            .filter(|flow| flow.expires_at > now)
            .cloned()
    }

    /// Atomically take ownership of a pending flow.
    ///
    /// Exactly one of several concurrent callers observes `Pending`; the
    /// rest see `Replayed` (exchange already finished) or `NotFound`.
    pub async fn consume(&self, state: &str) -> ConsumeOutcome {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        Self::evict_expired(&mut inner, now);

        match inner.pending.remove(state) {
            Some(flow) if flow.expires_at > now => ConsumeOutcome::Pending(flow),
            Some(_) => ConsumeOutcome::NotFound,
            None => {
                if inner.completed.contains_key(state) {
                    ConsumeOutcome::Replayed
                } else {
                    ConsumeOutcome::NotFound
                }
            }
        }
    }

    /// Put a consumed flow back, e.g. after an identity-provider failure.
    ///
    /// The original expiry is kept so the retry window stays bounded.
    pub async fn restore(&self, state: String, flow: FlowState) {
        let mut inner = self.inner.write().await;
        inner.pending.insert(state, flow);
    }

    /// Record that the exchange for a state token completed
    pub async fn mark_completed(&self, state: String, expires_at: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.completed.insert(state, expires_at);
    }

    fn evict_expired(inner: &mut Inner, now: DateTime<Utc>) {
        inner.pending.retain(|_, flow| flow.expires_at > now);
        inner.completed.retain(|_, expires_at| *expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discord() -> DiscordAccount {
        DiscordAccount {
            id: "42".into(),
            username: "alice".into(),
            avatar: "a.png".into(),
        }
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let store = FlowStateStore::new(600);
        store.insert("tok".into(), "verifier".into(), discord()).await;

        assert!(matches!(
            store.consume("tok").await,
            ConsumeOutcome::Pending(_)
        ));
        assert!(matches!(store.consume("tok").await, ConsumeOutcome::NotFound));
    }

    #[tokio::test]
    async fn unknown_state_not_found() {
        let store = FlowStateStore::new(600);
        assert!(matches!(
            store.consume("never-issued").await,
            ConsumeOutcome::NotFound
        ));
    }

    #[tokio::test]
    async fn completed_state_reports_replay() {
        let store = FlowStateStore::new(600);
        store.insert("tok".into(), "verifier".into(), discord()).await;

        let flow = match store.consume("tok").await {
            ConsumeOutcome::Pending(flow) => flow,
            other => panic!("expected pending, got {:?}", other),
        };
        store.mark_completed("tok".into(), flow.expires_at).await;

        assert!(matches!(store.consume("tok").await, ConsumeOutcome::Replayed));
    }

    #[tokio::test]
    async fn expired_flow_not_found() {
        let store = FlowStateStore::new(-1); // already expired on insert
        store.insert("tok".into(), "verifier".into(), discord()).await;

        assert!(matches!(store.consume("tok").await, ConsumeOutcome::NotFound));
    }

    #[tokio::test]
    async fn restore_permits_one_retry() {
        let store = FlowStateStore::new(600);
        store.insert("tok".into(), "verifier".into(), discord()).await;

        let flow = match store.consume("tok").await {
            ConsumeOutcome::Pending(flow) => flow,
            other => panic!("expected pending, got {:?}", other),
        };
        store.restore("tok".into(), flow).await;

        assert!(matches!(
            store.consume("tok").await,
            ConsumeOutcome::Pending(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_consumers_exactly_one_wins() {
        let store = FlowStateStore::new(600);
        store.insert("tok".into(), "verifier".into(), discord()).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.consume("tok").await }));
        }

        let mut winners = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), ConsumeOutcome::Pending(_)) {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
