/// End-to-end flow tests with a mock identity provider
use async_trait::async_trait;
use kizuna::{
    error::{LinkerError, LinkerResult},
    flow::{FlowCoordinator, FlowStateStore},
    idp::IdentityProvider,
    link::{AccountLink, DiscordAccount, LinkManager, LinkStatus, WikidotAccount},
    pkce::{self, ChallengeMethod},
};
use sqlx::SqlitePool;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

const PUBLIC_URL: &str = "https://linker.example.com";

/// Provider double that records challenges during the redirect leg and
/// verifies the submitted verifier against them on exchange, the way the
/// real provider would.
struct MockIdp {
    challenges: Mutex<Vec<String>>,
    account: WikidotAccount,
    exchange_count: AtomicUsize,
    fail_with: Mutex<Option<LinkerError>>,
}

impl MockIdp {
    fn new(account: WikidotAccount) -> Self {
        Self {
            challenges: Mutex::new(Vec::new()),
            account,
            exchange_count: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
        }
    }

    fn fail_next(&self, err: LinkerError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    fn exchanges(&self) -> usize {
        self.exchange_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdp {
    fn authorization_url(
        &self,
        state: &str,
        code_challenge: &str,
        method: ChallengeMethod,
    ) -> String {
        self.challenges
            .lock()
            .unwrap()
            .push(code_challenge.to_string());
        format!(
            "https://idp.example.com/authorize?state={}&code_challenge={}&code_challenge_method={}",
            state,
            code_challenge,
            method.as_str()
        )
    }

    async fn exchange_code(
        &self,
        _code: &str,
        code_verifier: &str,
    ) -> LinkerResult<WikidotAccount> {
        self.exchange_count.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }

        let matched = self
            .challenges
            .lock()
            .unwrap()
            .iter()
            .any(|challenge| pkce::verify(code_verifier, ChallengeMethod::S256, challenge));
        if !matched {
            return Err(LinkerError::Authentication(
                "code verifier does not match any issued challenge".to_string(),
            ));
        }

        Ok(self.account.clone())
    }
}

struct Harness {
    coordinator: FlowCoordinator,
    links: LinkManager,
    idp: Arc<MockIdp>,
}

async fn harness() -> Harness {
    harness_with_account(WikidotAccount {
        id: 7001,
        username: "sample-user".into(),
        unixname: "sample-user".into(),
        is_jp_member: true,
    })
    .await
}

async fn harness_with_account(account: WikidotAccount) -> Harness {
    let db = SqlitePool::connect(":memory:").await.unwrap();
    kizuna::db::run_migrations(&db).await.unwrap();

    let idp = Arc::new(MockIdp::new(account));
    let coordinator = FlowCoordinator::new(
        FlowStateStore::new(600),
        LinkManager::new(db.clone()),
        idp.clone(),
        PUBLIC_URL.to_string(),
        ChallengeMethod::S256,
    );

    Harness {
        coordinator,
        links: LinkManager::new(db),
        idp,
    }
}

fn discord(id: &str) -> DiscordAccount {
    DiscordAccount {
        id: id.to_string(),
        username: format!("user-{}", id),
        avatar: format!("https://cdn.example.com/{}.png", id),
    }
}

/// Pull the state token out of the hop URL returned by start
fn token_from(url: &str) -> String {
    url.split("token=").nth(1).unwrap().to_string()
}

#[tokio::test]
async fn start_returns_hop_url_and_auth_carries_challenge() {
    let h = harness().await;

    let url = h.coordinator.start(discord("101")).await.unwrap();
    assert!(url.starts_with(&format!("{}/v1/auth?token=", PUBLIC_URL)));

    let token = token_from(&url);
    let auth_url = h.coordinator.auth_redirect(&token).await.unwrap();
    assert!(auth_url.contains(&format!("state={}", token)));
    assert!(auth_url.contains("code_challenge="));
    assert!(auth_url.contains("code_challenge_method=S256"));

    // The raw verifier never appears in either URL
    let challenge = h.idp.challenges.lock().unwrap()[0].clone();
    assert!(!url.contains(&challenge));
}

#[tokio::test]
async fn start_rejects_empty_discord_id() {
    let h = harness().await;
    let result = h.coordinator.start(discord("")).await;
    assert!(matches!(result, Err(LinkerError::Validation(_))));
}

#[tokio::test]
async fn auth_redirect_for_unknown_token_is_not_found() {
    let h = harness().await;
    let result = h.coordinator.auth_redirect("no-such-token").await;
    assert!(matches!(result, Err(LinkerError::FlowNotFound)));
}

#[tokio::test]
async fn callback_creates_active_link() {
    let h = harness().await;

    let url = h.coordinator.start(discord("101")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();

    let outcome = h.coordinator.callback("auth-code", &token).await.unwrap();
    assert_eq!(outcome.discord.id, "101");
    assert_eq!(outcome.wikidot.id, 7001);
    assert_eq!(outcome.link.status, LinkStatus::Active);

    let active = h.links.active_wikidot_accounts("101").await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, 7001);
}

#[tokio::test]
async fn replayed_callback_is_rejected_without_second_exchange() {
    let h = harness().await;

    let url = h.coordinator.start(discord("101")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();

    h.coordinator.callback("auth-code", &token).await.unwrap();
    assert_eq!(h.idp.exchanges(), 1);

    let replay = h.coordinator.callback("auth-code", &token).await;
    assert!(matches!(replay, Err(LinkerError::ReplayedCallback)));
    assert_eq!(h.idp.exchanges(), 1);
}

#[tokio::test]
async fn callback_with_unknown_state_is_not_found() {
    let h = harness().await;
    let result = h.coordinator.callback("auth-code", "forged-state").await;
    assert!(matches!(result, Err(LinkerError::FlowNotFound)));
}

#[tokio::test]
async fn concurrent_callbacks_exactly_one_wins() {
    let h = Arc::new(harness().await);

    let url = h.coordinator.start(discord("101")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let h = h.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            h.coordinator.callback("auth-code", &token).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(h.idp.exchanges(), 1);
    assert_eq!(h.links.active_wikidot_accounts("101").await.unwrap().len(), 1);
}

#[tokio::test]
async fn provider_failure_leaves_flow_retryable() {
    let h = harness().await;

    let url = h.coordinator.start(discord("101")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();

    h.idp
        .fail_next(LinkerError::IdentityProvider("upstream timeout".into()));
    let first = h.coordinator.callback("auth-code", &token).await;
    assert!(matches!(first, Err(LinkerError::IdentityProvider(_))));

    // Flow is still pending, so a retry with the same state succeeds
    let retry = h.coordinator.callback("auth-code", &token).await.unwrap();
    assert_eq!(retry.link.status, LinkStatus::Active);
}

#[tokio::test]
async fn terminal_provider_error_spends_the_flow() {
    let h = harness().await;

    let url = h.coordinator.start(discord("101")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();

    h.idp
        .fail_next(LinkerError::Authentication("bad verifier".into()));
    let first = h.coordinator.callback("auth-code", &token).await;
    assert!(matches!(first, Err(LinkerError::Authentication(_))));

    let second = h.coordinator.callback("auth-code", &token).await;
    assert!(matches!(second, Err(LinkerError::ReplayedCallback)));
}

#[tokio::test]
async fn callback_after_existing_link_is_idempotent() {
    let h = harness().await;

    // First flow establishes the link
    let url = h.coordinator.start(discord("101")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();
    let first: AccountLink = h
        .coordinator
        .callback("auth-code", &token)
        .await
        .unwrap()
        .link;

    // Second flow for the same pair returns the same link row
    let url = h.coordinator.start(discord("101")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();
    let second = h
        .coordinator
        .callback("auth-code-2", &token)
        .await
        .unwrap()
        .link;

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
}

#[tokio::test]
async fn callback_for_wikidot_claimed_elsewhere_conflicts_but_spends_the_flow() {
    let h = harness().await;

    let url = h.coordinator.start(discord("101")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();
    h.coordinator.callback("auth-code", &token).await.unwrap();

    // A different Discord identity tries to claim the same Wikidot account
    let url = h.coordinator.start(discord("202")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();

    let result = h.coordinator.callback("auth-code", &token).await;
    assert!(matches!(
        result,
        Err(LinkerError::ConflictingLink { wikidot_id: 7001 })
    ));

    // The exchange ran, so replaying the state does not run it again
    let replay = h.coordinator.callback("auth-code", &token).await;
    assert!(matches!(replay, Err(LinkerError::ReplayedCallback)));
}

#[tokio::test]
async fn recheck_reports_active_accounts_and_refreshes_profile() {
    let h = harness().await;

    let url = h.coordinator.start(discord("101")).await.unwrap();
    let token = token_from(&url);
    h.coordinator.auth_redirect(&token).await.unwrap();
    h.coordinator.callback("auth-code", &token).await.unwrap();

    let mut updated = discord("101");
    updated.username = "renamed".into();
    let active = h.coordinator.recheck(updated).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, 7001);

    let stored = h.links.get_discord("101").await.unwrap().unwrap();
    assert_eq!(stored.username, "renamed");

    // Unlinking empties the recheck projection
    h.links.unlink("101", 7001).await.unwrap();
    let active = h.coordinator.recheck(discord("101")).await.unwrap();
    assert!(active.is_empty());
}
