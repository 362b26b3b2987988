/// Authorization flow coordinator
///
/// Drives one linking attempt: START hands out a hop URL bound to a fresh
/// PKCE verifier and CSRF state token, AUTH redirects to the provider,
/// CALLBACK validates the returned state, exchanges the code and activates
/// the link. RECHECK is a read-only projection for cached authorization
/// decisions.
use crate::{
    error::{LinkerError, LinkerResult},
    flow::store::{ConsumeOutcome, FlowStateStore},
    idp::IdentityProvider,
    link::{AccountLink, DiscordAccount, LinkManager, WikidotAccount},
    pkce::{self, ChallengeMethod},
};
use std::sync::Arc;

/// Outcome of a successful callback exchange
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub discord: DiscordAccount,
    pub wikidot: WikidotAccount,
    pub link: AccountLink,
}

pub struct FlowCoordinator {
    store: FlowStateStore,
    links: LinkManager,
    idp: Arc<dyn IdentityProvider>,
    public_url: String,
    method: ChallengeMethod,
}

impl FlowCoordinator {
    pub fn new(
        store: FlowStateStore,
        links: LinkManager,
        idp: Arc<dyn IdentityProvider>,
        public_url: String,
        method: ChallengeMethod,
    ) -> Self {
        Self {
            store,
            links,
            idp,
            public_url,
            method,
        }
    }

    /// Begin a linking attempt for a Discord account.
    ///
    /// Returns the linker-hosted hop URL the user must visit. The actual
    /// provider redirect happens in `auth_redirect` so the verifier never
    /// leaves this process.
    pub async fn start(&self, discord: DiscordAccount) -> LinkerResult<String> {
        if discord.id.is_empty() {
            return Err(LinkerError::Validation(
                "Discord account id cannot be empty".to_string(),
            ));
        }

        self.links.upsert_discord(&discord).await?;

        let code_verifier = pkce::generate_verifier();
        let state = pkce::generate_state_token();
        self.store
            .insert(state.clone(), code_verifier, discord)
            .await;

        tracing::info!(state = %state, "linking flow started");

        Ok(format!("{}/v1/auth?token={}", self.public_url, state))
    }

    /// Resolve a hop token into the provider authorization URL
    pub async fn auth_redirect(&self, token: &str) -> LinkerResult<String> {
        let flow = self.store.peek(token).await.ok_or(LinkerError::FlowNotFound)?;

        let challenge = pkce::derive_challenge(&flow.code_verifier, self.method);
        Ok(self.idp.authorization_url(token, &challenge, self.method))
    }

    /// Complete a linking attempt from the provider redirect.
    ///
    /// Exactly one of several concurrent callbacks for the same state wins;
    /// the rest observe `ReplayedCallback` or `FlowNotFound`. A provider
    /// failure leaves the flow pending until its TTL, permitting one retry.
    pub async fn callback(&self, code: &str, state: &str) -> LinkerResult<CallbackOutcome> {
        let flow = match self.store.consume(state).await {
            ConsumeOutcome::Pending(flow) => flow,
            ConsumeOutcome::Replayed => return Err(LinkerError::ReplayedCallback),
            ConsumeOutcome::NotFound => return Err(LinkerError::FlowNotFound),
        };

        let wikidot = match self.idp.exchange_code(code, &flow.code_verifier).await {
            Ok(wikidot) => wikidot,
            Err(e) if e.is_retryable() => {
                // Keep the attempt alive for a retry within the TTL
                self.store.restore(state.to_string(), flow).await;
                return Err(e);
            }
            Err(e) => {
                self.store
                    .mark_completed(state.to_string(), flow.expires_at)
                    .await;
                return Err(e);
            }
        };

        self.links.upsert_wikidot(&wikidot).await?;

        let link_result = self.links.link(&flow.discord.id, wikidot.id).await;
        // The exchange is spent either way; replays must not run it again
        self.store
            .mark_completed(state.to_string(), flow.expires_at)
            .await;
        let link = link_result?;

        tracing::info!(
            discord_id = %flow.discord.id,
            wikidot_id = wikidot.id,
            "linking flow completed"
        );

        Ok(CallbackOutcome {
            discord: flow.discord,
            wikidot,
            link,
        })
    }

    /// Current active links for a Discord account; refreshes the stored
    /// identity snapshot but never touches link state.
    pub async fn recheck(&self, discord: DiscordAccount) -> LinkerResult<Vec<WikidotAccount>> {
        self.links.upsert_discord(&discord).await?;
        self.links.active_wikidot_accounts(&discord.id).await
    }
}
