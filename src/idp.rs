/// Wikidot identity-provider client
///
/// Builds the authorization URL for the redirect leg and exchanges an
/// authorization code plus code verifier for identity claims. The exchange
/// sits behind a trait so flow tests can substitute a mock provider.
use crate::{
    config::IdpConfig,
    error::{LinkerError, LinkerResult},
    link::WikidotAccount,
    pkce::ChallengeMethod,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Seam between the flow coordinator and the remote provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the provider authorization URL for one flow attempt
    fn authorization_url(
        &self,
        state: &str,
        code_challenge: &str,
        method: ChallengeMethod,
    ) -> String;

    /// Exchange `code` + `code_verifier` for the account claims
    async fn exchange_code(&self, code: &str, code_verifier: &str)
        -> LinkerResult<WikidotAccount>;
}

/// Request body for the token/user endpoint
#[derive(Debug, Serialize)]
struct UserExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    code_verifier: &'a str,
    grant_type: &'a str,
    redirect_uri: &'a str,
}

/// Claims returned by the provider's user endpoint
#[derive(Debug, Deserialize)]
struct UserInfo {
    id: i64,
    name: String,
    unix_name: String,
    #[serde(default)]
    is_jp_member: bool,
}

/// HTTP client for the Wikidot identity provider
#[derive(Clone)]
pub struct WikidotIdp {
    config: IdpConfig,
    http_client: reqwest::Client,
}

impl WikidotIdp {
    pub fn new(config: IdpConfig) -> LinkerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LinkerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl IdentityProvider for WikidotIdp {
    fn authorization_url(
        &self,
        state: &str,
        code_challenge: &str,
        method: ChallengeMethod,
    ) -> String {
        format!(
            "{}/authorize?response_type=code&client_id={}&redirect_uri={}&scope=identify&state={}&code_challenge={}&code_challenge_method={}",
            self.config.endpoint,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
            method.as_str(),
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> LinkerResult<WikidotAccount> {
        let response = self
            .http_client
            .post(format!("{}/user", self.config.endpoint))
            .json(&UserExchangeRequest {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                code,
                code_verifier,
                grant_type: "authorization_code",
                redirect_uri: &self.config.redirect_uri,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LinkerError::IdentityProvider("Token exchange timed out".to_string())
                } else {
                    LinkerError::IdentityProvider(format!("Token exchange failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkerError::IdentityProvider(format!(
                "Token exchange returned {}",
                status
            )));
        }

        let userinfo: UserInfo = response
            .json()
            .await
            .map_err(|e| LinkerError::IdentityProvider(format!("Invalid user response: {}", e)))?;

        Ok(WikidotAccount {
            id: userinfo.id,
            username: userinfo.name,
            unixname: userinfo.unix_name,
            is_jp_member: userinfo.is_jp_member,
        })
    }
}
