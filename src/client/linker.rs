/// Typed client for the linker service surface
///
/// The wire schemas here are shared with the server handlers in `api` so
/// the two sides cannot drift apart.
use crate::{
    client::ApiTransport,
    error::LinkerResult,
    link::{AccountLink, DiscordAccount, LinkedDiscordAccount, LinkedWikidotAccount, WikidotAccount},
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStartRequest {
    pub discord: DiscordAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStartResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecheckRequest {
    pub discord: DiscordAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecheckResponse {
    pub discord: DiscordAccount,
    pub wikidot: Vec<WikidotAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub discord: DiscordAccount,
    pub wikidot: WikidotAccount,
    pub link: AccountLink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountListRequest {
    pub discord_ids: Vec<String>,
}

/// Accounts related to one Discord identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAccounts {
    pub discord: DiscordAccount,
    pub wikidot: Vec<WikidotAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountListResponse {
    pub result: HashMap<String, LinkedAccounts>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordDumpItem {
    pub discord: DiscordAccount,
    pub wikidot: Vec<LinkedWikidotAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDiscordResponse {
    pub result: Vec<DiscordDumpItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikidotDumpItem {
    pub discord: Vec<LinkedDiscordAccount>,
    pub wikidot: WikidotAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListWikidotResponse {
    pub result: Vec<WikidotDumpItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthcheckResponse {
    pub status: String,
    pub version: String,
}

/// Client for the account-linker API
#[derive(Clone)]
pub struct LinkerApiClient {
    transport: ApiTransport,
}

impl LinkerApiClient {
    pub fn new(base_url: &str, api_key: &str) -> LinkerResult<Self> {
        Ok(Self {
            transport: ApiTransport::new(base_url, api_key, 30)?,
        })
    }

    /// Begin a linking flow; returns the URL the user must visit
    pub async fn flow_start(&self, discord: DiscordAccount) -> LinkerResult<FlowStartResponse> {
        self.transport
            .request(
                Method::POST,
                "/v1/start",
                &[],
                Some(&FlowStartRequest { discord }),
            )
            .await
    }

    /// Resolve a hop token into the provider authorization URL
    pub async fn flow_auth(&self, token: &str) -> LinkerResult<String> {
        self.transport
            .get_redirect("/v1/auth", &[("token", token.to_string())])
            .await
    }

    /// Complete a flow from the provider redirect parameters
    pub async fn flow_callback(&self, code: &str, state: &str) -> LinkerResult<CallbackResponse> {
        self.transport
            .request::<CallbackResponse, ()>(
                Method::GET,
                "/v1/callback",
                &[("code", code.to_string()), ("state", state.to_string())],
                None,
            )
            .await
    }

    /// Refresh the current link set for a Discord account
    pub async fn flow_recheck(&self, discord: DiscordAccount) -> LinkerResult<FlowRecheckResponse> {
        self.transport
            .request(
                Method::POST,
                "/v1/recheck",
                &[],
                Some(&FlowRecheckRequest { discord }),
            )
            .await
    }

    /// Batch lookup of accounts for many Discord ids in one request
    pub async fn account_list(
        &self,
        discord_ids: Vec<String>,
    ) -> LinkerResult<AccountListResponse> {
        self.transport
            .request(
                Method::POST,
                "/v1/list",
                &[],
                Some(&AccountListRequest { discord_ids }),
            )
            .await
    }

    /// Administrative dump keyed by Discord account
    pub async fn discord_account_list(&self) -> LinkerResult<ListDiscordResponse> {
        self.transport
            .request::<ListDiscordResponse, ()>(Method::GET, "/v1/list/discord", &[], None)
            .await
    }

    /// Administrative dump keyed by Wikidot account
    pub async fn wikidot_account_list(&self) -> LinkerResult<ListWikidotResponse> {
        self.transport
            .request::<ListWikidotResponse, ()>(Method::GET, "/v1/list/wikidot", &[], None)
            .await
    }

    /// Sever an active link
    pub async fn unlink_account(
        &self,
        discord_id: &str,
        wikidot_id: i64,
    ) -> LinkerResult<AccountLink> {
        self.transport
            .request::<AccountLink, ()>(
                Method::PATCH,
                "/v1/unlink",
                &[
                    ("discord_id", discord_id.to_string()),
                    ("wikidot_id", wikidot_id.to_string()),
                ],
                None,
            )
            .await
    }

    /// Restore a previously unlinked pair
    pub async fn relink_account(
        &self,
        discord_id: &str,
        wikidot_id: i64,
    ) -> LinkerResult<AccountLink> {
        self.transport
            .request::<AccountLink, ()>(
                Method::PATCH,
                "/v1/relink",
                &[
                    ("discord_id", discord_id.to_string()),
                    ("wikidot_id", wikidot_id.to_string()),
                ],
                None,
            )
            .await
    }

    pub async fn healthcheck(&self) -> LinkerResult<HealthcheckResponse> {
        self.transport
            .request::<HealthcheckResponse, ()>(Method::GET, "/system/healthcheck/", &[], None)
            .await
    }
}
