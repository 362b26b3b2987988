/// Account link models and lifecycle store
pub mod manager;

pub use manager::LinkManager;

use crate::error::{LinkerError, LinkerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Flow started, callback not yet completed
    Pending,
    /// Link established and authoritative
    Active,
    /// Explicitly severed; row kept for audit
    Unlinked,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Pending => "pending",
            LinkStatus::Active => "active",
            LinkStatus::Unlinked => "unlinked",
        }
    }

    pub fn parse(s: &str) -> LinkerResult<Self> {
        match s {
            "pending" => Ok(LinkStatus::Pending),
            "active" => Ok(LinkStatus::Active),
            "unlinked" => Ok(LinkStatus::Unlinked),
            other => Err(LinkerError::Internal(format!(
                "Invalid link status in store: {}",
                other
            ))),
        }
    }
}

/// Discord identity snapshot supplied by the caller at flow time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordAccount {
    pub id: String,
    pub username: String,
    pub avatar: String,
}

/// Wikidot identity as returned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikidotAccount {
    pub id: i64,
    pub username: String,
    pub unixname: String,
    pub is_jp_member: bool,
}

/// A Discord ↔ Wikidot association record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLink {
    pub id: i64,
    pub discord_id: String,
    pub wikidot_id: i64,
    pub status: LinkStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub unlinked_at: Option<DateTime<Utc>>,
}

/// Wikidot account joined with its link row, for administrative dumps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedWikidotAccount {
    pub id: i64,
    pub username: String,
    pub unixname: String,
    pub is_jp_member: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub unlinked_at: Option<DateTime<Utc>>,
}

/// Discord account joined with its link row, for administrative dumps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedDiscordAccount {
    pub id: String,
    pub username: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub unlinked_at: Option<DateTime<Utc>>,
}
