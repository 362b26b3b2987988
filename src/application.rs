/// Site application (membership request) review workflow
use crate::{
    error::{LinkerError, LinkerResult},
    permission::{has_permission, PermissionLevel},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application lifecycle states.
///
/// No ordering is defined; the numeric codes are wire values only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Declined,
    /// Terminal state reached out-of-band (e.g. external withdrawal);
    /// never set by the approve/decline operations
    CancelledOrMissing,
}

impl ApplicationStatus {
    pub fn as_i64(&self) -> i64 {
        match self {
            ApplicationStatus::Pending => 0,
            ApplicationStatus::Approved => 1,
            ApplicationStatus::Declined => 2,
            ApplicationStatus::CancelledOrMissing => 9,
        }
    }

    pub fn from_i64(value: i64) -> LinkerResult<Self> {
        match value {
            0 => Ok(ApplicationStatus::Pending),
            1 => Ok(ApplicationStatus::Approved),
            2 => Ok(ApplicationStatus::Declined),
            9 => Ok(ApplicationStatus::CancelledOrMissing),
            other => Err(LinkerError::Validation(format!(
                "Invalid application status: {}",
                other
            ))),
        }
    }
}

impl From<ApplicationStatus> for i64 {
    fn from(status: ApplicationStatus) -> i64 {
        status.as_i64()
    }
}

impl TryFrom<i64> for ApplicationStatus {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        ApplicationStatus::from_i64(value).map_err(|e| e.to_string())
    }
}

/// Closed catalogue of decline reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum DeclineReasonType {
    IncorrectPassword,
    ReasonNotSpecifiedOrInappropriate,
    RolePlaying,
    IncorrectJapanese,
    ContainingSensitiveInformation,
    ForContact,
    Other,
}

impl DeclineReasonType {
    pub fn as_i64(&self) -> i64 {
        match self {
            DeclineReasonType::IncorrectPassword => 1,
            DeclineReasonType::ReasonNotSpecifiedOrInappropriate => 2,
            DeclineReasonType::RolePlaying => 3,
            DeclineReasonType::IncorrectJapanese => 4,
            DeclineReasonType::ContainingSensitiveInformation => 5,
            DeclineReasonType::ForContact => 6,
            DeclineReasonType::Other => 9,
        }
    }

    pub fn from_i64(value: i64) -> LinkerResult<Self> {
        match value {
            1 => Ok(DeclineReasonType::IncorrectPassword),
            2 => Ok(DeclineReasonType::ReasonNotSpecifiedOrInappropriate),
            3 => Ok(DeclineReasonType::RolePlaying),
            4 => Ok(DeclineReasonType::IncorrectJapanese),
            5 => Ok(DeclineReasonType::ContainingSensitiveInformation),
            6 => Ok(DeclineReasonType::ForContact),
            9 => Ok(DeclineReasonType::Other),
            other => Err(LinkerError::Validation(format!(
                "Invalid decline reason type: {}",
                other
            ))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeclineReasonType::IncorrectPassword => "incorrect password",
            DeclineReasonType::ReasonNotSpecifiedOrInappropriate => {
                "reason not specified or inappropriate"
            }
            DeclineReasonType::RolePlaying => "role playing",
            DeclineReasonType::IncorrectJapanese => "incorrect japanese",
            DeclineReasonType::ContainingSensitiveInformation => {
                "containing sensitive information"
            }
            DeclineReasonType::ForContact => "for contact",
            DeclineReasonType::Other => "other",
        }
    }

    pub fn all() -> [DeclineReasonType; 7] {
        [
            DeclineReasonType::IncorrectPassword,
            DeclineReasonType::ReasonNotSpecifiedOrInappropriate,
            DeclineReasonType::RolePlaying,
            DeclineReasonType::IncorrectJapanese,
            DeclineReasonType::ContainingSensitiveInformation,
            DeclineReasonType::ForContact,
            DeclineReasonType::Other,
        ]
    }
}

impl From<DeclineReasonType> for i64 {
    fn from(reason: DeclineReasonType) -> i64 {
        reason.as_i64()
    }
}

impl TryFrom<i64> for DeclineReasonType {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        DeclineReasonType::from_i64(value).map_err(|e| e.to_string())
    }
}

/// A site membership application under review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteApplication {
    pub id: i64,
    pub site_id: i64,
    pub user_id: i64,
    pub status: ApplicationStatus,
    pub text: String,
    pub acquired_at: DateTime<Utc>,
    pub decline_reason_type: Option<DeclineReasonType>,
    pub decline_reason_detail: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<i64>,
}

/// Reviewer identity and permission snapshot
#[derive(Debug, Clone)]
pub struct Reviewer {
    pub user_id: i64,
    pub global_level: PermissionLevel,
    pub site_override: Option<PermissionLevel>,
}

/// Minimum effective level required to review applications
pub const REVIEW_THRESHOLD: PermissionLevel = PermissionLevel::Moderator;

impl SiteApplication {
    fn check_reviewable(&self, reviewer: &Reviewer) -> LinkerResult<()> {
        if !has_permission(
            reviewer.global_level,
            reviewer.site_override,
            REVIEW_THRESHOLD,
        ) {
            return Err(LinkerError::Forbidden(format!(
                "Reviewer {} lacks the required permission level",
                reviewer.user_id
            )));
        }

        if self.status != ApplicationStatus::Pending {
            return Err(LinkerError::Conflict(format!(
                "Application {} is not pending",
                self.id
            )));
        }

        Ok(())
    }

    /// Approve a pending application
    pub fn approve(&self, reviewer: &Reviewer) -> LinkerResult<SiteApplication> {
        self.check_reviewable(reviewer)?;

        Ok(SiteApplication {
            status: ApplicationStatus::Approved,
            reviewed_at: Some(Utc::now()),
            reviewed_by: Some(reviewer.user_id),
            ..self.clone()
        })
    }

    /// Decline a pending application with a typed reason
    pub fn decline(
        &self,
        reviewer: &Reviewer,
        reason_type: DeclineReasonType,
        reason_detail: String,
    ) -> LinkerResult<SiteApplication> {
        self.check_reviewable(reviewer)?;

        Ok(SiteApplication {
            status: ApplicationStatus::Declined,
            decline_reason_type: Some(reason_type),
            decline_reason_detail: Some(reason_detail),
            reviewed_at: Some(Utc::now()),
            reviewed_by: Some(reviewer.user_id),
            ..self.clone()
        })
    }
}
