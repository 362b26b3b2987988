/// Permission levels and privilege actions
///
/// A user carries a global level plus, per site, an optional override. The
/// effective level is the override when present, otherwise the global level;
/// an override can lower access as well as raise it.
use crate::error::{LinkerError, LinkerResult};
use serde::{Deserialize, Serialize};

/// Totally ordered permission tiers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub enum PermissionLevel {
    Visitor,
    Contributor,
    Moderator,
    Admin,
    SystemAdmin,
}

impl PermissionLevel {
    /// Wire representation shared with the member-management service
    pub fn as_i64(&self) -> i64 {
        match self {
            PermissionLevel::Visitor => 10,
            PermissionLevel::Contributor => 20,
            PermissionLevel::Moderator => 30,
            PermissionLevel::Admin => 40,
            PermissionLevel::SystemAdmin => 50,
        }
    }

    pub fn from_i64(value: i64) -> LinkerResult<Self> {
        match value {
            10 => Ok(PermissionLevel::Visitor),
            20 => Ok(PermissionLevel::Contributor),
            30 => Ok(PermissionLevel::Moderator),
            40 => Ok(PermissionLevel::Admin),
            50 => Ok(PermissionLevel::SystemAdmin),
            other => Err(LinkerError::Validation(format!(
                "Invalid permission level: {}",
                other
            ))),
        }
    }
}

impl From<PermissionLevel> for i64 {
    fn from(level: PermissionLevel) -> i64 {
        level.as_i64()
    }
}

impl TryFrom<i64> for PermissionLevel {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        PermissionLevel::from_i64(value).map_err(|e| e.to_string())
    }
}

/// Resolve the effective level from a global level and a per-site override.
pub fn effective_level(
    global: PermissionLevel,
    site_override: Option<PermissionLevel>,
) -> PermissionLevel {
    site_override.unwrap_or(global)
}

/// Whether the effective level meets a threshold under the total order.
pub fn has_permission(
    global: PermissionLevel,
    site_override: Option<PermissionLevel>,
    threshold: PermissionLevel,
) -> bool {
    effective_level(global, site_override) >= threshold
}

/// Site membership state a privilege action is validated against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMember {
    pub site_id: i64,
    pub user_id: i64,
    pub is_resigned: bool,
    pub site_permission_level: Option<PermissionLevel>,
    pub global_permission_level: PermissionLevel,
}

impl SiteMember {
    pub fn effective_level(&self) -> PermissionLevel {
        effective_level(self.global_permission_level, self.site_permission_level)
    }
}

/// Named privilege-change actions; never arbitrary level writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeAction {
    /// Raise the site override one tier
    Promote,
    /// Lower the site override one tier
    Demote,
    /// Step down from the site entirely
    Resign,
    /// Return after a resignation
    Reinstate,
}

impl PrivilegeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivilegeAction::Promote => "promote",
            PrivilegeAction::Demote => "demote",
            PrivilegeAction::Resign => "resign",
            PrivilegeAction::Reinstate => "reinstate",
        }
    }

    pub fn parse(s: &str) -> LinkerResult<Self> {
        match s {
            "promote" => Ok(PrivilegeAction::Promote),
            "demote" => Ok(PrivilegeAction::Demote),
            "resign" => Ok(PrivilegeAction::Resign),
            "reinstate" => Ok(PrivilegeAction::Reinstate),
            other => Err(LinkerError::InvalidPrivilegeAction {
                action: other.to_string(),
                reason: "unknown action".to_string(),
            }),
        }
    }

    /// Validate the action against the member's current state and return the
    /// resulting member. Each action is valid only from specific states.
    pub fn apply(&self, member: &SiteMember) -> LinkerResult<SiteMember> {
        let invalid = |reason: &str| LinkerError::InvalidPrivilegeAction {
            action: self.as_str().to_string(),
            reason: reason.to_string(),
        };

        match self {
            PrivilegeAction::Promote => {
                if member.is_resigned {
                    return Err(invalid("member has resigned"));
                }
                let next = match member.effective_level() {
                    PermissionLevel::Visitor => PermissionLevel::Contributor,
                    PermissionLevel::Contributor => PermissionLevel::Moderator,
                    PermissionLevel::Moderator => PermissionLevel::Admin,
                    PermissionLevel::Admin | PermissionLevel::SystemAdmin => {
                        return Err(invalid("already at the highest site tier"));
                    }
                };
                Ok(SiteMember {
                    site_permission_level: Some(next),
                    ..member.clone()
                })
            }
            PrivilegeAction::Demote => {
                if member.is_resigned {
                    return Err(invalid("member has resigned"));
                }
                let next = match member.effective_level() {
                    PermissionLevel::Admin => PermissionLevel::Moderator,
                    PermissionLevel::Moderator => PermissionLevel::Contributor,
                    PermissionLevel::Contributor => PermissionLevel::Visitor,
                    PermissionLevel::Visitor => {
                        return Err(invalid("already at the lowest tier"));
                    }
                    PermissionLevel::SystemAdmin => {
                        return Err(invalid("system administrators are managed globally"));
                    }
                };
                Ok(SiteMember {
                    site_permission_level: Some(next),
                    ..member.clone()
                })
            }
            PrivilegeAction::Resign => {
                if member.is_resigned {
                    return Err(invalid("member already resigned"));
                }
                Ok(SiteMember {
                    is_resigned: true,
                    site_permission_level: None,
                    ..member.clone()
                })
            }
            PrivilegeAction::Reinstate => {
                if !member.is_resigned {
                    return Err(invalid("member has not resigned"));
                }
                Ok(SiteMember {
                    is_resigned: false,
                    ..member.clone()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(
        global: PermissionLevel,
        site: Option<PermissionLevel>,
        is_resigned: bool,
    ) -> SiteMember {
        SiteMember {
            site_id: 1,
            user_id: 7,
            is_resigned,
            site_permission_level: site,
            global_permission_level: global,
        }
    }

    #[test]
    fn level_order_is_total() {
        assert!(PermissionLevel::SystemAdmin > PermissionLevel::Admin);
        assert!(PermissionLevel::Admin > PermissionLevel::Moderator);
        assert!(PermissionLevel::Moderator > PermissionLevel::Contributor);
        assert!(PermissionLevel::Contributor > PermissionLevel::Visitor);
    }

    #[test]
    fn wire_values_round_trip() {
        for level in [
            PermissionLevel::Visitor,
            PermissionLevel::Contributor,
            PermissionLevel::Moderator,
            PermissionLevel::Admin,
            PermissionLevel::SystemAdmin,
        ] {
            assert_eq!(PermissionLevel::from_i64(level.as_i64()).unwrap(), level);
        }
        assert!(PermissionLevel::from_i64(25).is_err());
    }

    #[test]
    fn override_replaces_global_never_maxes() {
        // Override raises
        assert_eq!(
            effective_level(PermissionLevel::Visitor, Some(PermissionLevel::Admin)),
            PermissionLevel::Admin
        );
        // Override lowers
        assert_eq!(
            effective_level(PermissionLevel::Admin, Some(PermissionLevel::Visitor)),
            PermissionLevel::Visitor
        );
        // Absent override falls back to global
        assert_eq!(
            effective_level(PermissionLevel::Moderator, None),
            PermissionLevel::Moderator
        );
    }

    #[test]
    fn threshold_check_uses_effective_level() {
        assert!(has_permission(
            PermissionLevel::Visitor,
            Some(PermissionLevel::Moderator),
            PermissionLevel::Moderator
        ));
        assert!(!has_permission(
            PermissionLevel::Admin,
            Some(PermissionLevel::Visitor),
            PermissionLevel::Moderator
        ));
        assert!(has_permission(
            PermissionLevel::Admin,
            None,
            PermissionLevel::Moderator
        ));
    }

    #[test]
    fn resign_only_once() {
        let m = member(PermissionLevel::Contributor, None, false);
        let resigned = PrivilegeAction::Resign.apply(&m).unwrap();
        assert!(resigned.is_resigned);
        assert!(resigned.site_permission_level.is_none());

        let err = PrivilegeAction::Resign.apply(&resigned).unwrap_err();
        assert!(matches!(err, LinkerError::InvalidPrivilegeAction { .. }));
    }

    #[test]
    fn reinstate_requires_resignation() {
        let m = member(PermissionLevel::Contributor, None, false);
        assert!(PrivilegeAction::Reinstate.apply(&m).is_err());

        let resigned = PrivilegeAction::Resign.apply(&m).unwrap();
        let back = PrivilegeAction::Reinstate.apply(&resigned).unwrap();
        assert!(!back.is_resigned);
    }

    #[test]
    fn promote_walks_tiers_and_stops() {
        let m = member(PermissionLevel::Visitor, None, false);
        let m = PrivilegeAction::Promote.apply(&m).unwrap();
        assert_eq!(m.effective_level(), PermissionLevel::Contributor);
        let m = PrivilegeAction::Promote.apply(&m).unwrap();
        assert_eq!(m.effective_level(), PermissionLevel::Moderator);
        let m = PrivilegeAction::Promote.apply(&m).unwrap();
        assert_eq!(m.effective_level(), PermissionLevel::Admin);
        assert!(PrivilegeAction::Promote.apply(&m).is_err());
    }

    #[test]
    fn actions_invalid_while_resigned() {
        let m = member(PermissionLevel::Moderator, None, true);
        assert!(PrivilegeAction::Promote.apply(&m).is_err());
        assert!(PrivilegeAction::Demote.apply(&m).is_err());
    }

    #[test]
    fn unknown_action_string_rejected() {
        assert!(matches!(
            PrivilegeAction::parse("coronate"),
            Err(LinkerError::InvalidPrivilegeAction { .. })
        ));
    }
}
