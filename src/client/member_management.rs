/// Typed client for the member-management service
use crate::{
    application::{ApplicationStatus, DeclineReasonType},
    client::{ApiTransport, ListParams},
    error::LinkerResult,
    permission::{PermissionLevel, PrivilegeAction},
};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteCreate {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteUpdate {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteWithMembersCount {
    pub id: i64,
    pub name: String,
    pub members_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMemberCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMembersStats {
    pub current_count: i64,
    pub daily_counts: Vec<DailyMemberCount>,
}

/// Site membership row as the service renders it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMemberRecord {
    pub id: i64,
    pub site_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub is_resigned: bool,
    pub site_permission_level: Option<PermissionLevel>,
    pub effective_permission_level: PermissionLevel,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub unix_name: String,
    pub avatar_url: String,
    #[serde(default)]
    pub is_deleted: bool,
    pub permission_level: PermissionLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub id: i64,
    pub name: String,
    pub unix_name: String,
    pub avatar_url: String,
    pub is_deleted: bool,
    pub permission_level: PermissionLevel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unix_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_level: Option<PermissionLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithSiteMemberships {
    pub id: i64,
    pub name: String,
    pub unix_name: String,
    pub avatar_url: String,
    #[serde(default)]
    pub is_deleted: bool,
    pub permission_level: PermissionLevel,
    pub site_memberships: Vec<SiteMemberRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationPassword {
    pub id: i64,
    pub site_id: i64,
    pub password: String,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteApplicationWithDetails {
    pub id: i64,
    pub status: ApplicationStatus,
    pub acquired_at: DateTime<Utc>,
    pub text: String,
    pub decline_reason_type: Option<DeclineReasonType>,
    pub decline_reason_detail: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<serde_json::Value>,
    pub site: serde_json::Value,
    pub user: serde_json::Value,
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatus {
    pub name: String,
    pub next_run_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusesResponse {
    pub statuses: Vec<BatchStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchForceStartResponse {
    pub status: String,
}

/// Optional filters for the user list endpoint
#[derive(Debug, Clone, Default)]
pub struct UserFilters {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub unix_name: Option<String>,
    pub permission_levels: Option<Vec<PermissionLevel>>,
    pub is_deleted: Option<bool>,
    pub site_ids: Option<Vec<i64>>,
}

/// Optional filters for the application-password list endpoint
#[derive(Debug, Clone, Default)]
pub struct ApplicationPasswordFilters {
    pub site_id: Option<i64>,
    pub password: Option<String>,
    pub is_enabled: Option<bool>,
}

/// Optional filters for the application-request list endpoint
#[derive(Debug, Clone, Default)]
pub struct ApplicationRequestFilters {
    pub user_id: Option<i64>,
    pub site_id: Option<i64>,
    pub statuses: Option<Vec<ApplicationStatus>>,
    pub decline_reason_types: Option<Vec<DeclineReasonType>>,
}

#[derive(Debug, Serialize)]
struct PermissionUpdateBody {
    permission_level: PermissionLevel,
}

#[derive(Debug, Serialize)]
struct SitePermissionUpdateBody {
    site_permission_level: PermissionLevel,
}

#[derive(Debug, Serialize)]
struct PrivilegeActionBody<'a> {
    action: &'a str,
}

#[derive(Debug, Serialize)]
struct ApplicationApproveBody {
    reviewer_id: i64,
}

#[derive(Debug, Serialize)]
struct ApplicationDeclineBody {
    reviewer_id: i64,
    decline_reason_type: DeclineReasonType,
    decline_reason_detail: String,
}

#[derive(Debug, Deserialize)]
struct HasPermissionResponse {
    has_permission: bool,
}

/// Client for the member-management API
#[derive(Clone)]
pub struct MemberManagementApiClient {
    transport: ApiTransport,
}

impl MemberManagementApiClient {
    pub fn new(base_url: &str, api_key: &str) -> LinkerResult<Self> {
        Ok(Self {
            transport: ApiTransport::new(base_url, api_key, 30)?,
        })
    }

    // System endpoints

    pub async fn get_batch_status(&self) -> LinkerResult<BatchStatusesResponse> {
        self.transport
            .request::<BatchStatusesResponse, ()>(
                Method::GET,
                "/v1/system/batch/status",
                &[],
                None,
            )
            .await
    }

    pub async fn force_start_batch(&self, task_name: &str) -> LinkerResult<BatchForceStartResponse> {
        self.transport
            .request::<BatchForceStartResponse, ()>(
                Method::POST,
                &format!("/v1/system/batch/force_start/{}", task_name),
                &[],
                None,
            )
            .await
    }

    // Sites

    pub async fn get_sites(&self) -> LinkerResult<Vec<SiteWithMembersCount>> {
        self.transport
            .request::<Vec<SiteWithMembersCount>, ()>(Method::GET, "/v1/sites/", &[], None)
            .await
    }

    pub async fn create_site(&self, site_id: i64, name: &str) -> LinkerResult<Site> {
        self.transport
            .request(
                Method::POST,
                "/v1/sites/",
                &[],
                Some(&SiteCreate {
                    id: site_id,
                    name: name.to_string(),
                }),
            )
            .await
    }

    pub async fn update_site(&self, site_id: i64, name: &str) -> LinkerResult<Site> {
        self.transport
            .request(
                Method::PATCH,
                &format!("/v1/sites/{}", site_id),
                &[],
                Some(&SiteUpdate {
                    name: name.to_string(),
                }),
            )
            .await
    }

    pub async fn get_site_members_stats(
        &self,
        site_id: i64,
        from_date: Option<&str>,
        to_date: Option<&str>,
    ) -> LinkerResult<SiteMembersStats> {
        let mut query = Vec::new();
        if let Some(from_date) = from_date {
            query.push(("from_date", from_date.to_string()));
        }
        if let Some(to_date) = to_date {
            query.push(("to_date", to_date.to_string()));
        }

        self.transport
            .request::<SiteMembersStats, ()>(
                Method::GET,
                &format!("/v1/sites/{}/members/stats", site_id),
                &query,
                None,
            )
            .await
    }

    pub async fn update_site_member_permission(
        &self,
        site_id: i64,
        user_id: i64,
        site_permission_level: PermissionLevel,
    ) -> LinkerResult<SiteMemberRecord> {
        self.transport
            .request(
                Method::PATCH,
                &format!("/v1/sites/{}/members/{}/permission", site_id, user_id),
                &[],
                Some(&SitePermissionUpdateBody {
                    site_permission_level,
                }),
            )
            .await
    }

    pub async fn check_site_member_permission(
        &self,
        site_id: i64,
        user_id: i64,
        permission_level: PermissionLevel,
    ) -> LinkerResult<bool> {
        let response: HasPermissionResponse = self
            .transport
            .request::<HasPermissionResponse, ()>(
                Method::GET,
                &format!("/v1/sites/{}/members/{}/permission/check", site_id, user_id),
                &[("permission_level", permission_level.as_i64().to_string())],
                None,
            )
            .await?;

        Ok(response.has_permission)
    }

    /// Run a named privilege action against a site member.
    ///
    /// Only closed, named actions go over the wire; the service validates
    /// them against the member's current state as well.
    pub async fn change_site_member_privilege(
        &self,
        site_id: i64,
        user_id: i64,
        action: PrivilegeAction,
    ) -> LinkerResult<serde_json::Value> {
        self.transport
            .request(
                Method::POST,
                &format!("/v1/sites/{}/members/{}/privilege", site_id, user_id),
                &[],
                Some(&PrivilegeActionBody {
                    action: action.as_str(),
                }),
            )
            .await
    }

    // Users

    pub async fn create_user(&self, user: UserCreate) -> LinkerResult<User> {
        self.transport
            .request(Method::POST, "/v1/users/", &[], Some(&user))
            .await
    }

    pub async fn get_users(
        &self,
        params: ListParams,
        filters: UserFilters,
    ) -> LinkerResult<Vec<UserWithSiteMemberships>> {
        let mut query = params.to_query();
        if let Some(id) = filters.id {
            query.push(("id", id.to_string()));
        }
        if let Some(name) = filters.name {
            query.push(("name", name));
        }
        if let Some(unix_name) = filters.unix_name {
            query.push(("unix_name", unix_name));
        }
        if let Some(levels) = filters.permission_levels {
            for level in levels {
                query.push(("permission_levels", level.as_i64().to_string()));
            }
        }
        if let Some(is_deleted) = filters.is_deleted {
            query.push(("is_deleted", is_deleted.to_string()));
        }
        if let Some(site_ids) = filters.site_ids {
            for site_id in site_ids {
                query.push(("site_ids", site_id.to_string()));
            }
        }

        self.transport
            .request::<Vec<UserWithSiteMemberships>, ()>(Method::GET, "/v1/users/", &query, None)
            .await
    }

    pub async fn get_user(&self, user_id: i64) -> LinkerResult<UserWithSiteMemberships> {
        self.transport
            .request::<UserWithSiteMemberships, ()>(
                Method::GET,
                &format!("/v1/users/{}", user_id),
                &[],
                None,
            )
            .await
    }

    pub async fn update_user(&self, user_id: i64, update: UserUpdate) -> LinkerResult<User> {
        self.transport
            .request(
                Method::PATCH,
                &format!("/v1/users/{}", user_id),
                &[],
                Some(&update),
            )
            .await
    }

    pub async fn update_user_permission(
        &self,
        user_id: i64,
        permission_level: PermissionLevel,
    ) -> LinkerResult<User> {
        self.transport
            .request(
                Method::PATCH,
                &format!("/v1/users/{}/permission", user_id),
                &[],
                Some(&PermissionUpdateBody { permission_level }),
            )
            .await
    }

    pub async fn check_user_permission(
        &self,
        user_id: i64,
        permission_level: PermissionLevel,
    ) -> LinkerResult<bool> {
        let response: HasPermissionResponse = self
            .transport
            .request::<HasPermissionResponse, ()>(
                Method::GET,
                &format!("/v1/users/{}/permission/check", user_id),
                &[("permission_level", permission_level.as_i64().to_string())],
                None,
            )
            .await?;

        Ok(response.has_permission)
    }

    // Application passwords

    pub async fn create_application_password(
        &self,
        site_id: i64,
        password: &str,
        is_enabled: bool,
    ) -> LinkerResult<ApplicationPassword> {
        #[derive(Serialize)]
        struct Body<'a> {
            site_id: i64,
            password: &'a str,
            is_enabled: bool,
        }

        self.transport
            .request(
                Method::POST,
                "/v1/application/passwords/",
                &[],
                Some(&Body {
                    site_id,
                    password,
                    is_enabled,
                }),
            )
            .await
    }

    pub async fn get_application_passwords(
        &self,
        params: ListParams,
        filters: ApplicationPasswordFilters,
    ) -> LinkerResult<Vec<ApplicationPassword>> {
        let mut query = params.to_query();
        if let Some(site_id) = filters.site_id {
            query.push(("site_id", site_id.to_string()));
        }
        if let Some(password) = filters.password {
            query.push(("password", password));
        }
        if let Some(is_enabled) = filters.is_enabled {
            query.push(("is_enabled", is_enabled.to_string()));
        }

        self.transport
            .request::<Vec<ApplicationPassword>, ()>(
                Method::GET,
                "/v1/application/passwords/",
                &query,
                None,
            )
            .await
    }

    pub async fn toggle_application_password(
        &self,
        password_id: i64,
    ) -> LinkerResult<ApplicationPassword> {
        self.transport
            .request::<ApplicationPassword, ()>(
                Method::PATCH,
                &format!("/v1/application/passwords/{}/toggle", password_id),
                &[],
                None,
            )
            .await
    }

    pub async fn update_application_password(
        &self,
        password_id: i64,
        password: &str,
    ) -> LinkerResult<ApplicationPassword> {
        #[derive(Serialize)]
        struct Body<'a> {
            password: &'a str,
        }

        self.transport
            .request(
                Method::PATCH,
                &format!("/v1/application/passwords/{}", password_id),
                &[],
                Some(&Body { password }),
            )
            .await
    }

    // Application requests

    pub async fn get_application_requests(
        &self,
        params: ListParams,
        filters: ApplicationRequestFilters,
    ) -> LinkerResult<Vec<SiteApplicationWithDetails>> {
        let mut query = params.to_query();
        if let Some(user_id) = filters.user_id {
            query.push(("user_id", user_id.to_string()));
        }
        if let Some(site_id) = filters.site_id {
            query.push(("site_id", site_id.to_string()));
        }
        if let Some(statuses) = filters.statuses {
            for status in statuses {
                query.push(("statuses", status.as_i64().to_string()));
            }
        }
        if let Some(reasons) = filters.decline_reason_types {
            for reason in reasons {
                query.push(("decline_reason_types", reason.as_i64().to_string()));
            }
        }

        self.transport
            .request::<Vec<SiteApplicationWithDetails>, ()>(
                Method::GET,
                "/v1/application/requests/",
                &query,
                None,
            )
            .await
    }

    pub async fn get_decline_reason_types(&self) -> LinkerResult<HashMap<String, String>> {
        self.transport
            .request::<HashMap<String, String>, ()>(
                Method::GET,
                "/v1/application/requests/decline_reason_types",
                &[],
                None,
            )
            .await
    }

    pub async fn get_application_request(
        &self,
        request_id: i64,
    ) -> LinkerResult<SiteApplicationWithDetails> {
        self.transport
            .request::<SiteApplicationWithDetails, ()>(
                Method::GET,
                &format!("/v1/application/requests/{}", request_id),
                &[],
                None,
            )
            .await
    }

    pub async fn approve_application_request(
        &self,
        request_id: i64,
        reviewer_id: i64,
    ) -> LinkerResult<serde_json::Value> {
        self.transport
            .request(
                Method::POST,
                &format!("/v1/application/requests/{}/approve", request_id),
                &[],
                Some(&ApplicationApproveBody { reviewer_id }),
            )
            .await
    }

    pub async fn decline_application_request(
        &self,
        request_id: i64,
        reviewer_id: i64,
        decline_reason_type: DeclineReasonType,
        decline_reason_detail: &str,
    ) -> LinkerResult<serde_json::Value> {
        self.transport
            .request(
                Method::POST,
                &format!("/v1/application/requests/{}/decline", request_id),
                &[],
                Some(&ApplicationDeclineBody {
                    reviewer_id,
                    decline_reason_type,
                    decline_reason_detail: decline_reason_detail.to_string(),
                }),
            )
            .await
    }
}
