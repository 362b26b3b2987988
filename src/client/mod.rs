/// Typed API clients for the remote collaborator services
///
/// Shared request plumbing: bearer-token injection, a fixed timeout, and
/// mapping of upstream status codes onto the error taxonomy so callers can
/// tell retryable from terminal failures.
pub mod linker;
pub mod member_management;

pub use linker::LinkerApiClient;
pub use member_management::MemberManagementApiClient;

use crate::error::{LinkerError, LinkerResult};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Shared HTTP transport for the typed clients
#[derive(Clone)]
pub(crate) struct ApiTransport {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl ApiTransport {
    pub(crate) fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> LinkerResult<Self> {
        // Redirects are surfaced to the caller, not followed; /v1/auth
        // answers with the provider location
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| LinkerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client,
        })
    }

    /// Send a request and decode the JSON response.
    ///
    /// Upstream errors are re-raised, not swallowed: 4xx map onto the
    /// terminal taxonomy, 5xx and timeouts surface as retryable
    /// `IdentityProvider` errors.
    pub(crate) async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        json_body: Option<&B>,
    ) -> LinkerResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request = self
            .http_client
            .request(method, &url)
            .bearer_auth(&self.api_key);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = json_body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LinkerError::IdentityProvider(format!("Request to {} timed out", url))
            } else {
                LinkerError::IdentityProvider(format!("Request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(map_status(status, &url, &detail));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LinkerError::Validation(format!("Invalid response from {}: {}", url, e)))
    }

    /// Send a GET expected to answer with a redirect; returns the location.
    pub(crate) async fn get_redirect(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> LinkerResult<String> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| LinkerError::IdentityProvider(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_redirection() {
            let detail = response.text().await.unwrap_or_default();
            return Err(map_status(status, &url, &detail));
        }

        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                LinkerError::IdentityProvider(format!("{} redirected without a location", url))
            })
    }
}

fn map_status(status: StatusCode, url: &str, detail: &str) -> LinkerError {
    match status {
        StatusCode::BAD_REQUEST => {
            LinkerError::Validation(format!("{} rejected the request: {}", url, detail))
        }
        StatusCode::UNAUTHORIZED => {
            LinkerError::Authentication(format!("{} rejected the credentials", url))
        }
        StatusCode::FORBIDDEN => LinkerError::Forbidden(format!("{}: {}", url, detail)),
        StatusCode::NOT_FOUND => LinkerError::NotFound(format!("{}: {}", url, detail)),
        StatusCode::CONFLICT => LinkerError::Conflict(format!("{}: {}", url, detail)),
        _ => LinkerError::IdentityProvider(format!("{} returned {}: {}", url, status, detail)),
    }
}

/// Pagination and ordering accepted by every list endpoint
#[derive(Debug, Clone)]
pub struct ListParams {
    pub per_page: u32,
    pub page: u32,
    pub order_by: String,
    pub order: String,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            per_page: 100,
            page: 1,
            order_by: "created_at".to_string(),
            order: "desc".to_string(),
        }
    }
}

impl ListParams {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
            ("order_by", self.order_by.clone()),
            ("order", self.order.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_onto_taxonomy() {
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, "u", "d"),
            LinkerError::Validation(_)
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, "u", "d"),
            LinkerError::Forbidden(_)
        ));
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, "u", "d"),
            LinkerError::NotFound(_)
        ));
        assert!(matches!(
            map_status(StatusCode::CONFLICT, "u", "d"),
            LinkerError::Conflict(_)
        ));
        // Upstream failures stay retryable
        let err = map_status(StatusCode::INTERNAL_SERVER_ERROR, "u", "d");
        assert!(err.is_retryable());
    }

    #[test]
    fn default_list_params() {
        let params = ListParams::default();
        let query = params.to_query();
        assert_eq!(query[0], ("per_page", "100".to_string()));
        assert_eq!(query[3], ("order", "desc".to_string()));
    }
}
