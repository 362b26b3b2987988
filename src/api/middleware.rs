/// API-key authentication middleware
use crate::{
    context::AppContext,
    error::LinkerError,
};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| {
            if s.starts_with("Bearer ") {
                Some(s[7..].to_string())
            } else {
                None
            }
        })
}

/// Constant-time comparison against the configured key set.
///
/// Every configured key is compared regardless of earlier matches so the
/// timing does not depend on which key (if any) matched.
pub fn key_matches(presented: &str, configured: &[String]) -> bool {
    let presented = presented.as_bytes();
    let mut matched = false;

    for key in configured {
        let key = key.as_bytes();
        if key.len() == presented.len() {
            matched |= bool::from(key.ct_eq(presented));
        } else {
            // Burn the same compare on mismatched lengths
            let _ = key.ct_eq(key);
        }
    }

    matched
}

/// Reject requests that do not carry a valid API key
pub async fn require_api_key(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, LinkerError> {
    let token = extract_bearer_token(req.headers())
        .ok_or_else(|| LinkerError::Authentication("Missing authorization header".to_string()))?;

    if !key_matches(&token, &ctx.config.auth.api_keys) {
        return Err(LinkerError::Authentication("Invalid API key".to_string()));
    }

    Ok(next.run(req).await)
}
