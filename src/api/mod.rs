/// API routes and handlers
pub mod accounts;
pub mod flow;
pub mod middleware;

use crate::context::AppContext;
use axum::Router;

/// Build the /v1 API routes (API-key protected except the browser hops)
pub fn routes(ctx: AppContext) -> Router<AppContext> {
    // /v1/auth and /v1/callback are visited by the user's browser during
    // the flow; they carry the state token instead of an API key.
    let browser = Router::new()
        .route("/auth", axum::routing::get(flow::flow_auth))
        .route("/callback", axum::routing::get(flow::flow_callback));

    let protected = Router::new()
        .route("/start", axum::routing::post(flow::flow_start))
        .route("/recheck", axum::routing::post(flow::flow_recheck))
        .merge(accounts::routes())
        .layer(axum::middleware::from_fn_with_state(
            ctx,
            middleware::require_api_key,
        ));

    Router::new().merge(browser).merge(protected)
}
