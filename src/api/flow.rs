/// Authorization flow endpoints
use crate::{
    client::linker::{
        CallbackResponse, FlowRecheckRequest, FlowRecheckResponse, FlowStartRequest,
        FlowStartResponse,
    },
    context::AppContext,
    error::LinkerResult,
};
use axum::{
    extract::{Query, State},
    response::{Json, Redirect},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

/// Begin a flow for a Discord identity and hand back the hop URL
pub async fn flow_start(
    State(ctx): State<AppContext>,
    Json(request): Json<FlowStartRequest>,
) -> LinkerResult<Json<FlowStartResponse>> {
    let url = ctx.flow_coordinator.start(request.discord).await?;

    Ok(Json(FlowStartResponse { url }))
}

/// Redirect the browser from the hop URL to the identity provider
pub async fn flow_auth(
    State(ctx): State<AppContext>,
    Query(query): Query<AuthQuery>,
) -> LinkerResult<Redirect> {
    let url = ctx.flow_coordinator.auth_redirect(&query.token).await?;

    Ok(Redirect::temporary(&url))
}

/// Complete a flow after the identity provider sends the user back
pub async fn flow_callback(
    State(ctx): State<AppContext>,
    Query(query): Query<CallbackQuery>,
) -> LinkerResult<Json<CallbackResponse>> {
    let outcome = ctx
        .flow_coordinator
        .callback(&query.code, &query.state)
        .await?;

    tracing::info!(
        discord_id = %outcome.discord.id,
        wikidot_id = outcome.wikidot.id,
        "account_link_established"
    );

    Ok(Json(CallbackResponse {
        discord: outcome.discord,
        wikidot: outcome.wikidot,
        link: outcome.link,
    }))
}

/// Refresh a Discord profile and report its active Wikidot accounts
pub async fn flow_recheck(
    State(ctx): State<AppContext>,
    Json(request): Json<FlowRecheckRequest>,
) -> LinkerResult<Json<FlowRecheckResponse>> {
    let discord = request.discord.clone();
    let wikidot = ctx.flow_coordinator.recheck(request.discord).await?;

    Ok(Json(FlowRecheckResponse { discord, wikidot }))
}
