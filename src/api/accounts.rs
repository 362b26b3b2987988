/// Account listing and link management endpoints
use crate::{
    context::AppContext,
    client::linker::{
        AccountListRequest, AccountListResponse, DiscordDumpItem, LinkedAccounts,
        ListDiscordResponse, ListWikidotResponse, WikidotDumpItem,
    },
    error::LinkerResult,
    link::AccountLink,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/list", post(account_list))
        .route("/list/discord", get(list_by_discord))
        .route("/list/wikidot", get(list_by_wikidot))
        .route("/unlink", patch(unlink_account))
        .route("/relink", patch(relink_account))
}

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub discord_id: String,
    pub wikidot_id: i64,
}

/// Resolve a batch of Discord ids to their active Wikidot accounts.
///
/// Ids with no stored Discord profile are omitted from the result map.
pub async fn account_list(
    State(ctx): State<AppContext>,
    Json(request): Json<AccountListRequest>,
) -> LinkerResult<Json<AccountListResponse>> {
    let grouped = ctx
        .link_manager
        .accounts_for_discord_ids(&request.discord_ids)
        .await?;

    let result = grouped
        .into_iter()
        .map(|(id, (discord, wikidot))| (id, LinkedAccounts { discord, wikidot }))
        .collect();

    Ok(Json(AccountListResponse { result }))
}

/// Dump every Discord account with its link history
pub async fn list_by_discord(
    State(ctx): State<AppContext>,
) -> LinkerResult<Json<ListDiscordResponse>> {
    let result = ctx
        .link_manager
        .dump_by_discord()
        .await?
        .into_iter()
        .map(|(discord, wikidot)| DiscordDumpItem { discord, wikidot })
        .collect();

    Ok(Json(ListDiscordResponse { result }))
}

/// Dump every Wikidot account with its link history
pub async fn list_by_wikidot(
    State(ctx): State<AppContext>,
) -> LinkerResult<Json<ListWikidotResponse>> {
    let result = ctx
        .link_manager
        .dump_by_wikidot()
        .await?
        .into_iter()
        .map(|(wikidot, discord)| WikidotDumpItem { discord, wikidot })
        .collect();

    Ok(Json(ListWikidotResponse { result }))
}

/// Deactivate an active link, keeping its row for history
pub async fn unlink_account(
    State(ctx): State<AppContext>,
    Query(query): Query<LinkQuery>,
) -> LinkerResult<Json<AccountLink>> {
    let link = ctx
        .link_manager
        .unlink(&query.discord_id, query.wikidot_id)
        .await?;

    tracing::info!(
        discord_id = %query.discord_id,
        wikidot_id = query.wikidot_id,
        "account_unlinked"
    );

    Ok(Json(link))
}

/// Reactivate a previously unlinked pair
pub async fn relink_account(
    State(ctx): State<AppContext>,
    Query(query): Query<LinkQuery>,
) -> LinkerResult<Json<AccountLink>> {
    let link = ctx
        .link_manager
        .relink(&query.discord_id, query.wikidot_id)
        .await?;

    tracing::info!(
        discord_id = %query.discord_id,
        wikidot_id = query.wikidot_id,
        "account_relinked"
    );

    Ok(Json(link))
}
