use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use url::Url;

use crate::{
    error::{AppError, Result},
    services::pocket::SESSION_TOKEN_PARAM,
    state::AppState,
    url_ext::append_query,
    validation::params::{required, required_url},
};

pub const AUTHORIZE_PATH: &str = "/api/pocket/authorize";
pub const CALLBACK_PATH: &str = "/api/pocket/callback";
pub const NEXT_PATH: &str = "/api/pocket/next";
pub const DELETE_PATH: &str = "/api/pocket/delete";
pub const ARCHIVE_PATH: &str = "/api/pocket/archive";

/// The query parameters for starting authorization.
#[derive(Deserialize)]
pub struct AuthorizeQuery {
    #[serde(rename = "redirectUrl")]
    pub redirect_url: Option<String>,
}

/// The query parameters of every session-bound request.
#[derive(Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "xAccessToken")]
    pub x_access_token: Option<String>,
}

/// The query parameters for acting on a single article.
#[derive(Deserialize)]
pub struct ArticleQuery {
    #[serde(rename = "xAccessToken")]
    pub x_access_token: Option<String>,
    #[serde(rename = "articleId")]
    pub article_id: Option<String>,
}

/// Resolves a route of this service against the public base URL.
fn public_url(base: &Url, path: &str) -> Result<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| AppError::Internal(format!("Cannot build URL for {}: {}", path, e)))
}

/// Link to one of the article action routes, carrying everything it needs.
fn action_url(base: &Url, path: &str, article_id: &str, session_token: &str) -> Result<Url> {
    let url = public_url(base, path)?;
    let url = append_query(&url, "articleId", article_id);
    Ok(append_query(&url, SESSION_TOKEN_PARAM, session_token))
}

/// Starts linking: redirects the user to Pocket's authorization page.
#[axum::debug_handler]
pub async fn authorize(
    State(state): State<AppState>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Response> {
    let caller_redirect_url = required_url("redirectUrl", query.redirect_url)?;
    let callback_url = public_url(&state.config.public_base_url, CALLBACK_PATH)?;

    tracing::info!("🔐 Authorization requested, returning to {}", caller_redirect_url);

    let auth_url = state
        .pocket
        .begin_authorization(&callback_url, &caller_redirect_url)
        .await?;

    Ok(Redirect::to(auth_url.as_str()).into_response())
}

/// Pocket sends the user back here once they approved (or refused) access.
#[axum::debug_handler]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Response> {
    let session_token = required(SESSION_TOKEN_PARAM, query.x_access_token)?;

    let result_url = state
        .pocket
        .upgrade_request_token(&session_token)
        .await
        .map_err(|e| e.into_forbidden("Failed to complete pocket authorisation"))?;

    Ok(Redirect::to(result_url.as_str()).into_response())
}

/// Returns a random saved article plus links to delete or archive it.
#[axum::debug_handler]
pub async fn next_article(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Response> {
    let session_token = required(SESSION_TOKEN_PARAM, query.x_access_token)?;

    let article = state
        .pocket
        .get_next_article(&session_token)
        .await
        .map_err(|e| e.into_forbidden("Failed to get next article from pocket"))?;

    let base = &state.config.public_base_url;
    let delete = action_url(base, DELETE_PATH, &article.item_id, &session_token)?;
    let archive = action_url(base, ARCHIVE_PATH, &article.item_id, &session_token)?;

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "url": article.url,
        "actions": {
            "delete": delete.as_str(),
            "archive": archive.as_str()
        }
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], response).into_response())
}

/// Deletes an article from the user's Pocket list.
#[axum::debug_handler]
pub async fn delete_article(
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> Result<Response> {
    let session_token = required(SESSION_TOKEN_PARAM, query.x_access_token)?;
    let article_id = required("articleId", query.article_id)?;

    state
        .pocket
        .delete_article(&session_token, &article_id)
        .await
        .map_err(|e| e.into_forbidden("Failed to delete pocket article"))?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Archives an article in the user's Pocket list.
#[axum::debug_handler]
pub async fn archive_article(
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> Result<Response> {
    let session_token = required(SESSION_TOKEN_PARAM, query.x_access_token)?;
    let article_id = required("articleId", query.article_id)?;

    state
        .pocket
        .archive_article(&session_token, &article_id)
        .await
        .map_err(|e| e.into_forbidden("Failed to archive pocket article"))?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
