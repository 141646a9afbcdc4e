use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    error::{AppError, Result},
    handlers::pocket::SessionQuery,
    services::pocket::SESSION_TOKEN_PARAM,
    state::AppState,
    validation::params::required,
};

pub const TOGGLES_PATH: &str = "/api/toggles";

/// Lists the feature toggles enabled for the caller's account.
#[axum::debug_handler]
pub async fn get_toggles(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Response> {
    let session_token = required(SESSION_TOKEN_PARAM, query.x_access_token)?;

    let toggles = state
        .pocket
        .get_feature_toggles(&session_token)
        .await
        .map_err(|e| e.into_forbidden("Failed to get toggles"))?;

    let response = sonic_rs::to_string(&toggles)
        .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], response).into_response())
}
