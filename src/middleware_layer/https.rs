use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::state::AppState;

/// Header set by the TLS-terminating proxy in front of the service.
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// In production, sends requests that reached the proxy over plain http to
/// the same location over https.
pub async fn redirect_to_https(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.is_production() {
        return next.run(request).await;
    }

    let forwarded_http = request
        .headers()
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("http"));

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok());

    if let (true, Some(host)) = (forwarded_http, host) {
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let location = format!("https://{}{}", host, path);

        tracing::debug!("🔒 Redirecting to {}", location);
        return Redirect::permanent(&location).into_response();
    }

    next.run(request).await
}
