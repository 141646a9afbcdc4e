use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::handlers::{pocket, toggles};
use crate::middleware_layer::https::redirect_to_https;
use crate::state::AppState;

/// Builds the application router.
///
/// `wrap_authorize` lets the caller put extra layers (rate limiting) around
/// the authorize route alone, since it is the only one that creates rows.
pub fn router<F>(state: AppState, wrap_authorize: F) -> Router
where
    F: FnOnce(Router) -> Router,
{
    let authorize_routes = Router::new()
        .route(pocket::AUTHORIZE_PATH, get(pocket::authorize))
        .with_state(state.clone());

    let session_routes = Router::new()
        .route(pocket::CALLBACK_PATH, get(pocket::callback))
        .route(pocket::NEXT_PATH, get(pocket::next_article))
        .route(pocket::DELETE_PATH, get(pocket::delete_article))
        .route(pocket::ARCHIVE_PATH, get(pocket::archive_article))
        .route(toggles::TOGGLES_PATH, get(toggles::get_toggles))
        .with_state(state.clone());

    Router::new()
        .merge(wrap_authorize(authorize_routes))
        .merge(session_routes)
        .layer(from_fn_with_state(state, redirect_to_https))
}
