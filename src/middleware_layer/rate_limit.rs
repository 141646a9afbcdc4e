use std::sync::Arc;
use std::time::Duration;
use axum::Router;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::error::{AppError, Result};

/// Builds the per-IP limiter wrapped around the authorize route.
///
/// # Arguments
///
/// * `per_second` - Requests replenished per second for each client IP.
/// * `burst` - Requests a client IP may send back to back.
///
/// # Returns
///
/// A wrapper suitable for [`crate::routes::router`]. Keys on `ConnectInfo`,
/// so the router has to be served with connect info.
pub fn authorize_limiter(per_second: u32, burst: u32) -> Result<impl FnOnce(Router) -> Router> {
    if per_second == 0 {
        return Err(AppError::Validation(
            "authorize rate must be at least one request per second".to_string(),
        ));
    }

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .period(Duration::from_secs(1) / per_second)
            .burst_size(burst)
            .use_headers()
            .finish()
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "invalid authorize rate limit ({} per second, burst {})",
                    per_second, burst
                ))
            })?,
    );

    tracing::debug!("🚦 Authorize limiter: {} per second, burst {}", per_second, burst);

    Ok(move |authorize: Router| authorize.layer(GovernorLayer::new(governor_conf)))
}
