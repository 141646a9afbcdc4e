use std::net::SocketAddr;

use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use readmore::{config::Config, db, middleware_layer::rate_limit, migrations, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully ({})", config.app_env);

    let pool = db::create_pool(&config.database_url, config.database_max_connections)?;
    tracing::info!("✅ PostgreSQL pool initialized (max {} connections)", config.database_max_connections);

    tracing::info!("🗄️  Processing migrations...");
    match migrations::run(&pool, migrations::MIGRATIONS).await {
        Ok(executed) => {
            tracing::info!("✅ Migrations processed ({} applied)", executed.len());
        }
        Err(e) => {
            tracing::error!("❌ Failed to apply migrations: {}", e);
            return Err(e.into());
        }
    }

    let state = AppState::new(&config, pool)?;
    tracing::info!("✅ AppState initialized");

    let limit_authorize = rate_limit::authorize_limiter(
        config.authorize_rate_per_second,
        config.authorize_rate_burst,
    )?;
    tracing::info!(
        "✅ Authorize rate limit: {}/s, burst {}",
        config.authorize_rate_per_second,
        config.authorize_rate_burst
    );

    let app = routes::router(state, limit_authorize).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::default())
            .on_request(DefaultOnRequest::default().level(Level::DEBUG))
            .on_response(DefaultOnResponse::default().level(Level::DEBUG))
            .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
    );

    let addr = config.bind_addr;
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
