use std::sync::Arc;
use std::time::Duration;
use deadpool_postgres::Pool;

use crate::config::Config;
use crate::crypto::protector::AesTokenProtector;
use crate::error::Result;
use crate::pocket::client::HttpPocketClient;
use crate::repositories::account::PgAccountStore;
use crate::services::pocket::PocketService;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// The account linking and article proxy service.
    pub pocket: PocketService,
}

impl AppState {
    /// Wires the production collaborators around `pool`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    /// * `pool` - A pool whose database has been migrated.
    pub fn new(config: &Config, pool: Pool) -> Result<Self> {
        let accounts = PgAccountStore::new(pool);
        tracing::info!("✅ Account store initialized");

        let client = HttpPocketClient::new(
            config.pocket_base_url.clone(),
            config.pocket_consumer_key.clone(),
            Duration::from_secs(config.pocket_timeout_secs),
        )?;
        tracing::info!("✅ Pocket client initialized ({})", config.pocket_base_url);

        let protector = AesTokenProtector::new(&config.token_key, config.token_key_version)?;
        tracing::info!("✅ Token protector initialized (key v{})", config.token_key_version);

        let pocket = PocketService::new(
            Arc::new(accounts),
            Arc::new(client),
            Arc::new(protector),
            config.pocket_article_count,
        );

        Ok(Self::with_service(config.clone(), pocket))
    }

    /// Builds a state around an already wired service.
    pub fn with_service(config: Config, pocket: PocketService) -> Self {
        Self {
            config: Arc::new(config),
            pocket,
        }
    }
}
