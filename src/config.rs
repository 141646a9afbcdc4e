use std::env;
use std::net::SocketAddr;
use anyhow::{Context, Result};
use url::Url;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::aes::KEY_SIZE;

/// Default number of candidate articles fetched for "next article".
pub const DEFAULT_ARTICLE_COUNT: u32 = 200;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// Upper bound on pooled database connections.
    pub database_max_connections: usize,
    /// The socket address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The externally visible base URL, always ending in `/`.
    pub public_base_url: Url,
    /// Base URL of the Pocket API.
    pub pocket_base_url: Url,
    /// The Pocket consumer key of this application.
    pub pocket_consumer_key: String,
    /// How many articles to fetch when picking a random one.
    pub pocket_article_count: u32,
    /// Request timeout for calls to Pocket, in seconds.
    pub pocket_timeout_secs: u64,
    /// The AES-256 key used to protect session tokens.
    pub token_key: Zeroizing<Vec<u8>>,
    /// The version tag stamped on every protected session token.
    pub token_key_version: u8,
    /// Deployment environment name (`development`, `production`, ...).
    pub app_env: String,
    /// Sustained per-IP rate for the authorize endpoint.
    pub authorize_rate_per_second: u32,
    /// Burst allowance for the authorize endpoint.
    pub authorize_rate_burst: u32,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let mut token_key_hex = lookup("TOKEN_PROTECTION_KEY")
            .context("TOKEN_PROTECTION_KEY must be set (generate with: openssl rand -hex 32)")?;

        let token_key_bytes = hex::decode(token_key_hex.trim())
            .context("TOKEN_PROTECTION_KEY must be valid hexadecimal");

        token_key_hex.zeroize();
        let token_key = Zeroizing::new(token_key_bytes?);

        if token_key.len() != KEY_SIZE {
            anyhow::bail!("TOKEN_PROTECTION_KEY must be exactly 32 bytes (64 hex characters)");
        }

        let pocket_consumer_key = lookup("POCKET_CONSUMER_KEY")
            .filter(|key| !key.trim().is_empty())
            .context("POCKET_CONSUMER_KEY must be set")?;

        let authorize_rate_per_second: u32 = var_or("AUTHORIZE_RATE_PER_SECOND", "5")
            .parse()
            .context("Invalid AUTHORIZE_RATE_PER_SECOND")?;
        if authorize_rate_per_second == 0 {
            anyhow::bail!("AUTHORIZE_RATE_PER_SECOND must be at least 1");
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: var_or("DATABASE_MAX_CONNECTIONS", "16")
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
            bind_addr: var_or("BIND_ADDR", "127.0.0.1:3000")
                .parse()
                .context("Invalid BIND_ADDR")?,
            public_base_url: with_trailing_slash(
                Url::parse(&var_or("PUBLIC_BASE_URL", "http://127.0.0.1:3000/"))
                    .context("Invalid PUBLIC_BASE_URL")?,
            ),
            pocket_base_url: Url::parse(&var_or("POCKET_BASE_URL", "https://getpocket.com"))
                .context("Invalid POCKET_BASE_URL")?,
            pocket_consumer_key,
            pocket_article_count: var_or("POCKET_ARTICLE_COUNT", "200")
                .parse()
                .context("Invalid POCKET_ARTICLE_COUNT")?,
            pocket_timeout_secs: var_or("POCKET_TIMEOUT_SECS", "10")
                .parse()
                .context("Invalid POCKET_TIMEOUT_SECS")?,
            token_key,
            token_key_version: var_or("TOKEN_PROTECTION_KEY_VERSION", "1")
                .parse()
                .context("Invalid TOKEN_PROTECTION_KEY_VERSION")?,
            app_env: var_or("APP_ENV", "development"),
            authorize_rate_per_second,
            authorize_rate_burst: var_or("AUTHORIZE_RATE_BURST", "20")
                .parse()
                .context("Invalid AUTHORIZE_RATE_BURST")?,
        })
    }

    /// Whether this deployment should force https.
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("public_base_url", &self.public_base_url.as_str())
            .field("pocket_base_url", &self.pocket_base_url.as_str())
            .field("pocket_article_count", &self.pocket_article_count)
            .field("token_key", &"<redacted>")
            .field("token_key_version", &self.token_key_version)
            .field("app_env", &self.app_env)
            .finish_non_exhaustive()
    }
}

/// `Url::join` drops the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
