use std::time::Duration;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::pocket::error::PocketError;
use crate::pocket::models::{
    AccessGrant, AccessTokenRequest, AccessTokenResponse, Article, ItemAction, ModifyRequest,
    ModifyResponse, RequestCode, RequestCodeRequest, RequestCodeResponse, RetrieveRequest,
    RetrieveResponse,
};

/// The Pocket API version all endpoints live under.
const API_VERSION: &str = "v3";

/// The Pocket operations the service depends on.
#[async_trait]
pub trait PocketClient: Send + Sync {
    /// Obtains a request code that Pocket will redirect back to `callback_url` with.
    async fn create_request_code(&self, callback_url: &Url) -> Result<RequestCode, PocketError>;

    /// Exchanges an approved request code for an access token.
    async fn create_access_token(&self, request_code: &str) -> Result<AccessGrant, PocketError>;

    /// Fetches up to `count` saved items and returns one chosen uniformly at random.
    async fn get_random_article(&self, access_token: &str, count: u32) -> Result<Article, PocketError>;

    async fn delete_article(&self, access_token: &str, article_id: &str) -> Result<(), PocketError>;

    async fn archive_article(&self, access_token: &str, article_id: &str) -> Result<(), PocketError>;
}

/// [`PocketClient`] over HTTPS.
#[derive(Clone)]
pub struct HttpPocketClient {
    http: Client,
    base_url: Url,
    consumer_key: String,
}

impl HttpPocketClient {
    /// Creates a new `HttpPocketClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root of the Pocket site, e.g. `https://getpocket.com`.
    /// * `consumer_key` - This application's Pocket consumer key.
    /// * `timeout` - Per-request timeout.
    pub fn new(base_url: Url, consumer_key: String, timeout: Duration) -> Result<Self, PocketError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PocketError::new("client", e))?;

        Ok(Self {
            http,
            base_url,
            consumer_key,
        })
    }

    fn endpoint(&self, operation: &'static str, path: &str) -> Result<Url, PocketError> {
        self.base_url
            .join(path)
            .map_err(|e| PocketError::new(operation, e))
    }

    /// The Pocket page where the user approves `code`.
    fn auth_url(&self, code: &str, callback_url: &Url) -> Result<Url, PocketError> {
        let mut url = self.endpoint("request", "/auth/authorize")?;
        url.query_pairs_mut()
            .append_pair("request_token", code)
            .append_pair("redirect_uri", callback_url.as_str());
        Ok(url)
    }

    /// Posts a JSON body and decodes the JSON answer, folding every failure
    /// into a [`PocketError`].
    async fn post<B, T>(&self, operation: &'static str, path: &str, body: &B) -> Result<T, PocketError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(operation, &format!("/{}/{}", API_VERSION, path))?;
        let body = sonic_rs::to_string(body).map_err(|e| PocketError::new(operation, e))?;

        tracing::debug!("📡 POST {}", url);

        let response = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/json; charset=UTF-8")
            .header("X-Accept", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| PocketError::new(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .headers()
                .get("X-Error")
                .and_then(|v| v.to_str().ok())
                .map(|msg| format!("{} ({})", status, msg))
                .unwrap_or_else(|| status.to_string());
            return Err(PocketError::new(operation, reason));
        }

        let text = response
            .text()
            .await
            .map_err(|e| PocketError::new(operation, e))?;

        sonic_rs::from_str(&text).map_err(|e| PocketError::new(operation, e))
    }

    async fn modify(&self, operation: &'static str, access_token: &str, article_id: &str) -> Result<(), PocketError> {
        let request = ModifyRequest {
            consumer_key: &self.consumer_key,
            access_token,
            actions: [ItemAction {
                action: operation,
                item_id: article_id,
            }],
        };

        let response: ModifyResponse = self.post(operation, "send", &request).await?;
        if response.status != 1 {
            return Err(PocketError::new(
                operation,
                format!("unexpected status {}", response.status),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl PocketClient for HttpPocketClient {
    async fn create_request_code(&self, callback_url: &Url) -> Result<RequestCode, PocketError> {
        let request = RequestCodeRequest {
            consumer_key: &self.consumer_key,
            redirect_uri: callback_url.as_str(),
        };

        let response: RequestCodeResponse = self.post("request", "oauth/request", &request).await?;
        let auth_url = self.auth_url(&response.code, callback_url)?;

        Ok(RequestCode {
            code: response.code,
            auth_url,
        })
    }

    async fn create_access_token(&self, request_code: &str) -> Result<AccessGrant, PocketError> {
        let request = AccessTokenRequest {
            consumer_key: &self.consumer_key,
            code: request_code,
        };

        let response: AccessTokenResponse = self.post("authorize", "oauth/authorize", &request).await?;

        Ok(AccessGrant {
            access_token: response.access_token,
            username: response.username,
        })
    }

    async fn get_random_article(&self, access_token: &str, count: u32) -> Result<Article, PocketError> {
        let request = RetrieveRequest {
            consumer_key: &self.consumer_key,
            access_token,
            count,
            detail_type: "simple",
        };

        let response: RetrieveResponse = self.post("get", "get", &request).await?;
        let articles = response.list.into_articles();
        tracing::debug!("📚 Pocket returned {} candidate articles", articles.len());

        articles
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| PocketError::new("get", "no saved articles"))
    }

    async fn delete_article(&self, access_token: &str, article_id: &str) -> Result<(), PocketError> {
        self.modify("delete", access_token, article_id).await
    }

    async fn archive_article(&self, access_token: &str, article_id: &str) -> Result<(), PocketError> {
        self.modify("archive", access_token, article_id).await
    }
}
