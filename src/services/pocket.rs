use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::{
    crypto::protector::{self, TokenProtector},
    error::{AppError, Result},
    models::{account::Account, feature_toggle::FeatureToggle},
    pocket::{
        client::PocketClient,
        models::{AccessGrant, Article, RequestCode},
    },
    repositories::account::AccountStore,
    url_ext::append_query,
};

/// Query parameter carrying the session token in caller-facing URLs.
pub const SESSION_TOKEN_PARAM: &str = "xAccessToken";
/// Query parameter set on the caller's redirect when linking fails.
pub const ERROR_PARAM: &str = "error";
/// Value of [`ERROR_PARAM`] for a refused or failed exchange.
pub const AUTH_FAILED: &str = "auth_failed";

/// Result of trading a request code with Pocket.
enum Exchange {
    Granted(AccessGrant),
    Failed,
}

/// Which account ended up holding the Pocket grant.
enum Linked {
    /// The account behind the caller's session token.
    Current,
    /// A previously linked account with the same Pocket username.
    Existing(Uuid),
}

/// Links caller sessions to Pocket accounts and proxies article operations.
#[derive(Clone)]
pub struct PocketService {
    accounts: Arc<dyn AccountStore>,
    pocket: Arc<dyn PocketClient>,
    protector: Arc<dyn TokenProtector>,
    article_count: u32,
}

impl PocketService {
    /// Creates a new `PocketService`.
    ///
    /// # Arguments
    ///
    /// * `accounts` - Account persistence.
    /// * `pocket` - The Pocket API client.
    /// * `protector` - Protects account ids into session tokens.
    /// * `article_count` - Candidates fetched when picking the next article.
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        pocket: Arc<dyn PocketClient>,
        protector: Arc<dyn TokenProtector>,
        article_count: u32,
    ) -> Self {
        Self {
            accounts,
            pocket,
            protector,
            article_count,
        }
    }

    /// Starts linking a caller session to Pocket.
    ///
    /// Creates a pending account, obtains a request code whose callback carries
    /// the account's session token, and returns the Pocket page the user has to
    /// approve the request on. The account is removed again if Pocket cannot be
    /// reached.
    pub async fn begin_authorization(&self, oauth_callback_url: &Url, caller_redirect_url: &Url) -> Result<Url> {
        let mut account = Account::pending(caller_redirect_url.as_str());
        self.accounts.insert(&account).await?;
        tracing::info!("📝 Pending account created: {}", account.id);

        let request_code = match self.request_code_for(&account, oauth_callback_url).await {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!("⚠️  Could not obtain request code for {}: {}", account.id, e);
                self.discard(account.id).await;
                return Err(e);
            }
        };

        account.request_token = Some(request_code.code);
        if let Err(e) = self.accounts.update(&account).await {
            tracing::warn!("⚠️  Could not store request code for {}: {}", account.id, e);
            self.discard(account.id).await;
            return Err(e);
        }

        tracing::info!("✅ Request code stored for account: {}", account.id);
        Ok(request_code.auth_url)
    }

    async fn request_code_for(
        &self,
        account: &Account,
        oauth_callback_url: &Url,
    ) -> Result<RequestCode> {
        let session_token = protector::protect_id(self.protector.as_ref(), account.id)?;
        let callback_url = append_query(oauth_callback_url, SESSION_TOKEN_PARAM, &session_token);
        Ok(self.pocket.create_request_code(&callback_url).await?)
    }

    /// Completes linking after Pocket redirects the user back.
    ///
    /// Always answers with a URL on the caller's side: either carrying the
    /// session token of the linked account or `error=auth_failed`. Only a token
    /// that does not resolve to a pending account is an error; a refused
    /// exchange still redirects when the pending account cannot be removed.
    pub async fn upgrade_request_token(&self, session_token: &str) -> Result<Url> {
        let account = self.resolve_account(session_token).await?;
        let request_token = account.request_token.clone().ok_or(AppError::NotPending)?;
        let redirect_url = Url::parse(&account.redirect_url).map_err(|e| {
            AppError::Internal(format!("Stored redirect URL of {} is invalid: {}", account.id, e))
        })?;

        match self.exchange(&request_token).await {
            Exchange::Granted(grant) => {
                let token = match self.link_with_retry(&account, &grant).await? {
                    Linked::Current => session_token.to_string(),
                    Linked::Existing(id) => protector::protect_id(self.protector.as_ref(), id)?,
                };
                Ok(append_query(&redirect_url, SESSION_TOKEN_PARAM, &token))
            }
            Exchange::Failed => {
                self.discard(account.id).await;
                Ok(append_query(&redirect_url, ERROR_PARAM, AUTH_FAILED))
            }
        }
    }

    async fn exchange(&self, request_token: &str) -> Exchange {
        match self.pocket.create_access_token(request_token).await {
            Ok(grant) => Exchange::Granted(grant),
            Err(e) => {
                tracing::warn!("⚠️  Request code exchange failed: {}", e);
                Exchange::Failed
            }
        }
    }

    /// A concurrent link of the same username surfaces as `Conflict` on the
    /// first attempt; by then the other row exists, so one retry merges into it.
    async fn link_with_retry(&self, account: &Account, grant: &AccessGrant) -> Result<Linked> {
        match self.link(account, grant).await {
            Err(AppError::Conflict(reason)) => {
                tracing::warn!("⚠️  Username conflict while linking {}, retrying: {}", account.id, reason);
                self.link(account, grant).await
            }
            other => other,
        }
    }

    async fn link(&self, account: &Account, grant: &AccessGrant) -> Result<Linked> {
        if let Some(mut existing) = self.accounts.find_by_username(&grant.username).await? {
            if existing.id != account.id {
                existing.access_token = Some(grant.access_token.clone());
                self.accounts.update(&existing).await?;
                self.accounts.delete(account.id).await?;

                tracing::info!(
                    "✅ Re-linked existing account {} (pending {} merged)",
                    existing.id,
                    account.id
                );
                return Ok(Linked::Existing(existing.id));
            }
        }

        let mut account = account.clone();
        account.link(grant.access_token.clone(), grant.username.clone());
        self.accounts.update(&account).await?;

        tracing::info!("✅ Account linked to Pocket: {}", account.id);
        Ok(Linked::Current)
    }

    /// Returns one of the user's saved articles, picked at random by the client.
    pub async fn get_next_article(&self, session_token: &str) -> Result<Article> {
        let access_token = self.linked_access_token(session_token).await?;
        Ok(self.pocket.get_random_article(&access_token, self.article_count).await?)
    }

    pub async fn delete_article(&self, session_token: &str, article_id: &str) -> Result<()> {
        let access_token = self.linked_access_token(session_token).await?;
        self.pocket.delete_article(&access_token, article_id).await?;
        tracing::info!("🗑️  Article deleted: {}", article_id);
        Ok(())
    }

    pub async fn archive_article(&self, session_token: &str, article_id: &str) -> Result<()> {
        let access_token = self.linked_access_token(session_token).await?;
        self.pocket.archive_article(&access_token, article_id).await?;
        tracing::info!("📦 Article archived: {}", article_id);
        Ok(())
    }

    /// Lists the feature toggles enabled for the session's account.
    pub async fn get_feature_toggles(&self, session_token: &str) -> Result<Vec<FeatureToggle>> {
        let account = self.resolve_account(session_token).await?;
        self.accounts.find_feature_toggles(account.id).await
    }

    async fn resolve_account(&self, session_token: &str) -> Result<Account> {
        let id = protector::unprotect_id(self.protector.as_ref(), session_token)?;
        tracing::debug!("🔑 Session token resolved to account: {}", id);

        self.accounts.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    async fn linked_access_token(&self, session_token: &str) -> Result<String> {
        self.resolve_account(session_token)
            .await?
            .access_token
            .ok_or(AppError::NotLinked)
    }

    /// Best-effort removal of an account whose linking cannot continue.
    async fn discard(&self, id: Uuid) {
        match self.accounts.delete(id).await {
            Ok(()) => tracing::info!("🗑️  Pending account removed: {}", id),
            Err(e) => tracing::error!("❌ Failed to remove pending account {}: {}", id, e),
        }
    }
}
