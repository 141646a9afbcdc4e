use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::{error::SqlState, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{account::Account, feature_toggle::FeatureToggle},
};

/// Persistence for [`Account`] records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert(&self, account: &Account) -> Result<()>;

    /// Overwrites every mutable column. `NotFound` if the row is gone,
    /// `Conflict` if the username is already taken by another row.
    async fn update(&self, account: &Account) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>>;

    async fn find_feature_toggles(&self, account_id: Uuid) -> Result<Vec<FeatureToggle>>;
}

/// A helper function to map a `tokio_postgres::Row` to an `Account`.
fn row_to_account(row: &Row) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        redirect_url: row.try_get("redirect_url").map_err(|_| AppError::MissingData("redirect_url".to_string()))?,
        request_token: row.try_get("request_token").map_err(|_| AppError::MissingData("request_token".to_string()))?,
        access_token: row.try_get("access_token").map_err(|_| AppError::MissingData("access_token".to_string()))?,
        username: row.try_get("username").map_err(|_| AppError::MissingData("username".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

fn row_to_feature_toggle(row: &Row) -> Result<FeatureToggle> {
    Ok(FeatureToggle {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        description: row.try_get("description").map_err(|_| AppError::MissingData("description".to_string()))?,
    })
}

/// Maps a unique violation on `username` to `Conflict`.
fn map_write_error(e: tokio_postgres::Error) -> AppError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        AppError::Conflict(format!("username already linked: {}", e))
    } else {
        AppError::Database(e)
    }
}

/// [`AccountStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: Pool,
}

impl PgAccountStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, account: &Account) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                INSERT INTO pocket_accounts
                    (id, redirect_url, request_token, access_token, username, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
                &[
                    &account.id,
                    &account.redirect_url,
                    &account.request_token,
                    &account.access_token,
                    &account.username,
                    &account.created_at,
                    &account.updated_at,
                ],
            )
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE pocket_accounts
                SET
                    redirect_url = $2,
                    request_token = $3,
                    access_token = $4,
                    username = $5,
                    updated_at = NOW()
                WHERE id = $1
                "#,
                &[
                    &account.id,
                    &account.redirect_url,
                    &account.request_token,
                    &account.access_token,
                    &account.username,
                ],
            )
            .await
            .map_err(map_write_error)?;

        if updated == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute("DELETE FROM pocket_accounts WHERE id = $1", &[&id])
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM pocket_accounts
                WHERE id = $1
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_account(&r)).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM pocket_accounts
                WHERE username = $1
                "#,
                &[&username],
            )
            .await?;
        row.map(|r| row_to_account(&r)).transpose()
    }

    async fn find_feature_toggles(&self, account_id: Uuid) -> Result<Vec<FeatureToggle>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT t.id, t.name, t.description
                FROM feature_toggles t
                INNER JOIN pocket_account_feature_toggles a ON a.toggle_id = t.id
                WHERE a.account_id = $1
                ORDER BY t.name
                "#,
                &[&account_id],
            )
            .await?;
        rows.iter().map(row_to_feature_toggle).collect()
    }
}
