use std::collections::HashSet;
use chrono::NaiveDateTime;
use deadpool_postgres::Pool;

use crate::error::{AppError, Result};

/// Creates the log of applied migration scripts.
pub const CREATE_MIGRATION_SCRIPTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS migration_scripts (
        name            TEXT        PRIMARY KEY NOT NULL,
        executed_at     TIMESTAMPTZ NOT NULL
    )
"#;

/// Serializes concurrent migration runs across instances.
const MIGRATION_LOCK_KEY: i64 = 0x7265_6164_6d6f_7265;

/// Prefix every script name starts with, e.g. `20180121-1830`.
const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M";
const NAME_TIMESTAMP_LEN: usize = 13;

/// A named SQL script applied at most once.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Every migration shipped with the binary.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "20180121-1830-create-pocket-accounts.sql",
        sql: include_str!("../migrations/20180121-1830-create-pocket-accounts.sql"),
    },
    Migration {
        name: "20180304-2115-unique-pocket-usernames.sql",
        sql: include_str!("../migrations/20180304-2115-unique-pocket-usernames.sql"),
    },
    Migration {
        name: "20180611-1940-create-feature-toggles.sql",
        sql: include_str!("../migrations/20180611-1940-create-feature-toggles.sql"),
    },
];

fn name_timestamp(name: &str) -> Result<NaiveDateTime> {
    let prefix = name
        .get(..NAME_TIMESTAMP_LEN)
        .ok_or_else(|| AppError::Migration(format!("Malformed migration name: {}", name)))?;

    NaiveDateTime::parse_from_str(prefix, NAME_TIMESTAMP_FORMAT)
        .map_err(|e| AppError::Migration(format!("Malformed migration name {}: {}", name, e)))
}

/// Returns the migrations not yet in `applied`, oldest first.
pub fn plan<'a>(migrations: &'a [Migration], applied: &HashSet<String>) -> Result<Vec<&'a Migration>> {
    let mut pending = migrations
        .iter()
        .filter(|m| !applied.contains(m.name))
        .map(|m| name_timestamp(m.name).map(|at| (at, m)))
        .collect::<Result<Vec<_>>>()?;

    pending.sort_by(|(a, a_migration), (b, b_migration)| {
        a.cmp(b).then_with(|| a_migration.name.cmp(b_migration.name))
    });

    Ok(pending.into_iter().map(|(_, m)| m).collect())
}

/// Applies every pending migration, each in its own transaction.
///
/// # Returns
///
/// The names of the scripts executed by this call.
pub async fn run(pool: &Pool, migrations: &[Migration]) -> Result<Vec<String>> {
    let mut client = pool.get().await?;
    client.batch_execute(CREATE_MIGRATION_SCRIPTS_TABLE).await?;

    let applied: HashSet<String> = client
        .query("SELECT name FROM migration_scripts", &[])
        .await?
        .iter()
        .map(|row| row.try_get::<_, String>("name"))
        .collect::<std::result::Result<_, _>>()?;

    let pending = plan(migrations, &applied)?;
    let mut executed = Vec::with_capacity(pending.len());

    for migration in pending {
        let transaction = client.transaction().await?;
        transaction
            .execute("SELECT pg_advisory_xact_lock($1)", &[&MIGRATION_LOCK_KEY])
            .await?;

        let already_applied = transaction
            .query_opt(
                "SELECT 1 FROM migration_scripts WHERE name = $1",
                &[&migration.name],
            )
            .await?
            .is_some();

        if already_applied {
            tracing::debug!("Migration {} applied concurrently, skipping", migration.name);
            transaction.rollback().await?;
            continue;
        }

        tracing::info!("🗄️  Applying migration {}", migration.name);
        transaction.batch_execute(migration.sql).await.map_err(|e| {
            AppError::Migration(format!("{} failed: {}", migration.name, e))
        })?;
        transaction
            .execute(
                "INSERT INTO migration_scripts (name, executed_at) VALUES ($1, NOW())",
                &[&migration.name],
            )
            .await?;
        transaction.commit().await?;

        executed.push(migration.name.to_string());
    }

    Ok(executed)
}
