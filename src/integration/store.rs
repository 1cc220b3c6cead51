//! SQLite persistence for integration configs.

use super::{IntegrationConfig, ProviderType};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SELECT_COLUMNS: &str = "id, group_id, provider, repo_full_name, base_url, project_key, \
     account_email, token_encrypted, created_at, updated_at";

/// Integration config storage backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE integration_configs (
///     id INTEGER PRIMARY KEY,
///     group_id INTEGER NOT NULL,
///     provider TEXT NOT NULL,          -- "github" | "jira"
///     repo_full_name TEXT,
///     base_url TEXT,
///     project_key TEXT,
///     account_email TEXT,
///     token_encrypted TEXT,            -- base64(nonce || ciphertext)
///     created_at TEXT NOT NULL,        -- RFC 3339
///     updated_at TEXT NOT NULL,        -- RFC 3339
///     UNIQUE(group_id, provider)
/// );
/// ```
///
/// The UNIQUE constraint is what turns a lost create race into a
/// constraint violation instead of a duplicate row.
pub struct IntegrationStore {
    conn: Mutex<Connection>,
}

/// Values for a row that does not exist yet. The id is assigned on insert.
#[derive(Clone)]
pub struct NewIntegrationConfig {
    pub group_id: i64,
    pub provider: ProviderType,
    pub repo_full_name: Option<String>,
    pub base_url: Option<String>,
    pub project_key: Option<String>,
    pub account_email: Option<String>,
    pub token_encrypted: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntegrationStore {
    /// Opens (or creates) the database and ensures the schema exists.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open database")?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS integration_configs (
                id INTEGER PRIMARY KEY,
                group_id INTEGER NOT NULL,
                provider TEXT NOT NULL,
                repo_full_name TEXT,
                base_url TEXT,
                project_key TEXT,
                account_email TEXT,
                token_encrypted TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(group_id, provider)
            );
            "#,
        )
        .context("Failed to create integration_configs table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Integration store lock poisoned"))
    }

    /// Looks up the config for `(group_id, provider)`.
    pub fn find(&self, group_id: i64, provider: ProviderType) -> Result<Option<IntegrationConfig>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM integration_configs WHERE group_id = ?1 AND provider = ?2",
            SELECT_COLUMNS
        );
        conn.query_row(&sql, params![group_id, provider.as_str()], row_to_config)
            .optional()
            .context("Failed to query integration config")
    }

    /// Inserts a new row and returns it with its assigned id.
    ///
    /// Fails with a UNIQUE constraint violation if a row already exists for
    /// the pair (see [`is_unique_violation`]).
    pub fn insert(&self, new: &NewIntegrationConfig) -> Result<IntegrationConfig> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO integration_configs (
                group_id, provider,
                repo_full_name, base_url, project_key, account_email,
                token_encrypted, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                new.group_id,
                new.provider.as_str(),
                new.repo_full_name,
                new.base_url,
                new.project_key,
                new.account_email,
                new.token_encrypted,
                new.created_at.to_rfc3339(),
                new.updated_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert integration config")?;

        Ok(IntegrationConfig {
            id: conn.last_insert_rowid(),
            group_id: new.group_id,
            provider: new.provider,
            repo_full_name: new.repo_full_name.clone(),
            base_url: new.base_url.clone(),
            project_key: new.project_key.clone(),
            account_email: new.account_email.clone(),
            token_encrypted: new.token_encrypted.clone(),
            created_at: new.created_at,
            updated_at: new.updated_at,
        })
    }

    /// Writes every mutable column of `config` to the row with `config.id`.
    ///
    /// `group_id`, `provider` and `created_at` are never changed.
    pub fn update(&self, config: &IntegrationConfig) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn
            .execute(
                r#"
                UPDATE integration_configs SET
                    repo_full_name = ?1,
                    base_url = ?2,
                    project_key = ?3,
                    account_email = ?4,
                    token_encrypted = ?5,
                    updated_at = ?6
                WHERE id = ?7
                "#,
                params![
                    config.repo_full_name,
                    config.base_url,
                    config.project_key,
                    config.account_email,
                    config.token_encrypted,
                    config.updated_at.to_rfc3339(),
                    config.id,
                ],
            )
            .context("Failed to update integration config")?;

        if rows == 0 {
            return Err(anyhow!("Integration config {} no longer exists", config.id));
        }
        Ok(())
    }
}

/// True if `err` was caused by the `(group_id, provider)` UNIQUE constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
        )
    })
}

fn row_to_config(row: &rusqlite::Row<'_>) -> rusqlite::Result<IntegrationConfig> {
    let provider: String = row.get(2)?;
    let provider = provider
        .parse::<ProviderType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;

    Ok(IntegrationConfig {
        id: row.get(0)?,
        group_id: row.get(1)?,
        provider,
        repo_full_name: row.get(3)?,
        base_url: row.get(4)?,
        project_key: row.get(5)?,
        account_email: row.get(6)?,
        token_encrypted: row.get(7)?,
        created_at: parse_timestamp(row, 8)?,
        updated_at: parse_timestamp(row, 9)?,
    })
}

fn parse_timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
