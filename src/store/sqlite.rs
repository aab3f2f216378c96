//! Usage: SQLite-backed credential store (one row per account email).

use super::OAuthDataStore;
use crate::domain::record::OAuthRecord;
use crate::shared::error::{LoginError, LoginResult};
use rusqlite::{params, Connection};
use std::path::Path;

/// The table is the store's namespace: nothing else writes to it and the
/// store writes nowhere else. Absent optional values are stored as empty
/// strings and read back as absent.
const TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS oauth_accounts (
  email TEXT PRIMARY KEY,
  access_token TEXT NOT NULL DEFAULT '',
  refresh_token TEXT NOT NULL DEFAULT '',
  access_token_expiry_time INTEGER NOT NULL DEFAULT 0,
  oauth_scopes TEXT NOT NULL DEFAULT '',
  account_name TEXT NOT NULL DEFAULT '',
  avatar_url TEXT NOT NULL DEFAULT ''
)
"#;

pub struct SqliteOAuthDataStore {
    conn: Connection,
}

impl SqliteOAuthDataStore {
    /// Opens (or creates) the store at `path`. The database file must be
    /// exclusive to this store.
    pub fn open(path: impl AsRef<Path>) -> LoginResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| LoginError::storage("failed to open credential database", e))?;
        Self::with_connection(conn)
    }

    /// Volatile variant, mostly useful in tests.
    pub fn open_in_memory() -> LoginResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LoginError::storage("failed to open in-memory credential database", e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> LoginResult<Self> {
        conn.execute_batch(TABLE_SQL)
            .map_err(|e| LoginError::storage("failed to create oauth_accounts table", e))?;
        Ok(Self { conn })
    }
}

/// Every field is read tolerantly: a value of the wrong type or a NULL where
/// none is expected becomes the field default instead of poisoning the row.
/// A row without an email cannot be keyed and is dropped by the caller.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<OAuthRecord>> {
    let email: String = row.get("email").unwrap_or_default();
    let access_token: String = row.get("access_token").unwrap_or_default();
    let refresh_token: String = row.get("refresh_token").unwrap_or_default();
    let expiry: i64 = row.get("access_token_expiry_time").unwrap_or(0);
    let scopes_raw: String = row.get("oauth_scopes").unwrap_or_default();
    let name: String = row.get("account_name").unwrap_or_default();
    let avatar_url: String = row.get("avatar_url").unwrap_or_default();

    let record = OAuthRecord::new(
        &email,
        Some(&access_token),
        Some(&refresh_token),
        expiry,
        OAuthRecord::split_scopes(&scopes_raw),
        Some(&name),
        Some(&avatar_url),
    );
    Ok(record.ok())
}

impl OAuthDataStore for SqliteOAuthDataStore {
    fn save(&self, record: &OAuthRecord) -> LoginResult<()> {
        record.validate_scopes()?;
        self.conn
            .execute(
                r#"
INSERT INTO oauth_accounts(
  email,
  access_token,
  refresh_token,
  access_token_expiry_time,
  oauth_scopes,
  account_name,
  avatar_url
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT(email) DO UPDATE SET
  access_token = excluded.access_token,
  refresh_token = excluded.refresh_token,
  access_token_expiry_time = excluded.access_token_expiry_time,
  oauth_scopes = excluded.oauth_scopes,
  account_name = excluded.account_name,
  avatar_url = excluded.avatar_url
"#,
                params![
                    record.email(),
                    record.access_token().unwrap_or(""),
                    record.refresh_token().unwrap_or(""),
                    record.access_token_expiry_time(),
                    record.joined_scopes(),
                    record.name().unwrap_or(""),
                    record.avatar_url().unwrap_or(""),
                ],
            )
            .map_err(|e| LoginError::storage("failed to save oauth record", e))?;
        Ok(())
    }

    fn load_all(&self) -> LoginResult<Vec<OAuthRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
SELECT
  email,
  access_token,
  refresh_token,
  access_token_expiry_time,
  oauth_scopes,
  account_name,
  avatar_url
FROM oauth_accounts
ORDER BY email ASC
"#,
            )
            .map_err(|e| LoginError::storage("failed to prepare oauth record query", e))?;

        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| LoginError::storage("failed to query oauth records", e))?;

        let mut records = Vec::new();
        for row in rows {
            match row {
                Ok(Some(record)) => records.push(record),
                Ok(None) => tracing::warn!("skipping stored oauth row without an email"),
                Err(err) => tracing::warn!("skipping unreadable oauth row: {err}"),
            }
        }
        Ok(records)
    }

    fn remove(&self, email: &str) -> LoginResult<()> {
        // Zero rows affected means the record was already gone; that is fine.
        self.conn
            .execute(
                "DELETE FROM oauth_accounts WHERE email = ?1",
                params![email],
            )
            .map_err(|e| LoginError::storage("failed to remove oauth record", e))?;
        Ok(())
    }

    fn clear_all(&self) -> LoginResult<()> {
        self.conn
            .execute("DELETE FROM oauth_accounts", [])
            .map_err(|e| LoginError::storage("failed to clear oauth records", e))?;
        Ok(())
    }
}
