//! Usage: Durable credential storage contract and the shipped backends.

pub(crate) mod memory;
pub(crate) mod sqlite;

pub use memory::MemoryOAuthDataStore;
pub use sqlite::SqliteOAuthDataStore;

use crate::domain::record::OAuthRecord;
use crate::shared::error::LoginResult;

/// Persists one [`OAuthRecord`] per email under a namespace owned
/// exclusively by the store.
///
/// Contract for implementers:
/// - `save` rejects records whose scopes carry the storage delimiter
///   ([`crate::LoginError::Validation`]) and keeps the per-account write
///   atomic; a backend failure surfaces as [`crate::LoginError::Storage`]
///   with the original cause attached.
/// - `load_all` never fails on a single bad record: an unreadable field is
///   defaulted to absent/0, an unreadable row is skipped.
/// - `remove` treats "already removed" as success.
pub trait OAuthDataStore: Send {
    fn save(&self, record: &OAuthRecord) -> LoginResult<()>;
    fn load_all(&self) -> LoginResult<Vec<OAuthRecord>>;
    fn remove(&self, email: &str) -> LoginResult<()>;
    fn clear_all(&self) -> LoginResult<()>;
}
