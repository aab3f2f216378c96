//! Usage: In-memory credential store for tests and ephemeral embedders.

use super::OAuthDataStore;
use crate::domain::record::OAuthRecord;
use crate::shared::error::LoginResult;
use crate::shared::mutex_ext::MutexExt;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Applies the same validation and normalization rules as the persistent
/// backends, so round-trip behavior is identical; only durability differs.
#[derive(Debug, Default)]
pub struct MemoryOAuthDataStore {
    records: Mutex<BTreeMap<String, OAuthRecord>>,
}

impl MemoryOAuthDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OAuthDataStore for MemoryOAuthDataStore {
    fn save(&self, record: &OAuthRecord) -> LoginResult<()> {
        record.validate_scopes()?;
        self.records
            .lock_or_recover()
            .insert(record.email().to_string(), record.clone());
        Ok(())
    }

    fn load_all(&self) -> LoginResult<Vec<OAuthRecord>> {
        Ok(self.records.lock_or_recover().values().cloned().collect())
    }

    fn remove(&self, email: &str) -> LoginResult<()> {
        self.records.lock_or_recover().remove(email);
        Ok(())
    }

    fn clear_all(&self) -> LoginResult<()> {
        self.records.lock_or_recover().clear();
        Ok(())
    }
}
