//! Usage: Durable authorization record and its storage normalization rules.

use crate::domain::account::{Account, Credential};
use crate::domain::normalize_optional_text;
use crate::shared::error::{LoginError, LoginResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Joins the scope set into the single stored column. A scope identifier
/// must never contain this character; [`OAuthRecord::validate_scopes`]
/// rejects offenders at save time.
pub const SCOPE_DELIMITER: char = ' ';

/// The durable form of one account's authorization state.
///
/// Optional fields are normalized on construction: an empty string and an
/// absent value are the same state, both in memory and on disk. The scope
/// set is never null; it may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthRecord {
    email: String,
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Unix seconds; 0 when unknown.
    access_token_expiry_time: i64,
    scopes: BTreeSet<String>,
    name: Option<String>,
    avatar_url: Option<String>,
}

impl OAuthRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        email: &str,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        access_token_expiry_time: i64,
        scopes: BTreeSet<String>,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> LoginResult<Self> {
        let email = email.trim();
        if email.is_empty() {
            return Err(LoginError::validation("record email is required"));
        }
        let scopes = scopes
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            email: email.to_string(),
            access_token: normalize_optional_text(access_token),
            refresh_token: normalize_optional_text(refresh_token),
            access_token_expiry_time,
            scopes,
            name: normalize_optional_text(name),
            avatar_url: normalize_optional_text(avatar_url),
        })
    }

    /// The durable snapshot of a roster account, stamped with the scope set
    /// its tokens were granted for.
    pub fn from_account(account: &Account, scopes: &BTreeSet<String>) -> LoginResult<Self> {
        Self::new(
            account.email(),
            account.access_token(),
            account.refresh_token(),
            account.access_token_expiry_time(),
            scopes.clone(),
            account.name(),
            account.avatar_url(),
        )
    }

    /// Rehydrates the in-memory account this record was saved from.
    pub fn to_account(&self) -> LoginResult<Account> {
        let credential = Credential::new(
            self.access_token.as_deref(),
            self.refresh_token.as_deref(),
            self.access_token_expiry_time,
        );
        Account::new(
            &self.email,
            credential,
            self.name.as_deref(),
            self.avatar_url.as_deref(),
        )
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn access_token_expiry_time(&self) -> i64 {
        self.access_token_expiry_time
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    /// Rejects scope strings that would corrupt the joined storage column.
    /// A violation is a caller programming error.
    pub fn validate_scopes(&self) -> LoginResult<()> {
        for scope in &self.scopes {
            if scope.contains(SCOPE_DELIMITER) {
                return Err(LoginError::validation(format!(
                    "scope {scope:?} contains the storage delimiter"
                )));
            }
        }
        Ok(())
    }

    /// The single-column form of the scope set.
    pub fn joined_scopes(&self) -> String {
        self.scopes
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&SCOPE_DELIMITER.to_string())
    }

    /// Inverse of [`OAuthRecord::joined_scopes`]; empty fragments are dropped.
    pub fn split_scopes(raw: &str) -> BTreeSet<String> {
        raw.split(SCOPE_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
