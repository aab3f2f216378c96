//! Usage: In-memory account and credential value objects.

use crate::domain::normalize_optional_text;
use crate::shared::error::{LoginError, LoginResult};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// OAuth2 token material for one account.
///
/// Plain value data: every accessor that crosses the roster boundary hands
/// out an independent copy, so callers can never mutate roster-internal
/// state through a credential they were given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Unix seconds; 0 when unknown.
    access_token_expiry_time: i64,
}

impl Credential {
    pub fn new(
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        access_token_expiry_time: i64,
    ) -> Self {
        Self {
            access_token: normalize_optional_text(access_token),
            refresh_token: normalize_optional_text(refresh_token),
            access_token_expiry_time,
        }
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

    /// An unknown expiry (0) always needs a refresh.
    pub fn needs_refresh(&self, now_unix: i64) -> bool {
        self.access_token_expiry_time == 0 || now_unix >= self.access_token_expiry_time
    }
}

/// One logged-in user.
///
/// Identity is the email: two accounts with the same email are the same
/// account regardless of token payload, display name, or avatar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    email: String,
    credential: Credential,
    name: Option<String>,
    avatar_url: Option<String>,
}

impl Account {
    pub fn new(
        email: &str,
        credential: Credential,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> LoginResult<Self> {
        let email = email.trim();
        if email.is_empty() {
            return Err(LoginError::validation("account email is required"));
        }
        Ok(Self {
            email: email.to_string(),
            credential,
            name: normalize_optional_text(name),
            avatar_url: normalize_optional_text(avatar_url),
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.credential.access_token()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.credential.refresh_token()
    }

    pub fn access_token_expiry_time(&self) -> i64 {
        self.credential.access_token_expiry_time()
    }

    /// Same identity, new token material.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.email.hash(state);
    }
}
