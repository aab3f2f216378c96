//! Usage: Email-keyed registry of logged-in accounts plus the active designation.

use crate::domain::account::{Account, Credential};
use crate::shared::error::{LoginError, LoginResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Detached view of the roster for UI consumption. Mutating the roster after
/// taking a snapshot leaves the snapshot untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsSnapshot {
    pub active: Option<Account>,
    /// Remaining accounts, sorted by email for stable display ordering.
    pub inactive: Vec<Account>,
}

impl AccountsSnapshot {
    pub fn len(&self) -> usize {
        usize::from(self.active.is_some()) + self.inactive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.inactive.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.active.iter().chain(self.inactive.iter())
    }

    pub fn contains(&self, email: &str) -> bool {
        self.accounts().any(|account| account.email() == email)
    }
}

/// At most one account per email; the most recent add wins wholesale (no
/// field merging). Adding always designates the added account active;
/// removing the active account clears the designation without silently
/// promoting another entry.
///
/// Not thread-safe: the session manager serializes all access.
#[derive(Debug, Default)]
pub(crate) struct AccountRoster {
    accounts: HashMap<String, Account>,
    active_email: Option<String>,
}

impl AccountRoster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Replaces any same-email entry and makes the added account active.
    pub(crate) fn add(&mut self, account: Account) {
        let email = account.email().to_string();
        self.accounts.insert(email.clone(), account);
        self.active_email = Some(email);
    }

    /// No-op when the email is unknown.
    pub(crate) fn remove(&mut self, email: &str) {
        self.accounts.remove(email);
        if self.active_email.as_deref() == Some(email) {
            self.active_email = None;
        }
    }

    /// Returns whether an account with that email exists; the current
    /// designation is untouched on a miss.
    pub(crate) fn switch_active(&mut self, email: &str) -> bool {
        if !self.accounts.contains_key(email) {
            return false;
        }
        self.active_email = Some(email.to_string());
        true
    }

    pub(crate) fn active_account(&self) -> LoginResult<&Account> {
        if self.accounts.is_empty() {
            return Err(LoginError::invariant(
                "active account requested on an empty roster",
            ));
        }
        let email = self.active_email.as_deref().ok_or_else(|| {
            LoginError::invariant("no account is currently designated active")
        })?;
        self.accounts
            .get(email)
            .ok_or_else(|| LoginError::invariant("active designation points at a removed account"))
    }

    pub(crate) fn active_email(&self) -> Option<&str> {
        self.active_email.as_deref()
    }

    /// Puts a previously observed designation back, e.g. when a failed
    /// persist rolls an add back. A designation naming an unknown email is
    /// dropped rather than installed.
    pub(crate) fn restore_active(&mut self, email: Option<String>) {
        self.active_email = email.filter(|e| self.accounts.contains_key(e));
    }

    pub(crate) fn get(&self, email: &str) -> Option<&Account> {
        self.accounts.get(email)
    }

    pub(crate) fn active_credential(&self) -> Option<Credential> {
        let account = self.accounts.get(self.active_email.as_deref()?)?;
        Some(Credential::new(
            account.access_token(),
            account.refresh_token(),
            account.access_token_expiry_time(),
        ))
    }

    pub(crate) fn clear(&mut self) {
        self.accounts.clear();
        self.active_email = None;
    }

    pub(crate) fn snapshot(&self) -> AccountsSnapshot {
        let active = self
            .active_email
            .as_deref()
            .and_then(|email| self.accounts.get(email))
            .cloned();
        let mut inactive: Vec<Account> = self
            .accounts
            .values()
            .filter(|account| Some(account.email()) != self.active_email.as_deref())
            .cloned()
            .collect();
        inactive.sort_by(|a, b| a.email().cmp(b.email()));
        AccountsSnapshot { active, inactive }
    }
}
