//! Usage: Login session orchestration: login/logout flows, active-account
//! switching, on-demand token refresh, startup reconciliation, and listener
//! dispatch.

use crate::domain::account::{Account, Credential};
use crate::domain::record::OAuthRecord;
use crate::domain::roster::{AccountRoster, AccountsSnapshot};
use crate::facade::{LoggerFacade, UiFacade, VerificationCodeHolder};
use crate::oauth::authorize::{
    build_authorize_url, generate_pkce_pair, generate_state_nonce, OOB_REDIRECT_URI,
};
use crate::oauth::identity::{self, IdentityEndpoint};
use crate::oauth::token_exchange::{TokenExchangeRequest, TokenExchanger, TokenRefreshRequest};
use crate::shared::error::{LoginError, LoginResult};
use crate::shared::mutex_ext::MutexExt;
use crate::shared::time::now_unix_seconds;
use crate::store::OAuthDataStore;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

const SIGN_IN_ERROR_TITLE: &str = "Error while signing in";
const SIGN_OUT_PROMPT_TITLE: &str = "Sign out?";
const SIGN_OUT_PROMPT_MESSAGE: &str = "Are you sure you want to sign out?";

/// Receives a detached roster snapshot after every durable state change.
pub trait LoginListener: Send {
    fn status_changed(&self, accounts: &AccountsSnapshot);
}

/// Static client and endpoint configuration for one embedding application.
#[derive(Debug, Clone)]
pub struct LoginConfig {
    pub client_id: String,
    /// Empty when the provider issues no secret for native clients.
    pub client_secret: String,
    /// The scope set every held token must have been granted for, exactly.
    pub oauth_scopes: BTreeSet<String>,
    /// Authorization endpoint the browser flow sends the user to.
    pub auth_url: String,
    /// Token endpoint used for code exchange and refresh.
    pub token_uri: String,
    pub identity: IdentityEndpoint,
}

/// Drives login and logout for a set of accounts, keeps the roster and the
/// persistent store consistent, and notifies the UI and registered
/// listeners after every durable change.
///
/// Not internally thread-safe: the embedding application must serialize all
/// calls into one instance (mutating operations take `&mut self`, so the
/// borrow checker enforces the single-owner contract within one process).
/// The listener list is the one exception; [`Self::add_login_listener`] may
/// race with dispatch.
///
/// Side effects always run in the same order: roster mutation, persistence,
/// UI status refresh, listener notification. Listeners therefore only ever
/// observe state that is already durable.
pub struct LoginSessionManager {
    config: LoginConfig,
    store: Box<dyn OAuthDataStore>,
    ui: Box<dyn UiFacade>,
    logger: Box<dyn LoggerFacade>,
    exchanger: Box<dyn TokenExchanger>,
    roster: AccountRoster,
    listeners: Mutex<Vec<Box<dyn LoginListener>>>,
}

impl LoginSessionManager {
    /// Builds the manager and reconciles previously persisted accounts into
    /// the roster. Records that are incomplete (no refresh token, empty
    /// scope set) or granted for a different scope set than
    /// `config.oauth_scopes` are deleted from the store and never surface
    /// as logged-in.
    pub fn new(
        config: LoginConfig,
        store: Box<dyn OAuthDataStore>,
        ui: Box<dyn UiFacade>,
        logger: Box<dyn LoggerFacade>,
        exchanger: Box<dyn TokenExchanger>,
    ) -> Self {
        let mut manager = Self {
            config,
            store,
            ui,
            logger,
            exchanger,
            roster: AccountRoster::new(),
            listeners: Mutex::new(Vec::new()),
        };
        manager.retrieve_saved_credentials();
        manager
    }

    /// Registers a listener for login-state changes. May be called while a
    /// notification is being dispatched on another thread.
    pub fn add_login_listener(&self, listener: Box<dyn LoginListener>) {
        self.listeners.lock_or_recover().push(listener);
    }

    pub fn is_logged_in(&self) -> bool {
        !self.roster.is_empty()
    }

    /// Signs in via the browser flow: the authorization URL (with state
    /// nonce and PKCE challenge) goes to the UI facade, which returns the
    /// verification code the user pasted back. A cancelled interaction
    /// returns `false` with no side effects; so does any exchange,
    /// identity, or persistence failure, after surfacing the error.
    ///
    /// Always prompts, so a second account can be added at any time. The
    /// signed-in account becomes active.
    pub fn login(&mut self, title: Option<&str>) -> bool {
        let pkce = generate_pkce_pair();
        let state = generate_state_nonce();
        let auth_url = match build_authorize_url(
            &self.config.auth_url,
            &self.config.client_id,
            OOB_REDIRECT_URI,
            &self.config.oauth_scopes,
            &state,
            &pkce.code_challenge,
        ) {
            Ok(url) => url,
            Err(err) => {
                self.report_login_failure(&err);
                return false;
            }
        };

        let Some(code) = self.ui.obtain_verification_code_via_browser(title, &auth_url) else {
            return false;
        };

        let request = TokenExchangeRequest {
            token_uri: self.config.token_uri.clone(),
            client_id: self.config.client_id.clone(),
            client_secret: optional_secret(&self.config.client_secret),
            code,
            redirect_uri: OOB_REDIRECT_URI.to_string(),
            code_verifier: Some(pkce.code_verifier),
        };
        self.login_with_request(&request)
    }

    /// Signs in via the local-listener flow: the UI facade owns the
    /// authorization URL and callback listener and returns the code plus
    /// the redirect URL it was issued against.
    pub fn login_with_local_server(&mut self, title: Option<&str>) -> bool {
        let Some(holder) = self.ui.obtain_verification_code_via_local_server(title) else {
            return false;
        };
        let VerificationCodeHolder {
            verification_code,
            redirect_url,
        } = holder;

        let request = TokenExchangeRequest {
            token_uri: self.config.token_uri.clone(),
            client_id: self.config.client_id.clone(),
            client_secret: optional_secret(&self.config.client_secret),
            code: verification_code,
            redirect_uri: redirect_url,
            code_verifier: None,
        };
        self.login_with_request(&request)
    }

    /// Signs out every account. Trivially succeeds when nobody is signed
    /// in; a declined confirmation prompt aborts with no state change.
    pub fn log_out(&mut self, show_prompt: bool) -> bool {
        self.log_out_all(show_prompt)
    }

    pub fn log_out_all(&mut self, show_prompt: bool) -> bool {
        if !self.is_logged_in() {
            return true;
        }
        if show_prompt && !self.ui.ask_yes_or_no(SIGN_OUT_PROMPT_TITLE, SIGN_OUT_PROMPT_MESSAGE) {
            return false;
        }

        self.roster.clear();
        if let Err(err) = self.store.clear_all() {
            // Memory is already signed out; anything left on disk is
            // discarded by the next startup reconciliation.
            self.logger
                .log_error("could not clear stored sign-in data", Some(&err));
            self.ui.show_error_dialog(
                "Error while signing out",
                &format!("Stored sign-in data could not be removed: {err}"),
            );
        }

        self.ui.notify_status_indicator();
        self.notify_login_status_change();
        true
    }

    /// Makes the account with `email` active. Returns whether such an
    /// account exists; on a miss nothing changes and nobody is notified.
    pub fn switch_active_account(&mut self, email: &str) -> bool {
        if !self.roster.switch_active(email) {
            return false;
        }

        match self.record_for(email) {
            Ok(record) => {
                if let Err(err) = self.store.save(&record) {
                    self.logger
                        .log_error("could not re-persist the active account", Some(&err));
                }
            }
            Err(err) => {
                self.logger
                    .log_error("could not snapshot the active account", Some(&err));
            }
        }

        self.ui.notify_status_indicator();
        self.notify_login_status_change();
        true
    }

    /// Detached snapshot for UI consumption: the active account separated
    /// from the rest, unaffected by later roster changes.
    pub fn list_accounts(&self) -> AccountsSnapshot {
        self.roster.snapshot()
    }

    /// A freshly built credential for the active account, or `None` when
    /// nobody is signed in (or no account is currently designated active).
    /// Never a live reference into roster-internal state.
    pub fn get_active_credential(&self) -> Option<Credential> {
        self.roster.active_credential()
    }

    /// Returns a currently valid access token for the active account,
    /// refreshing it synchronously through the token endpoint when the held
    /// one is expired or of unknown age. A successful refresh re-saves the
    /// whole record.
    pub fn fetch_access_token(&mut self) -> LoginResult<String> {
        if !self.is_logged_in() {
            return Err(LoginError::invariant(
                "fetch_access_token requires a signed-in account",
            ));
        }
        let account = self.roster.active_account()?.clone();

        if !account.credential().needs_refresh(now_unix_seconds()) {
            if let Some(token) = account.access_token() {
                return Ok(token.to_string());
            }
        }
        self.refresh_account(account)
    }

    fn refresh_account(&mut self, account: Account) -> LoginResult<String> {
        let refresh_token = account
            .refresh_token()
            .map(str::to_string)
            .ok_or_else(|| LoginError::invariant("active account holds no refresh token"))?;

        let request = TokenRefreshRequest {
            token_uri: self.config.token_uri.clone(),
            client_id: self.config.client_id.clone(),
            client_secret: optional_secret(&self.config.client_secret),
            refresh_token: refresh_token.clone(),
        };
        let tokens = match self.exchanger.refresh(&request) {
            Ok(tokens) => tokens,
            Err(err) => {
                self.logger
                    .log_error("could not obtain an oauth2 access token", Some(&err));
                return Err(err);
            }
        };

        // Endpoints routinely omit the refresh token on refresh; keep the
        // stored one in that case.
        let credential = Credential::new(
            Some(&tokens.access_token),
            tokens
                .refresh_token
                .as_deref()
                .or(Some(refresh_token.as_str())),
            tokens.expires_at.unwrap_or(0),
        );
        self.commit_account(account.with_credential(credential))?;
        Ok(tokens.access_token)
    }

    fn login_with_request(&mut self, request: &TokenExchangeRequest) -> bool {
        match self.exchange_and_commit(request) {
            Ok(()) => {
                self.ui.notify_status_indicator();
                self.notify_login_status_change();
                true
            }
            Err(err) => {
                self.report_login_failure(&err);
                false
            }
        }
    }

    fn exchange_and_commit(&mut self, request: &TokenExchangeRequest) -> LoginResult<()> {
        let tokens = self.exchanger.exchange_code(request)?;
        let info = identity::query_identity(&self.config.identity, &tokens.access_token)?;

        let credential = Credential::new(
            Some(&tokens.access_token),
            tokens.refresh_token.as_deref(),
            tokens.expires_at.unwrap_or(0),
        );
        let account = Account::new(
            &info.email,
            credential,
            info.name.as_deref(),
            info.avatar_url.as_deref(),
        )?;
        self.commit_account(account)
    }

    /// Roster add plus persist. A persistence failure restores the exact
    /// pre-attempt roster content and designation, so a failed attempt is
    /// indistinguishable from one that never happened.
    fn commit_account(&mut self, account: Account) -> LoginResult<()> {
        let email = account.email().to_string();
        let previous = self.roster.get(&email).cloned();
        let previous_active = self.roster.active_email().map(str::to_string);

        self.roster.add(account);
        let committed = self
            .record_for(&email)
            .and_then(|record| self.store.save(&record));
        if let Err(err) = committed {
            match previous {
                Some(prev) => self.roster.add(prev),
                None => self.roster.remove(&email),
            }
            self.roster.restore_active(previous_active);
            return Err(err);
        }
        Ok(())
    }

    fn record_for(&self, email: &str) -> LoginResult<OAuthRecord> {
        let account = self
            .roster
            .get(email)
            .ok_or_else(|| LoginError::invariant(format!("no roster account for {email}")))?;
        OAuthRecord::from_account(account, &self.config.oauth_scopes)
    }

    fn retrieve_saved_credentials(&mut self) {
        let records = match self.store.load_all() {
            Ok(records) => records,
            Err(err) => {
                self.logger
                    .log_warning(&format!("could not load stored sign-in data: {err}"));
                return;
            }
        };

        for record in records {
            if record.refresh_token().is_none() || record.scopes().is_empty() {
                self.discard_stale_record(record.email(), "stored credentials are incomplete");
                continue;
            }
            if record.scopes() != &self.config.oauth_scopes {
                self.logger.log_warning(&format!(
                    "oauth scope set for stored credentials of {} no longer valid, discarding: {:?} vs. {:?}",
                    record.email(),
                    self.config.oauth_scopes,
                    record.scopes()
                ));
                self.discard_stale_record(record.email(), "scope set mismatch");
                continue;
            }
            match record.to_account() {
                Ok(account) => self.roster.add(account),
                Err(err) => self
                    .logger
                    .log_warning(&format!("skipping unusable stored record: {err}")),
            }
        }
    }

    /// One record failing to go away must not abort reconciliation of the
    /// rest.
    fn discard_stale_record(&mut self, email: &str, reason: &str) {
        tracing::warn!(email, reason, "discarding stored sign-in record");
        if let Err(err) = self.store.remove(email) {
            self.logger.log_warning(&format!(
                "could not discard the stale record for {email}: {err}"
            ));
        }
    }

    fn notify_login_status_change(&self) {
        let snapshot = self.roster.snapshot();
        let listeners = self.listeners.lock_or_recover();
        for listener in listeners.iter() {
            let dispatch = catch_unwind(AssertUnwindSafe(|| listener.status_changed(&snapshot)));
            if dispatch.is_err() {
                self.logger
                    .log_warning("a login listener panicked during notification; continuing");
            }
        }
    }

    fn report_login_failure(&self, err: &LoginError) {
        self.ui.show_error_dialog(
            SIGN_IN_ERROR_TITLE,
            &format!("An error occurred while trying to sign in: {err}"),
        );
        self.logger.log_error("could not sign in", Some(err));
    }
}

fn optional_secret(secret: &str) -> Option<String> {
    let secret = secret.trim();
    if secret.is_empty() {
        None
    } else {
        Some(secret.to_string())
    }
}
