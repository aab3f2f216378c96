#![allow(dead_code)]

use oauth_login_hub::{
    IdentityEndpoint, LoggerFacade, LoginConfig, LoginError, LoginListener, LoginResult,
    MemoryOAuthDataStore, OAuthDataStore, OAuthRecord, TokenExchangeRequest, TokenExchanger,
    TokenRefreshRequest, TokenSet, UiFacade, VerificationCodeHolder,
};
use std::collections::{BTreeSet, VecDeque};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

pub const FAR_FUTURE_EXPIRY: i64 = 4_000_000_000;

pub fn scope_set(scopes: &[&str]) -> BTreeSet<String> {
    scopes.iter().map(|s| s.to_string()).collect()
}

pub fn fake_scopes() -> BTreeSet<String> {
    scope_set(&["oauth-scope-1", "oauth-scope-2"])
}

pub fn login_config(identity_url: &str) -> LoginConfig {
    LoginConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        oauth_scopes: fake_scopes(),
        auth_url: "https://accounts.example.com/o/oauth2/auth".to_string(),
        token_uri: "https://oauth2.example.com/token".to_string(),
        identity: IdentityEndpoint::UrlEncodedEmail {
            url: identity_url.to_string(),
        },
    }
}

pub fn token_set(tag: &str) -> TokenSet {
    TokenSet {
        access_token: format!("access-token-login-{tag}"),
        refresh_token: Some(format!("refresh-token-login-{tag}")),
        expires_at: Some(FAR_FUTURE_EXPIRY),
    }
}

pub fn saved_record(email: &str, scopes: BTreeSet<String>, expiry: i64) -> OAuthRecord {
    OAuthRecord::new(
        email,
        Some("access-token-5"),
        Some("refresh-token-5"),
        expiry,
        scopes,
        None,
        None,
    )
    .expect("build saved record")
}

/// Store handle that can outlive the manager owning a clone of it, so tests
/// can inspect persisted state after logout or reconstruct a second manager
/// over the same data.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Arc<MemoryOAuthDataStore>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OAuthDataStore for SharedStore {
    fn save(&self, record: &OAuthRecord) -> LoginResult<()> {
        self.inner.save(record)
    }

    fn load_all(&self) -> LoginResult<Vec<OAuthRecord>> {
        self.inner.load_all()
    }

    fn remove(&self, email: &str) -> LoginResult<()> {
        self.inner.remove(email)
    }

    fn clear_all(&self) -> LoginResult<()> {
        self.inner.clear_all()
    }
}

/// Store whose writes always fail, for rollback coverage.
pub struct FailingSaveStore;

impl OAuthDataStore for FailingSaveStore {
    fn save(&self, _record: &OAuthRecord) -> LoginResult<()> {
        Err(LoginError::storage_msg("backend write refused"))
    }

    fn load_all(&self) -> LoginResult<Vec<OAuthRecord>> {
        Ok(Vec::new())
    }

    fn remove(&self, _email: &str) -> LoginResult<()> {
        Ok(())
    }

    fn clear_all(&self) -> LoginResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct UiState {
    pub browser_codes: Mutex<VecDeque<Option<String>>>,
    pub local_codes: Mutex<VecDeque<Option<VerificationCodeHolder>>>,
    pub confirm_sign_out: AtomicBool,
    pub error_dialogs: Mutex<Vec<(String, String)>>,
    pub status_pings: AtomicUsize,
    pub auth_urls: Mutex<Vec<String>>,
}

/// Scripted UI facade; tests keep a clone to script inputs and inspect what
/// the manager surfaced.
#[derive(Clone, Default)]
pub struct StubUi {
    pub state: Arc<UiState>,
}

impl StubUi {
    pub fn push_browser_code(&self, code: Option<&str>) {
        self.state
            .browser_codes
            .lock()
            .unwrap()
            .push_back(code.map(str::to_string));
    }

    pub fn push_local_code(&self, holder: Option<VerificationCodeHolder>) {
        self.state.local_codes.lock().unwrap().push_back(holder);
    }

    pub fn push_local_codes(&self, count: usize) {
        for i in 1..=count {
            self.push_local_code(Some(VerificationCodeHolder {
                verification_code: format!("verification-code-{i}"),
                redirect_url: format!("http://127.0.0.1:9{i}/callback"),
            }));
        }
    }

    pub fn error_dialog_count(&self) -> usize {
        self.state.error_dialogs.lock().unwrap().len()
    }

    pub fn status_ping_count(&self) -> usize {
        self.state.status_pings.load(Ordering::SeqCst)
    }
}

impl UiFacade for StubUi {
    fn obtain_verification_code_via_browser(
        &self,
        _title: Option<&str>,
        auth_url: &str,
    ) -> Option<String> {
        self.state
            .auth_urls
            .lock()
            .unwrap()
            .push(auth_url.to_string());
        self.state
            .browser_codes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(None)
    }

    fn obtain_verification_code_via_local_server(
        &self,
        _title: Option<&str>,
    ) -> Option<VerificationCodeHolder> {
        self.state
            .local_codes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(None)
    }

    fn show_error_dialog(&self, title: &str, message: &str) {
        self.state
            .error_dialogs
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }

    fn ask_yes_or_no(&self, _title: &str, _message: &str) -> bool {
        self.state.confirm_sign_out.load(Ordering::SeqCst)
    }

    fn notify_status_indicator(&self) {
        self.state.status_pings.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct LoggerState {
    pub errors: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
pub struct StubLogger {
    pub state: Arc<LoggerState>,
}

impl StubLogger {
    pub fn error_count(&self) -> usize {
        self.state.errors.lock().unwrap().len()
    }

    pub fn warning_count(&self) -> usize {
        self.state.warnings.lock().unwrap().len()
    }
}

impl LoggerFacade for StubLogger {
    fn log_error(&self, message: &str, _cause: Option<&(dyn std::error::Error + 'static)>) {
        self.state.errors.lock().unwrap().push(message.to_string());
    }

    fn log_warning(&self, message: &str) {
        self.state
            .warnings
            .lock()
            .unwrap()
            .push(message.to_string());
    }
}

#[derive(Default)]
pub struct ExchangerState {
    pub exchange_results: Mutex<VecDeque<LoginResult<TokenSet>>>,
    pub refresh_results: Mutex<VecDeque<LoginResult<TokenSet>>>,
    pub exchange_requests: Mutex<Vec<TokenExchangeRequest>>,
    pub refresh_requests: Mutex<Vec<TokenRefreshRequest>>,
}

/// Scripted token endpoint; each login pops the next scripted result.
#[derive(Clone, Default)]
pub struct StubExchanger {
    pub state: Arc<ExchangerState>,
}

impl StubExchanger {
    pub fn push_exchange(&self, result: LoginResult<TokenSet>) {
        self.state
            .exchange_results
            .lock()
            .unwrap()
            .push_back(result);
    }

    pub fn push_exchanges(&self, count: usize) {
        for i in 1..=count {
            self.push_exchange(Ok(token_set(&i.to_string())));
        }
    }

    pub fn push_refresh(&self, result: LoginResult<TokenSet>) {
        self.state.refresh_results.lock().unwrap().push_back(result);
    }

    pub fn exchange_request_count(&self) -> usize {
        self.state.exchange_requests.lock().unwrap().len()
    }

    pub fn refresh_request_count(&self) -> usize {
        self.state.refresh_requests.lock().unwrap().len()
    }
}

impl TokenExchanger for StubExchanger {
    fn exchange_code(&self, request: &TokenExchangeRequest) -> LoginResult<TokenSet> {
        self.state
            .exchange_requests
            .lock()
            .unwrap()
            .push(request.clone());
        self.state
            .exchange_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LoginError::io_msg("no scripted token response")))
    }

    fn refresh(&self, request: &TokenRefreshRequest) -> LoginResult<TokenSet> {
        self.state
            .refresh_requests
            .lock()
            .unwrap()
            .push(request.clone());
        self.state
            .refresh_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LoginError::io_msg("no scripted refresh response")))
    }
}

/// Records every dispatched snapshot as (size, active email).
#[derive(Clone, Default)]
pub struct CollectingListener {
    pub snapshots: Arc<Mutex<Vec<(usize, Option<String>)>>>,
}

impl CollectingListener {
    pub fn count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

impl LoginListener for CollectingListener {
    fn status_changed(&self, accounts: &oauth_login_hub::AccountsSnapshot) {
        self.snapshots.lock().unwrap().push((
            accounts.len(),
            accounts.active.as_ref().map(|a| a.email().to_string()),
        ));
    }
}

/// Misbehaving listener used to prove per-listener failure isolation.
pub struct PanickingListener;

impl LoginListener for PanickingListener {
    fn status_changed(&self, _accounts: &oauth_login_hub::AccountsSnapshot) {
        panic!("listener blew up");
    }
}

/// Records how many rows the store holds at the moment of dispatch, to pin
/// the persistence-before-notification ordering.
#[derive(Clone)]
pub struct StoreInspectingListener {
    pub store: SharedStore,
    pub seen_row_counts: Arc<Mutex<Vec<usize>>>,
}

impl StoreInspectingListener {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            seen_row_counts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl LoginListener for StoreInspectingListener {
    fn status_changed(&self, _accounts: &oauth_login_hub::AccountsSnapshot) {
        let rows = self.store.load_all().map(|r| r.len()).unwrap_or(0);
        self.seen_row_counts.lock().unwrap().push(rows);
    }
}

#[derive(Clone, Copy)]
pub enum EmailServerResponse {
    Ok,
    /// Same email on every connection, for same-account relogin scenarios.
    OkFixed,
    InternalServerError,
    MalformedContent,
    UserInfoJson,
    UserInfoJsonWithoutEmail,
    CloseWithoutResponse,
}

/// One-shot HTTP stub for the identity endpoint: serves `times_serving`
/// connections sequentially, numbering successful identities 1, 2, 3, ...
/// Returns the base URL to point the identity endpoint at.
pub fn run_email_query_server(times_serving: usize, response: EmailServerResponse) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind email stub server");
    let port = listener.local_addr().expect("stub server addr").port();

    thread::spawn(move || {
        for tag in 1..=times_serving {
            let Ok((stream, _)) = listener.accept() else {
                break;
            };
            serve_one(stream, response, tag);
        }
    });

    format!("http://127.0.0.1:{port}")
}

fn serve_one(mut stream: TcpStream, response: EmailServerResponse, tag: usize) {
    // Read the request head before answering; closing the socket with the
    // request unread makes clients report a reset instead of our response.
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    let (status, body) = match response {
        EmailServerResponse::Ok => (
            "200 OK",
            format!("email=email-from-server-{tag}@example.com"),
        ),
        EmailServerResponse::OkFixed => ("200 OK", "email=email-fixed@example.com".to_string()),
        EmailServerResponse::InternalServerError => ("500 Internal Server Error", String::new()),
        EmailServerResponse::MalformedContent => ("200 OK", "malformed-content".to_string()),
        EmailServerResponse::UserInfoJson => (
            "200 OK",
            format!(
                r#"{{"email":"email-from-server-{tag}@example.com","name":"Server User {tag}","picture":"https://pic.example.com/{tag}.png"}}"#
            ),
        ),
        EmailServerResponse::UserInfoJsonWithoutEmail => {
            ("200 OK", r#"{"name":"Nameless"}"#.to_string())
        }
        EmailServerResponse::CloseWithoutResponse => return,
    };

    let payload = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(payload.as_bytes());
    let _ = stream.flush();
}
