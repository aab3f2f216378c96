//! Usage: OAuth token endpoint collaborators (authorization_code + refresh_token grants).

use crate::shared::error::{LoginError, LoginResult};
use crate::shared::security::mask_token;
use crate::shared::time::now_unix_seconds;
use serde_json::Value;
use std::collections::HashMap;

/// One code-for-tokens exchange.
#[derive(Debug, Clone)]
pub struct TokenExchangeRequest {
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub code: String,
    pub redirect_uri: String,
    /// Present only when the authorization URL carried a PKCE challenge.
    pub code_verifier: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TokenRefreshRequest {
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub refresh_token: String,
}

/// Token material returned by the endpoint. `expires_at` is absolute unix
/// seconds, already offset from the endpoint's `expires_in`.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
}

/// Boundary to the OAuth2 token endpoint. The shipped
/// [`HttpTokenExchanger`] speaks the standard form-encoded grants; tests
/// substitute canned token sets.
pub trait TokenExchanger: Send {
    fn exchange_code(&self, request: &TokenExchangeRequest) -> LoginResult<TokenSet>;
    fn refresh(&self, request: &TokenRefreshRequest) -> LoginResult<TokenSet>;
}

#[derive(Debug, Default)]
pub struct HttpTokenExchanger {
    client: reqwest::blocking::Client,
}

impl HttpTokenExchanger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenExchanger for HttpTokenExchanger {
    fn exchange_code(&self, req: &TokenExchangeRequest) -> LoginResult<TokenSet> {
        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("grant_type", "authorization_code".to_string());
        form.insert("code", req.code.trim().to_string());
        form.insert("redirect_uri", req.redirect_uri.trim().to_string());
        form.insert("client_id", req.client_id.trim().to_string());
        if let Some(verifier) = req.code_verifier.as_deref().map(str::trim) {
            if !verifier.is_empty() {
                form.insert("code_verifier", verifier.to_string());
            }
        }
        if let Some(secret) = req.client_secret.as_deref().map(str::trim) {
            if !secret.is_empty() {
                form.insert("client_secret", secret.to_string());
            }
        }

        let response = self
            .client
            .post(req.token_uri.trim())
            .form(&form)
            .send()
            .map_err(|e| LoginError::io("oauth token exchange request failed", e))?;

        parse_token_response(response)
    }

    fn refresh(&self, req: &TokenRefreshRequest) -> LoginResult<TokenSet> {
        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("grant_type", "refresh_token".to_string());
        form.insert("refresh_token", req.refresh_token.trim().to_string());
        form.insert("client_id", req.client_id.trim().to_string());
        if let Some(secret) = req.client_secret.as_deref().map(str::trim) {
            if !secret.is_empty() {
                form.insert("client_secret", secret.to_string());
            }
        }

        let response = self
            .client
            .post(req.token_uri.trim())
            .form(&form)
            .send()
            .map_err(|e| LoginError::io("oauth refresh request failed", e))?;

        parse_token_response(response)
    }
}

fn parse_token_response(response: reqwest::blocking::Response) -> LoginResult<TokenSet> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| LoginError::io("oauth token response read failed", e))?;

    if !status.is_success() {
        let snippet = sanitize_error_body_snippet(&body);
        return Err(LoginError::io_msg(format!(
            "oauth token endpoint returned status={} body={snippet}",
            status.as_u16()
        )));
    }

    let value: Value = serde_json::from_str(&body)
        .map_err(|e| LoginError::io_msg(format!("oauth token response json invalid: {e}")))?;

    let access_token = value
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LoginError::io_msg("oauth token response missing access_token"))?
        .to_string();

    let refresh_token = value
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let expires_in = value.get("expires_in").and_then(parse_i64_lossy);
    let now = now_unix_seconds();
    let expires_at = expires_in.and_then(|v| {
        if v <= 0 {
            None
        } else {
            Some(now.saturating_add(v))
        }
    });

    Ok(TokenSet {
        access_token,
        refresh_token,
        expires_at,
    })
}

fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lc = key.trim().to_ascii_lowercase();
    key_lc.contains("token") || key_lc.contains("secret") || key_lc == "authorization"
}

fn redact_sensitive_json_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if is_sensitive_key(key) {
                    if let Some(raw) = nested.as_str() {
                        *nested = Value::String(mask_token(raw));
                        continue;
                    }
                }
                redact_sensitive_json_fields(nested);
            }
        }
        Value::Array(items) => {
            for nested in items {
                redact_sensitive_json_fields(nested);
            }
        }
        _ => {}
    }
}

fn sanitize_error_body_snippet(body: &str) -> String {
    if let Ok(mut value) = serde_json::from_str::<Value>(body) {
        redact_sensitive_json_fields(&mut value);
        if let Ok(encoded) = serde_json::to_string(&value) {
            return encoded.chars().take(500).collect();
        }
    }
    body.chars().take(500).collect()
}
