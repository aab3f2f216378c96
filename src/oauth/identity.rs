//! Usage: Identity endpoint lookup for a freshly authorized token.

use crate::domain::normalize_optional_text;
use crate::shared::error::{LoginError, LoginResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub(crate) const IDENTITY_CONNECT_TIMEOUT_MS: u64 = 5000;
pub(crate) const IDENTITY_READ_TIMEOUT_MS: u64 = 3000;

/// Which payload shape the configured identity endpoint answers with.
#[derive(Debug, Clone)]
pub enum IdentityEndpoint {
    /// The body is a URL-encoded parameter list carrying `email=...`.
    UrlEncodedEmail { url: String },
    /// The body is a JSON object with `email` and optional `name`/`picture`.
    UserInfoJson { url: String },
}

/// Resolved identity for a token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

pub(crate) fn query_identity(
    endpoint: &IdentityEndpoint,
    access_token: &str,
) -> LoginResult<UserInfo> {
    match endpoint {
        IdentityEndpoint::UrlEncodedEmail { url } => {
            let email = query_email(url, access_token)?;
            Ok(UserInfo {
                email,
                name: None,
                avatar_url: None,
            })
        }
        IdentityEndpoint::UserInfoJson { url } => query_user_info(url, access_token),
    }
}

/// Fetches the account email from an endpoint answering with a URL-encoded
/// body. A 2xx answer without a usable `email` parameter is
/// [`LoginError::EmailNotReturned`]; transport failures and non-2xx statuses
/// are [`LoginError::Io`].
pub fn query_email(url: &str, access_token: &str) -> LoginResult<String> {
    let body = fetch_body(url, access_token)?;
    parse_url_parameters(&body)
        .remove("email")
        .filter(|email| !email.trim().is_empty())
        .ok_or(LoginError::EmailNotReturned)
}

/// Fetches email plus optional display name and avatar from an endpoint
/// answering with a JSON user-info object. The failure taxonomy matches
/// [`query_email`]; an unparsable or email-less body counts as "no email".
pub fn query_user_info(url: &str, access_token: &str) -> LoginResult<UserInfo> {
    let body = fetch_body(url, access_token)?;
    let value: Value = serde_json::from_str(&body).map_err(|_| LoginError::EmailNotReturned)?;

    let email = value
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(LoginError::EmailNotReturned)?
        .to_string();

    Ok(UserInfo {
        email,
        name: normalize_optional_text(value.get("name").and_then(Value::as_str)),
        avatar_url: normalize_optional_text(value.get("picture").and_then(Value::as_str)),
    })
}

fn fetch_body(url: &str, access_token: &str) -> LoginResult<String> {
    let client = reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_millis(IDENTITY_CONNECT_TIMEOUT_MS))
        .timeout(Duration::from_millis(IDENTITY_READ_TIMEOUT_MS))
        .build()
        .map_err(|e| LoginError::io("failed to build identity http client", e))?;

    let response = client
        .get(url)
        .bearer_auth(access_token)
        .send()
        .map_err(|e| LoginError::io("identity query request failed", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoginError::io_msg(format!(
            "identity endpoint returned status={}",
            status.as_u16()
        )));
    }

    response
        .text()
        .map_err(|e| LoginError::io("identity response read failed", e))
}

/// Splits `a=1&b=2` (optionally after a `?`) into decoded key-value pairs.
fn parse_url_parameters(params: &str) -> HashMap<String, String> {
    let params = match params.find('?') {
        Some(index) => &params[index + 1..],
        None => params,
    };
    url::form_urlencoded::parse(params.trim().as_bytes())
        .into_owned()
        .collect()
}
