//! Multi-account OAuth2 login state for desktop-tool integrations.
//!
//! The crate is platform independent: an embedding application supplies an
//! [`OAuthDataStore`] for persistence, a [`UiFacade`] for user interaction
//! (browser hand-off, dialogs, the status indicator, plus the callback
//! listener in the local-listener flow), and a
//! [`LoggerFacade`] for its logging system. [`LoginSessionManager`] drives
//! sign-in and sign-out, keeps the roster and the store consistent, and
//! notifies registered [`LoginListener`]s after every durable change.
//!
//! A manager instance expects a single logical owner; see the type docs for
//! the exact contract.

mod domain;
mod facade;
mod oauth;
mod session;
mod shared;
mod store;

pub use domain::account::{Account, Credential};
pub use domain::record::{OAuthRecord, SCOPE_DELIMITER};
pub use domain::roster::AccountsSnapshot;
pub use facade::{LoggerFacade, TracingLogger, UiFacade, VerificationCodeHolder};
pub use oauth::authorize::OOB_REDIRECT_URI;
pub use oauth::identity::{query_email, query_user_info, IdentityEndpoint, UserInfo};
pub use oauth::token_exchange::{
    HttpTokenExchanger, TokenExchangeRequest, TokenExchanger, TokenRefreshRequest, TokenSet,
};
pub use session::{LoginConfig, LoginListener, LoginSessionManager};
pub use shared::error::{LoginError, LoginResult};
pub use store::{MemoryOAuthDataStore, OAuthDataStore, SqliteOAuthDataStore};
