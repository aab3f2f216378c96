//! Usage: Unified login error taxonomy shared across the crate.

use std::error::Error as StdError;
use std::sync::Arc;

pub type LoginResult<T> = Result<T, LoginError>;

/// Failure taxonomy for the login engine.
///
/// Only [`LoginError::Io`] is retryable by convention; everything else is
/// either a caller bug or a condition a retry cannot fix.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoginError {
    /// Bad input supplied by the caller, e.g. a scope string carrying the
    /// storage delimiter. Indicates a caller bug, not a runtime condition.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The persistent credential store failed to read, write, or remove.
    #[error("credential store failure: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Arc<dyn StdError + Send + Sync>>,
    },

    /// Network-level failure or non-2xx status during token exchange or an
    /// identity query.
    #[error("network failure: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<Arc<dyn StdError + Send + Sync>>,
    },

    /// The identity endpoint answered 2xx but supplied no usable email.
    #[error("identity endpoint returned no email address")]
    EmailNotReturned,

    /// Programmer error: an operation requiring a logged-in account was
    /// invoked without one.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl LoginError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn storage_msg(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    pub fn io(message: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn io_msg(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// True for transient network failures that a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
