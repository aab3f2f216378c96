//! Usage: Embedder-implemented collaborator seams (UI interaction + logging).

use std::error::Error as StdError;

/// Verification code captured by an embedder-owned local callback listener,
/// together with the redirect URL the code was issued against.
#[derive(Debug, Clone)]
pub struct VerificationCodeHolder {
    pub verification_code: String,
    pub redirect_url: String,
}

/// Platform UI surface the session manager drives. Implementations decide
/// what dialogs, browsers, and status widgets actually look like.
pub trait UiFacade: Send {
    /// Presents `auth_url` (typically by opening a browser) and returns the
    /// verification code the user pasted back, or `None` on cancel.
    fn obtain_verification_code_via_browser(
        &self,
        title: Option<&str>,
        auth_url: &str,
    ) -> Option<String>;

    /// Runs the embedder's authorization flow backed by a local callback
    /// listener. The facade owns the authorization URL in this variant and
    /// reports which redirect URL the returned code was issued against.
    fn obtain_verification_code_via_local_server(
        &self,
        title: Option<&str>,
    ) -> Option<VerificationCodeHolder>;

    fn show_error_dialog(&self, title: &str, message: &str);

    fn ask_yes_or_no(&self, title: &str, message: &str) -> bool;

    /// Called after every durable login-state change so the embedder can
    /// repaint its status widgets.
    fn notify_status_indicator(&self);
}

/// User-facing logging sink.
pub trait LoggerFacade: Send {
    fn log_error(&self, message: &str, cause: Option<&(dyn StdError + 'static)>);
    fn log_warning(&self, message: &str);
}

/// Default logger facade forwarding to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl LoggerFacade for TracingLogger {
    fn log_error(&self, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        match cause {
            Some(cause) => tracing::error!(cause = %cause, "{message}"),
            None => tracing::error!("{message}"),
        }
    }

    fn log_warning(&self, message: &str) {
        tracing::warn!("{message}");
    }
}
