use std::future::Future;

use thiserror::Error;

use super::UserProfile;

/// Failure reported by the host platform (identity provider or UI).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Host identity provider: issues one-time login codes and consent-gated profiles.
pub trait IdentityProvider: Send + Sync {
    /// An empty code is treated the same as a failure.
    fn auth_code(&self) -> impl Future<Output = Result<String, PlatformError>> + Send;

    fn user_profile(&self) -> impl Future<Output = Result<UserProfile, PlatformError>> + Send;
}

/// Modal confirmation shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: &'static str,
    pub message: &'static str,
    pub confirm_label: &'static str,
    pub cancel_label: &'static str,
}

/// Asked before the profile is requested during login.
pub const PROFILE_CONSENT_PROMPT: ConfirmPrompt = ConfirmPrompt {
    title: "Authorization",
    message: "We need your profile to finish signing in",
    confirm_label: "Authorize",
    cancel_label: "Cancel",
};

/// Asked by the access guard when no session exists.
pub const SIGN_IN_PROMPT: ConfirmPrompt = ConfirmPrompt {
    title: "Notice",
    message: "Please sign in first",
    confirm_label: "Sign in",
    cancel_label: "Cancel",
};

pub const SIGN_IN_FAILED_MESSAGE: &str = "Sign-in failed";

/// Host UI: modal dialogs and transient notifications.
pub trait PlatformUi: Send + Sync {
    /// Resolves to `true` when the user confirmed.
    fn confirm(&self, prompt: ConfirmPrompt) -> impl Future<Output = bool> + Send;

    fn notify(&self, message: &str) -> impl Future<Output = ()> + Send;
}
