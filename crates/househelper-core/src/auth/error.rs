use thiserror::Error;

use crate::http::TransportError;

use super::StoreError;

/// Errors surfaced by the login handshakes and the access guard.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("failed to obtain authorization code: {0}")]
    CodeRetrieval(String),
    #[error("user cancelled authorization")]
    UserCancelled,
    #[error("failed to obtain user profile: {0}")]
    ProfileRetrieval(String),
    #[error("{message}")]
    LoginExchange { status: u16, message: String },
    #[error("invalid login response: {0}")]
    InvalidLoginResponse(#[source] serde_json::Error),
    #[error("user declined phone number authorization ({0})")]
    PhoneAuthDeclined(String),
    #[error("failed to retrieve phone number (status {status})")]
    PhoneExchange { status: u16 },
}
