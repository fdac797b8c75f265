mod credential_store;
mod error;
mod guard;
mod orchestrator;
mod platform;
mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use credential_store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StoreError};
pub use error::AuthError;
pub use guard::{AccessGuard, GuardOutcome};
pub use orchestrator::{
    LoginOrchestrator, LoginPayload, LoginRequest, LoginStage, PhoneAuthEvent, PHONE_AUTH_OK,
};
pub use platform::{
    ConfirmPrompt, IdentityProvider, PlatformError, PlatformUi, PROFILE_CONSENT_PROMPT,
    SIGN_IN_FAILED_MESSAGE, SIGN_IN_PROMPT,
};
pub use session::{SessionStore, SessionToken, UserProfile, TOKEN_KEY, USER_INFO_KEY};
