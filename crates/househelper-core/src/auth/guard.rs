use std::future::Future;

use tracing::{debug, warn};

use crate::http::HttpTransport;

use super::platform::{SIGN_IN_FAILED_MESSAGE, SIGN_IN_PROMPT};
use super::{AuthError, IdentityProvider, KeyValueStore, LoginOrchestrator, PlatformUi};

/// What happened to a guarded action.
///
/// `Declined` and `LoginFailed` only come out of the prompting path, which
/// reports sign-in failure to the user instead of returning it as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<R> {
    Completed(R),
    Declined,
    LoginFailed,
}

impl<R> GuardOutcome<R> {
    pub fn completed(self) -> Option<R> {
        match self {
            GuardOutcome::Completed(value) => Some(value),
            GuardOutcome::Declined | GuardOutcome::LoginFailed => None,
        }
    }
}

/// Runs protected actions only once a session exists, signing in first if needed.
pub struct AccessGuard<T, S, I, U> {
    orchestrator: LoginOrchestrator<T, S, I, U>,
}

impl<T, S, I, U> AccessGuard<T, S, I, U>
where
    T: HttpTransport,
    S: KeyValueStore,
    I: IdentityProvider,
    U: PlatformUi,
{
    pub fn new(orchestrator: LoginOrchestrator<T, S, I, U>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &LoginOrchestrator<T, S, I, U> {
        &self.orchestrator
    }

    /// Run `action` if signed in; otherwise sign in first.
    ///
    /// With `prompt_if_absent` the user is asked before the handshake starts and
    /// a failed handshake ends in a notification plus `Ok(LoginFailed)`. Without
    /// it the handshake runs straight away and its error is returned.
    pub async fn ensure_logged_in<F, Fut, R>(
        &self,
        action: F,
        prompt_if_absent: bool,
    ) -> Result<GuardOutcome<R>, AuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        if self.orchestrator.session().is_logged_in()? {
            return Ok(GuardOutcome::Completed(action().await));
        }

        if !prompt_if_absent {
            self.orchestrator.login_with_profile().await?;
            return Ok(GuardOutcome::Completed(action().await));
        }

        let ui = self.orchestrator.ui();
        if !ui.confirm(SIGN_IN_PROMPT).await {
            debug!("sign-in prompt declined");
            return Ok(GuardOutcome::Declined);
        }

        match self.orchestrator.login_with_profile().await {
            Ok(_) => Ok(GuardOutcome::Completed(action().await)),
            Err(err) => {
                warn!(error = %err, "sign-in from guard prompt failed");
                ui.notify(SIGN_IN_FAILED_MESSAGE).await;
                Ok(GuardOutcome::LoginFailed)
            }
        }
    }

    /// The same gate with nothing to run afterwards.
    pub async fn require_login(
        &self,
        prompt_if_absent: bool,
    ) -> Result<GuardOutcome<()>, AuthError> {
        self.ensure_logged_in(|| async {}, prompt_if_absent).await
    }
}
