use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Endpoints;
use crate::http::{ApiClient, HttpResponse, HttpTransport, RequestDescriptor};

use super::platform::PROFILE_CONSENT_PROMPT;
use super::{
    AuthError, IdentityProvider, KeyValueStore, PlatformUi, SessionStore, SessionToken,
    UserProfile,
};

/// `err_msg` reported by the platform when the user shared their phone number.
pub const PHONE_AUTH_OK: &str = "getPhoneNumber:ok";

const GENERIC_LOGIN_FAILURE: &str =
    "WeChat login failed; check the network or contact the administrator";

/// Stages of the code + profile handshake, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    AwaitingCode,
    AwaitingConsent,
    AwaitingProfile,
    Exchanging,
    Completed,
    Failed,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            LoginStage::AwaitingCode => "awaiting-code",
            LoginStage::AwaitingConsent => "awaiting-consent",
            LoginStage::AwaitingProfile => "awaiting-profile",
            LoginStage::Exchanging => "exchanging",
            LoginStage::Completed => "completed",
            LoginStage::Failed => "failed",
        };
        write!(f, "{value}")
    }
}

/// Body sent to the backend login endpoint. Built per attempt, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LoginRequest {
    Profile {
        code: String,
        user_info: UserProfile,
    },
    Phone {
        code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        encrypted_data: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        iv: Option<String>,
    },
}

/// Successful login response; fields beyond the token are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// Platform event delivered when the user answers the phone-number prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneAuthEvent {
    pub err_msg: String,
    #[serde(default)]
    pub encrypted_data: Option<String>,
    #[serde(default)]
    pub iv: Option<String>,
}

impl PhoneAuthEvent {
    pub fn is_granted(&self) -> bool {
        self.err_msg == PHONE_AUTH_OK
    }
}

/// Drives the third-party login handshakes and persists the resulting session.
pub struct LoginOrchestrator<T, S, I, U> {
    client: ApiClient<T, S>,
    identity: I,
    ui: U,
}

impl<T, S, I, U> LoginOrchestrator<T, S, I, U>
where
    T: HttpTransport,
    S: KeyValueStore,
    I: IdentityProvider,
    U: PlatformUi,
{
    pub fn new(client: ApiClient<T, S>, identity: I, ui: U) -> Self {
        Self {
            client,
            identity,
            ui,
        }
    }

    pub fn session(&self) -> &SessionStore<S> {
        self.client.session()
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    /// Code, consent, profile, exchange. Persists token and profile on success.
    pub async fn login_with_profile(&self) -> Result<LoginPayload, AuthError> {
        let mut stage = LoginStage::AwaitingCode;
        let result = self.run_profile_handshake(&mut stage).await;
        match &result {
            Ok(_) => {
                advance(&mut stage, LoginStage::Completed);
                info!("profile login completed");
            }
            Err(err) => {
                warn!(%stage, error = %err, "profile login failed");
                advance(&mut stage, LoginStage::Failed);
            }
        }
        result
    }

    async fn run_profile_handshake(
        &self,
        stage: &mut LoginStage,
    ) -> Result<LoginPayload, AuthError> {
        let code = self.fetch_code().await?;

        advance(stage, LoginStage::AwaitingConsent);
        if !self.ui.confirm(PROFILE_CONSENT_PROMPT).await {
            return Err(AuthError::UserCancelled);
        }

        advance(stage, LoginStage::AwaitingProfile);
        let profile = self
            .identity
            .user_profile()
            .await
            .map_err(|err| AuthError::ProfileRetrieval(err.to_string()))?;

        advance(stage, LoginStage::Exchanging);
        let response = self
            .exchange(&LoginRequest::Profile {
                code,
                user_info: profile.clone(),
            })
            .await?;

        if response.status != 200 {
            return Err(AuthError::LoginExchange {
                status: response.status,
                message: error_detail(&response.data),
            });
        }

        let payload = parse_payload(response.data)?;
        // profile first: a token must never outlive a failed handshake
        let session = self.session();
        session.set_profile(&profile)?;
        session.set_token(&SessionToken::new(payload.access_token.clone()))?;
        Ok(payload)
    }

    /// Exchange the encrypted phone number from a platform event for a session.
    ///
    /// A declined event short-circuits before any code request or network call.
    pub async fn login_with_phone(&self, event: PhoneAuthEvent) -> Result<LoginPayload, AuthError> {
        if !event.is_granted() {
            debug!(err_msg = %event.err_msg, "phone authorization declined");
            return Err(AuthError::PhoneAuthDeclined(event.err_msg));
        }

        let code = self.fetch_code().await?;
        let response = self
            .exchange(&LoginRequest::Phone {
                code,
                encrypted_data: event.encrypted_data,
                iv: event.iv,
            })
            .await?;

        if response.status != 200 {
            warn!(status = response.status, "phone login rejected by backend");
            return Err(AuthError::PhoneExchange {
                status: response.status,
            });
        }

        let payload = parse_payload(response.data)?;
        self.session()
            .set_token(&SessionToken::new(payload.access_token.clone()))?;
        info!("phone login completed");
        Ok(payload)
    }

    async fn fetch_code(&self) -> Result<String, AuthError> {
        let code = self
            .identity
            .auth_code()
            .await
            .map_err(|err| AuthError::CodeRetrieval(err.to_string()))?;
        if code.is_empty() {
            return Err(AuthError::CodeRetrieval(
                "platform returned no authorization code".into(),
            ));
        }
        Ok(code)
    }

    async fn exchange(&self, request: &LoginRequest) -> Result<HttpResponse, AuthError> {
        let body = serde_json::to_value(request)?;
        let response = self
            .client
            .send(RequestDescriptor::post(Endpoints::WECHAT_LOGIN).json(body))
            .await?;
        Ok(response)
    }
}

fn advance(stage: &mut LoginStage, next: LoginStage) {
    debug!(from = %stage, to = %next, "login stage");
    *stage = next;
}

/// An empty `access_token` is rejected like a missing one.
fn parse_payload(data: Value) -> Result<LoginPayload, AuthError> {
    let payload: LoginPayload =
        serde_json::from_value(data).map_err(AuthError::InvalidLoginResponse)?;
    if payload.access_token.is_empty() {
        return Err(AuthError::InvalidLoginResponse(serde::de::Error::custom(
            "access_token is empty",
        )));
    }
    Ok(payload)
}

/// Backend-provided `detail`, or a generic message when there is none.
fn error_detail(data: &Value) -> String {
    match data.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::Null) | None => GENERIC_LOGIN_FAILURE.to_owned(),
        Some(Value::String(_)) => GENERIC_LOGIN_FAILURE.to_owned(),
        Some(other) => other.to_string(),
    }
}
