use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{KeyValueStore, StoreError};

pub const TOKEN_KEY: &str = "househelper_token";
pub const USER_INFO_KEY: &str = "househelper_user_info";

/// Opaque credential returned by the backend login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Display attributes handed over by the platform after user consent.
///
/// Fields the platform adds beyond the well-known ones are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn with_nick_name(nick_name: impl Into<String>) -> Self {
        Self {
            nick_name: Some(nick_name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Token and profile persistence on top of a [`KeyValueStore`].
///
/// Nothing is cached: every call goes to the backing store, so clones of the
/// same store always observe the latest committed value.
#[derive(Debug)]
pub struct SessionStore<S> {
    backend: Arc<S>,
}

impl<S> Clone for SessionStore<S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Stored token; an empty string counts as absent.
    pub fn token(&self) -> Result<Option<SessionToken>, StoreError> {
        let token = match self.backend.get(TOKEN_KEY)? {
            Some(Value::String(raw)) if !raw.is_empty() => Some(SessionToken(raw)),
            _ => None,
        };
        Ok(token)
    }

    pub fn set_token(&self, token: &SessionToken) -> Result<(), StoreError> {
        self.backend
            .set(TOKEN_KEY, &Value::String(token.as_str().to_owned()))
    }

    /// Cached profile, or an empty one when nothing was stored.
    pub fn profile(&self) -> Result<UserProfile, StoreError> {
        match self.backend.get(USER_INFO_KEY)? {
            Some(Value::Null) | None => Ok(UserProfile::default()),
            Some(raw) => Ok(serde_json::from_value(raw)?),
        }
    }

    pub fn set_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let value = serde_json::to_value(profile)?;
        self.backend.set(USER_INFO_KEY, &value)
    }

    pub fn clear_profile(&self) -> Result<(), StoreError> {
        self.backend.remove(USER_INFO_KEY)
    }

    /// Forget both the token and the cached profile.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(TOKEN_KEY)?;
        self.backend.remove(USER_INFO_KEY)
    }

    pub fn is_logged_in(&self) -> Result<bool, StoreError> {
        Ok(self.token()?.is_some())
    }
}
