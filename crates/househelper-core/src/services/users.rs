use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::auth::KeyValueStore;
use crate::config::Endpoints;
use crate::http::{ApiClient, HttpTransport, RequestDescriptor};

use super::{fetch_json, ServiceResult};

/// Account record returned by `/users/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_superuser: Option<bool>,
    #[serde(default)]
    pub role_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub struct UserService<T, S> {
    client: ApiClient<T, S>,
}

impl<T, S> UserService<T, S>
where
    T: HttpTransport,
    S: KeyValueStore,
{
    pub fn new(client: ApiClient<T, S>) -> Self {
        Self { client }
    }

    /// The account behind the current session token.
    pub async fn me(&self) -> ServiceResult<UserAccount> {
        fetch_json(&self.client, RequestDescriptor::get(Endpoints::USER_INFO)).await
    }
}
