pub mod house_transactions;
pub mod system;
pub mod users;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::auth::KeyValueStore;
use crate::http::{ApiClient, HttpTransport, RequestDescriptor, TransportError};

/// Errors returned by the typed service wrappers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("HTTP status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("failed to deserialize response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Send a request and decode a 2xx body, mapping anything else to `Status`.
pub(crate) async fn fetch_json<T, S, R>(
    client: &ApiClient<T, S>,
    descriptor: RequestDescriptor,
) -> ServiceResult<R>
where
    T: HttpTransport,
    S: KeyValueStore,
    R: DeserializeOwned,
{
    let response = client.send(descriptor).await?;
    if !response.is_success() {
        let detail = match response.data.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => response.data.to_string(),
        };
        return Err(ServiceError::Status {
            status: response.status,
            detail,
        });
    }
    Ok(serde_json::from_value(response.data)?)
}
