use serde_json::Value;

use crate::auth::KeyValueStore;
use crate::config::Endpoints;
use crate::http::{ApiClient, HttpTransport, RequestDescriptor};

use super::{fetch_json, ServiceResult};

/// Health and info endpoints; bodies are passed through as raw JSON.
pub struct SystemService<T, S> {
    client: ApiClient<T, S>,
}

impl<T, S> SystemService<T, S>
where
    T: HttpTransport,
    S: KeyValueStore,
{
    pub fn new(client: ApiClient<T, S>) -> Self {
        Self { client }
    }

    pub async fn health(&self) -> ServiceResult<Value> {
        fetch_json(&self.client, RequestDescriptor::get(Endpoints::HEALTH_CHECK)).await
    }

    pub async fn info(&self) -> ServiceResult<Value> {
        fetch_json(&self.client, RequestDescriptor::get(Endpoints::SYSTEM_INFO)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryKeyValueStore, SessionStore};
    use crate::config::ApiConfig;
    use crate::http::ReqwestTransport;
    use crate::services::ServiceError;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn health_passes_body_through() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/health");
            then.status(200).json_body(json!({ "status": "ok" }));
        });

        let client = ApiClient::new(
            ApiConfig::new(server.base_url(), "/api/v1"),
            ReqwestTransport::new().unwrap(),
            SessionStore::new(MemoryKeyValueStore::new()),
        );
        let body = SystemService::new(client).health().await.unwrap();

        mock.assert();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn info_reports_backend_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/info");
            then.status(503).json_body(json!({ "detail": "maintenance" }));
        });

        let client = ApiClient::new(
            ApiConfig::new(server.base_url(), "/api/v1"),
            ReqwestTransport::new().unwrap(),
            SessionStore::new(MemoryKeyValueStore::new()),
        );
        let err = SystemService::new(client).info().await.unwrap_err();

        match err {
            ServiceError::Status { status, detail } => {
                assert_eq!(status, 503);
                assert_eq!(detail, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
