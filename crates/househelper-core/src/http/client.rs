use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{KeyValueStore, SessionStore};
use crate::config::ApiConfig;

use super::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";

/// One outbound call, described relative to the API prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDescriptor {
    pub endpoint: String,
    pub method: Method,
    pub body: Option<Value>,
    pub query: Option<Vec<(String, String)>>,
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint).method(Method::Post)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a query parameter; order of insertion is kept.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Builds requests against the configured backend and hands them to a transport.
pub struct ApiClient<T, S> {
    transport: T,
    config: ApiConfig,
    session: SessionStore<S>,
}

impl<T: Clone, S> Clone for ApiClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: self.config.clone(),
            session: self.session.clone(),
        }
    }
}

impl<T, S> ApiClient<T, S>
where
    T: HttpTransport,
    S: KeyValueStore,
{
    pub fn new(config: ApiConfig, transport: T, session: SessionStore<S>) -> Self {
        Self {
            transport,
            config,
            session,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    /// Resolve a descriptor into the concrete request the transport will see.
    pub fn build_request(&self, descriptor: RequestDescriptor) -> HttpRequest {
        let mut url = self.config.api_url(&descriptor.endpoint);
        if let Some(params) = descriptor.query.as_deref() {
            if !params.is_empty() {
                url.push('?');
                url.push_str(&query_string(params, self.config.encode_query_params));
            }
        }

        let mut headers = vec![(CONTENT_TYPE.to_owned(), "application/json".to_owned())];
        if self.config.inject_bearer_header {
            if let Some(token) = self.current_token() {
                headers.push((AUTHORIZATION.to_owned(), format!("Bearer {token}")));
            }
        }
        for (name, value) in descriptor.headers {
            set_header(&mut headers, name, value);
        }

        HttpRequest {
            url,
            method: descriptor.method,
            headers,
            body: descriptor.body,
        }
    }

    /// Send the request and return the transport's response untouched.
    pub async fn send(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.build_request(descriptor);
        let method = request.method;
        let url = request.url.clone();
        debug!(%method, %url, "sending request");

        match self.transport.send(request).await {
            Ok(response) => {
                debug!(%method, %url, status = response.status, "received response");
                Ok(response)
            }
            Err(err) => {
                warn!(%method, %url, error = %err, "request failed");
                Err(err)
            }
        }
    }

    fn current_token(&self) -> Option<String> {
        match self.session.token() {
            Ok(token) => token.map(|token| token.as_str().to_owned()),
            Err(err) => {
                warn!(error = %err, "unable to read session token; sending without it");
                None
            }
        }
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
    {
        Some(entry) => *entry = (name, value),
        None => headers.push((name, value)),
    }
}

fn query_string(params: &[(String, String)], encode: bool) -> String {
    params
        .iter()
        .map(|(key, value)| {
            if encode {
                format!("{}={}", encode_component(key), encode_component(value))
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode the way `encodeURIComponent` does, which keeps `!'()*` literal.
fn encode_component(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    let mut buf = [0u8; 4];
    for ch in raw.chars() {
        if matches!(ch, '!' | '\'' | '(' | ')' | '*') {
            encoded.push(ch);
        } else {
            encoded.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::FakeTransport;
    use crate::auth::{MemoryKeyValueStore, SessionToken};
    use serde_json::json;

    fn client(
        config: ApiConfig,
        transport: FakeTransport,
    ) -> ApiClient<FakeTransport, MemoryKeyValueStore> {
        ApiClient::new(
            config,
            transport,
            SessionStore::new(MemoryKeyValueStore::new()),
        )
    }

    #[tokio::test]
    async fn post_reaches_prefixed_url_with_json_body() {
        let transport = FakeTransport::default();
        let client = client(ApiConfig::new("http://h", "/api/v1"), transport.clone());

        client
            .send(RequestDescriptor::post("/x").json(json!({ "a": 1 })))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://h/api/v1/x");
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].body, Some(json!({ "a": 1 })));
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
    }

    #[test]
    fn query_params_are_percent_encoded_when_enabled() {
        let client = client(ApiConfig::new("http://h", "/api/v1"), FakeTransport::default());
        let descriptor = RequestDescriptor::get("/s").query("q", "a b").query("n", "1");
        let request = client.build_request(descriptor);
        assert_eq!(request.url, "http://h/api/v1/s?q=a%20b&n=1");
    }

    #[test]
    fn encoding_matches_uri_component_rules() {
        assert_eq!(encode_component("it's (a)!*"), "it's%20(a)!*");
        assert_eq!(encode_component("a&b=c/d?"), "a%26b%3Dc%2Fd%3F");
        assert_eq!(encode_component("-_.~"), "-_.~");
        assert_eq!(encode_component("北京"), "%E5%8C%97%E4%BA%AC");
        assert_eq!(encode_component("100%"), "100%25");
    }

    #[test]
    fn query_params_are_verbatim_when_disabled() {
        let config = ApiConfig::new("http://h", "/api/v1").with_query_encoding(false);
        let client = client(config, FakeTransport::default());
        let descriptor = RequestDescriptor::get("/s").query("q", "a b").query("n", "1");
        let request = client.build_request(descriptor);
        assert_eq!(request.url, "http://h/api/v1/s?q=a b&n=1");
    }

    #[test]
    fn bearer_header_follows_session_and_config() {
        let client = client(ApiConfig::new("http://h", ""), FakeTransport::default());
        let request = client.build_request(RequestDescriptor::get("/me"));
        assert_eq!(request.header("authorization"), None);

        client
            .session()
            .set_token(&SessionToken::new("T"))
            .unwrap();
        let request = client.build_request(RequestDescriptor::get("/me"));
        assert_eq!(request.header("authorization"), Some("Bearer T"));

        let disabled = ApiClient::new(
            ApiConfig::new("http://h", "").with_bearer_header(false),
            FakeTransport::default(),
            client.session().clone(),
        );
        let request = disabled.build_request(RequestDescriptor::get("/me"));
        assert_eq!(request.header("authorization"), None);
    }

    #[test]
    fn caller_headers_override_defaults() {
        let client = client(ApiConfig::new("http://h", ""), FakeTransport::default());
        client.session().set_token(&SessionToken::new("T")).unwrap();
        let request = client.build_request(
            RequestDescriptor::get("/me")
                .header("content-type", "text/plain")
                .header("X-Trace", "1"),
        );
        assert_eq!(request.header("Content-Type"), Some("text/plain"));
        assert_eq!(request.header("x-trace"), Some("1"));
        assert_eq!(request.header("authorization"), Some("Bearer T"));
        assert_eq!(request.headers.len(), 3);
    }

    #[tokio::test]
    async fn status_codes_are_not_interpreted() {
        let transport = FakeTransport::default()
            .respond(Ok(HttpResponse::new(500, json!({ "detail": "boom" }))));
        let client = client(ApiConfig::default(), transport);
        let response = client.send(RequestDescriptor::get("/x")).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.data["detail"], "boom");
    }

    #[tokio::test]
    async fn transport_failure_propagates_unchanged() {
        let transport = FakeTransport::default()
            .respond(Err(TransportError::Rejected("offline".into())));
        let client = client(ApiConfig::default(), transport.clone());
        let err = client.send(RequestDescriptor::get("/x")).await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected(msg) if msg == "offline"));
        assert_eq!(transport.requests().len(), 1);
    }
}
