//! In-memory collaborators shared by the auth test modules.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::config::ApiConfig;
use crate::http::{ApiClient, HttpRequest, HttpResponse, HttpTransport, TransportError};

use super::{
    ConfirmPrompt, IdentityProvider, KeyValueStore, LoginOrchestrator, MemoryKeyValueStore,
    PlatformError, PlatformUi, SessionStore, StoreError, UserProfile,
};

pub(crate) type TestOrchestrator =
    LoginOrchestrator<FakeTransport, MemoryKeyValueStore, FakeIdentity, FakeUi>;

pub(crate) fn harness(
    transport: FakeTransport,
    identity: FakeIdentity,
    ui: FakeUi,
) -> TestOrchestrator {
    harness_with_store(transport, identity, ui, MemoryKeyValueStore::new())
}

pub(crate) fn harness_with_store<S: KeyValueStore>(
    transport: FakeTransport,
    identity: FakeIdentity,
    ui: FakeUi,
    store: S,
) -> LoginOrchestrator<FakeTransport, S, FakeIdentity, FakeUi> {
    let client = ApiClient::new(
        ApiConfig::new("http://h", "/api/v1"),
        transport,
        SessionStore::new(store),
    );
    LoginOrchestrator::new(client, identity, ui)
}

/// Memory store that fails reads, or writes to chosen keys, with an I/O error.
#[derive(Clone, Default)]
pub(crate) struct FlakyStore {
    inner: MemoryKeyValueStore,
    failing_reads: bool,
    failing_writes: Vec<&'static str>,
}

impl FlakyStore {
    pub(crate) fn failing_reads() -> Self {
        Self {
            failing_reads: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_writes_to(key: &'static str) -> Self {
        Self {
            failing_writes: vec![key],
            ..Self::default()
        }
    }
}

fn disk_unavailable() -> StoreError {
    StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk unavailable"))
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if self.failing_reads {
            return Err(disk_unavailable());
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        if self.failing_writes.iter().any(|failing| *failing == key) {
            return Err(disk_unavailable());
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, TransportError>>>>,
}

impl FakeTransport {
    pub(crate) fn respond(self, result: Result<HttpResponse, TransportError>) -> Self {
        self.responses.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(404, Value::Null)))
    }
}

#[derive(Clone)]
pub(crate) struct FakeIdentity {
    code: String,
    profile: Result<UserProfile, PlatformError>,
    code_requests: Arc<Mutex<usize>>,
}

impl FakeIdentity {
    pub(crate) fn with_code(code: &str) -> Self {
        Self {
            code: code.to_owned(),
            profile: Ok(UserProfile::default()),
            code_requests: Arc::new(Mutex::new(0)),
        }
    }

    pub(crate) fn profile(mut self, profile: UserProfile) -> Self {
        self.profile = Ok(profile);
        self
    }

    pub(crate) fn failing_profile(mut self, message: &str) -> Self {
        self.profile = Err(PlatformError::new(message));
        self
    }

    pub(crate) fn code_requests(&self) -> usize {
        *self.code_requests.lock().unwrap()
    }
}

impl IdentityProvider for FakeIdentity {
    async fn auth_code(&self) -> Result<String, PlatformError> {
        *self.code_requests.lock().unwrap() += 1;
        Ok(self.code.clone())
    }

    async fn user_profile(&self) -> Result<UserProfile, PlatformError> {
        self.profile.clone()
    }
}

/// Answers prompts from a queue, then falls back to `default_answer`.
#[derive(Clone)]
pub(crate) struct FakeUi {
    answers: Arc<Mutex<VecDeque<bool>>>,
    default_answer: bool,
    prompts: Arc<Mutex<Vec<ConfirmPrompt>>>,
    notifications: Arc<Mutex<Vec<String>>>,
}

impl FakeUi {
    fn answering(default_answer: bool) -> Self {
        Self {
            answers: Arc::new(Mutex::new(VecDeque::new())),
            default_answer,
            prompts: Arc::new(Mutex::new(Vec::new())),
            notifications: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn confirming() -> Self {
        Self::answering(true)
    }

    pub(crate) fn declining() -> Self {
        Self::answering(false)
    }

    pub(crate) fn then(self, answer: bool) -> Self {
        self.answers.lock().unwrap().push_back(answer);
        self
    }

    pub(crate) fn confirmations(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn prompts(&self) -> Vec<ConfirmPrompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn notifications(&self) -> Vec<String> {
        self.notifications.lock().unwrap().clone()
    }
}

impl PlatformUi for FakeUi {
    async fn confirm(&self, prompt: ConfirmPrompt) -> bool {
        self.prompts.lock().unwrap().push(prompt);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_answer)
    }

    async fn notify(&self, message: &str) {
        self.notifications.lock().unwrap().push(message.to_owned());
    }
}
