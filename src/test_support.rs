//! Scripted transport shared by unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;
use serde_json::Value;

use crate::client::AuthClient;
use crate::error::{ApiError, ApiResult};
use crate::frontend::RecordingFrontend;
use crate::identity::MemoryStore;
use crate::transport::{OutboundRequest, RawResponse, Transport};

#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ApiResult<RawResponse>>>,
    seen: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn reply(&self, status: u16, body: Value) -> &Self {
        let text = if body.is_null() { String::new() } else { body.to_string() };
        self.replies.lock().push_back(Ok(RawResponse {
            status,
            status_text: reqwest::StatusCode::from_u16(status).ok().and_then(|s| s.canonical_reason()).unwrap_or("").to_string(),
            headers: Default::default(),
            body: text,
        }));
        self
    }

    pub fn reply_text(&self, status: u16, text: &str) -> &Self {
        self.replies.lock().push_back(Ok(RawResponse { status, status_text: String::new(), headers: Default::default(), body: text.to_string() }));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.replies.lock().push_back(Err(ApiError::transport(message)));
        self
    }

    pub fn seen(&self) -> Vec<OutboundRequest> { self.seen.lock().clone() }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: OutboundRequest) -> ApiResult<RawResponse> {
        self.seen.lock().push(request);
        self.replies.lock().pop_front().unwrap_or_else(|| Err(ApiError::transport("no scripted reply")))
    }
}

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryStore>,
    pub frontend: Arc<RecordingFrontend>,
    pub client: Arc<AuthClient>,
}

pub fn harness() -> Harness { harness_with_store(MemoryStore::shared()) }

pub fn harness_with_store(store: Arc<MemoryStore>) -> Harness {
    let transport = ScriptedTransport::new();
    let frontend = Arc::new(RecordingFrontend::new());
    let base = Url::parse("https://api.test/api").unwrap();
    let client = Arc::new(AuthClient::new(base, transport.clone(), store.clone(), frontend.clone()));
    Harness { transport, store, frontend, client }
}
