//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::Value;

use super::{ApiError, ApiRequest, Transport};

#[derive(Default)]
struct MockState {
    responses: VecDeque<Result<Value, ApiError>>,
    requests: Vec<ApiRequest>,
}

/// Replays queued responses in order and records every request it sees.
/// Clones share state, so a test can keep one to inspect what was sent.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_ok(&self, value: Value) -> &Self {
        self.state.lock().unwrap().responses.push_back(Ok(value));
        self
    }

    pub(crate) fn push_err(&self, error: ApiError) -> &Self {
        self.state.lock().unwrap().responses.push_back(Err(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>> {
        let response = {
            let mut state = self.state.lock().unwrap();
            let path = request.path.clone();
            state.requests.push(request);
            state
                .responses
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::NotFound(format!("no scripted response for {}", path))))
        };
        Box::pin(async move { response })
    }
}
