//! Scripted transport for tests

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::LlmError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Replays canned responses in order and records every request.
///
/// Once the script runs out, further calls fail with a network error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, LlmError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Ok(HttpResponse { status, body: body.into() }))
    }

    /// Queue a transport failure
    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error))
    }

    fn push(self, entry: Result<HttpResponse, LlmError>) -> Self {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(entry);
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl HttpTransport for ScriptedTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, LlmError> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Network("script exhausted".to_string())))
    }
}
