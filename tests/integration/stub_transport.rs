//! Stub transport for integration testing.
//!
//! Serves queued responses in order and records every request it sees,
//! all in-memory with no network access. Clones share the same queue and
//! log so a test can keep a handle after moving one into the probe.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use flux_probe::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

#[derive(Clone, Default)]
pub struct StubTransport {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, String>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn respond(self, response: HttpResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn post_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == Method::Post)
            .count()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(msg)) => Err(TransportError::Other(msg)),
            None => Err(TransportError::Other("no response queued".to_string())),
        }
    }
}
