//! HTTP transport.
//!
//! Defines the `Transport` trait the probe talks through and the request
//! and response shapes it exchanges. `http::ReqwestTransport` is the real
//! implementation; tests substitute a mock or a fixture-serving stub.

pub mod http;

use async_trait::async_trait;

pub use http::ReqwestTransport;

/// HTTP method subset the probe needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Form fields, sent `application/x-www-form-urlencoded` on POST.
    pub form: Vec<(String, String)>,
    /// Value for the `Cookie` header.
    pub cookie: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            form: Vec::new(),
            cookie: None,
        }
    }

    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            form,
            cookie: None,
        }
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// Look up a form field by name.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The parts of a response the probe consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Set-Cookie` header values, in arrival order.
    pub set_cookies: Vec<String>,
    /// Body text. Left empty for POSTs, whose body the probe ignores.
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            set_cookies: Vec::new(),
            body: body.into(),
        }
    }
}

/// Transport-level failure, before any stage context is attached.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("{0}")]
    Other(String),
}

/// Abstraction over the HTTP client.
///
/// Implementors send exactly one request per call: no redirects are
/// followed, no cookies are stored between calls and nothing is retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
