//! reqwest-backed transport.
//!
//! Redirects are disabled so the login POST's `Set-Cookie` header is seen
//! on the 302 itself, and there is no cookie store: the probe attaches the
//! session cookie explicitly.

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{redirect, Client};
use std::time::Duration;
use tracing::debug;

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use crate::config::ProbeConfig;
use crate::types::ProbeError;

pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self { http })
    }

    pub fn from_config(cfg: &ProbeConfig) -> Result<Self, ProbeError> {
        Self::new(Duration::from_secs(cfg.timeout_secs), &cfg.user_agent)
            .map_err(|e| ProbeError::config(format!("failed to build HTTP client: {e}")))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = ?request.method, url = %request.url, "HTTP request");

        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url).form(&request.form),
        };
        if let Some(cookie) = &request.cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: request.url,
            });
        }

        let set_cookies = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        let body = match request.method {
            Method::Get => resp.text().await?,
            Method::Post => String::new(),
        };

        debug!(status = status.as_u16(), bytes = body.len(), "HTTP response");

        Ok(HttpResponse {
            status: status.as_u16(),
            set_cookies,
            body,
        })
    }
}
