//! The balance probe.
//!
//! Three sequential requests against the portal, each feeding the next:
//!
//! 1. GET the login page and scrape the view-state tokens.
//! 2. POST the login form and pick the session id out of `Set-Cookie`.
//! 3. GET the details page with that session and scrape the reading.
//!
//! The reading is then turned into a single line-protocol metric. Any
//! failure ends the run; the scheduler that launched the probe is
//! expected to try again later.

use chrono::FixedOffset;
use tracing::{debug, info};

use crate::config::{AppConfig, PortalConfig};
use crate::extract::{self, VIEWSTATE_FIELD, VIEWSTATE_GENERATOR_FIELD};
use crate::metric;
use crate::transport::{HttpRequest, Transport};
use crate::types::{Credentials, MetricLine, ProbeError, Reading, Session, Stage, ViewState};

// ---------------------------------------------------------------------------
// Login form fields
// ---------------------------------------------------------------------------

pub const USERNAME_FIELD: &str = "net_Default_LoginCtrl1$txtUserName";
pub const PASSWORD_FIELD: &str = "net_Default_LoginCtrl1$txtUserPwd";
pub const SUBMIT_FIELD: &str = "net_Default_LoginCtrl1$lbtnLogin";
pub const SUBMIT_VALUE: &str = "登录";

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

pub struct BalanceProbe<T> {
    transport: T,
    portal: PortalConfig,
    metric_name: String,
    offset: FixedOffset,
}

impl<T: Transport> BalanceProbe<T> {
    /// Build a probe from an already-validated configuration.
    pub fn new(transport: T, config: &AppConfig) -> Result<Self, ProbeError> {
        Ok(Self {
            transport,
            offset: config.portal.utc_offset()?,
            portal: config.portal.clone(),
            metric_name: config.probe.metric_name.clone(),
        })
    }

    /// Run one login → scrape → format cycle.
    pub async fn run(&self, credentials: &Credentials) -> Result<MetricLine, ProbeError> {
        let tokens = self.acquire_tokens().await?;
        let session = self.authenticate(credentials, tokens).await?;
        let reading = self.fetch_reading(&session).await?;

        debug!(
            balance = %reading.balance,
            timestamp = %reading.raw_timestamp,
            "Reading scraped"
        );

        let line = metric::format_metric(
            &self.metric_name,
            &reading,
            &self.portal.timestamp_formats,
            self.offset,
        )?;
        info!(balance = %line.balance, epoch_ns = line.epoch_ns, "Probe complete");
        Ok(line)
    }

    /// Step 1: anonymous GET of the login page.
    async fn acquire_tokens(&self) -> Result<ViewState, ProbeError> {
        let resp = self
            .transport
            .send(HttpRequest::get(&self.portal.login_url))
            .await
            .map_err(|e| ProbeError::network(Stage::LoginPage, e))?;

        let tokens = extract::extract_viewstate(&resp.body)?;
        debug!(generator = %tokens.viewstate_generator, "View-state tokens acquired");
        Ok(tokens)
    }

    /// Step 2: POST the login form. Only the `Set-Cookie` headers matter.
    async fn authenticate(
        &self,
        credentials: &Credentials,
        tokens: ViewState,
    ) -> Result<Session, ProbeError> {
        debug!(username = %credentials.username(), "Submitting login form");

        let form = vec![
            (VIEWSTATE_FIELD.to_string(), tokens.viewstate.clone()),
            (VIEWSTATE_GENERATOR_FIELD.to_string(), tokens.viewstate_generator.clone()),
            (USERNAME_FIELD.to_string(), credentials.username().to_string()),
            (PASSWORD_FIELD.to_string(), credentials.password().to_string()),
            (SUBMIT_FIELD.to_string(), SUBMIT_VALUE.to_string()),
        ];

        let resp = self
            .transport
            .send(HttpRequest::post_form(&self.portal.login_url, form))
            .await
            .map_err(|e| ProbeError::network(Stage::LoginForm, e))?;

        let session_id = extract::extract_session_id(&resp.set_cookies)?;
        debug!(status = resp.status, "Session established");
        Session::new(tokens, session_id)
    }

    /// Step 3: GET the details page with the session cookie attached.
    async fn fetch_reading(&self, session: &Session) -> Result<Reading, ProbeError> {
        let request =
            HttpRequest::get(&self.portal.details_url).with_cookie(session.cookie_header());
        let resp = self
            .transport
            .send(request)
            .await
            .map_err(|e| ProbeError::network(Stage::DetailsPage, e))?;

        extract::extract_reading(&resp.body, &self.portal.balance_id, &self.portal.timestamp_id)
    }
}

/// Validate `config`, resolve credentials through `lookup`, then run the
/// probe once. Credentials are checked before the transport is touched.
pub async fn probe_once<T, F>(
    config: &AppConfig,
    transport: T,
    lookup: F,
) -> Result<MetricLine, ProbeError>
where
    T: Transport,
    F: Fn(&str) -> Option<String>,
{
    config.validate()?;
    let credentials = config.resolve_credentials(lookup)?;
    BalanceProbe::new(transport, config)?.run(&credentials).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
