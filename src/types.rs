//! Shared types for the balance probe.
//!
//! These types form the data model used across all modules: what the
//! portal hands back at each step, what the probe emits, and how a run
//! fails.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Portal login credentials, immutable for the lifetime of a probe run.
#[derive(Debug)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Anti-forgery tokens scraped from the anonymous login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub viewstate: String,
    pub viewstate_generator: String,
}

/// An authenticated portal session. Only valid for the run that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub viewstate: String,
    pub viewstate_generator: String,
    pub session_id: String,
}

impl Session {
    /// Combine the login-page tokens with the issued session id.
    ///
    /// Every field must be non-empty; the extractors already refuse empty
    /// values, so a failure here means a caller built the parts by hand.
    pub fn new(tokens: ViewState, session_id: String) -> Result<Self, ProbeError> {
        for (field, value) in [
            ("__VIEWSTATE", &tokens.viewstate),
            ("__VIEWSTATEGENERATOR", &tokens.viewstate_generator),
            ("ASP.NET_SessionId", &session_id),
        ] {
            if value.is_empty() {
                return Err(ProbeError::extraction(Stage::LoginForm, field, "empty value"));
            }
        }
        Ok(Self {
            viewstate: tokens.viewstate,
            viewstate_generator: tokens.viewstate_generator,
            session_id,
        })
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.session_id)
    }
}

/// Name of the cookie carrying the portal session identifier.
pub const SESSION_COOKIE: &str = "ASP.NET_SessionId";

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// The two display fields scraped from the details page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    /// Timestamp exactly as the site renders it (site-local time).
    pub raw_timestamp: String,
    /// Remaining balance as a decimal string, passed through verbatim.
    pub balance: String,
}

// ---------------------------------------------------------------------------
// Metric output
// ---------------------------------------------------------------------------

/// One line-protocol metric: `<measurement> value=<balance> <epoch_ns>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLine {
    pub measurement: String,
    pub balance: String,
    pub epoch_ns: i64,
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} value={} {}", self.measurement, self.balance, self.epoch_ns)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The network step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoginPage,
    LoginForm,
    DetailsPage,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::LoginPage => write!(f, "login page"),
            Stage::LoginForm => write!(f, "login form"),
            Stage::DetailsPage => write!(f, "details page"),
        }
    }
}

/// Everything that can end a probe run. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error ({stage}): {message}")]
    Network { stage: Stage, message: String },

    #[error("extraction error ({stage}): {field} {reason}")]
    Extraction {
        stage: Stage,
        field: &'static str,
        reason: String,
    },
}

impl ProbeError {
    pub fn config(message: impl Into<String>) -> Self {
        ProbeError::Config(message.into())
    }

    pub fn network(stage: Stage, err: impl fmt::Display) -> Self {
        ProbeError::Network {
            stage,
            message: err.to_string(),
        }
    }

    pub fn extraction(stage: Stage, field: &'static str, reason: impl Into<String>) -> Self {
        ProbeError::Extraction {
            stage,
            field,
            reason: reason.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, ProbeError::Config(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ProbeError::Network { .. })
    }

    pub fn is_extraction(&self) -> bool {
        matches!(self, ProbeError::Extraction { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
