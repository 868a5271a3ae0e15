//! Field extraction from portal responses.
//!
//! One named function per scraped field. HTML is parsed with `scraper` and
//! elements are found by attribute (`name` / `id`), never by matching raw
//! text, so whitespace, attribute order and line breaks in the markup do
//! not matter. Every function refuses empty values: an empty token is as
//! useless to the next step as a missing one.

use rust_decimal::Decimal;
use scraper::{ElementRef, Html};
use std::str::FromStr;

use crate::types::{ProbeError, Reading, Stage, ViewState, SESSION_COOKIE};

pub const VIEWSTATE_FIELD: &str = "__VIEWSTATE";
pub const VIEWSTATE_GENERATOR_FIELD: &str = "__VIEWSTATEGENERATOR";

// ---------------------------------------------------------------------------
// Login page
// ---------------------------------------------------------------------------

/// Extract both anti-forgery tokens from the anonymous login page.
pub fn extract_viewstate(html: &str) -> Result<ViewState, ProbeError> {
    let doc = Html::parse_document(html);
    Ok(ViewState {
        viewstate: hidden_field(&doc, VIEWSTATE_FIELD)?,
        viewstate_generator: hidden_field(&doc, VIEWSTATE_GENERATOR_FIELD)?,
    })
}

/// `value` of the `<input>` whose `name` (or, failing that, `id`) is `field`.
fn hidden_field(doc: &Html, field: &'static str) -> Result<String, ProbeError> {
    let input = elements(doc)
        .filter(|el| el.value().name() == "input")
        .find(|el| el.value().attr("name") == Some(field) || el.value().id() == Some(field))
        .ok_or_else(|| ProbeError::extraction(Stage::LoginPage, field, "not found"))?;

    match input.value().attr("value") {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(_) => Err(ProbeError::extraction(Stage::LoginPage, field, "empty value")),
        None => Err(ProbeError::extraction(Stage::LoginPage, field, "has no value attribute")),
    }
}

// ---------------------------------------------------------------------------
// Login response
// ---------------------------------------------------------------------------

/// Find the session cookie among the `Set-Cookie` headers and return its
/// value: everything after `ASP.NET_SessionId=` up to the next `;`.
pub fn extract_session_id(set_cookies: &[String]) -> Result<String, ProbeError> {
    let prefix = format!("{SESSION_COOKIE}=");
    let value = set_cookies
        .iter()
        .filter_map(|header| {
            let pair = header.split(';').next().unwrap_or_default().trim();
            pair.strip_prefix(&prefix)
        })
        .next()
        .ok_or_else(|| ProbeError::extraction(Stage::LoginForm, SESSION_COOKIE, "not set"))?;

    if value.is_empty() {
        return Err(ProbeError::extraction(Stage::LoginForm, SESSION_COOKIE, "empty value"));
    }
    Ok(value.to_string())
}

// ---------------------------------------------------------------------------
// Details page
// ---------------------------------------------------------------------------

/// Extract the balance and meter-reading time from the details page.
pub fn extract_reading(
    html: &str,
    balance_id: &str,
    timestamp_id: &str,
) -> Result<Reading, ProbeError> {
    let doc = Html::parse_document(html);
    Ok(Reading {
        raw_timestamp: extract_timestamp(&doc, timestamp_id)?,
        balance: extract_balance(&doc, balance_id)?,
    })
}

/// The balance text, validated as a decimal but returned verbatim.
pub fn extract_balance(doc: &Html, id: &str) -> Result<String, ProbeError> {
    let text = labelled_text(doc, id)
        .ok_or_else(|| ProbeError::extraction(Stage::DetailsPage, "balance", format!("#{id} not found")))?;
    if text.is_empty() {
        return Err(ProbeError::extraction(Stage::DetailsPage, "balance", "empty value"));
    }
    if !is_plain_decimal(&text) || Decimal::from_str(&text).is_err() {
        return Err(ProbeError::extraction(
            Stage::DetailsPage,
            "balance",
            format!("is not a decimal number: {text:?}"),
        ));
    }
    Ok(text)
}

/// `[+-]?digits[.digits]`: the only shape a line-protocol float field
/// takes verbatim. `Decimal::from_str` alone also admits `1_000`.
fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.map_or(true, digits)
}

/// The meter-reading time, as displayed.
pub fn extract_timestamp(doc: &Html, id: &str) -> Result<String, ProbeError> {
    let text = labelled_text(doc, id)
        .ok_or_else(|| ProbeError::extraction(Stage::DetailsPage, "timestamp", format!("#{id} not found")))?;
    if text.is_empty() {
        return Err(ProbeError::extraction(Stage::DetailsPage, "timestamp", "empty value"));
    }
    Ok(text)
}

/// Text of the element with `id`. The site wraps values in a styling
/// `<font>` tag; when one is present its text wins over any label text
/// around it.
fn labelled_text(doc: &Html, id: &str) -> Option<String> {
    let el = elements(doc).find(|el| el.value().id() == Some(id))?;
    let styled = el
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "font");
    let text: String = styled.unwrap_or(el).text().collect();
    Some(text.trim().to_string())
}

fn elements(doc: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    doc.root_element().descendants().filter_map(ElementRef::wrap)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
