//! Timestamp conversion and line-protocol formatting.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

use crate::types::{MetricLine, ProbeError, Reading, Stage};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Parse a site-local display timestamp, trying each format in turn.
pub fn parse_timestamp(
    raw: &str,
    formats: &[String],
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, ProbeError> {
    let raw = raw.trim();
    let naive = formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| {
            ProbeError::extraction(
                Stage::DetailsPage,
                "timestamp",
                format!("does not match any configured format: {raw:?}"),
            )
        })?;

    offset.from_local_datetime(&naive).single().ok_or_else(|| {
        ProbeError::extraction(
            Stage::DetailsPage,
            "timestamp",
            format!("ambiguous local time: {raw:?}"),
        )
    })
}

/// Epoch time in nanoseconds at whole-second resolution. Any sub-second
/// part of the parsed time is dropped, not rounded.
pub fn epoch_nanos(ts: &DateTime<FixedOffset>) -> Result<i64, ProbeError> {
    ts.timestamp().checked_mul(NANOS_PER_SECOND).ok_or_else(|| {
        ProbeError::extraction(
            Stage::DetailsPage,
            "timestamp",
            format!("out of range for nanosecond epoch: {ts}"),
        )
    })
}

/// Build the metric line for a reading. The balance string is copied
/// as-is.
pub fn format_metric(
    metric_name: &str,
    reading: &Reading,
    formats: &[String],
    offset: FixedOffset,
) -> Result<MetricLine, ProbeError> {
    let ts = parse_timestamp(&reading.raw_timestamp, formats, offset)?;
    Ok(MetricLine {
        measurement: metric_name.to_string(),
        balance: reading.balance.clone(),
        epoch_ns: epoch_nanos(&ts)?,
    })
}
