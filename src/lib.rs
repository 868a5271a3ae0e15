//! FLUX: electricity balance probe
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod transport;
pub mod extract;
pub mod metric;
pub mod probe;

pub use probe::{probe_once, BalanceProbe};
pub use types::{MetricLine, ProbeError};
