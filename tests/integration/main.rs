//! Integration tests: the probe driven end to end through its public API
//! against captured portal pages.

mod end_to_end;
mod stub_transport;
