//! Ambient infrastructure shared by the interop crates: structured logging and Prometheus
//! metrics.

pub mod logging;
pub mod metrics;
