//! Metrics export.
//!
//! Pushes per-host expiry metrics to a Prometheus Push Gateway when enabled.
//!
//! # Submodules
//!
//! - `prom` - Prometheus metrics integration

pub mod prom;
