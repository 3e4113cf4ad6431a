//! Concurrent TLS certificate expiry checking.
//!
//! `certsweep` dials many hosts in parallel with a bounded worker pool,
//! inspects each peer certificate chain and reports every host whose chain
//! contains a certificate expiring within a configurable look-ahead window.
//!
//! ```no_run
//! use std::time::Duration;
//! use certsweep::{dispatch, Checker, Report};
//!
//! let hosts = vec!["example.com".to_string(), "example.com:8443".to_string()];
//! let checker = Checker::new(30, Duration::from_secs(30));
//! let outcomes = dispatch::run(&hosts, checker, 8)?;
//! let report = Report::from_outcomes(outcomes);
//! for failure in report.failures() {
//!     eprintln!("error: {}: {}", failure.hostname, failure.error.as_ref().unwrap());
//! }
//! # Ok::<(), certsweep::CheckError>(())
//! ```

pub mod checker;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod report;

pub use checker::{CheckOutcome, Checker};
pub use config::{Config, Settings};
pub use error::CheckError;
pub use report::{OutputFormat, Report, Status};
