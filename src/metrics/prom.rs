use lazy_static::lazy_static;
use log::warn;
use prometheus::{labels, register_gauge, Gauge};

use crate::report::Report;

lazy_static! {
    static ref DAYS_BEFORE_EXPIRY: Gauge = register_gauge!(
        "certsweep_days_before_expiry",
        "days until the leaf certificate expires"
    )
    .unwrap();
    static ref CHECK_FAILED: Gauge = register_gauge!(
        "certsweep_check_failed",
        "whether the last check of the host failed"
    )
    .unwrap();
}

/// Push one metrics sample per checked host to the push gateway.
///
/// Push failures are logged and never affect the run's exit status.
pub fn push_report(report: &Report, prometheus_address: &str) {
    for outcome in report.outcomes() {
        if let Some(days) = outcome.days_left {
            DAYS_BEFORE_EXPIRY.set(days as f64);
        }
        CHECK_FAILED.set(if outcome.passed() { 0.0 } else { 1.0 });

        let metric_families = prometheus::gather();
        let pushed = prometheus::push_metrics(
            "certsweep",
            labels! {
                "instance".to_owned() => "certsweep".to_owned(),
                "job".to_owned() => "certsweep".to_owned(),
                "host".to_owned() => outcome.hostname.to_owned(),
                "failed".to_owned() => (!outcome.passed()).to_string(),
            },
            &format!("{}/metrics/job", prometheus_address),
            metric_families,
            None,
        );

        if let Err(e) = pushed {
            warn!("failed to push metrics to {}: {}", prometheus_address, e);
        }
    }
}
