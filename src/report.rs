//! Outcome aggregation and rendering.

use comfy_table::Table;
use log::warn;
use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::checker::CheckOutcome;

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// Diagnostic lines for failing hosts only
    Text,
    /// Table of every checked host
    Summary,
    /// JSON document of every checked host
    Json,
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
}

/// Aggregated check results. Holds exactly one outcome per input hostname.
#[derive(Debug)]
pub struct Report {
    outcomes: Vec<CheckOutcome>,
}

#[derive(Debug, Serialize)]
struct ReportEntry<'a> {
    hostname: &'a str,
    status: String,
    days_left: Option<i64>,
    error: Option<String>,
}

impl Report {
    /// Take ownership of all outcomes. Every outcome is retained, so the
    /// failure report covers every failing host, not just the first.
    pub fn from_outcomes(outcomes: Vec<CheckOutcome>) -> Report {
        Report { outcomes }
    }

    /// All outcomes in completion order.
    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }

    /// Outcomes that recorded an error.
    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    /// Fail if any host failed.
    pub fn status(&self) -> Status {
        if self.outcomes.iter().all(|o| o.passed()) {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    fn entries(&self) -> Vec<ReportEntry<'_>> {
        self.outcomes
            .iter()
            .map(|o| ReportEntry {
                hostname: &o.hostname,
                status: if o.passed() {
                    Status::Pass.to_string()
                } else {
                    Status::Fail.to_string()
                },
                days_left: o.days_left,
                error: o.error.as_ref().map(|e| e.to_string()),
            })
            .collect()
    }
}

/// Render the report: diagnostics for failing hosts always go to stderr,
/// one line per host; summary and json formats additionally write the full
/// result set to stdout.
pub fn render(report: &Report, format: OutputFormat) {
    for outcome in report.failures() {
        if let Some(error) = &outcome.error {
            eprintln!("error: {}: {}", outcome.hostname, error);
        }
    }

    match format {
        OutputFormat::Text => {}
        OutputFormat::Summary => println!("{}", summary_table(report)),
        OutputFormat::Json => match serde_json::to_string_pretty(&report.entries()) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("failed to render json report: {}", e),
        },
    }
}

fn summary_table(report: &Report) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Host", "Days left", "Status", "Detail"]);
    for outcome in report.outcomes() {
        table.add_row(vec![
            outcome.hostname.clone(),
            outcome
                .days_left
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            if outcome.passed() {
                Status::Pass.to_string()
            } else {
                Status::Fail.to_string()
            },
            outcome
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default(),
        ]);
    }
    table
}
