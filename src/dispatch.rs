//! Fan-out/fan-in work dispatcher.
//!
//! A fixed pool of worker threads pulls hostnames from a shared queue and
//! emits one outcome per hostname onto a results channel. The dispatcher
//! blocks only until it has collected exactly as many outcomes as there were
//! input hostnames; it never joins the workers.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use log::debug;

use crate::checker::{CheckOutcome, Checker};
use crate::error::CheckError;

/// Check every hostname with a pool of `concurrency` workers.
///
/// Returns one outcome per input hostname, in completion order. Fails with a
/// `Config` error before spawning anything if `concurrency` is zero.
pub fn run(
    hosts: &[String],
    checker: Checker,
    concurrency: usize,
) -> Result<Vec<CheckOutcome>, CheckError> {
    run_with(hosts, concurrency, move |host| checker.check(host))
}

/// Pool implementation, generic over the per-host check.
///
/// Workers terminate when the work queue is closed and drained. Every pulled
/// hostname produces exactly one outcome, so collecting `hosts.len()`
/// outcomes is a complete drain regardless of how work was interleaved
/// across workers.
pub fn run_with<F>(
    hosts: &[String],
    concurrency: usize,
    check: F,
) -> Result<Vec<CheckOutcome>, CheckError>
where
    F: Fn(&str) -> CheckOutcome + Send + Sync + 'static,
{
    if concurrency == 0 {
        return Err(CheckError::config("concurrency must be at least 1"));
    }

    let (work_tx, work_rx) = mpsc::channel::<String>();
    let work_rx = Arc::new(Mutex::new(work_rx));
    let (outcome_tx, outcome_rx) = mpsc::channel::<CheckOutcome>();
    let check = Arc::new(check);

    for worker in 0..concurrency {
        let work_rx = Arc::clone(&work_rx);
        let outcome_tx = outcome_tx.clone();
        let check = Arc::clone(&check);
        thread::spawn(move || loop {
            // the guard is dropped before the check runs; workers never hold
            // the queue lock during I/O
            let pulled = work_rx.lock().unwrap().recv();
            let host = match pulled {
                Ok(host) => host,
                Err(_) => {
                    debug!("worker {} exiting, queue closed", worker);
                    break;
                }
            };
            if outcome_tx.send(check(&host)).is_err() {
                break;
            }
        });
    }
    drop(outcome_tx);

    let expected = hosts.len();
    let pending: Vec<String> = hosts.to_vec();
    thread::spawn(move || {
        for host in pending {
            if work_tx.send(host).is_err() {
                break;
            }
        }
        // dropping work_tx closes the queue, letting idle workers exit
    });

    let mut outcomes = Vec::with_capacity(expected);
    for _ in 0..expected {
        let outcome = outcome_rx
            .recv()
            .expect("checker worker exited without delivering an outcome");
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn pass(host: &str) -> CheckOutcome {
        CheckOutcome {
            hostname: host.to_string(),
            days_left: Some(120),
            error: None,
        }
    }

    fn fail(host: &str) -> CheckOutcome {
        CheckOutcome {
            hostname: host.to_string(),
            days_left: Some(2),
            error: Some(CheckError::Expiring {
                position: 0,
                subject: host.to_string(),
                not_after: "soon".to_string(),
            }),
        }
    }

    fn hostnames(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("host-{}.example", i)).collect()
    }

    fn sorted_names(outcomes: &[CheckOutcome]) -> Vec<String> {
        let mut names: Vec<String> = outcomes.iter().map(|o| o.hostname.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_zero_concurrency_fails_fast() {
        let err = run_with(&hostnames(3), 0, pass).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_one_outcome_per_host_across_pool_sizes() {
        let hosts = hostnames(25);
        let mut expected = hosts.clone();
        expected.sort();

        for concurrency in [1, 4, 32] {
            let outcomes = run_with(&hosts, concurrency, pass).unwrap();
            assert_eq!(outcomes.len(), hosts.len());
            assert_eq!(sorted_names(&outcomes), expected);
        }
    }

    #[test]
    fn test_duplicate_hosts_each_produce_an_outcome() {
        let hosts = vec![
            "dup.example".to_string(),
            "dup.example".to_string(),
            "other.example".to_string(),
        ];
        let outcomes = run_with(&hosts, 2, pass).unwrap();
        assert_eq!(outcomes.len(), 3);
        let dups = outcomes
            .iter()
            .filter(|o| o.hostname == "dup.example")
            .count();
        assert_eq!(dups, 2);
    }

    #[test]
    fn test_empty_input_completes_immediately() {
        let outcomes = run_with(&[], 8, pass).unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_failures_flow_through_unchanged() {
        let hosts = hostnames(10);
        let outcomes = run_with(&hosts, 3, |host| {
            if host.contains("host-3") || host.contains("host-7") {
                fail(host)
            } else {
                pass(host)
            }
        })
        .unwrap();

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| !o.passed())
            .map(|o| o.hostname.as_str())
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.contains(&"host-3.example"));
        assert!(failed.contains(&"host-7.example"));
    }

    #[test]
    fn test_slow_checks_still_account_exactly() {
        let hosts = hostnames(12);
        let mut expected = hosts.clone();
        expected.sort();

        let outcomes = run_with(&hosts, 4, |host| {
            thread::sleep(Duration::from_millis(5));
            pass(host)
        })
        .unwrap();
        assert_eq!(sorted_names(&outcomes), expected);
    }
}
