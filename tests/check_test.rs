//! End-to-end tests against local TLS servers with generated certificates,
//! so no network access or live endpoints are required.

use std::net::TcpListener;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::ssl::{SslAcceptor, SslMethod};
use openssl::x509::{X509, X509NameBuilder};

use certsweep::{dispatch, CheckError, Checker, Report, Status};

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn generate_identity(cn: &str, not_after_unix: i64) -> (X509, PKey<Private>) {
    let rsa = Rsa::generate(2048).unwrap();
    let key = PKey::from_rsa(rsa).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = {
        let mut serial = BigNum::new().unwrap();
        serial.rand(159, MsbOption::MAYBE_ZERO, false).unwrap();
        serial.to_asn1_integer().unwrap()
    };
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    let not_before = Asn1Time::from_unix(unix_now() - 86_400).unwrap();
    builder.set_not_before(&not_before).unwrap();
    let not_after = Asn1Time::from_unix(not_after_unix).unwrap();
    builder.set_not_after(&not_after).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    (builder.build(), key)
}

/// Serve TLS handshakes on a loopback port with the given identity.
/// The listener thread lives for the remainder of the test process.
fn spawn_tls_server(cert: X509, key: PKey<Private>) -> u16 {
    let mut acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls()).unwrap();
    acceptor.set_private_key(&key).unwrap();
    acceptor.set_certificate(&cert).unwrap();
    acceptor.check_private_key().unwrap();
    let acceptor = acceptor.build();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                // the client hangs up right after the handshake; a failed
                // shutdown on our side is expected
                Ok(stream) => drop(acceptor.accept(stream)),
                Err(_) => break,
            }
        }
    });
    port
}

fn checker() -> Checker {
    Checker::new(30, Duration::from_secs(10))
}

#[test]
fn test_healthy_host_passes() {
    let (cert, key) = generate_identity("good.example", unix_now() + 400 * 86_400);
    let port = spawn_tls_server(cert, key);

    let host = format!("127.0.0.1:{}", port);
    let outcome = checker().check(&host);

    assert_eq!(outcome.hostname, host);
    assert!(outcome.passed(), "unexpected error: {:?}", outcome.error);
    let days = outcome.days_left.unwrap();
    assert!((399..=400).contains(&days), "unexpected days_left: {}", days);
}

#[test]
fn test_expiring_host_is_flagged() {
    let (cert, key) = generate_identity("expiring.example", unix_now() + 5 * 86_400);
    let port = spawn_tls_server(cert, key);

    let host = format!("127.0.0.1:{}", port);
    let outcome = checker().check(&host);

    assert_eq!(outcome.hostname, host);
    match outcome.error {
        Some(CheckError::Expiring {
            position, subject, ..
        }) => {
            assert_eq!(position, 0);
            assert_eq!(subject, "expiring.example");
        }
        other => panic!("expected Expiring, got {:?}", other),
    }
    let days = outcome.days_left.unwrap();
    assert!((4..=5).contains(&days), "unexpected days_left: {}", days);
}

#[test]
fn test_unreachable_host_records_connect_error() {
    // bind then drop to find a port with nothing listening
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let host = format!("127.0.0.1:{}", port);
    let outcome = checker().check(&host);

    assert!(outcome.days_left.is_none());
    match outcome.error {
        Some(CheckError::Connect { address, .. }) => assert_eq!(address, host),
        other => panic!("expected Connect, got {:?}", other),
    }
}

#[test]
fn test_dispatch_end_to_end() {
    let (cert, key) = generate_identity("good.example", unix_now() + 400 * 86_400);
    let good_port = spawn_tls_server(cert, key);
    let (cert, key) = generate_identity("expiring.example", unix_now() + 5 * 86_400);
    let expiring_port = spawn_tls_server(cert, key);

    let good_host = format!("127.0.0.1:{}", good_port);
    let expiring_host = format!("127.0.0.1:{}", expiring_port);
    let hosts = vec![good_host.clone(), expiring_host.clone()];

    let outcomes = dispatch::run(&hosts, checker(), 4).unwrap();
    assert_eq!(outcomes.len(), 2);

    let report = Report::from_outcomes(outcomes);
    assert_eq!(report.status(), Status::Fail);
    assert_eq!(report.passed_count(), 1);

    let failed: Vec<&str> = report.failures().map(|o| o.hostname.as_str()).collect();
    assert_eq!(failed, vec![expiring_host.as_str()]);
}

#[test]
fn test_zero_concurrency_never_dials() {
    let hosts = vec!["127.0.0.1:1".to_string()];
    let err = dispatch::run(&hosts, checker(), 0).unwrap_err();
    assert!(err.is_config());
}
