//! Per-host certificate checking: TLS connect, peer chain extraction and
//! expiry evaluation.

use std::net::{TcpStream, ToSocketAddrs};
use std::ops::Deref;
use std::time::Duration;

use chrono::{DateTime, Days, Utc};
use log::debug;
use openssl::asn1::Asn1Time;
use openssl::nid::Nid;
use openssl::ssl::{Ssl, SslContext, SslMethod, SslVerifyMode};
use openssl::x509::{X509, X509Ref};
use url::Url;

use crate::error::CheckError;

/// Port implied when a hostname carries no explicit port.
const HTTPS_PORT: u16 = 443;

/// Result of checking a single host.
///
/// Produced by [`Checker::check`], immutable afterwards, consumed once by the
/// report aggregator.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// The hostname exactly as it was supplied, used for reporting
    pub hostname: String,
    /// Remaining validity of the leaf certificate in whole days, when a
    /// handshake completed
    pub days_left: Option<i64>,
    /// The failure recorded for this host, if any
    pub error: Option<CheckError>,
}

impl CheckOutcome {
    /// Whether the host passed its check.
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Checks one host at a time: dials, inspects the peer chain, evaluates
/// expiry against a per-check threshold.
#[derive(Debug, Clone)]
pub struct Checker {
    days: u32,
    timeout: Duration,
}

impl Checker {
    /// Create a checker flagging certificates that expire within `days`
    /// calendar days, with `timeout` applied to connect, read and write.
    pub fn new(days: u32, timeout: Duration) -> Checker {
        Checker { days, timeout }
    }

    /// Check a single host.
    ///
    /// Opens exactly one connection. Failures never propagate out of this
    /// method; they are folded into the outcome.
    pub fn check(&self, hostname: &str) -> CheckOutcome {
        let threshold = expiry_threshold(Utc::now(), self.days);
        debug!("checking {} against threshold {}", hostname, threshold);

        let chain = match self.connect(hostname) {
            Ok(chain) => chain,
            Err(error) => {
                return CheckOutcome {
                    hostname: hostname.to_string(),
                    days_left: None,
                    error: Some(error),
                }
            }
        };

        let days_left = chain.first().and_then(|leaf| validity_days(leaf));
        let error = evaluate_chain(&chain, threshold).err();
        CheckOutcome {
            hostname: hostname.to_string(),
            days_left,
            error,
        }
    }

    /// Dial the host, perform a TLS handshake and return the peer chain,
    /// leaf first. The connection is closed immediately after the handshake;
    /// no application data is exchanged.
    fn connect(&self, hostname: &str) -> Result<Vec<X509>, CheckError> {
        let target = dial_target(hostname)?;
        let address = target.address;

        let mut context = SslContext::builder(SslMethod::tls()).map_err(|e| {
            CheckError::Connect {
                address: address.clone(),
                details: e.to_string(),
            }
        })?;
        // expiry is the only concern here; trust and hostname validation are
        // out of scope
        context.set_verify(SslVerifyMode::empty());
        let context = context.build();

        let mut ssl = Ssl::new(&context).map_err(|e| CheckError::Connect {
            address: address.clone(),
            details: e.to_string(),
        })?;
        ssl.set_hostname(&target.sni).map_err(|e| CheckError::Connect {
            address: address.clone(),
            details: e.to_string(),
        })?;

        let mut addrs = address.to_socket_addrs().map_err(|e| CheckError::Connect {
            address: address.clone(),
            details: format!("resolve: {}", e),
        })?;
        let socket_addr = addrs.next().ok_or_else(|| CheckError::Connect {
            address: address.clone(),
            details: "no addresses resolved".to_string(),
        })?;

        let tcp = TcpStream::connect_timeout(&socket_addr, self.timeout).map_err(|e| {
            CheckError::Connect {
                address: address.clone(),
                details: format!("connect: {}", e),
            }
        })?;
        tcp.set_read_timeout(Some(self.timeout))
            .map_err(|e| CheckError::Connect {
                address: address.clone(),
                details: e.to_string(),
            })?;
        tcp.set_write_timeout(Some(self.timeout))
            .map_err(|e| CheckError::Connect {
                address: address.clone(),
                details: e.to_string(),
            })?;

        let mut stream = ssl.connect(tcp).map_err(|e| CheckError::Connect {
            address: address.clone(),
            details: format!("tls handshake: {}", e),
        })?;

        let chain = stream
            .ssl()
            .peer_cert_chain()
            .map(|stack| stack.iter().map(|cert| cert.to_owned()).collect())
            .unwrap_or_default();
        let _ = stream.shutdown();
        Ok(chain)
    }
}

/// Fail on the first certificate in the chain whose NotAfter is strictly
/// before `threshold`. A certificate expiring exactly at the threshold
/// instant is not flagged. An empty chain passes vacuously.
pub fn evaluate_chain(chain: &[X509], threshold: DateTime<Utc>) -> Result<(), CheckError> {
    let threshold = Asn1Time::from_unix(threshold.timestamp())
        .map_err(|e| CheckError::config(format!("threshold out of range: {}", e)))?;

    for (position, cert) in chain.iter().enumerate() {
        if cert.not_after() < threshold {
            return Err(CheckError::Expiring {
                position,
                subject: subject_common_name(cert),
                not_after: cert.not_after().to_string(),
            });
        }
    }
    Ok(())
}

/// The expiry threshold for a check starting at `now`: calendar-day
/// addition, so month and year rollover are respected. Saturates at the
/// maximum representable instant.
pub(crate) fn expiry_threshold(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Where a hostname string is actually dialed.
///
/// The original hostname is never mutated; reporting always uses it
/// verbatim.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct DialTarget {
    /// Host portion, sent as SNI
    pub sni: String,
    /// host:port dialed over TCP
    pub address: String,
}

/// Normalize a hostname into a dial target. `host` gains the implied `:443`,
/// `host:port` passes through unchanged, and URL forms such as
/// `https://host:port` are reduced to their host and port.
pub(crate) fn dial_target(hostname: &str) -> Result<DialTarget, CheckError> {
    if hostname.contains("://") {
        let url = Url::parse(hostname).map_err(|e| CheckError::Connect {
            address: hostname.to_string(),
            details: format!("invalid host url: {}", e),
        })?;
        let host = url.host_str().ok_or_else(|| CheckError::Connect {
            address: hostname.to_string(),
            details: "host url has no host".to_string(),
        })?;
        let port = url.port().unwrap_or(HTTPS_PORT);
        return Ok(DialTarget {
            sni: host.to_string(),
            address: format!("{}:{}", host, port),
        });
    }

    match hostname.rsplit_once(':') {
        Some((host, _port)) => Ok(DialTarget {
            sni: host.to_string(),
            address: hostname.to_string(),
        }),
        None => Ok(DialTarget {
            sni: hostname.to_string(),
            address: format!("{}:{}", hostname, HTTPS_PORT),
        }),
    }
}

fn subject_common_name(cert: &X509Ref) -> String {
    cert.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
        .map(|name| name.to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn validity_days(cert: &X509Ref) -> Option<i64> {
    let now = Asn1Time::days_from_now(0).ok()?;
    let diff = now.deref().diff(cert.not_after()).ok()?;
    Some(i64::from(diff.days))
}
