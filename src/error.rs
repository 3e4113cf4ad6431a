//! Error types for certificate expiry checking.
//!
//! Per-host failures are captured into the check outcome and reported by the
//! aggregator; only configuration errors abort the whole run.

use std::fmt;

/// Error raised while configuring or running certificate checks.
///
/// The variants carry structured fields; rendering is deferred to the
/// `Display` implementation at the reporting boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Invalid input discovered before any network activity.
    ///
    /// Fatal: aborts the run before dispatch with a usage exit status.
    Config {
        /// Why the configuration was rejected
        reason: String,
    },

    /// Resolution, TCP connection or TLS handshake failure for one host.
    Connect {
        /// The address (host:port) that was dialed
        address: String,
        /// The underlying transport or TLS error
        details: String,
    },

    /// A certificate within the peer chain expires before the threshold.
    Expiring {
        /// Zero-based position of the certificate in the chain, leaf first
        position: usize,
        /// Subject common name of the expiring certificate
        subject: String,
        /// The certificate's exact NotAfter value
        not_after: String,
    },
}

impl CheckError {
    /// Shorthand for a `Config` error.
    pub fn config<S: Into<String>>(reason: S) -> CheckError {
        CheckError::Config {
            reason: reason.into(),
        }
    }

    /// Whether this error is fatal to the whole run.
    pub fn is_config(&self) -> bool {
        matches!(self, CheckError::Config { .. })
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "{}", reason),
            Self::Connect { address, details } => {
                write!(f, "tls dial {}: {}", address, details)
            }
            Self::Expiring {
                position,
                subject,
                not_after,
            } => {
                write!(f, "cert[{}] {} expires at {}", position, subject, not_after)
            }
        }
    }
}

impl std::error::Error for CheckError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_display() {
        let err = CheckError::config("concurrency must be at least 1");
        assert_eq!(err.to_string(), "concurrency must be at least 1");
        assert!(err.is_config());
    }

    #[test]
    fn test_connect_display() {
        let err = CheckError::Connect {
            address: "example.com:443".to_string(),
            details: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "tls dial example.com:443: connection refused"
        );
        assert!(!err.is_config());
    }

    #[test]
    fn test_expiring_display() {
        let err = CheckError::Expiring {
            position: 0,
            subject: "expiring.example".to_string(),
            not_after: "Mar  1 12:00:00 2026 GMT".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cert[0] expiring.example expires at Mar  1 12:00:00 2026 GMT"
        );
    }
}
