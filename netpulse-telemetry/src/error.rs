use std::time::Duration;

use thiserror::Error;

/// Common error type for telemetry sampling operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No reply from the agent within the timeout, after the single retry.
    /// The caller's next scheduled poll is the effective retry.
    #[error("no reply from {device} within {timeout:?} (after retry)")]
    Timeout { device: String, timeout: Duration },

    /// Malformed or unexpected response framing.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The agent reported that a requested object does not exist.
    #[error("requested object not available on agent")]
    NoSuchObject,

    /// A requested interface name did not resolve to any known index.
    /// Carries a small sample of known names to aid operator debugging.
    #[error("unknown interface '{name}' (known interfaces include: {available:?})")]
    UnknownInterface {
        name: String,
        available: Vec<String>,
    },
}

impl Error {
    /// Classify an snmp2 error: "no such name" class errors feed the
    /// 32-bit counter fallback, everything else is a protocol fault.
    pub(crate) fn from_snmp(e: snmp2::Error) -> Self {
        let detail = format!("{e:?}");
        if detail.contains("NoSuch") {
            Error::NoSuchObject
        } else {
            Error::Protocol(detail)
        }
    }
}

/// Result type alias using the telemetry Error.
pub type Result<T> = std::result::Result<T, Error>;
