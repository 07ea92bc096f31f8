//! Error types and result definitions for the tplink-smart crate.
//! Separates framing, transport, device-reported and capability failures.

use crate::device::Feature;
use std::fmt;
use std::io::ErrorKind;
use thiserror::Error;

/// The step of a request/response exchange a transport error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPhase {
    Connect,
    Write,
    Read,
}

impl fmt::Display for TransportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportPhase::Connect => "connect",
            TransportPhase::Write => "write",
            TransportPhase::Read => "read",
        };
        f.write_str(s)
    }
}

/// Represents all possible errors that can occur when talking to a TP-Link device.
#[derive(Error, Debug, Clone)]
pub enum TpLinkError {
    /// Standard IO error outside of a device exchange (e.g. runtime setup)
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization or deserialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// An empty or oversized payload cannot be framed
    #[error("Frame encoding failed")]
    EncodeFailed,

    /// The bytes received from the device do not form a valid frame
    #[error("Frame decoding failed: {0}")]
    DecodeFailed(String),

    /// The exchange did not complete within the configured deadline
    #[error("Timeout waiting for device {endpoint}")]
    Timeout { endpoint: String },

    /// Connecting, writing or reading failed
    #[error("Socket {phase} failed for {endpoint}: {reason}")]
    Transport {
        endpoint: String,
        phase: TransportPhase,
        kind: ErrorKind,
        reason: String,
    },

    /// The device answered with a nonzero `err_code`
    #[error("Operation {command} failed on {endpoint} (err_code {code}{})", fmt_message(.message))]
    OperationFailed {
        endpoint: String,
        command: String,
        code: i64,
        message: Option<String>,
    },

    /// The device does not advertise the feature token for a capability
    #[error("Feature {feature} is not supported by {endpoint}")]
    UnsupportedFeature { endpoint: String, feature: Feature },

    /// The response JSON does not have the expected envelope shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A device answered with a frame or JSON that could not be decoded
    #[error("Invalid response from {endpoint}: {source}")]
    Response {
        endpoint: String,
        source: Box<TpLinkError>,
    },

    /// A builder was given values it cannot accept
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn fmt_message(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(": {}", m),
        _ => String::new(),
    }
}

/// A specialized Result type for TP-Link operations.
pub type Result<T> = std::result::Result<T, TpLinkError>;

impl From<std::io::Error> for TpLinkError {
    fn from(err: std::io::Error) -> Self {
        TpLinkError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TpLinkError {
    fn from(err: serde_json::Error) -> Self {
        TpLinkError::Json(err.to_string())
    }
}

impl TpLinkError {
    pub(crate) fn transport(endpoint: &str, phase: TransportPhase, err: &std::io::Error) -> Self {
        TpLinkError::Transport {
            endpoint: endpoint.to_string(),
            phase,
            kind: err.kind(),
            reason: err.to_string(),
        }
    }

    /// Whether a retry of the same exchange may succeed.
    ///
    /// Deadline expiry and the socket conditions the OS reports as temporary
    /// are transient; every other failure is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            TpLinkError::Timeout { .. } => true,
            TpLinkError::Transport { kind, .. } => matches!(
                kind,
                ErrorKind::TimedOut
                    | ErrorKind::WouldBlock
                    | ErrorKind::Interrupted
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }

    /// Tags a decoding failure with the device that produced the response.
    /// Errors that already name their endpoint pass through unchanged.
    pub(crate) fn at_device(self, endpoint: &str) -> Self {
        match self {
            TpLinkError::DecodeFailed(_) | TpLinkError::Json(_) | TpLinkError::InvalidPayload(_) => {
                TpLinkError::Response {
                    endpoint: endpoint.to_string(),
                    source: Box::new(self),
                }
            }
            other => other,
        }
    }

    /// The `address:port` of the device involved, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            TpLinkError::Timeout { endpoint }
            | TpLinkError::Transport { endpoint, .. }
            | TpLinkError::OperationFailed { endpoint, .. }
            | TpLinkError::UnsupportedFeature { endpoint, .. }
            | TpLinkError::Response { endpoint, .. } => Some(endpoint.as_str()),
            _ => None,
        }
    }

    /// Whether this is a cipher framing failure.
    pub fn is_framing(&self) -> bool {
        match self {
            TpLinkError::EncodeFailed | TpLinkError::DecodeFailed(_) => true,
            TpLinkError::Response { source, .. } => source.is_framing(),
            _ => false,
        }
    }
}
