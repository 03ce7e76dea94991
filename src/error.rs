//! Gateway error taxonomy
//!
//! Every fallible gateway operation returns [`GatewayError`]. Errors are
//! surfaced to the immediate caller; nothing in this crate retries or
//! degrades silently. [`GatewayError::category`] gives the short label a
//! front end shows next to the detail.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used across the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors produced by the gateway and its components
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Unknown model name, missing model file or missing download URL
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The engine or download source could not be reached, or the
    /// connection broke mid-transfer
    #[error("Cannot reach {target}: {message}")]
    Unreachable { target: String, message: String },

    /// Non-success HTTP status from the engine or a download source
    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The engine did not answer its health probe within the bounded wait
    #[error("Engine did not become ready within {seconds} seconds")]
    EngineStartTimeout { seconds: u64 },

    /// The engine process exited before it became ready
    #[error("Engine exited before becoming ready ({status})")]
    EngineExited { status: String },

    /// Filesystem or process-spawn failure
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A non-streaming engine response could not be decoded
    #[error("Invalid response from engine: {message}")]
    InvalidResponse { message: String },
}

impl GatewayError {
    pub fn not_found(what: impl Into<String>) -> Self {
        GatewayError::NotFound { what: what.into() }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        GatewayError::Io {
            context: context.into(),
            source,
        }
    }

    /// Wraps an I/O error with the path it happened on
    pub fn io_at(action: &str, path: &Path, source: io::Error) -> Self {
        GatewayError::Io {
            context: format!("Failed to {} {}", action, path.display()),
            source,
        }
    }

    /// Converts a transport-level reqwest error into the taxonomy
    pub fn from_transport(target: impl Into<String>, err: reqwest::Error) -> Self {
        let target = target.into();
        let message = if err.is_timeout() {
            format!("request timed out ({})", err)
        } else if err.is_connect() {
            format!("connection failed ({})", err)
        } else {
            err.to_string()
        };
        GatewayError::Unreachable { target, message }
    }

    /// Short taxonomy label for user-facing display
    pub fn category(&self) -> &'static str {
        match self {
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::Unreachable { .. } => "unreachable",
            GatewayError::UpstreamStatus { .. } => "upstream_status",
            GatewayError::EngineStartTimeout { .. } | GatewayError::EngineExited { .. } => {
                "timeout"
            }
            GatewayError::Io { .. } => "io",
            GatewayError::InvalidResponse { .. } => "invalid_response",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

/// Missing model file at `path`
pub(crate) fn missing_file(name: &str, path: PathBuf) -> GatewayError {
    GatewayError::not_found(format!("model '{}' at {}", name, path.display()))
}
