// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the Feie client.

use thiserror::Error;

/// Top-level error type for all Feie operations.
#[derive(Debug, Error)]
pub enum FeieError {
    // -- Gateway transport --
    /// Connection could not be established (DNS, refused, TLS) or timed out.
    #[error("gateway transport failed: {0}")]
    Transport(String),

    /// The gateway answered with a zero-length body.
    #[error("gateway returned an empty response")]
    EmptyResponse,

    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The vendor envelope carried a non-zero `ret` (or no `data`).
    #[error("vendor rejected request (ret={ret}): {msg}")]
    Vendor { ret: i32, msg: String },

    // -- Request construction --
    #[error("account credentials are incomplete: user and ukey must both be set")]
    MissingCredentials,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // -- Callback verification --
    /// The configured vendor public key is missing or cannot be parsed.
    #[error("vendor public key error: {0}")]
    Key(String),

    #[error("malformed callback notification: {0}")]
    InvalidCallback(String),

    // -- Configuration / plumbing --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FeieError>;

/// Classification of errors for callers that wrap calls in their own retry
/// policy. The client itself never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connectivity blip or empty gateway reply. Retrying may succeed.
    Transient,
    /// Bad input, bad key, bad configuration or a vendor-side rejection.
    Permanent,
}

impl FeieError {
    /// Classify this error for retry decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            FeieError::Transport(_) | FeieError::EmptyResponse => ErrorClass::Transient,
            FeieError::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::Interrupted
                | std::io::ErrorKind::WouldBlock => ErrorClass::Transient,
                _ => ErrorClass::Permanent,
            },
            FeieError::Decode(_)
            | FeieError::Vendor { .. }
            | FeieError::MissingCredentials
            | FeieError::InvalidRequest(_)
            | FeieError::Key(_)
            | FeieError::InvalidCallback(_)
            | FeieError::Config(_)
            | FeieError::Logging(_) => ErrorClass::Permanent,
        }
    }
}
