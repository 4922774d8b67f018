// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QRT error taxonomy.
//!
//! One enum for the whole crate, grouped by layer. Server-originated text
//! (Error packets, unexpected command responses) is carried verbatim so
//! callers can surface QTM's own wording.

use std::fmt;
use std::io;

/// Crate-wide error type.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Socket-level I/O failure with the underlying cause.
    Io(io::Error),
    /// TCP connect failed (refused, unreachable, resolution failure).
    ConnectFailed(String),
    /// Operation requires a connected transport.
    NotConnected,

    // ========================================================================
    // Flow Outcomes
    // ========================================================================
    /// No data within the deadline. Recoverable; the caller decides whether
    /// to retry or abort.
    Timeout,
    /// Peer closed the connection; the session must be torn down.
    Disconnected,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed header, truncated frame, or a packet kind that does not fit
    /// the current request.
    Protocol(String),

    // ========================================================================
    // Server Errors
    // ========================================================================
    /// A well-formed Error packet, or a Command response whose text does not
    /// match the expected success phrase. Message text comes verbatim from
    /// the server.
    Server(String),

    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// Caller misuse: bad index, undersized scratch buffer, invalid argument.
    Contract(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::ConnectFailed(msg) => write!(f, "Connect failed: {}", msg),
            Error::NotConnected => write!(f, "Not connected"),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Disconnected => write!(f, "Connection closed by peer"),
            Error::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Error::Server(msg) => write!(f, "{}", msg),
            Error::Contract(msg) => write!(f, "Contract violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_text_is_verbatim() {
        let err = Error::Server("Wrong or missing password".to_string());
        assert_eq!(err.to_string(), "Wrong or missing password");
    }

    #[test]
    fn io_error_keeps_source() {
        let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
