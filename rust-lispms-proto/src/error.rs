//! Error types for the LISP mapping service implementation.

use thiserror::Error;

/// All possible errors that can occur within the LISP mapping service.
#[derive(Error, Debug)]
pub enum Error {
    /// A control message or address could not be decoded. Raised on
    /// truncated buffers, unknown LCAF type codes and inconsistent length
    /// fields. The transport boundary logs and drops; the sender resends.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// A control message could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Message authentication failed or used an unsupported key algorithm.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
