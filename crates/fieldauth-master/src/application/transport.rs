//! The register transport port: what the handshake needs from the fieldbus.
//!
//! The handshake never talks to sockets directly.  It calls the four
//! primitives of [`RegisterTransport`], and the infrastructure layer supplies
//! an implementation (Modbus TCP in production, an in-memory slave in tests).
//!
//! Every method is awaited to completion before the next one is issued; the
//! Modbus master/slave model is half-duplex and the handshake relies on the
//! slave seeing calls in exactly the order they were made.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a transport call.
///
/// Any of these aborts the current handshake run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection to the slave could not be established.
    #[error("could not connect to slave at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// The slave did not answer within the response timeout.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The link failed while the request was in flight.
    #[error("{operation} failed: {reason}")]
    Io {
        operation: &'static str,
        reason: String,
    },

    /// The slave answered with a Modbus exception.
    #[error("{operation} rejected by slave: {exception}")]
    Exception {
        operation: &'static str,
        exception: String,
    },

    /// The caller asked for more registers than one request may carry.
    #[error("{operation} of {requested} registers exceeds the per-request limit of {limit}")]
    RequestTooLarge {
        operation: &'static str,
        requested: usize,
        limit: u16,
    },

    /// The slave returned fewer (or more) registers than requested.
    #[error("{operation} returned {actual} registers, expected {expected}")]
    IncompleteTransfer {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The transport was used after it was closed.
    #[error("transport is closed")]
    Closed,
}

/// Primitive fieldbus operations used by the handshake.
///
/// Implementations must enforce the per-request register limits
/// ([`fieldauth_core::MAX_WRITE_REGISTERS`] for writes,
/// [`fieldauth_core::MAX_READ_REGISTERS`] for reads) and apply the response
/// timeout configured when the connection was set up.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegisterTransport: Send {
    /// Writes `bits.len()` consecutive coils starting at `addr`.
    async fn write_bits(&mut self, addr: u16, bits: &[bool]) -> Result<(), TransportError>;

    /// Writes `values.len()` consecutive holding registers starting at `addr`.
    async fn write_registers(&mut self, addr: u16, values: &[u16]) -> Result<(), TransportError>;

    /// Reads `count` consecutive holding registers starting at `addr`.
    async fn read_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>, TransportError>;

    /// Releases the connection.  Further calls return [`TransportError::Closed`].
    async fn close(&mut self) -> Result<(), TransportError>;
}
