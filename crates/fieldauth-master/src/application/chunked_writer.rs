//! ChunkedWriter: issues a long payload as a series of bounded register writes.
//!
//! The burst layout itself is computed by
//! [`fieldauth_core::protocol::burst::plan_bursts`]; this use case only
//! drives the transport.  Every burst is written at the same base address,
//! in order, and the first failure stops the sequence.

use std::num::NonZeroU16;

use fieldauth_core::protocol::burst::plan_bursts;
use fieldauth_core::MAX_WRITE_REGISTERS;
use tracing::{debug, trace};

use super::transport::{RegisterTransport, TransportError};

/// Splits payloads into bursts of at most `max_write` registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedWriter {
    max_write: NonZeroU16,
}

impl ChunkedWriter {
    /// Creates a writer bounded by `max_write` registers per call.
    ///
    /// Values above [`MAX_WRITE_REGISTERS`] are clamped to it; a Modbus
    /// request cannot carry more.
    pub fn new(max_write: NonZeroU16) -> Self {
        Self {
            max_write: max_write.min(MAX_WRITE_REGISTERS),
        }
    }

    /// The per-call register limit in effect.
    pub fn max_write(&self) -> NonZeroU16 {
        self.max_write
    }

    /// Writes `payload` as consecutive bursts, all starting at `base_address`.
    ///
    /// Returns the number of bursts issued.  An empty payload issues none.
    ///
    /// # Errors
    ///
    /// Returns the first [`TransportError`]; no later burst is attempted.
    pub async fn write<T>(
        &self,
        transport: &mut T,
        base_address: u16,
        payload: &[u16],
    ) -> Result<usize, TransportError>
    where
        T: RegisterTransport + ?Sized,
    {
        let mut issued = 0;
        for burst in plan_bursts(payload, self.max_write) {
            trace!(
                burst = burst.index,
                offset = burst.offset,
                len = burst.words.len(),
                "writing burst"
            );
            transport.write_registers(base_address, burst.words).await?;
            issued += 1;
        }
        debug!(bursts = issued, words = payload.len(), "payload written");
        Ok(issued)
    }
}

impl Default for ChunkedWriter {
    fn default() -> Self {
        Self::new(MAX_WRITE_REGISTERS)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
