//! Phase operations: the five data transfers of the handshake.
//!
//! Each operation assumes the matching [`fieldauth_core::Mode`] has already
//! been committed by the [`ModeController`](super::mode_controller::ModeController).
//! All transfers target [`DATA_BASE_ADDRESS`].
//!
//! | Operation           | Direction | Registers |
//! |---------------------|-----------|-----------|
//! | `write_challenge`   | write     | 256 (bursts) |
//! | `write_timestamp`   | write     | 2         |
//! | `write_master_hmac` | write     | 32        |
//! | `read_sensor`       | read      | 1         |
//! | `read_slave_hmac`   | read      | 32        |
//!
//! A read that returns the wrong number of registers is reported as
//! [`TransportError::IncompleteTransfer`]; nothing partial is handed back.

use fieldauth_core::protocol::codec::{
    decode_sensor_reading, decode_slave_hmac, encode_master_hmac, encode_timestamp, CodecError,
};
use fieldauth_core::{
    Challenge, MasterHmac, SensorReading, SlaveHmac, Timestamp, WordOrder, DATA_BASE_ADDRESS,
    HMAC_LEN,
};
use tracing::debug;

use super::chunked_writer::ChunkedWriter;
use super::transport::{RegisterTransport, TransportError};

const SENSOR_REGISTERS: u16 = 1;

/// Writes the 256-word challenge in bursts.
pub async fn write_challenge<T>(
    transport: &mut T,
    writer: &ChunkedWriter,
    challenge: &Challenge,
) -> Result<(), TransportError>
where
    T: RegisterTransport + ?Sized,
{
    let bursts = writer
        .write(transport, DATA_BASE_ADDRESS, challenge.as_words())
        .await?;
    debug!(bursts, "challenge sent");
    Ok(())
}

/// Writes the timestamp as two registers.
pub async fn write_timestamp<T>(
    transport: &mut T,
    timestamp: Timestamp,
    order: WordOrder,
) -> Result<(), TransportError>
where
    T: RegisterTransport + ?Sized,
{
    let words = encode_timestamp(timestamp.0, order);
    debug!(%timestamp, ?words, "sending timestamp");
    transport.write_registers(DATA_BASE_ADDRESS, &words).await
}

/// Writes the master HMAC, one byte per register.
pub async fn write_master_hmac<T>(transport: &mut T, hmac: &MasterHmac) -> Result<(), TransportError>
where
    T: RegisterTransport + ?Sized,
{
    let registers = encode_master_hmac(hmac);
    debug!(registers = registers.len(), "sending master hmac");
    transport.write_registers(DATA_BASE_ADDRESS, &registers).await
}

/// Reads the single sensor register and keeps its low byte.
pub async fn read_sensor<T>(transport: &mut T) -> Result<SensorReading, TransportError>
where
    T: RegisterTransport + ?Sized,
{
    let registers = transport
        .read_registers(DATA_BASE_ADDRESS, SENSOR_REGISTERS)
        .await?;
    decode_sensor_reading(&registers).map_err(|e| incomplete("read_sensor", e))
}

/// Reads the 32 slave HMAC registers.
///
/// The value is returned as read; it is never compared with the master HMAC.
pub async fn read_slave_hmac<T>(transport: &mut T) -> Result<SlaveHmac, TransportError>
where
    T: RegisterTransport + ?Sized,
{
    let registers = transport
        .read_registers(DATA_BASE_ADDRESS, HMAC_LEN as u16)
        .await?;
    decode_slave_hmac(&registers).map_err(|e| incomplete("read_slave_hmac", e))
}

fn incomplete(operation: &'static str, err: CodecError) -> TransportError {
    match err {
        CodecError::LengthMismatch { expected, actual } => TransportError::IncompleteTransfer {
            operation,
            expected,
            actual,
        },
    }
}
