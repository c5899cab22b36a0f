//! In-memory slave for tests and dry runs.
//!
//! [`SimulatedSlave`] implements the slave side of the register map so the
//! handshake can be exercised end to end without a network:
//!
//! - coils 0..4 hold the current mode;
//! - in `SetChallenge` mode, register writes are appended to the challenge
//!   buffer in arrival order (every burst lands at address 0);
//! - in `SetTimestamp` / `SetHmac` mode, a register write replaces the stored
//!   value;
//! - in `ReadSensorData` / `ReadHmac` mode, register reads return the
//!   configured sensor value or slave HMAC.
//!
//! A request that does not fit the current mode is answered with a Modbus
//! exception, just as firmware would.  Every call is recorded in a log, and a
//! single call can be made to fail on purpose with [`SimulatedSlave::fail_call`].

use async_trait::async_trait;
use fieldauth_core::protocol::codec::{decode_bytes, decode_timestamp, encode_bytes};
use fieldauth_core::{
    Challenge, MasterHmac, Mode, SensorReading, SlaveHmac, Timestamp, WordOrder, CHALLENGE_LEN,
    HMAC_LEN, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS, MODE_BIT_ADDRESS, MODE_BIT_COUNT,
};
use tracing::trace;

use crate::application::transport::{RegisterTransport, TransportError};

/// One request as the slave received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    WriteBits { addr: u16, bits: Vec<bool> },
    WriteRegisters { addr: u16, values: Vec<u16> },
    ReadRegisters { addr: u16, count: u16 },
    Close,
}

/// An in-memory stand-in for the sensor slave.
#[derive(Debug)]
pub struct SimulatedSlave {
    mode: Option<Mode>,
    challenge: Vec<u16>,
    timestamp: Option<[u16; 2]>,
    master_hmac: Option<Vec<u16>>,
    sensor_reading: SensorReading,
    slave_hmac: SlaveHmac,
    calls: Vec<TransportCall>,
    injected: Option<(usize, TransportError)>,
    read_limit: Option<usize>,
    closed: bool,
}

impl SimulatedSlave {
    /// A slave reporting `sensor_reading` and `slave_hmac` when asked.
    pub fn new(sensor_reading: SensorReading, slave_hmac: SlaveHmac) -> Self {
        Self {
            mode: None,
            challenge: Vec::with_capacity(CHALLENGE_LEN),
            timestamp: None,
            master_hmac: None,
            sensor_reading,
            slave_hmac,
            calls: Vec::new(),
            injected: None,
            read_limit: None,
            closed: false,
        }
    }

    /// Makes the `nth` call (1-based, counting every call) fail with `error`.
    pub fn fail_call(mut self, nth: usize, error: TransportError) -> Self {
        self.injected = Some((nth, error));
        self
    }

    /// Truncates every read response to at most `len` registers.
    pub fn truncate_reads(mut self, len: usize) -> Self {
        self.read_limit = Some(len);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> &[TransportCall] {
        &self.calls
    }

    /// The modes committed so far, in order.
    pub fn mode_history(&self) -> Vec<Mode> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::WriteBits { bits, .. } => {
                    let bits: [bool; MODE_BIT_COUNT] = bits.as_slice().try_into().ok()?;
                    Mode::from_bits(bits).ok()
                }
                _ => None,
            })
            .collect()
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The challenge reassembled from the bursts, once all 256 words arrived.
    pub fn received_challenge(&self) -> Option<Challenge> {
        (self.challenge.len() == CHALLENGE_LEN)
            .then(|| Challenge::from_prefix(&self.challenge))
            .flatten()
    }

    /// The timestamp as the slave decodes it with `order`.
    pub fn received_timestamp(&self, order: WordOrder) -> Option<Timestamp> {
        self.timestamp
            .map(|words| Timestamp(decode_timestamp(words, order)))
    }

    /// The master HMAC as written, one byte per register.
    pub fn received_master_hmac(&self) -> Option<MasterHmac> {
        let bytes: [u8; HMAC_LEN] = decode_bytes(self.master_hmac.as_ref()?).try_into().ok()?;
        Some(MasterHmac::new(bytes))
    }

    /// Records `call` and applies failure injection and the closed check.
    fn accept(&mut self, call: TransportCall) -> Result<(), TransportError> {
        trace!(?call, "simulated slave received");
        self.calls.push(call);
        if self.closed {
            return Err(TransportError::Closed);
        }
        let due = self
            .injected
            .as_ref()
            .is_some_and(|(nth, _)| *nth == self.calls.len());
        match self.injected.take() {
            Some((_, error)) if due => Err(error),
            pending => {
                self.injected = pending;
                Ok(())
            }
        }
    }

    fn illegal(operation: &'static str, exception: &str) -> TransportError {
        TransportError::Exception {
            operation,
            exception: exception.to_string(),
        }
    }
}

impl Default for SimulatedSlave {
    fn default() -> Self {
        Self::new(SensorReading(0), SlaveHmac::new([0; HMAC_LEN]))
    }
}

#[async_trait]
impl RegisterTransport for SimulatedSlave {
    async fn write_bits(&mut self, addr: u16, bits: &[bool]) -> Result<(), TransportError> {
        self.accept(TransportCall::WriteBits {
            addr,
            bits: bits.to_vec(),
        })?;
        const OP: &str = "write_bits";
        if addr != MODE_BIT_ADDRESS {
            return Err(Self::illegal(OP, "IllegalDataAddress"));
        }
        let pattern: [bool; MODE_BIT_COUNT] = bits
            .try_into()
            .map_err(|_| Self::illegal(OP, "IllegalDataValue"))?;
        let mode = Mode::from_bits(pattern).map_err(|_| Self::illegal(OP, "IllegalDataValue"))?;

        if mode == Mode::SetChallenge {
            self.challenge.clear();
        }
        self.mode = Some(mode);
        Ok(())
    }

    async fn write_registers(&mut self, addr: u16, values: &[u16]) -> Result<(), TransportError> {
        self.accept(TransportCall::WriteRegisters {
            addr,
            values: values.to_vec(),
        })?;
        const OP: &str = "write_registers";
        if values.len() > usize::from(MAX_WRITE_REGISTERS.get()) {
            return Err(TransportError::RequestTooLarge {
                operation: OP,
                requested: values.len(),
                limit: MAX_WRITE_REGISTERS.get(),
            });
        }
        if addr != 0 {
            return Err(Self::illegal(OP, "IllegalDataAddress"));
        }

        match self.mode {
            Some(Mode::SetChallenge) => {
                if self.challenge.len() + values.len() > CHALLENGE_LEN {
                    return Err(Self::illegal(OP, "IllegalDataValue"));
                }
                self.challenge.extend_from_slice(values);
            }
            Some(Mode::SetTimestamp) => {
                let words: [u16; 2] = values
                    .try_into()
                    .map_err(|_| Self::illegal(OP, "IllegalDataValue"))?;
                self.timestamp = Some(words);
            }
            Some(Mode::SetHmac) => {
                if values.len() != HMAC_LEN {
                    return Err(Self::illegal(OP, "IllegalDataValue"));
                }
                self.master_hmac = Some(values.to_vec());
            }
            _ => return Err(Self::illegal(OP, "IllegalFunction")),
        }
        Ok(())
    }

    async fn read_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        self.accept(TransportCall::ReadRegisters { addr, count })?;
        const OP: &str = "read_registers";
        if count > MAX_READ_REGISTERS.get() {
            return Err(TransportError::RequestTooLarge {
                operation: OP,
                requested: usize::from(count),
                limit: MAX_READ_REGISTERS.get(),
            });
        }
        if addr != 0 {
            return Err(Self::illegal(OP, "IllegalDataAddress"));
        }

        let mut response = match (self.mode, count) {
            (Some(Mode::ReadSensorData), 1) => vec![u16::from(self.sensor_reading.0)],
            (Some(Mode::ReadHmac), n) if usize::from(n) == HMAC_LEN => {
                encode_bytes(self.slave_hmac.as_bytes())
            }
            (Some(Mode::ReadSensorData | Mode::ReadHmac), _) => {
                return Err(Self::illegal(OP, "IllegalDataAddress"))
            }
            _ => return Err(Self::illegal(OP, "IllegalFunction")),
        };
        if let Some(limit) = self.read_limit {
            response.truncate(limit);
        }
        Ok(response)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.calls.push(TransportCall::Close);
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_challenge_bursts_are_reassembled_in_arrival_order() {
        // Arrange
        let mut slave = SimulatedSlave::default();
        let words: Vec<u16> = (0..256).collect();
        slave.write_bits(0, &Mode::SetChallenge.bits()).await.unwrap();

        // Act
        for chunk in words.chunks(123) {
            slave.write_registers(0, chunk).await.unwrap();
        }

        // Assert
        let challenge = slave.received_challenge().expect("complete challenge");
        assert_eq!(challenge.as_words(), words.as_slice());
    }

    #[tokio::test]
    async fn test_register_write_without_mode_is_rejected() {
        let mut slave = SimulatedSlave::default();

        let err = slave.write_registers(0, &[1, 2]).await.unwrap_err();

        assert!(matches!(err, TransportError::Exception { .. }));
    }

    #[tokio::test]
    async fn test_read_in_write_mode_is_rejected() {
        let mut slave = SimulatedSlave::default();
        slave.write_bits(0, &Mode::SetHmac.bits()).await.unwrap();

        let err = slave.read_registers(0, 32).await.unwrap_err();

        assert!(matches!(err, TransportError::Exception { .. }));
    }

    #[tokio::test]
    async fn test_oversized_write_is_rejected() {
        let mut slave = SimulatedSlave::default();
        slave.write_bits(0, &Mode::SetChallenge.bits()).await.unwrap();

        let err = slave.write_registers(0, &[0; 124]).await.unwrap_err();

        assert!(matches!(err, TransportError::RequestTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_injected_failure_hits_only_the_nth_call() {
        // Arrange
        let mut slave = SimulatedSlave::default().fail_call(2, TransportError::Closed);

        // Act
        let first = slave.write_bits(0, &Mode::SetChallenge.bits()).await;
        let second = slave.write_registers(0, &[1]).await;
        let third = slave.write_registers(0, &[2]).await;

        // Assert
        assert!(first.is_ok());
        assert_eq!(second, Err(TransportError::Closed));
        assert!(third.is_ok());
        assert_eq!(slave.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_sensor_read_returns_configured_value() {
        let mut slave = SimulatedSlave::new(SensorReading(73), SlaveHmac::new([0; HMAC_LEN]));
        slave.write_bits(0, &Mode::ReadSensorData.bits()).await.unwrap();

        let registers = slave.read_registers(0, 1).await.unwrap();

        assert_eq!(registers, vec![73]);
    }

    #[tokio::test]
    async fn test_calls_after_close_fail() {
        let mut slave = SimulatedSlave::default();
        slave.close().await.unwrap();

        let err = slave.write_bits(0, &Mode::SetChallenge.bits()).await.unwrap_err();

        assert_eq!(err, TransportError::Closed);
        assert!(slave.is_closed());
    }
}
