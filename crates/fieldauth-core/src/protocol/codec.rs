//! Register codec: application values ⇄ 16-bit register words.
//!
//! Wire layout of the holding-register window (address 0):
//! ```text
//! SetChallenge   [w0 .. w255]                 one burst at a time, each at address 0
//! SetTimestamp   [word_a, word_b]             order given by WordOrder
//! SetHmac        [0x00b0, 0x00b1 .. 0x00b31]  one HMAC byte per register, low byte
//! ReadSensorData [0x??rr]                     reading in the low byte
//! ReadHmac       [0x??b0 .. 0x??b31]          one HMAC byte per register, low byte
//! ```
//!
//! # Timestamp word order
//!
//! Master and slave share an *implicit* assumption about how the 32-bit
//! timestamp is split into two words; there is no negotiation.  The
//! reference deployment copies the `u32` into two `u16` slots in host memory,
//! i.e. native layout.  [`WordOrder::NATIVE`] reproduces exactly that and is
//! the default.  Deployments whose slave uses a different layout must set the
//! order explicitly; the codec never guesses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::values::{MasterHmac, SensorReading, SlaveHmac, HMAC_LEN};

/// Errors raised when register words cannot be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The number of registers does not match the fixed field size.
    #[error("expected {expected} registers, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// How a 32-bit timestamp is laid out across two consecutive registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordOrder {
    /// Bits 0..16 in the first register, bits 16..32 in the second.
    LowWordFirst,
    /// Bits 16..32 in the first register, bits 0..16 in the second.
    HighWordFirst,
}

impl WordOrder {
    /// The layout produced by copying a `u32` into two `u16` slots on this host.
    pub const NATIVE: WordOrder = if cfg!(target_endian = "little") {
        WordOrder::LowWordFirst
    } else {
        WordOrder::HighWordFirst
    };
}

impl Default for WordOrder {
    fn default() -> Self {
        WordOrder::NATIVE
    }
}

/// Splits a timestamp into two register words.
///
/// # Examples
///
/// ```rust
/// use fieldauth_core::protocol::codec::{encode_timestamp, WordOrder};
///
/// assert_eq!(encode_timestamp(0x1234_5678, WordOrder::LowWordFirst), [0x5678, 0x1234]);
/// assert_eq!(encode_timestamp(0x1234_5678, WordOrder::HighWordFirst), [0x1234, 0x5678]);
/// ```
pub fn encode_timestamp(ts: u32, order: WordOrder) -> [u16; 2] {
    let low = (ts & 0xFFFF) as u16;
    let high = (ts >> 16) as u16;
    match order {
        WordOrder::LowWordFirst => [low, high],
        WordOrder::HighWordFirst => [high, low],
    }
}

/// Joins two register words back into a timestamp.
pub fn decode_timestamp(words: [u16; 2], order: WordOrder) -> u32 {
    let (high, low) = match order {
        WordOrder::LowWordFirst => (words[1], words[0]),
        WordOrder::HighWordFirst => (words[0], words[1]),
    };
    (u32::from(high) << 16) | u32::from(low)
}

/// Packs bytes into registers, one byte per register in the low byte.
pub fn encode_bytes(bytes: &[u8]) -> Vec<u16> {
    bytes.iter().map(|&b| u16::from(b)).collect()
}

/// Extracts the low byte of every register.
pub fn decode_bytes(registers: &[u16]) -> Vec<u8> {
    registers.iter().map(|&r| decode_byte(r)).collect()
}

/// Extracts the low byte of a single register.
pub fn decode_byte(register: u16) -> u8 {
    (register & 0x00FF) as u8
}

/// Encodes the master HMAC as [`HMAC_LEN`] registers.
pub fn encode_master_hmac(hmac: &MasterHmac) -> Vec<u16> {
    encode_bytes(hmac.as_bytes())
}

/// Decodes exactly [`HMAC_LEN`] registers into the slave HMAC.
///
/// # Errors
///
/// Returns [`CodecError::LengthMismatch`] for any other register count.
pub fn decode_slave_hmac(registers: &[u16]) -> Result<SlaveHmac, CodecError> {
    if registers.len() != HMAC_LEN {
        return Err(CodecError::LengthMismatch {
            expected: HMAC_LEN,
            actual: registers.len(),
        });
    }
    let mut bytes = [0u8; HMAC_LEN];
    for (byte, &register) in bytes.iter_mut().zip(registers) {
        *byte = decode_byte(register);
    }
    Ok(SlaveHmac::new(bytes))
}

/// Decodes the single sensor register.
///
/// # Errors
///
/// Returns [`CodecError::LengthMismatch`] unless exactly one register is given.
pub fn decode_sensor_reading(registers: &[u16]) -> Result<SensorReading, CodecError> {
    match registers {
        [register] => Ok(SensorReading(decode_byte(*register))),
        other => Err(CodecError::LengthMismatch {
            expected: 1,
            actual: other.len(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ── Timestamp ─────────────────────────────────────────────────────────────

    #[test]
    fn test_native_order_matches_host_memory_layout() {
        // Arrange – reproduce a raw copy of the u32 into two u16 slots
        let ts: u32 = 1_700_000_000;
        let b = ts.to_ne_bytes();
        let raw = [
            u16::from_ne_bytes([b[0], b[1]]),
            u16::from_ne_bytes([b[2], b[3]]),
        ];

        // Act
        let encoded = encode_timestamp(ts, WordOrder::NATIVE);

        // Assert
        assert_eq!(encoded, raw);
    }

    #[test]
    fn test_default_word_order_is_native() {
        assert_eq!(WordOrder::default(), WordOrder::NATIVE);
    }

    #[test]
    fn test_encode_timestamp_reference_value() {
        // 1_700_000_000 = 0x6553_F100
        assert_eq!(
            encode_timestamp(1_700_000_000, WordOrder::LowWordFirst),
            [0xF100, 0x6553]
        );
        assert_eq!(
            encode_timestamp(1_700_000_000, WordOrder::HighWordFirst),
            [0x6553, 0xF100]
        );
    }

    // ── Bytes ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_encode_bytes_uses_one_register_per_byte() {
        let registers = encode_bytes(&[0x00, 0x7F, 0xFF]);
        assert_eq!(registers, vec![0x0000, 0x007F, 0x00FF]);
    }

    #[test]
    fn test_decode_byte_ignores_high_byte() {
        assert_eq!(decode_byte(0xAB17), 0x17);
    }

    #[test]
    fn test_encode_master_hmac_produces_hmac_len_registers() {
        let hmac = MasterHmac::new([0x5A; HMAC_LEN]);
        let registers = encode_master_hmac(&hmac);
        assert_eq!(registers.len(), HMAC_LEN);
        assert!(registers.iter().all(|&r| r == 0x005A));
    }

    #[test]
    fn test_decode_slave_hmac_rejects_short_read() {
        let result = decode_slave_hmac(&[0u16; 16]);
        assert_eq!(
            result,
            Err(CodecError::LengthMismatch {
                expected: HMAC_LEN,
                actual: 16
            })
        );
    }

    #[test]
    fn test_decode_sensor_reading_takes_low_byte() {
        assert_eq!(decode_sensor_reading(&[0x0119]), Ok(SensorReading(0x19)));
    }

    #[test]
    fn test_decode_sensor_reading_rejects_empty() {
        assert!(matches!(
            decode_sensor_reading(&[]),
            Err(CodecError::LengthMismatch { expected: 1, actual: 0 })
        ));
    }

    // ── Laws ──────────────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn prop_timestamp_round_trips_in_both_orders(ts in any::<u32>()) {
            for order in [WordOrder::LowWordFirst, WordOrder::HighWordFirst] {
                prop_assert_eq!(decode_timestamp(encode_timestamp(ts, order), order), ts);
            }
        }

        #[test]
        fn prop_hmac_bytes_round_trip(bytes in any::<[u8; HMAC_LEN]>()) {
            let registers = encode_master_hmac(&MasterHmac::new(bytes));
            let decoded = decode_slave_hmac(&registers).unwrap();
            prop_assert_eq!(decoded.as_bytes(), &bytes);
        }
    }
}
