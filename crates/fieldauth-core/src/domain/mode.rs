//! Slave operating modes and the fixed order in which the master commits them.
//!
//! # What is a "mode"? (for beginners)
//!
//! The slave exposes a single window of holding registers starting at address
//! 0.  The *meaning* of that window changes with the slave's current mode: in
//! `SetChallenge` mode a register write is a challenge burst, in `ReadHmac`
//! mode a register read returns the slave's HMAC, and so on.
//!
//! The master selects the mode by writing a 4-bit pattern into coils 0..4
//! before every data transfer:
//!
//! ```text
//! coil:        0     1     2     3
//!            (MSB)             (LSB)
//! SetChallenge   0     0     0     0
//! SetTimestamp   0     0     0     1
//! SetHmac        0     0     1     0
//! ReadSensorData 0     0     1     1
//! ReadHmac       0     1     0     0
//! ```
//!
//! Within one handshake run the modes are committed exactly once each, in
//! the order listed above.  There is no way back to an earlier mode.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of coils used to encode a [`Mode`].
pub const MODE_BIT_COUNT: usize = 4;

/// Coil address of the most significant mode bit.
pub const MODE_BIT_ADDRESS: u16 = 0;

/// Errors raised when a mode code or mode transition is invalid.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ModeError {
    /// The 4-bit code does not name any mode.
    #[error("unknown mode code: 0b{0:04b}")]
    UnknownCode(u8),

    /// The requested mode is not the next one in the handshake order.
    #[error("mode {requested} cannot follow {}", describe_current(.current))]
    OutOfOrder {
        current: Option<Mode>,
        requested: Mode,
    },
}

fn describe_current(current: &Option<Mode>) -> String {
    match current {
        Some(mode) => mode.to_string(),
        None => "the start of the run".to_string(),
    }
}

/// The handshake phase the slave is currently serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Mode {
    /// Register writes carry challenge bursts.
    SetChallenge = 0b0000,
    /// Register writes carry the two timestamp words.
    SetTimestamp = 0b0001,
    /// Register writes carry the master HMAC.
    SetHmac = 0b0010,
    /// Register 0 holds the sensor reading.
    ReadSensorData = 0b0011,
    /// Registers 0..32 hold the slave HMAC.
    ReadHmac = 0b0100,
}

impl Mode {
    /// Every mode, in the order a handshake commits them.
    pub const SEQUENCE: [Mode; 5] = [
        Mode::SetChallenge,
        Mode::SetTimestamp,
        Mode::SetHmac,
        Mode::ReadSensorData,
        Mode::ReadHmac,
    ];

    /// The 4-bit wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The coil pattern for this mode, most significant bit first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fieldauth_core::Mode;
    ///
    /// assert_eq!(Mode::ReadSensorData.bits(), [false, false, true, true]);
    /// ```
    pub fn bits(self) -> [bool; MODE_BIT_COUNT] {
        let code = self.code();
        let mut bits = [false; MODE_BIT_COUNT];
        for (index, bit) in bits.iter_mut().enumerate() {
            *bit = code & (1 << (MODE_BIT_COUNT - 1 - index)) != 0;
        }
        bits
    }

    /// Decodes a coil pattern written most significant bit first.
    ///
    /// # Errors
    ///
    /// Returns [`ModeError::UnknownCode`] if the pattern names no mode.
    pub fn from_bits(bits: [bool; MODE_BIT_COUNT]) -> Result<Self, ModeError> {
        let code = bits
            .iter()
            .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit));
        Mode::try_from(code)
    }

    /// The mode that must follow this one, or `None` for the last phase.
    pub fn next(self) -> Option<Mode> {
        let position = Mode::SEQUENCE.iter().position(|&m| m == self)?;
        Mode::SEQUENCE.get(position + 1).copied()
    }

    /// Checks that `requested` may be committed after `current`.
    ///
    /// `current == None` means nothing has been committed in this run yet,
    /// so only [`Mode::SetChallenge`] is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ModeError::OutOfOrder`] for any other transition.
    pub fn check_transition(current: Option<Mode>, requested: Mode) -> Result<(), ModeError> {
        let expected = match current {
            None => Some(Mode::SEQUENCE[0]),
            Some(mode) => mode.next(),
        };
        if expected == Some(requested) {
            Ok(())
        } else {
            Err(ModeError::OutOfOrder { current, requested })
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = ModeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0b0000 => Ok(Mode::SetChallenge),
            0b0001 => Ok(Mode::SetTimestamp),
            0b0010 => Ok(Mode::SetHmac),
            0b0011 => Ok(Mode::ReadSensorData),
            0b0100 => Ok(Mode::ReadHmac),
            other => Err(ModeError::UnknownCode(other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::SetChallenge => "SetChallenge",
            Mode::SetTimestamp => "SetTimestamp",
            Mode::SetHmac => "SetHmac",
            Mode::ReadSensorData => "ReadSensorData",
            Mode::ReadHmac => "ReadHmac",
        };
        f.write_str(name)
    }
}
