//! Parsing of the three handshake inputs supplied by the operator.
//!
//! ```text
//! challenge   "12,7,65535,0"        comma-separated decimal u16, at most 256
//! master hmac "00ff…"               64 hex digits (32 bytes)
//! timestamp   "1700000000"          decimal u32
//! ```
//!
//! All validation happens here, before any transport interaction.

use thiserror::Error;

use crate::domain::values::{Challenge, MasterHmac, Timestamp, CHALLENGE_LEN, HMAC_LEN};

/// Errors produced while parsing handshake inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A challenge element is not a decimal integer in `0..=65535`.
    #[error("challenge element {position} ({value:?}) is not a 16-bit unsigned integer")]
    ChallengeElement { position: usize, value: String },

    /// More than [`CHALLENGE_LEN`] challenge elements were supplied.
    #[error("challenge has {count} elements, at most {} are allowed", CHALLENGE_LEN)]
    ChallengeTooLong { count: usize },

    /// The HMAC string is not valid hexadecimal.
    #[error("master HMAC is not valid hex: {0}")]
    HmacHex(String),

    /// The HMAC decodes to the wrong number of bytes.
    #[error("master HMAC must be {} bytes, got {actual}", HMAC_LEN)]
    HmacLength { actual: usize },

    /// The timestamp is not a decimal integer in `0..=4294967295`.
    #[error("timestamp {0:?} is not a 32-bit unsigned integer")]
    Timestamp(String),
}

/// Parses a comma-separated challenge.
///
/// Fewer than [`CHALLENGE_LEN`] elements are accepted; the remaining
/// positions are zero.  Surrounding whitespace around each element is
/// ignored.  An empty string yields the all-zero challenge.
///
/// # Errors
///
/// Returns [`InputError::ChallengeElement`] for a malformed element and
/// [`InputError::ChallengeTooLong`] for more than [`CHALLENGE_LEN`] elements.
pub fn parse_challenge(input: &str) -> Result<Challenge, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Challenge::default());
    }

    let words = trimmed
        .split(',')
        .enumerate()
        .map(|(position, raw)| {
            let raw = raw.trim();
            raw.parse::<u16>().map_err(|_| InputError::ChallengeElement {
                position,
                value: raw.to_string(),
            })
        })
        .collect::<Result<Vec<u16>, InputError>>()?;

    Challenge::from_prefix(&words).ok_or(InputError::ChallengeTooLong { count: words.len() })
}

/// Parses a hex-encoded 32-byte master HMAC (upper or lower case).
///
/// # Errors
///
/// Returns [`InputError::HmacHex`] for non-hex input and
/// [`InputError::HmacLength`] when the decoded length is not [`HMAC_LEN`].
pub fn parse_master_hmac(input: &str) -> Result<MasterHmac, InputError> {
    let bytes = hex::decode(input.trim()).map_err(|e| InputError::HmacHex(e.to_string()))?;
    let array: [u8; HMAC_LEN] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| InputError::HmacLength {
            actual: bytes.len(),
        })?;
    Ok(MasterHmac::new(array))
}

/// Parses a decimal 32-bit timestamp.
///
/// # Errors
///
/// Returns [`InputError::Timestamp`] if the value is not a `u32`.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, InputError> {
    let raw = input.trim();
    raw.parse::<u32>()
        .map(Timestamp)
        .map_err(|_| InputError::Timestamp(raw.to_string()))
}
