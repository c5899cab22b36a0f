//! Application values exchanged during a handshake.
//!
//! Every value here has a fixed size that is a protocol constant, never
//! negotiated with the slave.  The types are thin newtypes so that a master
//! HMAC cannot be passed where the slave HMAC is expected (and vice versa).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of 16-bit words in a challenge.
pub const CHALLENGE_LEN: usize = 256;

/// Number of bytes in an HMAC (SHA-256 output size).
pub const HMAC_LEN: usize = 32;

/// The nonce array the master sends to anchor the exchange.
///
/// Always exactly [`CHALLENGE_LEN`] words.  Positions the caller did not
/// supply are zero.
#[derive(Clone, PartialEq, Eq)]
pub struct Challenge([u16; CHALLENGE_LEN]);

impl Challenge {
    /// Wraps a full challenge array.
    pub fn new(words: [u16; CHALLENGE_LEN]) -> Self {
        Self(words)
    }

    /// Builds a challenge from a prefix of at most [`CHALLENGE_LEN`] words,
    /// zero-filling the remainder.
    ///
    /// Returns `None` if `prefix` is longer than [`CHALLENGE_LEN`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fieldauth_core::Challenge;
    ///
    /// let challenge = Challenge::from_prefix(&[7, 8, 9]).unwrap();
    /// assert_eq!(&challenge.as_words()[..4], &[7, 8, 9, 0]);
    /// ```
    pub fn from_prefix(prefix: &[u16]) -> Option<Self> {
        if prefix.len() > CHALLENGE_LEN {
            return None;
        }
        let mut words = [0u16; CHALLENGE_LEN];
        words[..prefix.len()].copy_from_slice(prefix);
        Some(Self(words))
    }

    /// The challenge as register words.
    pub fn as_words(&self) -> &[u16] {
        &self.0
    }
}

impl Default for Challenge {
    fn default() -> Self {
        Self([0u16; CHALLENGE_LEN])
    }
}

impl fmt::Debug for Challenge {
    // 256 words are unreadable in logs; show the head only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Challenge({:?}, ..)", &self.0[..4])
    }
}

/// The 32-bit freshness nonce bound to a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u32);

impl From<u32> for Timestamp {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HMAC computed by the caller over challenge, timestamp, and shared secret.
///
/// Opaque to the handshake beyond its length.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MasterHmac([u8; HMAC_LEN]);

/// HMAC returned by the slave at the end of the handshake.
///
/// The handshake never compares it against anything; verification belongs
/// to the caller.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SlaveHmac([u8; HMAC_LEN]);

macro_rules! hmac_newtype {
    ($name:ident) => {
        impl $name {
            /// Wraps raw HMAC bytes.
            pub fn new(bytes: [u8; HMAC_LEN]) -> Self {
                Self(bytes)
            }

            /// The raw bytes.
            pub fn as_bytes(&self) -> &[u8; HMAC_LEN] {
                &self.0
            }

            /// Lower-case hex rendering, two characters per byte.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl From<[u8; HMAC_LEN]> for $name {
            fn from(bytes: [u8; HMAC_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }
    };
}

hmac_newtype!(MasterHmac);
hmac_newtype!(SlaveHmac);

/// A single-byte measurement read from the slave (e.g. temperature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorReading(pub u8);

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_from_prefix_zero_fills_remainder() {
        // Arrange
        let prefix: Vec<u16> = (1..=10).collect();

        // Act
        let challenge = Challenge::from_prefix(&prefix).expect("fits");

        // Assert
        assert_eq!(&challenge.as_words()[..10], prefix.as_slice());
        assert!(challenge.as_words()[10..].iter().all(|&w| w == 0));
        assert_eq!(challenge.as_words().len(), CHALLENGE_LEN);
    }

    #[test]
    fn test_challenge_from_prefix_accepts_exactly_full_length() {
        let prefix = vec![0xFFFF; CHALLENGE_LEN];
        let challenge = Challenge::from_prefix(&prefix).expect("fits");
        assert_eq!(challenge.as_words(), prefix.as_slice());
    }

    #[test]
    fn test_challenge_from_prefix_rejects_overlong_input() {
        let prefix = vec![1u16; CHALLENGE_LEN + 1];
        assert!(Challenge::from_prefix(&prefix).is_none());
    }

    #[test]
    fn test_challenge_debug_is_abbreviated() {
        let challenge = Challenge::from_prefix(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(format!("{challenge:?}"), "Challenge([1, 2, 3, 4], ..)");
    }

    #[test]
    fn test_hmac_hex_is_lowercase_and_64_chars() {
        let mut bytes = [0u8; HMAC_LEN];
        bytes[0] = 0xAB;
        bytes[31] = 0x0F;
        let hmac = SlaveHmac::new(bytes);

        let hex = hmac.to_hex();

        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab"));
        assert!(hex.ends_with("0f"));
        assert_eq!(hmac.to_string(), hex);
    }

    #[test]
    fn test_sensor_reading_displays_decimal() {
        assert_eq!(SensorReading(23).to_string(), "23");
    }
}
