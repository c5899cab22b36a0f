//! # fieldauth-core
//!
//! Shared library for the fieldauth Modbus handshake containing the slave
//! mode table, the register codec, burst planning, and input parsing.
//!
//! It has no dependency on sockets, runtimes, or logging: every function is a
//! pure value transform and can be tested on any host.
//!
//! # Architecture overview (for beginners)
//!
//! fieldauth authenticates a field sensor (the Modbus *slave*) from a control
//! device (the *master*).  The master walks the slave through five modes, and
//! in each mode either writes or reads a small block of holding registers:
//!
//! ```text
//! master                                   slave
//! ──────                                   ─────
//! coils ← SetChallenge    registers ← challenge (256 words, in bursts)
//! coils ← SetTimestamp    registers ← timestamp (2 words)
//! coils ← SetHmac         registers ← master HMAC (32 words)
//! coils ← ReadSensorData  registers → sensor reading (1 word)
//! coils ← ReadHmac        registers → slave HMAC (32 words)
//! ```
//!
//! This crate defines:
//!
//! - **`domain`** – the mode state table and the fixed-size values that
//!   travel through the handshake.
//! - **`protocol`** – transport limits, how long payloads are split into
//!   bursts, and how values map onto 16-bit registers.
//! - **`input`** – validation of operator-supplied challenge, HMAC, and
//!   timestamp strings.
//!
//! The master application (`fieldauth-master`) drives these pieces against a
//! real transport.

pub mod domain;
pub mod input;
pub mod protocol;

pub use domain::mode::{Mode, ModeError, MODE_BIT_ADDRESS, MODE_BIT_COUNT};
pub use domain::values::{
    Challenge, MasterHmac, SensorReading, SlaveHmac, Timestamp, CHALLENGE_LEN, HMAC_LEN,
};
pub use input::{parse_challenge, parse_master_hmac, parse_timestamp, InputError};
pub use protocol::codec::{CodecError, WordOrder};
pub use protocol::{DATA_BASE_ADDRESS, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};
