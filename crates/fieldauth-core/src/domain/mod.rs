//! Domain entities for the fieldauth handshake.
//!
//! Pure types with no infrastructure dependencies:
//!
//! - [`mode`] – the five slave modes, their 4-bit codes, and the only legal
//!   order in which a run may commit them.
//! - [`values`] – challenge, timestamp, HMACs, and the sensor reading.

pub mod mode;
pub mod values;
