//! Protocol module: transport limits, burst planning, and the register codec.

use std::num::NonZeroU16;

pub mod burst;
pub mod codec;

pub use burst::{burst_count, plan_bursts, Burst};
pub use codec::{CodecError, WordOrder};

/// Most registers a single Modbus "write multiple registers" request may carry.
pub const MAX_WRITE_REGISTERS: NonZeroU16 = match NonZeroU16::new(123) {
    Some(n) => n,
    None => unreachable!(),
};

/// Most registers a single Modbus "read holding registers" request may return.
pub const MAX_READ_REGISTERS: NonZeroU16 = match NonZeroU16::new(125) {
    Some(n) => n,
    None => unreachable!(),
};

/// Holding-register address every data transfer starts at.
pub const DATA_BASE_ADDRESS: u16 = 0;
