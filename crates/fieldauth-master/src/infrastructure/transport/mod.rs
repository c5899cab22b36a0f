//! Transport adapters implementing [`RegisterTransport`](crate::application::transport::RegisterTransport).
//!
//! # Sub-modules
//!
//! - **`modbus_tcp`** – The production transport: a Modbus TCP client with a
//!   per-request response timeout.
//!
//! - **`simulated`** – An in-memory slave that follows the same register map.
//!   Used by the integration tests and handy for trying the binary without
//!   hardware.

pub mod modbus_tcp;
pub mod simulated;

pub use modbus_tcp::{ModbusTcpTransport, TransportSettings};
pub use simulated::{SimulatedSlave, TransportCall};
