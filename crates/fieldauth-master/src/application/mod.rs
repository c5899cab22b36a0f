//! Application layer use cases for the master application.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure protocol rules in `fieldauth-core`) and the infrastructure (sockets,
//! files, terminals).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain values to fulfil one goal: authenticate a slave
//!   and fetch its sensor reading.
//! - **Depend on abstractions** ([`transport::RegisterTransport`]) rather than
//!   a concrete Modbus client, so tests can substitute a mock or an
//!   in-memory slave.
//! - **Contain no OS calls, no network I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`transport`**      – The port the handshake talks through, and its
//!   error type.
//!
//! - **`chunked_writer`** – Splits long payloads into bounded write bursts.
//!
//! - **`mode_controller`** – Commits the slave's mode coils and enforces the
//!   order of modes within a run.
//!
//! - **`phases`**         – The five data transfers, one per mode.
//!
//! - **`handshake`**      – Runs the five (mode, transfer) steps in order and
//!   aborts on the first failure.

pub mod chunked_writer;
pub mod handshake;
pub mod mode_controller;
pub mod phases;
pub mod transport;
