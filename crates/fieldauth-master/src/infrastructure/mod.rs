//! Infrastructure layer for the master application.
//!
//! Contains the outward-facing adapters: the Modbus TCP transport, the
//! simulated slave, configuration file storage, and result reporting.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `fieldauth_core`, but MUST NOT be imported by the `application` layer
//! (configuration builds application settings, never the reverse).

pub mod report;
pub mod storage;
pub mod transport;
