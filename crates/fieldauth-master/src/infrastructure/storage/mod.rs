//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from `--config` or the
//!   platform-appropriate directory.
//! - Providing defaults when the file does not exist (a slave on the local
//!   host, standard Modbus limits).
//! - Validating ranges the slave firmware depends on.

pub mod config;
