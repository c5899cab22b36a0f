//! fieldauth master entry point.
//!
//! Authenticates a sensor slave over Modbus TCP and prints its sensor reading
//! together with the HMAC the slave returned.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()            -- positional inputs and overrides
//!  └─ load_config()           -- TOML file, then CLI overrides
//!  └─ parse inputs            -- challenge, master HMAC, timestamp
//!  └─ ModbusTcpTransport::connect()   (or SimulatedSlave with --simulate)
//!  └─ run_and_close()         -- five handshake steps, then close
//!  └─ print report            -- stdout; logs go to stderr
//! ```
//!
//! # Exit status
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | handshake completed                              |
//! | 1    | handshake aborted at some step                   |
//! | 2    | challenge, HMAC, or timestamp argument malformed |
//! | 3    | configuration or connection failure              |

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fieldauth_core::{
    parse_challenge, parse_master_hmac, parse_timestamp, Challenge, InputError, MasterHmac,
    SensorReading, SlaveHmac, Timestamp, HMAC_LEN,
};
use fieldauth_master::application::handshake::run_and_close;
use fieldauth_master::infrastructure::report::{HandshakeReport, OutputFormat};
use fieldauth_master::infrastructure::storage::config::{load_config, AppConfig};
use fieldauth_master::infrastructure::transport::{
    ModbusTcpTransport, SimulatedSlave, TransportSettings,
};

const EXIT_HANDSHAKE_FAILED: u8 = 1;
const EXIT_BAD_INPUT: u8 = 2;
const EXIT_SETUP_FAILED: u8 = 3;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// fieldauth master.
///
/// Runs the challenge-response handshake against a sensor slave and prints
/// `<sensor reading>-<slave hmac hex>`.
#[derive(Debug, Parser)]
#[command(
    name = "fieldauth-master",
    about = "Challenge-response authentication of a Modbus sensor slave",
    version
)]
struct Cli {
    /// Comma-separated challenge words (up to 256 decimal values, missing
    /// positions are zero).
    challenge: String,

    /// Master HMAC as 64 hexadecimal characters.
    hmac: String,

    /// Timestamp as a decimal unsigned 32-bit value.
    timestamp: String,

    /// Configuration file.  Defaults to the platform config directory.
    #[arg(long, env = "FIELDAUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Slave host name or IP address.
    #[arg(long, env = "FIELDAUTH_SLAVE_HOST")]
    host: Option<String>,

    /// Slave TCP port.
    #[arg(long, env = "FIELDAUTH_SLAVE_PORT")]
    port: Option<u16>,

    /// Modbus unit identifier of the slave.
    #[arg(long, env = "FIELDAUTH_UNIT_ID")]
    unit_id: Option<u8>,

    /// Response timeout per request, in milliseconds.
    #[arg(long, env = "FIELDAUTH_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "FIELDAUTH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format for the result.
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Run against an in-memory slave instead of the network.
    #[arg(long)]
    simulate: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.slave.host = host.clone();
        }
        if let Some(port) = self.port {
            config.slave.port = port;
        }
        if let Some(unit_id) = self.unit_id {
            config.slave.unit_id = unit_id;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.slave.response_timeout_ms = timeout_ms;
        }
        if let Some(level) = &self.log_level {
            config.master.log_level = level.clone();
        }
    }

    fn inputs(&self) -> Result<(Challenge, MasterHmac, Timestamp), InputError> {
        Ok((
            parse_challenge(&self.challenge)?,
            parse_master_hmac(&self.hmac)?,
            parse_timestamp(&self.timestamp)?,
        ))
    }
}

/// Loads the config file and applies CLI overrides, then re-validates.
fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn transport_settings(config: &AppConfig) -> anyhow::Result<TransportSettings> {
    let host = config.slave.host.as_str();
    let port = config.slave.port;
    let addr = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("cannot resolve slave address '{host}:{port}'"))?
        .next()
        .with_context(|| format!("no address found for '{host}:{port}'"))?;
    Ok(TransportSettings {
        addr,
        unit_id: config.slave.unit_id,
        response_timeout: config.slave.response_timeout(),
    })
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration decides the default log level, so it is loaded first and
    // any error is reported once logging is up.
    let config = resolve_config(&cli);
    let level = match &config {
        Ok(cfg) => cfg.master.log_level.clone(),
        Err(_) => cli.log_level.clone().unwrap_or_else(|| "info".to_string()),
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = match config {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::from(EXIT_SETUP_FAILED);
        }
    };

    let (challenge, master_hmac, timestamp) = match cli.inputs() {
        Ok(inputs) => inputs,
        Err(e) => {
            error!("invalid input: {e}");
            return ExitCode::from(EXIT_BAD_INPUT);
        }
    };

    match run(&cli, &config, &challenge, &master_hmac, timestamp).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(EXIT_SETUP_FAILED)
        }
    }
}

/// Connects, runs the handshake, and prints the report.
///
/// Setup failures are returned as errors; handshake failures are reported and
/// mapped to an exit code.
async fn run(
    cli: &Cli,
    config: &AppConfig,
    challenge: &Challenge,
    master_hmac: &MasterHmac,
    timestamp: Timestamp,
) -> anyhow::Result<ExitCode> {
    let settings = config.handshake_settings()?;

    let result = if cli.simulate {
        info!("running against simulated slave");
        let slave = SimulatedSlave::new(SensorReading(0), SlaveHmac::new([0; HMAC_LEN]));
        run_and_close(slave, settings, challenge, timestamp, master_hmac)
            .await
            .1
    } else {
        let transport_settings = transport_settings(config).await?;
        let transport = ModbusTcpTransport::connect(&transport_settings)
            .await
            .context("failed to connect to slave")?;
        run_and_close(transport, settings, challenge, timestamp, master_hmac)
            .await
            .1
    };

    let report = HandshakeReport::from_result(&result);
    let rendered = report
        .render(cli.format)
        .context("failed to render report")?;

    match (&result, cli.format) {
        (Ok(_), _) | (Err(_), OutputFormat::Json) => println!("{rendered}"),
        (Err(_), OutputFormat::Plain) => eprintln!("{rendered}"),
    }

    Ok(match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::from(EXIT_HANDSHAKE_FAILED),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_HMAC: &str = "0000000000000000000000000000000000000000000000000000000000000000";

    fn parse(extra: &[&str]) -> Cli {
        let mut args = vec!["fieldauth-master", "1,2,3", ZERO_HMAC, "1700000000"];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    #[test]
    fn test_cli_positional_inputs_parse() {
        // Arrange
        let cli = parse(&[]);

        // Act
        let (challenge, hmac, ts) = cli.inputs().unwrap();

        // Assert
        assert_eq!(&challenge.as_words()[..4], &[1, 2, 3, 0]);
        assert_eq!(hmac.as_bytes(), &[0; HMAC_LEN]);
        assert_eq!(ts, Timestamp(1_700_000_000));
        assert_eq!(cli.format, OutputFormat::Plain);
        assert!(!cli.simulate);
    }

    #[test]
    fn test_cli_overrides_replace_file_values() {
        let cli = parse(&["--host", "10.1.2.3", "--port", "5020", "--timeout-ms", "900"]);
        let mut config = AppConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.slave.host, "10.1.2.3");
        assert_eq!(config.slave.port, 5020);
        assert_eq!(config.slave.response_timeout_ms, 900);
        // Not overridden
        assert_eq!(config.slave.unit_id, 1);
    }

    #[test]
    fn test_cli_bad_hmac_is_input_error() {
        let cli = Cli::parse_from(["fieldauth-master", "1", "zz", "1"]);
        assert!(cli.inputs().is_err());
    }

    #[test]
    fn test_cli_json_format_flag() {
        let cli = parse(&["--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[tokio::test]
    async fn test_transport_settings_resolve_loopback() {
        let config = AppConfig::default();

        let settings = transport_settings(&config).await.unwrap();

        assert_eq!(settings.addr.to_string(), "127.0.0.1:1502");
        assert_eq!(settings.unit_id, 1);
    }
}
