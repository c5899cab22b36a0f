//! Rendering handshake results for the terminal.
//!
//! Two formats are supported:
//!
//! - `plain` – `<sensor>-<slave hmac hex>` on success, the line downstream
//!   scripts already parse.
//! - `json`  – a single JSON object with the same data plus failure details.

use clap::ValueEnum;
use serde::Serialize;

use crate::application::handshake::{HandshakeError, HandshakeOutcome, StepStage};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// Serializable summary of one handshake run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandshakeReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_reading: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slave_hmac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<StepStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandshakeReport {
    pub fn from_result(result: &Result<HandshakeOutcome, HandshakeError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                sensor_reading: Some(outcome.sensor_reading.0),
                slave_hmac: Some(outcome.slave_hmac.to_hex()),
                failed_step: None,
                failed_stage: None,
                error: None,
            },
            Err(e) => Self {
                success: false,
                sensor_reading: e.last_sensor_reading().map(|r| r.0),
                slave_hmac: None,
                failed_step: Some(e.step().number()),
                failed_stage: match e {
                    HandshakeError::Transport { stage, .. } => Some(*stage),
                    HandshakeError::Mode { .. } => None,
                },
                error: Some(e.to_string()),
            },
        }
    }

    /// Renders the report in `format`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if JSON encoding fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Json => serde_json::to_string(self),
            OutputFormat::Plain => Ok(match (&self.sensor_reading, &self.slave_hmac) {
                (Some(reading), Some(hmac)) if self.success => format!("{reading}-{hmac}"),
                _ => format!(
                    "handshake failed: {}",
                    self.error.as_deref().unwrap_or("unknown error")
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handshake::HandshakeStep;
    use crate::application::transport::TransportError;
    use fieldauth_core::{SensorReading, SlaveHmac, HMAC_LEN};

    fn outcome() -> HandshakeOutcome {
        HandshakeOutcome {
            sensor_reading: SensorReading(25),
            slave_hmac: SlaveHmac::new([0xAB; HMAC_LEN]),
        }
    }

    #[test]
    fn test_plain_success_is_reading_dash_hex() {
        // Arrange
        let report = HandshakeReport::from_result(&Ok(outcome()));

        // Act
        let line = report.render(OutputFormat::Plain).unwrap();

        // Assert
        assert_eq!(line, format!("25-{}", "ab".repeat(HMAC_LEN)));
    }

    #[test]
    fn test_json_success_has_reading_and_hmac() {
        let report = HandshakeReport::from_result(&Ok(outcome()));

        let json: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["sensor_reading"], 25);
        assert!(json.get("failed_step").is_none());
    }

    #[test]
    fn test_json_failure_names_step_and_keeps_reading() {
        // Arrange
        let err = HandshakeError::Transport {
            step: HandshakeStep::SlaveHmac,
            stage: StepStage::Transfer,
            source: TransportError::Closed,
            sensor_reading: Some(SensorReading(7)),
        };

        // Act
        let report = HandshakeReport::from_result(&Err(err));
        let json: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();

        // Assert
        assert_eq!(json["success"], false);
        assert_eq!(json["failed_step"], 5);
        assert_eq!(json["failed_stage"], "transfer");
        assert_eq!(json["sensor_reading"], 7);
    }

    #[test]
    fn test_plain_failure_describes_error() {
        let err = HandshakeError::Transport {
            step: HandshakeStep::Challenge,
            stage: StepStage::ModeSwitch,
            source: TransportError::Closed,
            sensor_reading: None,
        };

        let line = HandshakeReport::from_result(&Err(err))
            .render(OutputFormat::Plain)
            .unwrap();

        assert!(line.starts_with("handshake failed: handshake step 1"));
    }
}
