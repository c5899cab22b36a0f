//! HandshakeSequencer: runs the five-step challenge-response exchange.
//!
//! # The exchange (for beginners)
//!
//! Every step is a pair: first the master commits a mode to the slave's coils,
//! then it performs exactly one data transfer that the slave interprets
//! according to that mode.
//!
//! ```text
//! step  mode            transfer
//! ────  ──────────────  ───────────────────────────────────────
//!  1    SetChallenge    write 256 challenge words (in bursts)
//!  2    SetTimestamp    write 2 timestamp words
//!  3    SetHmac         write 32 master HMAC registers
//!  4    ReadSensorData  read 1 sensor register
//!  5    ReadHmac        read 32 slave HMAC registers
//! ```
//!
//! The first failure ends the run.  No further transport call is made and the
//! error names the step and the stage (mode switch or transfer) that failed.
//! If the sensor reading was already obtained, the error carries it.
//!
//! The sequencer hands back the slave's HMAC untouched.  Deciding whether the
//! slave is authentic is the caller's business.

use std::fmt;
use std::num::NonZeroU16;

use fieldauth_core::{
    Challenge, MasterHmac, Mode, ModeError, SensorReading, SlaveHmac, Timestamp, WordOrder,
    MAX_WRITE_REGISTERS,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::chunked_writer::ChunkedWriter;
use super::mode_controller::{ModeController, ModeSwitchError};
use super::phases;
use super::transport::{RegisterTransport, TransportError};

// ── Steps ─────────────────────────────────────────────────────────────────────

/// One (mode switch, transfer) pair of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeStep {
    Challenge,
    Timestamp,
    MasterHmac,
    SensorData,
    SlaveHmac,
}

impl HandshakeStep {
    /// All steps in execution order.
    pub const ALL: [HandshakeStep; 5] = [
        HandshakeStep::Challenge,
        HandshakeStep::Timestamp,
        HandshakeStep::MasterHmac,
        HandshakeStep::SensorData,
        HandshakeStep::SlaveHmac,
    ];

    /// 1-based position in the exchange.
    pub fn number(self) -> u8 {
        match self {
            HandshakeStep::Challenge => 1,
            HandshakeStep::Timestamp => 2,
            HandshakeStep::MasterHmac => 3,
            HandshakeStep::SensorData => 4,
            HandshakeStep::SlaveHmac => 5,
        }
    }

    /// The mode that must be committed before this step's transfer.
    pub fn mode(self) -> Mode {
        match self {
            HandshakeStep::Challenge => Mode::SetChallenge,
            HandshakeStep::Timestamp => Mode::SetTimestamp,
            HandshakeStep::MasterHmac => Mode::SetHmac,
            HandshakeStep::SensorData => Mode::ReadSensorData,
            HandshakeStep::SlaveHmac => Mode::ReadHmac,
        }
    }

    fn label(self) -> &'static str {
        match self {
            HandshakeStep::Challenge => "write challenge",
            HandshakeStep::Timestamp => "write timestamp",
            HandshakeStep::MasterHmac => "write master hmac",
            HandshakeStep::SensorData => "read sensor data",
            HandshakeStep::SlaveHmac => "read slave hmac",
        }
    }
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

/// Which half of a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStage {
    ModeSwitch,
    Transfer,
}

impl fmt::Display for StepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepStage::ModeSwitch => "mode switch",
            StepStage::Transfer => "transfer",
        })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why a handshake run was aborted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// A transport call failed.
    #[error("handshake step {step} failed during {stage}: {source}")]
    Transport {
        step: HandshakeStep,
        stage: StepStage,
        source: TransportError,
        /// Present when the failure happened after step 4 completed.
        sensor_reading: Option<SensorReading>,
    },

    /// The mode controller refused the transition.
    #[error("handshake step {step} refused: {source}")]
    Mode { step: HandshakeStep, source: ModeError },
}

impl HandshakeError {
    /// The step that failed.
    pub fn step(&self) -> HandshakeStep {
        match self {
            HandshakeError::Transport { step, .. } | HandshakeError::Mode { step, .. } => *step,
        }
    }

    /// The sensor reading obtained before the failure, if any.
    pub fn last_sensor_reading(&self) -> Option<SensorReading> {
        match self {
            HandshakeError::Transport { sensor_reading, .. } => *sensor_reading,
            HandshakeError::Mode { .. } => None,
        }
    }
}

// ── Settings and outcome ──────────────────────────────────────────────────────

/// Protocol knobs fixed for the lifetime of a sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeSettings {
    /// Registers per challenge burst.
    pub max_write: NonZeroU16,
    /// Register layout of the timestamp; the slave must use the same one.
    pub word_order: WordOrder,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            max_write: MAX_WRITE_REGISTERS,
            word_order: WordOrder::NATIVE,
        }
    }
}

/// Values retrieved by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOutcome {
    pub sensor_reading: SensorReading,
    pub slave_hmac: SlaveHmac,
}

// ── Sequencer ─────────────────────────────────────────────────────────────────

/// Drives the handshake over an exclusively owned transport.
pub struct HandshakeSequencer<T> {
    transport: T,
    writer: ChunkedWriter,
    word_order: WordOrder,
}

impl<T: RegisterTransport> HandshakeSequencer<T> {
    pub fn new(transport: T, settings: HandshakeSettings) -> Self {
        Self {
            transport,
            writer: ChunkedWriter::new(settings.max_write),
            word_order: settings.word_order,
        }
    }

    /// Borrows the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gives the transport back, typically so the caller can close it.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Runs all five steps in order.
    ///
    /// Each call starts from a fresh mode state, so a sequencer can be reused
    /// for another run on the same connection.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError`] for the first step that fails.
    pub async fn run(
        &mut self,
        challenge: &Challenge,
        timestamp: Timestamp,
        master_hmac: &MasterHmac,
    ) -> Result<HandshakeOutcome, HandshakeError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("handshake", %run_id);

        async {
            info!(%timestamp, "starting handshake");
            let result = self.run_steps(challenge, timestamp, master_hmac).await;
            match &result {
                Ok(outcome) => info!(
                    sensor_reading = %outcome.sensor_reading,
                    slave_hmac = %outcome.slave_hmac,
                    "handshake complete"
                ),
                Err(e) => error!(step = e.step().number(), error = %e, "handshake aborted"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_steps(
        &mut self,
        challenge: &Challenge,
        timestamp: Timestamp,
        master_hmac: &MasterHmac,
    ) -> Result<HandshakeOutcome, HandshakeError> {
        let mut modes = ModeController::new();

        let step = HandshakeStep::Challenge;
        self.enter(&mut modes, step, None).await?;
        phases::write_challenge(&mut self.transport, &self.writer, challenge)
            .await
            .map_err(|e| transfer_failed(step, e, None))?;
        info!(%step, "step complete");

        let step = HandshakeStep::Timestamp;
        self.enter(&mut modes, step, None).await?;
        phases::write_timestamp(&mut self.transport, timestamp, self.word_order)
            .await
            .map_err(|e| transfer_failed(step, e, None))?;
        info!(%step, "step complete");

        let step = HandshakeStep::MasterHmac;
        self.enter(&mut modes, step, None).await?;
        phases::write_master_hmac(&mut self.transport, master_hmac)
            .await
            .map_err(|e| transfer_failed(step, e, None))?;
        info!(%step, "step complete");

        let step = HandshakeStep::SensorData;
        self.enter(&mut modes, step, None).await?;
        let sensor_reading = phases::read_sensor(&mut self.transport)
            .await
            .map_err(|e| transfer_failed(step, e, None))?;
        info!(%step, %sensor_reading, "step complete");

        let step = HandshakeStep::SlaveHmac;
        self.enter(&mut modes, step, Some(sensor_reading)).await?;
        let slave_hmac = phases::read_slave_hmac(&mut self.transport)
            .await
            .map_err(|e| transfer_failed(step, e, Some(sensor_reading)))?;
        info!(%step, "step complete");

        Ok(HandshakeOutcome {
            sensor_reading,
            slave_hmac,
        })
    }

    /// Commits the mode for `step`.
    async fn enter(
        &mut self,
        modes: &mut ModeController,
        step: HandshakeStep,
        sensor_reading: Option<SensorReading>,
    ) -> Result<(), HandshakeError> {
        modes
            .set_mode(&mut self.transport, step.mode())
            .await
            .map_err(|e| match e {
                ModeSwitchError::Rejected(source) => HandshakeError::Mode { step, source },
                ModeSwitchError::Transport(source) => HandshakeError::Transport {
                    step,
                    stage: StepStage::ModeSwitch,
                    source,
                    sensor_reading,
                },
            })
    }
}

/// Runs one handshake and closes the transport whatever the outcome.
///
/// A failure to close is logged but does not change the result.  The
/// transport is handed back so callers can inspect it.
pub async fn run_and_close<T: RegisterTransport>(
    transport: T,
    settings: HandshakeSettings,
    challenge: &Challenge,
    timestamp: Timestamp,
    master_hmac: &MasterHmac,
) -> (T, Result<HandshakeOutcome, HandshakeError>) {
    let mut sequencer = HandshakeSequencer::new(transport, settings);
    let result = sequencer.run(challenge, timestamp, master_hmac).await;

    let mut transport = sequencer.into_transport();
    if let Err(e) = transport.close().await {
        warn!(error = %e, "failed to close transport");
    }
    (transport, result)
}

fn transfer_failed(
    step: HandshakeStep,
    source: TransportError,
    sensor_reading: Option<SensorReading>,
) -> HandshakeError {
    HandshakeError::Transport {
        step,
        stage: StepStage::Transfer,
        source,
        sensor_reading,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
