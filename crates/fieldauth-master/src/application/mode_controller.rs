//! ModeController: commits the slave's operating mode before each data phase.
//!
//! The controller remembers the last mode it committed during the current run
//! and refuses any transition that is not the next one in
//! [`Mode::SEQUENCE`].  A rejected transition never reaches the transport.

use fieldauth_core::{Mode, ModeError, MODE_BIT_ADDRESS};
use thiserror::Error;
use tracing::debug;

use super::transport::{RegisterTransport, TransportError};

/// Why a mode could not be committed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModeSwitchError {
    /// The transition violates the handshake order.
    #[error(transparent)]
    Rejected(#[from] ModeError),

    /// The coil write failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Per-run mode state machine.
#[derive(Debug, Default)]
pub struct ModeController {
    current: Option<Mode>,
}

impl ModeController {
    /// A controller that has not committed any mode yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last mode successfully committed, if any.
    pub fn current(&self) -> Option<Mode> {
        self.current
    }

    /// Writes the 4-bit pattern for `mode` to coils 0..4.
    ///
    /// # Errors
    ///
    /// Returns [`ModeSwitchError::Rejected`] when `mode` does not follow the
    /// current mode, and [`ModeSwitchError::Transport`] when the coil write
    /// fails.  In both cases the current mode is unchanged.
    pub async fn set_mode<T>(&mut self, transport: &mut T, mode: Mode) -> Result<(), ModeSwitchError>
    where
        T: RegisterTransport + ?Sized,
    {
        Mode::check_transition(self.current, mode)?;

        let bits = mode.bits();
        debug!(%mode, code = mode.code(), "committing slave mode");
        transport.write_bits(MODE_BIT_ADDRESS, &bits).await?;

        self.current = Some(mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::transport::MockRegisterTransport;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_set_mode_writes_four_bits_at_address_zero() {
        // Arrange
        let mut mock = MockRegisterTransport::new();
        mock.expect_write_bits()
            .withf(|addr, bits| *addr == 0 && bits == [false, false, false, false])
            .times(1)
            .returning(|_, _| Ok(()));
        let mut controller = ModeController::new();

        // Act
        controller.set_mode(&mut mock, Mode::SetChallenge).await.unwrap();

        // Assert
        assert_eq!(controller.current(), Some(Mode::SetChallenge));
    }

    #[tokio::test]
    async fn test_full_sequence_writes_expected_patterns() {
        // Arrange
        let mut mock = MockRegisterTransport::new();
        let mut seq = mockall::Sequence::new();
        for mode in Mode::SEQUENCE {
            let expected = mode.bits();
            mock.expect_write_bits()
                .withf(move |addr, bits| *addr == 0 && bits == expected)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }
        let mut controller = ModeController::new();

        // Act / Assert
        for mode in Mode::SEQUENCE {
            controller.set_mode(&mut mock, mode).await.unwrap();
        }
        assert_eq!(controller.current(), Some(Mode::ReadHmac));
    }

    #[tokio::test]
    async fn test_out_of_order_mode_is_rejected_without_transport_call() {
        // Arrange – no expectation: any write_bits call would panic
        let mut mock = MockRegisterTransport::new();
        let mut controller = ModeController::new();

        // Act
        let result = controller.set_mode(&mut mock, Mode::SetTimestamp).await;

        // Assert
        assert_eq!(
            result,
            Err(ModeSwitchError::Rejected(ModeError::OutOfOrder {
                current: None,
                requested: Mode::SetTimestamp,
            }))
        );
        assert_eq!(controller.current(), None);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_current_mode_unchanged() {
        // Arrange
        let mut mock = MockRegisterTransport::new();
        mock.expect_write_bits()
            .with(eq(0), mockall::predicate::always())
            .times(1)
            .returning(|_, _| {
                Err(TransportError::Timeout {
                    operation: "write_bits",
                    after: std::time::Duration::from_millis(500),
                })
            });
        let mut controller = ModeController::new();

        // Act
        let result = controller.set_mode(&mut mock, Mode::SetChallenge).await;

        // Assert
        assert!(matches!(result, Err(ModeSwitchError::Transport(_))));
        assert_eq!(controller.current(), None);
    }
}
