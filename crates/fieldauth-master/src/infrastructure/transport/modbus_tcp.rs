//! Modbus TCP implementation of [`RegisterTransport`].
//!
//! Wraps a `tokio-modbus` client context.  Every request is bounded by the
//! response timeout chosen at connection time, and request sizes are checked
//! against the Modbus PDU limits before anything is put on the wire.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use fieldauth_core::{MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::{Client, Reader, Slave, Writer};
use tokio_modbus::{Error as ModbusError, ExceptionCode};
use tracing::{debug, info, trace};

use crate::application::transport::{RegisterTransport, TransportError};

/// Coils per "write multiple coils" request allowed by the Modbus PDU.
const MAX_WRITE_COILS: u16 = 1968;

/// Connection parameters fixed for the lifetime of a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub addr: SocketAddr,
    pub unit_id: u8,
    pub response_timeout: Duration,
}

/// A connected Modbus TCP master.
pub struct ModbusTcpTransport {
    ctx: Option<Context>,
    settings: TransportSettings,
}

impl ModbusTcpTransport {
    /// Opens the TCP connection and selects the slave unit.
    ///
    /// The connection attempt itself is also bounded by the response timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the socket cannot be opened in
    /// time.
    pub async fn connect(settings: &TransportSettings) -> Result<Self, TransportError> {
        let connect = tcp::connect_slave(settings.addr, Slave(settings.unit_id));
        let ctx = match tokio::time::timeout(settings.response_timeout, connect).await {
            Ok(Ok(ctx)) => ctx,
            Ok(Err(e)) => {
                return Err(TransportError::Connect {
                    addr: settings.addr.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(TransportError::Connect {
                    addr: settings.addr.to_string(),
                    reason: format!("no answer within {:?}", settings.response_timeout),
                })
            }
        };

        info!(
            addr = %settings.addr,
            unit_id = settings.unit_id,
            timeout_ms = settings.response_timeout.as_millis() as u64,
            "connected to slave"
        );
        Ok(Self {
            ctx: Some(ctx),
            settings: settings.clone(),
        })
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    fn context(&mut self) -> Result<&mut Context, TransportError> {
        self.ctx.as_mut().ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl RegisterTransport for ModbusTcpTransport {
    async fn write_bits(&mut self, addr: u16, bits: &[bool]) -> Result<(), TransportError> {
        check_limit("write_bits", bits.len(), MAX_WRITE_COILS)?;
        trace!(addr, ?bits, "write_multiple_coils");
        let timeout = self.settings.response_timeout;
        let ctx = self.context()?;
        exchange("write_bits", timeout, ctx.write_multiple_coils(addr, bits)).await
    }

    async fn write_registers(&mut self, addr: u16, values: &[u16]) -> Result<(), TransportError> {
        check_limit("write_registers", values.len(), MAX_WRITE_REGISTERS.get())?;
        trace!(addr, count = values.len(), "write_multiple_registers");
        let timeout = self.settings.response_timeout;
        let ctx = self.context()?;
        exchange(
            "write_registers",
            timeout,
            ctx.write_multiple_registers(addr, values),
        )
        .await
    }

    async fn read_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        check_limit("read_registers", usize::from(count), MAX_READ_REGISTERS.get())?;
        trace!(addr, count, "read_holding_registers");
        let timeout = self.settings.response_timeout;
        let ctx = self.context()?;
        let values = exchange(
            "read_registers",
            timeout,
            ctx.read_holding_registers(addr, count),
        )
        .await?;
        if values.len() != usize::from(count) {
            return Err(TransportError::IncompleteTransfer {
                operation: "read_registers",
                expected: usize::from(count),
                actual: values.len(),
            });
        }
        Ok(values)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(mut ctx) = self.ctx.take() else {
            return Ok(());
        };
        debug!(addr = %self.settings.addr, "closing connection");
        ctx.disconnect()
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Io {
                operation: "close",
                reason: e.to_string(),
            })
    }
}

fn check_limit(operation: &'static str, requested: usize, limit: u16) -> Result<(), TransportError> {
    if requested > usize::from(limit) {
        return Err(TransportError::RequestTooLarge {
            operation,
            requested,
            limit,
        });
    }
    Ok(())
}

/// Awaits one Modbus request under `timeout` and flattens its nested result.
async fn exchange<T, F>(
    operation: &'static str,
    timeout: Duration,
    request: F,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<Result<T, ExceptionCode>, ModbusError>>,
{
    match tokio::time::timeout(timeout, request).await {
        Err(_) => Err(TransportError::Timeout {
            operation,
            after: timeout,
        }),
        Ok(Err(e)) => Err(TransportError::Io {
            operation,
            reason: e.to_string(),
        }),
        Ok(Ok(Err(code))) => Err(TransportError::Exception {
            operation,
            exception: format!("{code:?}"),
        }),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}
