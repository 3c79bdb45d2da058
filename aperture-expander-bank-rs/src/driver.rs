//! Low-level register transport.
//!
//! Implements the I2C framing shared by the mux and the expanders: a
//! register write is a single `[register, data...]` transaction, retried a
//! bounded number of times; a register read is a write of the register
//! byte followed by a repeated-start read.
//!
//! This module is crate-private. Consumers interact with [`ExpanderBank`]
//! in `expander_bank.rs` instead.
//!
//! [`ExpanderBank`]: crate::ExpanderBank

use embedded_hal_async::i2c::I2c;

use crate::error::BusError;
use crate::registers::{MAX_WRITE_LEN, WRITE_RETRIES};

/// Owns the I2C peripheral and provides the register primitives.
pub(crate) struct RegisterDriver<I2C> {
    i2c: I2C,
}

impl<I2C> RegisterDriver<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    // -----------------------------------------------------------------------
    // Single-byte devices (mux control register)
    // -----------------------------------------------------------------------

    pub async fn write_byte(&mut self, address: u8, value: u8) -> Result<(), BusError<I2C::Error>> {
        self.i2c.write(address, &[value]).await?;
        Ok(())
    }

    pub async fn read_byte(&mut self, address: u8) -> Result<u8, BusError<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.i2c.read(address, &mut buf).await?;
        Ok(buf[0])
    }

    // -----------------------------------------------------------------------
    // Register access
    // -----------------------------------------------------------------------

    /// Write `data` starting at `register`.
    ///
    /// The whole frame is resent up to [`WRITE_RETRIES`] more times if the
    /// transaction fails; the last I2C error is returned.
    pub async fn write_register(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), BusError<I2C::Error>> {
        if data.len() > MAX_WRITE_LEN {
            return Err(BusError::PayloadTooLong);
        }

        // Full write buffer: [register, d0, d1, ...]
        let mut buf = [0u8; MAX_WRITE_LEN + 1];
        buf[0] = register;
        buf[1..=data.len()].copy_from_slice(data);
        let frame = &buf[..=data.len()];

        let mut attempt = 0;
        loop {
            match self.i2c.write(address, frame).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt == WRITE_RETRIES => return Err(BusError::I2c(e)),
                Err(_) => {
                    attempt += 1;
                    #[cfg(feature = "defmt")]
                    defmt::debug!(
                        "write {=u8:#x}/{=u8:#x} failed, retry {}/{}",
                        address,
                        register,
                        attempt,
                        WRITE_RETRIES
                    );
                }
            }
        }
    }

    /// Read a 16-bit register transmitted MSB first.
    pub async fn read_u16_be(
        &mut self,
        address: u8,
        register: u8,
    ) -> Result<u16, BusError<I2C::Error>> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(address, &[register], &mut buf).await?;
        Ok(u16::from_be_bytes(buf))
    }
}
