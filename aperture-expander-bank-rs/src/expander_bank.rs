//! High-level interface for the multiplexed expander bank.
//!
//! [`ExpanderBank`] wraps the register driver with mux channel validation
//! and implements the tuning core's [`DeviceBus`] so the apply sequencer
//! and the probe handler can drive real hardware.

use embedded_hal_async::i2c::I2c;

use aperture_tuning::mapping::OUTPUT_REGISTER;
use aperture_tuning::DeviceBus;

use crate::driver::RegisterDriver;
use crate::error::BusError;
use crate::registers::{MUX_ADDRESS, MUX_CHANNELS};

/// A TCA9548A mux and the TCA6424A expanders on its downstream channels.
///
/// # Example
///
/// ```no_run
/// use expander_driver::{BusError, ExpanderBank};
/// # async fn example<I: embedded_hal_async::i2c::I2c>(i2c: I) -> Result<(), BusError<I::Error>> {
///
/// // `i2c` is any `embedded-hal-async` I2C implementation
/// let mut bank = ExpanderBank::new(i2c);
///
/// // Route the bus to channel 1, then drive the expander at 0x22
/// bank.select(1).await?;
/// bank.write_outputs(0x22, &[0x12, 0x34, 0x05]).await?;
/// # Ok(())
/// # }
/// ```
pub struct ExpanderBank<I2C> {
    driver: RegisterDriver<I2C>,
    mux_address: u8,
}

impl<I2C> ExpanderBank<I2C>
where
    I2C: I2c,
{
    /// Create a bank behind a mux at the default address (0x70).
    pub fn new(i2c: I2C) -> Self {
        Self::with_mux_address(i2c, MUX_ADDRESS)
    }

    pub fn with_mux_address(i2c: I2C, mux_address: u8) -> Self {
        Self {
            driver: RegisterDriver::new(i2c),
            mux_address,
        }
    }

    /// Give the I2C peripheral back.
    pub fn release(self) -> I2C {
        self.driver.release()
    }

    // -----------------------------------------------------------------------
    // Mux
    // -----------------------------------------------------------------------

    /// Route the shared bus to mux channel `channel` only.
    ///
    /// # Errors
    /// * [`BusError::InvalidBus`] if `channel >= 8` (nothing is sent)
    /// * [`BusError::I2c`] on communication failure
    pub async fn select(&mut self, channel: u8) -> Result<(), BusError<I2C::Error>> {
        if channel >= MUX_CHANNELS {
            return Err(BusError::InvalidBus);
        }
        self.driver.write_byte(self.mux_address, 1 << channel).await
    }

    /// Read the mux control register (one enable bit per channel).
    pub async fn read_mux(&mut self) -> Result<u8, BusError<I2C::Error>> {
        self.driver.read_byte(self.mux_address).await
    }

    // -----------------------------------------------------------------------
    // Expanders
    // -----------------------------------------------------------------------

    /// Write all 24 output lines of the expander at `address` on the
    /// currently selected channel.
    pub async fn write_outputs(
        &mut self,
        address: u8,
        payload: &[u8; 3],
    ) -> Result<(), BusError<I2C::Error>> {
        self.driver.write_register(address, OUTPUT_REGISTER, payload).await
    }
}

impl<I2C> DeviceBus for ExpanderBank<I2C>
where
    I2C: I2c,
{
    type Error = BusError<I2C::Error>;

    async fn select_bus(&mut self, bus: u8) -> Result<(), Self::Error> {
        self.select(bus).await
    }

    async fn write_register(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        self.driver.write_register(address, register, data).await
    }

    async fn read_register16(&mut self, address: u8, register: u8) -> Result<u16, Self::Error> {
        self.driver.read_u16_be(address, register).await
    }

    async fn read_mux(&mut self) -> Result<u8, Self::Error> {
        ExpanderBank::read_mux(self).await
    }
}
