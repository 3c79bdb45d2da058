//! Collaborator interface to the multiplexed device bus.
//!
//! The core never talks to I2C directly. Everything it needs from the bus
//! goes through [`DeviceBus`], which the board crate implements on top of
//! the real mux and expander driver (and the tests implement with a
//! recording mock).

use core::fmt::Debug;

/// Multiplexed register bus used by the apply sequencer and diagnostics.
///
/// Implementations own any transaction-level retry; callers treat every
/// `Err` as final for that operation.
#[allow(async_fn_in_trait)]
pub trait DeviceBus {
    /// Bus-level failure.
    type Error: Debug;

    /// Route the shared bus to mux channel `bus`.
    async fn select_bus(&mut self, bus: u8) -> Result<(), Self::Error>;

    /// Write `data` starting at `register` of the device at `address`.
    async fn write_register(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Read a big-endian 16-bit register.
    async fn read_register16(&mut self, address: u8, register: u8) -> Result<u16, Self::Error>;

    /// Read back the mux control byte (one bit per enabled channel).
    async fn read_mux(&mut self) -> Result<u8, Self::Error>;
}
