//! Error types for the expander bank driver.

use core::fmt;

/// Errors that can occur when talking to the mux or the expanders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError<E> {
    /// Underlying I2C bus error (after any retries).
    I2c(E),

    /// Mux channel out of range (must be 0-7).
    InvalidBus,

    /// Register write longer than the transmit buffer allows.
    PayloadTooLong,
}

// Allow ergonomic `?` propagation from raw I2C errors.
impl<E> From<E> for BusError<E> {
    fn from(error: E) -> Self {
        BusError::I2c(error)
    }
}

impl<E: fmt::Debug> fmt::Display for BusError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BusError::I2c(e) => write!(f, "I2C error: {:?}", e),
            BusError::InvalidBus => write!(f, "Invalid mux channel (must be 0-7)"),
            BusError::PayloadTooLong => write!(f, "Register write too long (max 15 bytes)"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for BusError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            BusError::I2c(e) => defmt::write!(f, "I2C error: {}", e),
            BusError::InvalidBus => defmt::write!(f, "Invalid mux channel"),
            BusError::PayloadTooLong => defmt::write!(f, "Register write too long"),
        }
    }
}
