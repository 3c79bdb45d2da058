//! Async driver for a multiplexed bank of 24-bit output expanders.
//!
//! The aperture tuning board hangs its TCA6424A output expanders off the
//! downstream channels of a TCA9548A I2C multiplexer. This crate drives
//! both and plugs into the tuning core as its `DeviceBus`.
//!
//! # Architecture
//!
//! - **`driver`** (crate-private): register framing, the bounded write
//!   retry, and big-endian 16-bit reads.
//! - **[`ExpanderBank`]** (public): mux channel selection plus the
//!   [`aperture_tuning::DeviceBus`] implementation.
//!
//! # Quick start
//!
//! ```no_run
//! use expander_driver::ExpanderBank;
//! # async fn example<I: embedded_hal_async::i2c::I2c>(i2c: I) {
//!
//! // Construct with any `embedded-hal-async` I2C implementation
//! let mut bank = ExpanderBank::new(i2c);
//!
//! // Configure every expander listed in the device table
//! let report = aperture_tuning::init_devices(&mut bank).await;
//! # let _ = report;
//! # }
//! ```
//!
//! # Features
//!
//! - **`defmt`**: enable [`defmt::Format`] on [`BusError`] and log retries.

#![cfg_attr(not(test), no_std)]

pub use error::BusError;
pub use expander_bank::ExpanderBank;
pub use registers::{MAX_WRITE_LEN, MUX_ADDRESS, MUX_CHANNELS, WRITE_RETRIES};

mod driver;
mod error;
mod expander_bank;
mod registers;
