//! Addresses and protocol limits for the TCA9548A mux and the TCA6424A
//! expanders behind it.
//!
//! Expander register ids (output, polarity, configuration) live in
//! `aperture_tuning::mapping` next to the device table that uses them.

// ---------------------------------------------------------------------------
// TCA9548A bus multiplexer
// ---------------------------------------------------------------------------

/// Default I2C address of the mux (A2..A0 tied low).
pub const MUX_ADDRESS: u8 = 0x70;

/// Downstream channels on the mux. The control register holds one enable
/// bit per channel.
pub const MUX_CHANNELS: u8 = 8;

// ---------------------------------------------------------------------------
// Transaction limits
// ---------------------------------------------------------------------------

/// Largest register write payload, excluding the register byte.
pub const MAX_WRITE_LEN: usize = 15;

/// Extra attempts after a failed register write (3 attempts in total).
pub const WRITE_RETRIES: u8 = 2;
