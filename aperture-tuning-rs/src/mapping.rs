//! Compiled-in hardware layout: channel counts, the expander register map
//! and the table routing logical channels onto physical output devices.
//!
//! A preset row is ordered `[TX, RX1, RX2, ..., RXn]`, so row index `0` is
//! always the transmit channel and RX channel `n` lives at row `1 + n`.
//!
//! ```text
//! dev  bus  addr   slot A   slot B
//!  0    0   0x22   RX1      RX2
//!  1    0   0x23   ---      ---
//!  2    1   0x22   RX3      RX4
//!  3    1   0x23   RX5      RX6
//!  4    2   0x22   ---      ---
//!  5    2   0x23   ---      ---
//!  6    3   0x22   TX       ---
//! ```

// ---------------------------------------------------------------------------
// Channel counts
// ---------------------------------------------------------------------------

/// Number of receive channels per preset.
pub const NUM_CHANNELS_RX: usize = 6;

/// Number of transmit channels per preset.
pub const NUM_CHANNELS_TX: usize = 1;

/// Channels per preset row (TX first, then RX).
pub const NUM_CHANNELS: usize = NUM_CHANNELS_TX + NUM_CHANNELS_RX;

/// Capacity of the preset cache.
pub const MAX_PRESETS: usize = 16;

// ---------------------------------------------------------------------------
// Expander registers (24-bit, auto-increment bit set)
// ---------------------------------------------------------------------------

/// Output port register, 3 bytes starting at port 0.
pub const OUTPUT_REGISTER: u8 = 0x84;

/// Polarity inversion register, 3 bytes starting at port 0.
pub const INVERT_REGISTER: u8 = 0x88;

/// Direction register (`0` = output), 3 bytes starting at port 0.
pub const CONFIG_REGISTER: u8 = 0x8C;

/// Direction bytes written at init: every line is an output.
pub const CONFIG_ALL_OUTPUTS: [u8; 3] = [0x00, 0x00, 0x00];

/// Polarity bytes written at init: every line inverted.
pub const INVERT_ALL: [u8; 3] = [0xFF, 0xFF, 0xFF];

// ---------------------------------------------------------------------------
// Device table
// ---------------------------------------------------------------------------

/// Multiplexed bus carrying the RX expanders of channels 1–2 (and spare).
pub const RX_BUS_0: u8 = 0;
/// Multiplexed bus carrying the RX expanders of channels 3–6.
pub const RX_BUS_1: u8 = 1;
/// Multiplexed bus reserved for RX channels 7–12.
pub const RX_BUS_2: u8 = 2;
/// Multiplexed bus carrying the TX expander.
pub const TX_BUS: u8 = 3;

/// Expander address with the ADDR pin low.
pub const EXPANDER_ADDR_LOW: u8 = 0x22;
/// Expander address with the ADDR pin high.
pub const EXPANDER_ADDR_HIGH: u8 = 0x23;

/// What a 12-bit half of a device payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    /// Nothing wired; the half is always zero.
    Unused,
    /// The transmit channel (preset row 0).
    Tx,
    /// Receive channel `n` (0-based), preset row `1 + n`.
    Rx(u8),
}

impl Slot {
    /// Preset row feeding this slot, or `None` for an unused slot.
    pub const fn preset_row(self) -> Option<usize> {
        match self {
            Slot::Unused => None,
            Slot::Tx => Some(0),
            Slot::Rx(n) => Some(NUM_CHANNELS_TX + n as usize),
        }
    }
}

/// One physical output device and the channels it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceMapping {
    /// Mux channel the device sits behind.
    pub bus: u8,
    /// 7-bit I2C address on that bus.
    pub address: u8,
    /// Low 12 bits of the payload.
    pub slot_a: Slot,
    /// High 12 bits of the payload.
    pub slot_b: Slot,
}

impl DeviceMapping {
    const fn new(bus: u8, address: u8, slot_a: Slot, slot_b: Slot) -> Self {
        Self {
            bus,
            address,
            slot_a,
            slot_b,
        }
    }
}

/// Number of physical output devices.
pub const NUM_DEVICES: usize = 7;

/// Index of the transmit device in [`DEVICE_MAP`].
pub const TX_DEVICE_INDEX: usize = 6;

/// Physical output devices in apply order.
pub const DEVICE_MAP: [DeviceMapping; NUM_DEVICES] = [
    DeviceMapping::new(RX_BUS_0, EXPANDER_ADDR_LOW, Slot::Rx(0), Slot::Rx(1)),
    DeviceMapping::new(RX_BUS_0, EXPANDER_ADDR_HIGH, Slot::Unused, Slot::Unused),
    DeviceMapping::new(RX_BUS_1, EXPANDER_ADDR_LOW, Slot::Rx(2), Slot::Rx(3)),
    DeviceMapping::new(RX_BUS_1, EXPANDER_ADDR_HIGH, Slot::Rx(4), Slot::Rx(5)),
    DeviceMapping::new(RX_BUS_2, EXPANDER_ADDR_LOW, Slot::Unused, Slot::Unused),
    DeviceMapping::new(RX_BUS_2, EXPANDER_ADDR_HIGH, Slot::Unused, Slot::Unused),
    DeviceMapping::new(TX_BUS, EXPANDER_ADDR_LOW, Slot::Tx, Slot::Unused),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_device_index_points_at_tx_slot() {
        let tx = &DEVICE_MAP[TX_DEVICE_INDEX];
        assert_eq!(tx.slot_a, Slot::Tx);
        assert_eq!(tx.slot_b, Slot::Unused);
        assert_eq!(tx.bus, TX_BUS);
    }

    #[test]
    fn every_channel_is_routed_exactly_once() {
        let mut hits = [0usize; NUM_CHANNELS];
        for device in &DEVICE_MAP {
            for slot in [device.slot_a, device.slot_b] {
                if let Some(row) = slot.preset_row() {
                    hits[row] += 1;
                }
            }
        }
        assert_eq!(hits, [1; NUM_CHANNELS]);
    }

    #[test]
    fn preset_rows_stay_inside_a_preset() {
        for device in &DEVICE_MAP {
            for slot in [device.slot_a, device.slot_b] {
                if let Some(row) = slot.preset_row() {
                    assert!(row < NUM_CHANNELS);
                }
            }
        }
    }

    #[test]
    fn device_addresses_are_unique_per_bus() {
        for (i, a) in DEVICE_MAP.iter().enumerate() {
            for b in &DEVICE_MAP[i + 1..] {
                assert!(
                    !(a.bus == b.bus && a.address == b.address),
                    "duplicate device on bus {} at {:#04x}",
                    a.bus,
                    a.address
                );
            }
        }
    }

    #[test]
    fn slot_rows() {
        assert_eq!(Slot::Unused.preset_row(), None);
        assert_eq!(Slot::Tx.preset_row(), Some(0));
        assert_eq!(Slot::Rx(0).preset_row(), Some(1));
        assert_eq!(Slot::Rx(5).preset_row(), Some(6));
    }
}
