//! Bit-exact encoding of one channel's tuning state.
//!
//! Each channel is packed into a 12-bit word that is shifted into the
//! tuning board's shift register:
//!
//! ```text
//!  11   10 ........ 4   3 ..... 0
//! [det][ tuning (rev) ][ matching ]
//! ```
//!
//! The 7 tuning bits are stored **reversed** (bit `i` ↔ bit `6 - i`) to
//! match the load order of the downstream shift register.

/// Bit offset of the matching field.
pub const MATCHING_OFFSET: u16 = 0;
/// Bit offset of the (reversed) tuning field.
pub const TUNING_OFFSET: u16 = 4;
/// Bit offset of the detune enable flag.
pub const DETUNE_ENABLE_OFFSET: u16 = 11;

/// Width of the matching field in bits.
pub const MATCHING_BITS: u32 = 4;
/// Width of the tuning field in bits.
pub const TUNING_BITS: u32 = 7;

const MATCHING_MASK: u16 = (1 << MATCHING_BITS) - 1;
const TUNING_MASK: u16 = (1 << TUNING_BITS) - 1;

/// Mask of a full encoded channel word.
pub const CHANNEL_WORD_MASK: u16 = 0x0FFF;

/// Tuning state of one logical channel.
///
/// Fields are stored as received. Out-of-range values are truncated to
/// their bit width by [`encode`], never rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Tuning capacitor code, 0..=127.
    pub tuning: u8,
    /// Matching network code, 0..=15.
    pub matching: u8,
    /// Detune switch.
    pub detune_enable: bool,
}

impl ChannelConfig {
    /// All-zero configuration (tuning 0, matching 0, detune off).
    pub const ZERO: Self = Self {
        tuning: 0,
        matching: 0,
        detune_enable: false,
    };

    pub const fn new(tuning: u8, matching: u8, detune_enable: bool) -> Self {
        Self {
            tuning,
            matching,
            detune_enable,
        }
    }

    /// Build a configuration from one 3-byte bulk-update group
    /// `{tuning, matching, detune_flag}`.
    ///
    /// Only the low bit of `detune_flag` is significant.
    pub const fn from_group(group: [u8; 3]) -> Self {
        Self {
            tuning: group[0],
            matching: group[1],
            detune_enable: group[2] & 0x01 != 0,
        }
    }
}

/// Reverse the low `bits` bits of `value` (LSB ↔ MSB).
const fn reverse_bits(value: u16, bits: u32) -> u16 {
    (value.reverse_bits() >> (u16::BITS - bits)) & ((1 << bits) - 1)
}

/// Encode a channel configuration into its 12-bit word.
///
/// # Examples
///
/// ```
/// use aperture_tuning::{decode, encode, ChannelConfig};
///
/// // tuning 0b000_0001 is reversed into 0b100_0000
/// let word = encode(&ChannelConfig::new(1, 0, false));
/// assert_eq!(word, 0b0_1000000_0000);
///
/// let cfg = ChannelConfig::new(5, 2, true);
/// assert_eq!(decode(encode(&cfg)), cfg);
/// ```
pub const fn encode(cfg: &ChannelConfig) -> u16 {
    let tuning = cfg.tuning as u16 & TUNING_MASK;
    let matching = cfg.matching as u16 & MATCHING_MASK;
    let detune = cfg.detune_enable as u16;

    let word = (matching << MATCHING_OFFSET)
        | (reverse_bits(tuning, TUNING_BITS) << TUNING_OFFSET)
        | (detune << DETUNE_ENABLE_OFFSET);
    word & CHANNEL_WORD_MASK
}

/// Decode a 12-bit word back into a channel configuration.
///
/// Bits above bit 11 are ignored.
pub const fn decode(word: u16) -> ChannelConfig {
    let matching = (word >> MATCHING_OFFSET) & MATCHING_MASK;
    let reversed_tuning = (word >> TUNING_OFFSET) & TUNING_MASK;
    let detune = (word >> DETUNE_ENABLE_OFFSET) & 0x1;

    ChannelConfig {
        tuning: reverse_bits(reversed_tuning, TUNING_BITS) as u8,
        matching: matching as u8,
        detune_enable: detune != 0,
    }
}
