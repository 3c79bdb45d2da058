//! Precomputed device payloads for every preset.
//!
//! [`PresetCache`] is a fixed-capacity arena indexed by `(preset, device)`.
//! Rebuilding it is the slow, infrequent path (a bulk config update);
//! reading it is the fast path used on every preset switch, so apply never
//! has to encode anything.

use crate::codec::{encode, ChannelConfig, CHANNEL_WORD_MASK};
use crate::error::TuningError;
use crate::mapping::{Slot, DEVICE_MAP, MAX_PRESETS, NUM_CHANNELS, NUM_DEVICES};

/// One preset row: `[TX, RX1, ..., RXn]`.
pub type Preset = [ChannelConfig; NUM_CHANNELS];

/// Packed 3-byte output register contents for one device.
///
/// Byte order is little-endian over the 24-bit word
/// `(channel_b << 12) | channel_a`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DevicePayload(pub [u8; 3]);

impl DevicePayload {
    /// Assemble a payload from two encoded channel words.
    pub const fn from_channels(channel_a: u16, channel_b: u16) -> Self {
        let word = ((channel_b as u32 & CHANNEL_WORD_MASK as u32) << 12)
            | (channel_a as u32 & CHANNEL_WORD_MASK as u32);
        Self([word as u8, (word >> 8) as u8, (word >> 16) as u8])
    }

    /// The packed 24-bit word.
    pub const fn word(&self) -> u32 {
        self.0[0] as u32 | (self.0[1] as u32) << 8 | (self.0[2] as u32) << 16
    }

    /// Encoded word in the low 12 bits (slot A).
    pub const fn channel_a(&self) -> u16 {
        (self.word() & CHANNEL_WORD_MASK as u32) as u16
    }

    /// Encoded word in the high 12 bits (slot B).
    pub const fn channel_b(&self) -> u16 {
        (self.word() >> 12) as u16 & CHANNEL_WORD_MASK
    }

    pub const fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

/// Encoded word for one slot of a preset; unused slots encode to 0.
fn slot_word(preset: &Preset, slot: Slot) -> u16 {
    match slot.preset_row() {
        Some(row) => encode(&preset[row]),
        None => 0,
    }
}

/// Fixed-capacity cache of device payloads.
///
/// Starts empty. [`precompute`](Self::precompute) either rebuilds every
/// payload for the requested preset count or, on a rejected count, leaves
/// the previous contents readable.
pub struct PresetCache {
    payloads: [[DevicePayload; NUM_DEVICES]; MAX_PRESETS],
    /// Number of valid presets; 0 while the cache is empty.
    preset_count: usize,
}

impl Default for PresetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetCache {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self {
            payloads: [[DevicePayload([0; 3]); NUM_DEVICES]; MAX_PRESETS],
            preset_count: 0,
        }
    }

    /// Rebuild the cache from the first `preset_count` rows of `presets`.
    ///
    /// The count is validated before anything is written, so a rejected
    /// call never disturbs the payloads of a previous successful call.
    ///
    /// # Errors
    /// * [`TuningError::InvalidPresetCount`] if `preset_count` is 0, above
    ///   [`MAX_PRESETS`], or larger than `presets.len()`
    ///
    /// # Examples
    ///
    /// ```
    /// use aperture_tuning::{encode, ChannelConfig, PresetCache, NUM_CHANNELS, TX_DEVICE_INDEX};
    ///
    /// let mut presets = [[ChannelConfig::ZERO; NUM_CHANNELS]; 2];
    /// presets[0][0] = ChannelConfig::new(5, 2, false);
    ///
    /// let mut cache = PresetCache::new();
    /// cache.precompute(&presets, 2).unwrap();
    ///
    /// let payload = cache.get(0, TX_DEVICE_INDEX).unwrap();
    /// assert_eq!(payload.channel_a(), encode(&presets[0][0]));
    /// assert_eq!(payload.channel_b(), 0);
    /// ```
    pub fn precompute(
        &mut self,
        presets: &[Preset],
        preset_count: usize,
    ) -> Result<(), TuningError> {
        if preset_count == 0 || preset_count > MAX_PRESETS || preset_count > presets.len() {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "precompute rejected: count={} (max {}, matrix rows {})",
                preset_count,
                MAX_PRESETS,
                presets.len()
            );
            return Err(TuningError::InvalidPresetCount);
        }

        for (preset, row) in presets[..preset_count].iter().zip(self.payloads.iter_mut()) {
            for (device, payload) in DEVICE_MAP.iter().zip(row.iter_mut()) {
                *payload = DevicePayload::from_channels(
                    slot_word(preset, device.slot_a),
                    slot_word(preset, device.slot_b),
                );
            }
        }
        self.preset_count = preset_count;

        #[cfg(feature = "defmt")]
        defmt::debug!("precomputed {} presets x {} devices", preset_count, NUM_DEVICES);

        Ok(())
    }

    /// Look up the payload for one device of one preset.
    ///
    /// # Errors
    /// * [`TuningError::NotFound`] if the cache is empty or either index is
    ///   out of the cached bounds
    pub fn get(
        &self,
        preset_index: usize,
        device_index: usize,
    ) -> Result<DevicePayload, TuningError> {
        if preset_index >= self.preset_count || device_index >= NUM_DEVICES {
            return Err(TuningError::NotFound);
        }
        Ok(self.payloads[preset_index][device_index])
    }

    /// All device payloads of one preset, in [`DEVICE_MAP`] order.
    pub fn preset(
        &self,
        preset_index: usize,
    ) -> Result<&[DevicePayload; NUM_DEVICES], TuningError> {
        if self.is_empty() {
            return Err(TuningError::NotReady);
        }
        self.payloads[..self.preset_count]
            .get(preset_index)
            .ok_or(TuningError::PresetIndexOutOfRange)
    }

    /// Number of presets currently cached.
    pub fn preset_count(&self) -> usize {
        self.preset_count
    }

    /// Returns `true` until the first successful precompute.
    pub fn is_empty(&self) -> bool {
        self.preset_count == 0
    }
}
