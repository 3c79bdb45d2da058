//! Aperture tuning core for a phased-array transmit/receive front end.
//!
//! Every channel of the array (one transmit, six receive) has a tuning and
//! a matching setting plus a detune switch, driven through 24-bit I2C
//! output expanders behind a bus multiplexer. This crate holds everything
//! that does not depend on the board:
//!
//! - **[`codec`]**: packs a [`ChannelConfig`] into a 12-bit channel word.
//! - **[`mapping`]**: the compiled-in device table (which expander on which
//!   sub-bus drives which channels).
//! - **[`cache`]**: precomputes the 3-byte device payloads of every preset.
//! - **[`sequencer`]**: writes a cached preset to the devices, skipping the
//!   ones that fail.
//! - **[`mailbox`]** and **[`command`]**: the shared-memory request channel
//!   from the host core, including the diagnostic probe fallback.
//! - **[`events`]** and **[`control`]**: interrupt-raised flags and the
//!   cooperative loop that acts on them.
//!
//! Bus access goes through the [`DeviceBus`] trait so the board crate can
//! plug in the real mux/expander driver.
//!
//! # Quick start
//!
//! ```
//! use aperture_tuning::{encode, ChannelConfig, PresetCache, NUM_CHANNELS, TX_DEVICE_INDEX};
//!
//! let mut presets = [[ChannelConfig::ZERO; NUM_CHANNELS]; 4];
//! presets[2][0] = ChannelConfig::new(40, 7, true);
//!
//! let mut cache = PresetCache::new();
//! cache.precompute(&presets, 4).unwrap();
//!
//! let tx = cache.get(2, TX_DEVICE_INDEX).unwrap();
//! assert_eq!(tx.channel_a(), encode(&presets[2][0]));
//! ```
//!
//! # Features
//!
//! - **`defmt`**: log through [`defmt`](https://docs.rs/defmt) and derive
//!   `defmt::Format` on the public types.

#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod cache;
pub mod codec;
pub mod command;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod mailbox;
pub mod mapping;
pub mod sequencer;

#[cfg(test)]
mod test_support;

pub use bus::DeviceBus;
pub use cache::{DevicePayload, Preset, PresetCache};
pub use codec::{decode, encode, ChannelConfig};
pub use command::{on_notification, send_request, Command, Doorbell, Notification};
pub use config::{ControllerConfig, TestSequenceConfig};
pub use control::{Controller, ScanProgress};
pub use error::{MailboxError, RejectReason, TuningError};
pub use events::ControlEvents;
pub use mailbox::{Mailbox, MailboxStatus, Request, MAILBOX_MAGIC, MAILBOX_PAYLOAD_SIZE};
pub use mapping::{DEVICE_MAP, MAX_PRESETS, NUM_CHANNELS, NUM_DEVICES, TX_DEVICE_INDEX};
pub use sequencer::{apply, init_devices, ApplyReport};
