//! Error types for the aperture tuning core.

use core::fmt;

/// Errors returned by the preset cache and the apply sequencer.
///
/// Every variant is a caller-side rejection: the call that returned it
/// performed no device I/O and left the cache exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuningError {
    /// Preset count is zero, above [`MAX_PRESETS`](crate::MAX_PRESETS), or
    /// larger than the preset matrix that was passed in.
    InvalidPresetCount,
    /// Preset index is not below the cached preset count.
    PresetIndexOutOfRange,
    /// No successful precompute has happened yet.
    NotReady,
    /// Cache lookup outside the cached bounds (or on an empty cache).
    NotFound,
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TuningError::InvalidPresetCount => write!(f, "Invalid preset count"),
            TuningError::PresetIndexOutOfRange => write!(f, "Preset index out of range"),
            TuningError::NotReady => write!(f, "Preset cache not ready"),
            TuningError::NotFound => write!(f, "Payload not found"),
        }
    }
}

/// Errors returned to the host side when posting into the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MailboxError {
    /// A request is still outstanding (status is `REQUEST_READY`).
    Busy,
    /// Payload does not fit the 512-byte mailbox buffer.
    PayloadTooLong,
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MailboxError::Busy => write!(f, "Mailbox busy"),
            MailboxError::PayloadTooLong => write!(f, "Mailbox payload too long"),
        }
    }
}

/// Why a cross-core notification was answered with the diagnostic probe
/// instead of being queued as a request.
///
/// Never returned as an error; only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RejectReason {
    /// Magic word does not match [`MAILBOX_MAGIC`](crate::MAILBOX_MAGIC).
    BadMagic,
    /// Status word was not `REQUEST_READY` when the doorbell rang.
    NotRequestReady,
    /// Valid request carrying the explicit probe command.
    ProbeCommand,
}
