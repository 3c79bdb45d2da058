//! Cross-core command channel: validation and hand-off of mailbox
//! requests, plus the diagnostic probe fallback.
//!
//! The host posts a request into the [`Mailbox`] and rings the controller's
//! doorbell. [`on_notification`] runs in the doorbell handler:
//!
//! 1. A frame with the right magic word in `REQUEST_READY` is copied into
//!    private storage, acknowledged with `RESPONSE_READY`, the host's
//!    doorbell is rung, and the copy is queued for the control loop.
//! 2. Anything else (bad magic, wrong status, or the explicit probe
//!    command) is answered with a 3-byte mux status response instead.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

use crate::bus::DeviceBus;
use crate::error::{MailboxError, RejectReason};
use crate::events::ControlEvents;
use crate::mailbox::{Mailbox, MailboxStatus, Request, MAILBOX_MAGIC};

/// Diagnostic probe: answered in the handler with the mux status.
pub const CMD_PROBE: u32 = 1;
/// Bulk config update: `{tuning, matching, detune}` groups, preset-major.
pub const CMD_BULK_CONFIG: u32 = 2;
/// Select a preset and fire the trigger pulse.
pub const CMD_PRESET_SELECT: u32 = 3;
/// Start the synthetic scan test sequence.
pub const CMD_TEST_SEQUENCE_START: u32 = 4;

/// Second byte of every probe response (the mux's bus address).
pub const PROBE_MUX_TAG: u8 = 0x70;

/// Size in bytes of one bulk-update group.
pub const BULK_GROUP_SIZE: usize = 3;

/// Latched notification towards the peer core.
pub trait Doorbell {
    fn ring(&self);

    /// Drop a ring nobody waited for.
    fn clear(&self);
}

impl<M: RawMutex> Doorbell for Signal<M, ()> {
    fn ring(&self) {
        self.signal(());
    }

    fn clear(&self) {
        self.reset();
    }
}

/// A decoded request, borrowing its payload from the [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// Raw bulk payload; use [`bulk_groups`] to iterate it.
    BulkConfig(&'a [u8]),
    PresetSelect(u8),
    StartTestSequence,
    /// Preset select without the index byte.
    MalformedPresetSelect,
    Unknown(u32),
}

impl<'a> Command<'a> {
    pub fn parse(request: &'a Request) -> Self {
        match request.command {
            CMD_BULK_CONFIG => Command::BulkConfig(&request.payload),
            CMD_PRESET_SELECT => match request.payload.first() {
                Some(&preset) => Command::PresetSelect(preset),
                None => Command::MalformedPresetSelect,
            },
            CMD_TEST_SEQUENCE_START => Command::StartTestSequence,
            other => Command::Unknown(other),
        }
    }
}

/// Complete 3-byte groups of a bulk payload; a trailing partial group is
/// ignored.
pub fn bulk_groups(payload: &[u8]) -> impl Iterator<Item = [u8; BULK_GROUP_SIZE]> + '_ {
    payload
        .chunks_exact(BULK_GROUP_SIZE)
        .map(|group| [group[0], group[1], group[2]])
}

/// What the notification handler did with the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// Request copied and queued for the loop.
    Queued { command: u32 },
    /// Frame answered with the mux probe response.
    Probed(RejectReason),
}

fn classify(mailbox: &Mailbox) -> Result<(), RejectReason> {
    let header = mailbox.header();
    if header.magic != MAILBOX_MAGIC {
        return Err(RejectReason::BadMagic);
    }
    if MailboxStatus::from_raw(header.status) != Some(MailboxStatus::RequestReady) {
        return Err(RejectReason::NotRequestReady);
    }
    if header.command == CMD_PROBE {
        return Err(RejectReason::ProbeCommand);
    }
    Ok(())
}

/// Answer the frame with `[status, PROBE_MUX_TAG, mux]`.
///
/// `status` is 0 when the mux read succeeded, 1 otherwise (with a zero mux
/// byte).
async fn respond_with_probe<B: DeviceBus>(mailbox: &Mailbox, bus: &mut B) {
    let response = match bus.read_mux().await {
        Ok(mux) => [0, PROBE_MUX_TAG, mux],
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("probe: mux read failed: {}", defmt::Debug2Format(&_e));
            [1, PROBE_MUX_TAG, 0]
        }
    };
    mailbox.respond(&response);
}

/// Handle one doorbell from the host.
///
/// Runs in notification context: the only bus traffic it may cause is the
/// single mux read of the probe fallback. Valid requests are copied out of
/// shared memory *before* `RESPONSE_READY` is published, then the host is
/// notified and the copy is queued on `events`.
pub async fn on_notification<B, D>(
    mailbox: &Mailbox,
    events: &ControlEvents,
    probe_bus: &mut B,
    host_doorbell: &D,
) -> Notification
where
    B: DeviceBus,
    D: Doorbell + ?Sized,
{
    match classify(mailbox) {
        Ok(()) => {
            let request = mailbox.take_request();
            host_doorbell.ring();
            let command = request.command;
            events.post_request(request);
            Notification::Queued { command }
        }
        Err(reason) => {
            #[cfg(feature = "defmt")]
            defmt::debug!("mailbox notification answered by probe: {}", reason);
            respond_with_probe(mailbox, probe_bus).await;
            host_doorbell.ring();
            Notification::Probed(reason)
        }
    }
}

/// Host side: post a request and ring the controller.
///
/// A ring still latched on `host_doorbell` (the late answer to an exchange
/// the host gave up on) is cleared first, so the next wait on it only ends
/// with the answer to this request.
///
/// # Errors
/// Whatever [`Mailbox::post_request`] rejects; nothing is rung then.
pub fn send_request<C, H>(
    mailbox: &Mailbox,
    command: u32,
    payload: &[u8],
    controller_doorbell: &C,
    host_doorbell: &H,
) -> Result<(), MailboxError>
where
    C: Doorbell + ?Sized,
    H: Doorbell + ?Sized,
{
    host_doorbell.clear();
    mailbox.post_request(command, payload)?;
    controller_doorbell.ring();
    Ok(())
}
