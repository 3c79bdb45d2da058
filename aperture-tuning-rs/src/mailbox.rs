//! Shared-memory mailbox between the host core and the controller core.
//!
//! # Layout
//!
//! ```text
//! offset  size  field
//!      0     4  magic    (MAILBOX_MAGIC)
//!      4     4  cmd
//!      8     4  len      (<= 512)
//!     12     4  status   (0 = empty, 1 = request ready, 2 = response ready)
//!     16   512  payload
//! ```
//!
//! # Ownership
//!
//! The `status` word is the hand-off token. Whoever the status names as
//! owner is the only side allowed to touch `cmd`, `len` and `payload`:
//!
//! - `EMPTY` / `RESPONSE_READY`: the host owns the frame and may post a
//!   new request at any moment.
//! - `REQUEST_READY`: the controller owns the frame until it stores
//!   `RESPONSE_READY`.
//!
//! Status is stored with `Release` and loaded with `Acquire`, so the frame
//! contents written before a hand-off are visible after it. Because the
//! host may overwrite the frame as soon as it sees `RESPONSE_READY`, the
//! controller copies a request out *before* acknowledging it (see
//! [`Mailbox::take_request`]).

use core::cell::UnsafeCell;
use core::ptr;
use core::slice;
use core::sync::atomic::{AtomicU32, Ordering};

use heapless::Vec;

use crate::error::MailboxError;

/// Sentinel in the `magic` word of a valid frame.
pub const MAILBOX_MAGIC: u32 = 0xABCD_1234;

/// Size of the mailbox payload buffer in bytes.
pub const MAILBOX_PAYLOAD_SIZE: usize = 512;

/// Status word values; see the module docs for the ownership rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum MailboxStatus {
    Empty = 0,
    RequestReady = 1,
    ResponseReady = 2,
}

impl MailboxStatus {
    /// Interpret a raw status word; unknown values yield `None`.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Empty),
            1 => Some(Self::RequestReady),
            2 => Some(Self::ResponseReady),
            _ => None,
        }
    }
}

/// A request copied out of shared memory into controller-private storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Raw command id.
    pub command: u32,
    /// Payload bytes, `len` clamped to [`MAILBOX_PAYLOAD_SIZE`].
    pub payload: Vec<u8, MAILBOX_PAYLOAD_SIZE>,
}

/// Snapshot of the header words, read without taking ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub magic: u32,
    pub command: u32,
    pub len: u32,
    /// Raw status word (may hold garbage written by a misbehaving peer).
    pub status: u32,
}

/// The shared mailbox frame.
///
/// Place one instance in memory visible to both cores (a plain `static`
/// on parts with coherent SRAM).
#[repr(C)]
pub struct Mailbox {
    magic: AtomicU32,
    command: AtomicU32,
    len: AtomicU32,
    status: AtomicU32,
    payload: UnsafeCell<[u8; MAILBOX_PAYLOAD_SIZE]>,
}

// SAFETY: the payload buffer is only accessed by the side that currently
// owns the frame according to the status token (module docs), and every
// hand-off goes through a Release store / Acquire load of `status`. No
// method forms a reference to the whole buffer: reads borrow only the
// bytes being copied, writes go through the raw pointer.
unsafe impl Sync for Mailbox {}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    /// A zeroed frame with a valid magic word and `EMPTY` status.
    pub const fn new() -> Self {
        Self {
            magic: AtomicU32::new(MAILBOX_MAGIC),
            command: AtomicU32::new(0),
            len: AtomicU32::new(0),
            status: AtomicU32::new(MailboxStatus::Empty as u32),
            payload: UnsafeCell::new([0; MAILBOX_PAYLOAD_SIZE]),
        }
    }

    /// Re-initialise the frame at boot: magic, zero command/len/payload,
    /// `EMPTY` status.
    ///
    /// Call before the peer is allowed to post.
    pub fn reset(&self) {
        self.status.store(MailboxStatus::Empty as u32, Ordering::Relaxed);
        self.magic.store(MAILBOX_MAGIC, Ordering::Relaxed);
        self.command.store(0, Ordering::Relaxed);
        self.len.store(0, Ordering::Relaxed);
        // SAFETY: at boot no peer has been handed the frame yet, and the
        // write stays inside the buffer.
        unsafe { ptr::write_bytes(self.payload_ptr(), 0, MAILBOX_PAYLOAD_SIZE) };
        self.status.store(MailboxStatus::Empty as u32, Ordering::Release);
    }

    /// Read the four header words.
    pub fn header(&self) -> Header {
        let status = self.status.load(Ordering::Acquire);
        Header {
            magic: self.magic.load(Ordering::Relaxed),
            command: self.command.load(Ordering::Relaxed),
            len: self.len.load(Ordering::Relaxed),
            status,
        }
    }

    /// Current status, if the raw word is one of the three known values.
    pub fn status(&self) -> Option<MailboxStatus> {
        MailboxStatus::from_raw(self.status.load(Ordering::Acquire))
    }

    // ── Controller side ──────────────────────────────────────────────

    /// Copy the pending request into private storage and acknowledge it.
    ///
    /// The copy completes before `RESPONSE_READY` is published; after this
    /// returns the host may reuse the frame.
    ///
    /// Only call this after validating that the frame is in
    /// `REQUEST_READY` with a good magic word.
    pub fn take_request(&self) -> Request {
        let command = self.command.load(Ordering::Relaxed);
        let len = (self.len.load(Ordering::Relaxed) as usize).min(MAILBOX_PAYLOAD_SIZE);

        let mut payload = Vec::new();
        // SAFETY: status is REQUEST_READY, so the controller owns the frame
        // and the host does not write it until RESPONSE_READY is published
        // below. len <= MAILBOX_PAYLOAD_SIZE.
        let shared = unsafe { slice::from_raw_parts(self.payload_ptr(), len) };
        // len <= MAILBOX_PAYLOAD_SIZE == capacity
        let _ = payload.extend_from_slice(shared);

        self.status.store(MailboxStatus::ResponseReady as u32, Ordering::Release);

        Request { command, payload }
    }

    /// Overwrite the frame with a response and publish `RESPONSE_READY`.
    ///
    /// Used by the diagnostic probe path, which answers regardless of what
    /// the frame held. Only the first `data.len()` payload bytes (at most
    /// 512) are written; the rest of the buffer is left as it was.
    pub fn respond(&self, data: &[u8]) {
        let len = data.len().min(MAILBOX_PAYLOAD_SIZE);
        // SAFETY: the probe answers a doorbell. A host that rang has finished
        // writing the frame and only reads it again after RESPONSE_READY, so
        // nothing else touches these bytes; even with a bad magic or status
        // word the frame is not being refilled. No reference to the shared
        // buffer is formed and the copy stays inside it.
        unsafe { ptr::copy_nonoverlapping(data.as_ptr(), self.payload_ptr(), len) };
        self.len.store(len as u32, Ordering::Relaxed);
        self.status.store(MailboxStatus::ResponseReady as u32, Ordering::Release);
    }

    // ── Host side ────────────────────────────────────────────────────

    /// Post a request: fill the frame and publish `REQUEST_READY`.
    ///
    /// The caller rings the controller's doorbell afterwards.
    ///
    /// # Errors
    /// * [`MailboxError::Busy`] if the previous request is still pending
    /// * [`MailboxError::PayloadTooLong`] if `payload` exceeds 512 bytes
    pub fn post_request(&self, command: u32, payload: &[u8]) -> Result<(), MailboxError> {
        if payload.len() > MAILBOX_PAYLOAD_SIZE {
            return Err(MailboxError::PayloadTooLong);
        }
        if self.status() == Some(MailboxStatus::RequestReady) {
            return Err(MailboxError::Busy);
        }

        // SAFETY: status is EMPTY or RESPONSE_READY, so the host owns the
        // frame until REQUEST_READY is published below. payload.len() was
        // checked against the buffer size above.
        unsafe {
            ptr::copy_nonoverlapping(payload.as_ptr(), self.payload_ptr(), payload.len());
        }
        self.magic.store(MAILBOX_MAGIC, Ordering::Relaxed);
        self.command.store(command, Ordering::Relaxed);
        self.len.store(payload.len() as u32, Ordering::Relaxed);
        self.status.store(MailboxStatus::RequestReady as u32, Ordering::Release);
        Ok(())
    }

    /// Copy a response into `buf` once the controller has answered.
    ///
    /// Returns the number of bytes copied, or `None` if no response is
    /// ready. Bytes beyond `buf.len()` are dropped.
    pub fn read_response(&self, buf: &mut [u8]) -> Option<usize> {
        if self.status() != Some(MailboxStatus::ResponseReady) {
            return None;
        }
        let len = (self.len.load(Ordering::Relaxed) as usize)
            .min(MAILBOX_PAYLOAD_SIZE)
            .min(buf.len());
        // SAFETY: status is RESPONSE_READY, so the host owns the frame.
        // len <= MAILBOX_PAYLOAD_SIZE.
        let shared = unsafe { slice::from_raw_parts(self.payload_ptr(), len) };
        buf[..len].copy_from_slice(shared);
        Some(len)
    }

    fn payload_ptr(&self) -> *mut u8 {
        self.payload.get().cast::<u8>()
    }

    /// Store arbitrary header words, bypassing the protocol.
    #[cfg(test)]
    pub(crate) fn force_header(&self, magic: u32, command: u32, len: u32, status: u32) {
        self.magic.store(magic, Ordering::Relaxed);
        self.command.store(command, Ordering::Relaxed);
        self.len.store(len, Ordering::Relaxed);
        self.status.store(status, Ordering::Release);
    }
}
