//! Event flags shared between interrupt context and the control loop.
//!
//! Every field has exactly one producer (an interrupt handler or the
//! mailbox notification handler) and one consumer (the control loop).
//! Producers never block: flags are atomics, the copied mailbox request
//! sits in a single-slot [`Signal`], and every producer finishes by
//! signalling `wake` so an idle loop resumes.

use core::sync::atomic::{fence, AtomicBool, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::mailbox::Request;

/// Pending work raised from interrupt context.
///
/// Designed to live in a `static`:
///
/// ```
/// use aperture_tuning::ControlEvents;
///
/// static EVENTS: ControlEvents = ControlEvents::new();
/// ```
pub struct ControlEvents {
    preset_change: AtomicBool,
    pending_preset: AtomicU8,
    pulse: AtomicBool,
    request: Signal<CriticalSectionRawMutex, Request>,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for ControlEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlEvents {
    pub const fn new() -> Self {
        Self {
            preset_change: AtomicBool::new(false),
            pending_preset: AtomicU8::new(0),
            pulse: AtomicBool::new(false),
            request: Signal::new(),
            wake: Signal::new(),
        }
    }

    // ── Producers (interrupt context) ────────────────────────────────

    /// Record a preset sampled from the preset-select input lines.
    ///
    /// Performs no I/O; the loop applies the preset on its next iteration.
    pub fn request_preset(&self, preset: u8) {
        self.pending_preset.store(preset, Ordering::Relaxed);
        self.preset_change.store(true, Ordering::Release);
        fence(Ordering::SeqCst);
        self.wake.signal(());
    }

    /// Ask the loop to emit one trigger pulse.
    pub fn request_pulse(&self) {
        self.pulse.store(true, Ordering::Release);
        fence(Ordering::SeqCst);
        self.wake.signal(());
    }

    /// Hand a copied mailbox request to the loop.
    ///
    /// A request that has not been consumed yet is replaced.
    pub fn post_request(&self, request: Request) {
        self.request.signal(request);
        self.wake.signal(());
    }

    // ── Consumer (loop context) ──────────────────────────────────────

    /// Take the pending preset change, clearing the flag.
    pub fn take_preset_change(&self) -> Option<u8> {
        if self.preset_change.swap(false, Ordering::AcqRel) {
            Some(self.pending_preset.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    /// Take the pending pulse request, clearing the flag.
    pub fn take_pulse(&self) -> bool {
        self.pulse.swap(false, Ordering::AcqRel)
    }

    /// Take the pending mailbox request, if any.
    pub fn take_request(&self) -> Option<Request> {
        self.request.try_take()
    }

    /// Returns `true` if any flag is raised.
    pub fn has_pending(&self) -> bool {
        self.preset_change.load(Ordering::Acquire)
            || self.pulse.load(Ordering::Acquire)
            || self.request.signaled()
    }

    /// Suspend until a producer signals.
    ///
    /// A signal raised since the last wait returns immediately, so an event
    /// arriving between the idle check and this call is not lost.
    pub async fn wait(&self) {
        self.wake.wait().await;
    }
}
