//! The control loop: the only place device I/O happens after boot.
//!
//! Each iteration works through the pending events in a fixed priority
//! order (not arrival order):
//!
//! 1. preset change: apply the cached preset to the devices
//! 2. pulse request: drive the trigger output for one pulse width
//! 3. active test sequence: run one scan of strobe toggles
//! 4. mailbox request: dispatch the queued command
//!
//! When nothing is pending and no test sequence is running, [`Controller::run`]
//! suspends until an interrupt-side producer raises an event.

use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal_async::delay::DelayNs;

use crate::bus::DeviceBus;
use crate::cache::{Preset, PresetCache};
use crate::codec::ChannelConfig;
use crate::command::{bulk_groups, Command};
use crate::config::ControllerConfig;
use crate::error::TuningError;
use crate::events::ControlEvents;
use crate::mapping::{MAX_PRESETS, NUM_CHANNELS};
use crate::sequencer::{self, ApplyReport};

/// Progress of a running test sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanProgress {
    pub completed: u16,
    pub target: u16,
}

impl ScanProgress {
    pub fn is_done(&self) -> bool {
        self.completed >= self.target
    }
}

#[cfg_attr(not(feature = "defmt"), allow(unused_variables))]
fn drive<P: OutputPin>(pin: &mut P, name: &str, high: bool) {
    if let Err(_e) = pin.set_state(PinState::from(high)) {
        #[cfg(feature = "defmt")]
        defmt::warn!("{} output: set {} failed: {}", name, high, defmt::Debug2Format(&_e));
    }
}

/// Owns the device bus, the trigger and strobe outputs, the preset matrix
/// and its cache.
///
/// Generic over its collaborators so the same loop runs on the board and
/// against mocks:
/// * `B` - device bus (mux + expanders)
/// * `T` - trigger pulse output
/// * `S` - sample strobe output
/// * `D` - async delay
pub struct Controller<B, T, S, D> {
    bus: B,
    trigger: T,
    strobe: S,
    delay: D,
    config: ControllerConfig,
    presets: [Preset; MAX_PRESETS],
    cache: PresetCache,
    // presets kept in the cache; boot value from the config, replaced by
    // `load_presets`
    preset_count: usize,
    test_sequence: Option<ScanProgress>,
}

impl<B, T, S, D> Controller<B, T, S, D>
where
    B: DeviceBus,
    T: OutputPin,
    S: OutputPin,
    D: DelayNs,
{
    /// Create a controller with an all-zero preset matrix and an empty
    /// cache. Call [`start`](Self::start) before running the loop.
    pub fn new(bus: B, trigger: T, strobe: S, delay: D, config: ControllerConfig) -> Self {
        Self {
            bus,
            trigger,
            strobe,
            delay,
            config,
            presets: [[ChannelConfig::ZERO; NUM_CHANNELS]; MAX_PRESETS],
            cache: PresetCache::new(),
            preset_count: config.preset_count,
            test_sequence: None,
        }
    }

    /// Boot: configure every expander, then cache the boot presets.
    ///
    /// Outputs start low. Device failures during init are counted in the
    /// returned report only.
    ///
    /// # Errors
    /// * [`TuningError::InvalidPresetCount`] if the configured preset count
    ///   does not fit the cache
    pub async fn start(&mut self) -> Result<ApplyReport, TuningError> {
        drive(&mut self.trigger, "trigger", false);
        drive(&mut self.strobe, "strobe", false);

        let report = sequencer::init_devices(&mut self.bus).await;
        self.precompute()?;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "controller started: {} presets cached, init {}",
            self.cache.preset_count(),
            report
        );

        Ok(report)
    }

    /// Rebuild the cache from the controller's own preset matrix with the
    /// active preset count.
    pub fn precompute(&mut self) -> Result<(), TuningError> {
        self.cache.precompute(&self.presets, self.preset_count)
    }

    /// Replace the first `preset_count` presets and rebuild the cache.
    ///
    /// `preset_count` becomes the active count used by later rebuilds and
    /// by [`bulk_update`](Self::bulk_update). The count is validated first;
    /// on error neither the matrix, the cache nor the active count changes.
    pub fn load_presets(
        &mut self,
        presets: &[Preset],
        preset_count: usize,
    ) -> Result<(), TuningError> {
        self.cache.precompute(presets, preset_count)?;
        self.presets[..preset_count].copy_from_slice(&presets[..preset_count]);
        self.preset_count = preset_count;
        Ok(())
    }

    /// Write one cached preset to the devices.
    pub async fn apply(&mut self, preset_index: usize) -> Result<ApplyReport, TuningError> {
        sequencer::apply(&self.cache, &mut self.bus, preset_index).await
    }

    /// Emit one trigger pulse.
    pub async fn pulse(&mut self) {
        drive(&mut self.trigger, "trigger", true);
        self.delay.delay_us(self.config.pulse_width_us).await;
        drive(&mut self.trigger, "trigger", false);
    }

    /// Start the test sequence. Returns `false` (and changes nothing) if
    /// one is already running.
    pub fn start_test_sequence(&mut self) -> bool {
        if self.test_sequence.is_some() {
            #[cfg(feature = "defmt")]
            defmt::info!("test sequence already running; start ignored");
            return false;
        }

        let target = self.config.test_sequence.scans;
        self.test_sequence = Some(ScanProgress { completed: 0, target });

        #[cfg(feature = "defmt")]
        defmt::info!(
            "test sequence started: {} scans, {} us each",
            target,
            self.config.test_sequence.scan_period_us()
        );

        true
    }

    /// Store the complete `{tuning, matching, detune}` groups of a bulk
    /// payload into the matrix (preset-major) and rebuild the cache.
    ///
    /// Returns how many groups were stored. Groups beyond the active
    /// presets and a trailing partial group are dropped.
    pub fn bulk_update(&mut self, payload: &[u8]) -> Result<usize, TuningError> {
        let capacity = self.preset_count.min(MAX_PRESETS) * NUM_CHANNELS;
        let mut stored = 0;

        for group in bulk_groups(payload) {
            if stored == capacity {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "bulk update: {} groups beyond {} presets ignored",
                    payload.len() / 3 - stored,
                    self.preset_count
                );
                break;
            }
            let (preset, channel) = (stored / NUM_CHANNELS, stored % NUM_CHANNELS);
            self.presets[preset][channel] = ChannelConfig::from_group(group);
            stored += 1;
        }

        self.precompute()?;

        #[cfg(feature = "defmt")]
        defmt::info!("bulk update: {} channel configs stored", stored);

        Ok(stored)
    }

    /// Run one loop iteration.
    pub async fn run_iteration(&mut self, events: &ControlEvents) {
        if let Some(preset) = events.take_preset_change() {
            self.on_preset_change(preset).await;
        }

        if events.take_pulse() {
            self.pulse().await;
        }

        if self.test_sequence.is_some() {
            self.step_test_sequence().await;
        }

        if let Some(request) = events.take_request() {
            self.dispatch(Command::parse(&request), events);
        }
    }

    /// Returns `true` if another iteration has something to do.
    pub fn has_work(&self, events: &ControlEvents) -> bool {
        self.test_sequence.is_some() || events.has_pending()
    }

    /// Run the loop forever.
    pub async fn run(&mut self, events: &ControlEvents) -> ! {
        loop {
            self.run_iteration(events).await;
            if !self.has_work(events) {
                events.wait().await;
            }
        }
    }

    async fn on_preset_change(&mut self, preset: u8) {
        #[cfg(feature = "defmt")]
        defmt::info!("aperture tuning change ({})", preset);

        match self.apply(preset as usize).await {
            Ok(_report) if _report.is_complete() => {
                #[cfg(feature = "defmt")]
                defmt::debug!("preset {} applied: {}", preset, _report);
            }
            Ok(_report) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("preset {} partially applied: {}", preset, _report);
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("preset {} not applied: {}", preset, _e);
            }
        }
    }

    async fn step_test_sequence(&mut self) {
        let Some(mut progress) = self.test_sequence else {
            return;
        };
        let timing = self.config.test_sequence;

        if !progress.is_done() {
            #[cfg(feature = "defmt")]
            defmt::debug!("scan {}", progress.completed);

            for _ in 0..timing.echoes_per_scan {
                drive(&mut self.strobe, "strobe", true);
                self.delay.delay_us(timing.strobe_half_period_us).await;
                drive(&mut self.strobe, "strobe", false);
                self.delay.delay_us(timing.strobe_half_period_us).await;
            }
            progress.completed += 1;
        }

        if progress.is_done() {
            self.test_sequence = None;
            #[cfg(feature = "defmt")]
            defmt::info!("test sequence complete");
        } else {
            self.test_sequence = Some(progress);
        }

        self.delay.delay_us(timing.inter_scan_delay_us).await;
    }

    fn dispatch(&mut self, command: Command<'_>, events: &ControlEvents) {
        match command {
            Command::BulkConfig(payload) => {
                if let Err(_e) = self.bulk_update(payload) {
                    #[cfg(feature = "defmt")]
                    defmt::error!("bulk update: precompute failed: {}", _e);
                }
            }
            Command::PresetSelect(preset) => {
                #[cfg(feature = "defmt")]
                defmt::info!("preset select ({})", preset);
                events.request_preset(preset);
                events.request_pulse();
            }
            Command::StartTestSequence => {
                self.start_test_sequence();
            }
            Command::MalformedPresetSelect => {
                #[cfg(feature = "defmt")]
                defmt::warn!("preset select without preset index ignored");
            }
            Command::Unknown(_id) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("unknown mailbox command {} ignored", _id);
            }
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn cache(&self) -> &PresetCache {
        &self.cache
    }

    pub fn presets(&self) -> &[Preset; MAX_PRESETS] {
        &self.presets
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Presets the cache is rebuilt with.
    pub fn preset_count(&self) -> usize {
        self.preset_count
    }

    /// Progress of the running test sequence, if any.
    pub fn test_sequence(&self) -> Option<ScanProgress> {
        self.test_sequence
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}
