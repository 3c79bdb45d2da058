//! Runtime-tunable timing for the control loop.

/// Parameters of the synthetic scan generator started by
/// [`CMD_TEST_SEQUENCE_START`](crate::command::CMD_TEST_SEQUENCE_START).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TestSequenceConfig {
    /// Strobe toggles per scan.
    pub echoes_per_scan: u16,
    /// Scans before the sequence stops on its own.
    pub scans: u16,
    /// Strobe high time and low time, each.
    pub strobe_half_period_us: u32,
    /// Pause after each scan.
    pub inter_scan_delay_us: u32,
}

impl TestSequenceConfig {
    /// Duration of one scan step including the inter-scan pause.
    pub fn scan_period_us(&self) -> u64 {
        let strobe_us = self.echoes_per_scan as u64 * 2 * self.strobe_half_period_us as u64;
        strobe_us + self.inter_scan_delay_us as u64
    }
}

impl Default for TestSequenceConfig {
    fn default() -> Self {
        Self {
            echoes_per_scan: 600,
            // one scan per channel of every preset slot
            scans: 112,
            strobe_half_period_us: 400,
            inter_scan_delay_us: 30_000,
        }
    }
}

/// Control loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Presets cached at boot and after every bulk update.
    pub preset_count: usize,
    /// Trigger pulse width in microseconds.
    pub pulse_width_us: u32,
    pub test_sequence: TestSequenceConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            preset_count: 7,
            pulse_width_us: 500,
            test_sequence: TestSequenceConfig::default(),
        }
    }
}
