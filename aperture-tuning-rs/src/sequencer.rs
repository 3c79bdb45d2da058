//! Writes cached presets (and the boot-time register setup) to the
//! physical output devices.
//!
//! Both operations walk [`DEVICE_MAP`] in order and follow a best-effort
//! policy: a device whose bus select or register write fails is skipped
//! and the walk continues. Partial coverage of the array is preferred over
//! halting with some devices updated and others not even attempted.

use crate::bus::DeviceBus;
use crate::cache::PresetCache;
use crate::error::TuningError;
use crate::mapping::{
    DeviceMapping, CONFIG_ALL_OUTPUTS, CONFIG_REGISTER, DEVICE_MAP, INVERT_ALL, INVERT_REGISTER,
    OUTPUT_REGISTER,
};

/// Per-call outcome of a device walk.
///
/// Failures are counted here and logged, never turned into an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ApplyReport {
    /// Devices that took every write.
    pub written: u8,
    /// Devices skipped after a select or write failure.
    pub failed: u8,
}

impl ApplyReport {
    /// Returns `true` if every device was updated.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Select the device's bus, then perform the writes; stop at the first
/// failure for this device.
#[cfg_attr(not(feature = "defmt"), allow(unused_variables))]
async fn write_device<B: DeviceBus>(
    bus: &mut B,
    index: usize,
    device: &DeviceMapping,
    writes: &[(u8, &[u8])],
) -> bool {
    if let Err(_e) = bus.select_bus(device.bus).await {
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "device {}: mux select bus {} failed: {}",
            index,
            device.bus,
            defmt::Debug2Format(&_e)
        );
        return false;
    }

    for &(register, data) in writes {
        if let Err(_e) = bus.write_register(device.address, register, data).await {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "device {} ({=u8:#x}): write reg {=u8:#x} failed: {}",
                index,
                device.address,
                register,
                defmt::Debug2Format(&_e)
            );
            return false;
        }
    }
    true
}

/// Write every device payload of a cached preset to the hardware.
///
/// Per-device failures are skipped (see the module docs) and only show up
/// in the returned [`ApplyReport`] and the log.
///
/// # Errors
/// * [`TuningError::NotReady`] if the cache has never been precomputed
/// * [`TuningError::PresetIndexOutOfRange`] if `preset_index` is not cached
///
/// Neither error issues any bus traffic.
pub async fn apply<B: DeviceBus>(
    cache: &PresetCache,
    bus: &mut B,
    preset_index: usize,
) -> Result<ApplyReport, TuningError> {
    let payloads = cache.preset(preset_index)?;
    let mut report = ApplyReport::default();

    for (index, (device, payload)) in DEVICE_MAP.iter().zip(payloads.iter()).enumerate() {
        if write_device(bus, index, device, &[(OUTPUT_REGISTER, &payload.as_bytes()[..])]).await {
            report.written += 1;
        } else {
            report.failed += 1;
        }
    }

    Ok(report)
}

/// Configure every expander once at boot: all lines as outputs, all
/// lines inverted.
pub async fn init_devices<B: DeviceBus>(bus: &mut B) -> ApplyReport {
    let mut report = ApplyReport::default();
    let writes: [(u8, &[u8]); 2] = [
        (CONFIG_REGISTER, &CONFIG_ALL_OUTPUTS[..]),
        (INVERT_REGISTER, &INVERT_ALL[..]),
    ];

    for (index, device) in DEVICE_MAP.iter().enumerate() {
        if write_device(bus, index, device, &writes).await {
            report.written += 1;
        } else {
            report.failed += 1;
        }
    }

    #[cfg(feature = "defmt")]
    defmt::info!("expander init: {}", report);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ChannelConfig;
    use crate::mapping::{MAX_PRESETS, NUM_CHANNELS, NUM_DEVICES, TX_DEVICE_INDEX};
    use crate::test_support::{BusOp, MockBus};
    use embassy_futures::block_on;

    fn cache_with(count: usize) -> PresetCache {
        let mut presets = [[ChannelConfig::ZERO; NUM_CHANNELS]; MAX_PRESETS];
        for (p, preset) in presets.iter_mut().enumerate() {
            preset[0] = ChannelConfig::new(p as u8, 1, false);
        }
        let mut cache = PresetCache::new();
        cache.precompute(&presets, count).unwrap();
        cache
    }

    // ── Rejections ───────────────────────────────────────────────────

    #[test]
    fn apply_without_precompute_is_not_ready_and_silent() {
        let cache = PresetCache::new();
        let mut bus = MockBus::new();
        assert_eq!(block_on(apply(&cache, &mut bus, 0)), Err(TuningError::NotReady));
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn apply_out_of_range_is_rejected_and_silent() {
        let cache = cache_with(3);
        let mut bus = MockBus::new();
        assert_eq!(
            block_on(apply(&cache, &mut bus, 3)),
            Err(TuningError::PresetIndexOutOfRange)
        );
        assert!(bus.ops().is_empty());
    }

    // ── Happy path ───────────────────────────────────────────────────

    #[test]
    fn apply_selects_then_writes_each_device_in_map_order() {
        let cache = cache_with(4);
        let mut bus = MockBus::new();

        let report = block_on(apply(&cache, &mut bus, 2)).unwrap();
        assert_eq!(report, ApplyReport { written: NUM_DEVICES as u8, failed: 0 });
        assert!(report.is_complete());

        let ops = bus.ops();
        assert_eq!(ops.len(), 2 * NUM_DEVICES);
        for (d, device) in DEVICE_MAP.iter().enumerate() {
            assert_eq!(ops[2 * d], BusOp::Select(device.bus));
            assert_eq!(
                ops[2 * d + 1],
                BusOp::Write {
                    address: device.address,
                    register: OUTPUT_REGISTER,
                    data: cache.get(2, d).unwrap().0.to_vec(),
                }
            );
        }
    }

    #[test]
    fn tx_device_receives_tx_payload() {
        let cache = cache_with(4);
        let mut bus = MockBus::new();
        block_on(apply(&cache, &mut bus, 3)).unwrap();

        let expected = cache.get(3, TX_DEVICE_INDEX).unwrap();
        assert_eq!(bus.output_writes()[TX_DEVICE_INDEX], expected.0.to_vec());
    }

    // ── Continue-on-error ────────────────────────────────────────────

    #[test]
    fn select_failure_skips_only_that_device() {
        let cache = cache_with(1);
        let mut bus = MockBus::new();
        bus.fail_select_on(DEVICE_MAP[2].bus);

        let report = block_on(apply(&cache, &mut bus, 0)).unwrap();

        // RX_BUS_1 carries devices 2 and 3
        assert_eq!(report.failed, 2);
        assert_eq!(report.written, NUM_DEVICES as u8 - 2);
        assert_eq!(bus.output_writes().len(), NUM_DEVICES - 2);
    }

    #[test]
    fn write_failure_is_reported_not_raised() {
        let cache = cache_with(1);
        let mut bus = MockBus::new();
        bus.fail_writes_to(DEVICE_MAP[TX_DEVICE_INDEX].address, 0x84);

        let result = block_on(apply(&cache, &mut bus, 0));
        assert!(result.is_ok());
        let report = result.unwrap();
        // TX shares its address with the other 0x22 devices on other buses
        let same_address = DEVICE_MAP
            .iter()
            .filter(|d| d.address == DEVICE_MAP[TX_DEVICE_INDEX].address)
            .count() as u8;
        assert_eq!(report.failed, same_address);
        // every device was still attempted
        let selects = bus.ops().iter().filter(|op| matches!(op, BusOp::Select(_))).count();
        assert_eq!(selects, NUM_DEVICES);
    }

    // ── Init ─────────────────────────────────────────────────────────

    #[test]
    fn init_writes_direction_then_polarity() {
        let mut bus = MockBus::new();
        let report = block_on(init_devices(&mut bus));
        assert!(report.is_complete());

        let ops = bus.ops();
        assert_eq!(ops.len(), 3 * NUM_DEVICES);
        for (d, device) in DEVICE_MAP.iter().enumerate() {
            assert_eq!(ops[3 * d], BusOp::Select(device.bus));
            assert_eq!(
                ops[3 * d + 1],
                BusOp::Write {
                    address: device.address,
                    register: CONFIG_REGISTER,
                    data: vec![0, 0, 0],
                }
            );
            assert_eq!(
                ops[3 * d + 2],
                BusOp::Write {
                    address: device.address,
                    register: INVERT_REGISTER,
                    data: vec![0xFF; 3],
                }
            );
        }
    }

    #[test]
    fn init_skips_polarity_after_failed_direction_write() {
        let mut bus = MockBus::new();
        bus.fail_writes_to(DEVICE_MAP[1].address, CONFIG_REGISTER);
        let report = block_on(init_devices(&mut bus));

        let invert_writes_to_failing_address = bus
            .ops()
            .iter()
            .filter(|op| {
                matches!(op, BusOp::Write { address, register, .. }
                    if *address == DEVICE_MAP[1].address && *register == INVERT_REGISTER)
            })
            .count();
        assert_eq!(invert_writes_to_failing_address, 0);
        assert_eq!(report.written as usize + report.failed as usize, NUM_DEVICES);
        assert!(report.failed > 0);
    }
}
