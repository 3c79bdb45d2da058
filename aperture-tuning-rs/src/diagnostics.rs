//! Board diagnostics read over the device bus.

use crate::bus::DeviceBus;

/// TMP117 temperature sensor on the controller board.
pub const TEMPERATURE_SENSOR_ADDR: u8 = 0x4B;
/// TMP117 temperature result register.
pub const TEMPERATURE_REGISTER: u8 = 0x00;

/// Convert a raw TMP117 result (two's complement, 7.8125 m°C per LSB) to
/// milli-degrees Celsius, rounded toward zero.
pub const fn raw_to_millicelsius(raw: u16) -> i32 {
    // 7.8125 = 125 / 16
    (raw as i16 as i32) * 125 / 16
}

/// Read the board temperature in milli-degrees Celsius.
///
/// Reads on whichever sub-bus is currently routed; the sensor sits on the
/// mux upstream side.
pub async fn read_board_temperature<B: DeviceBus>(bus: &mut B) -> Result<i32, B::Error> {
    let raw = bus
        .read_register16(TEMPERATURE_SENSOR_ADDR, TEMPERATURE_REGISTER)
        .await?;
    let millicelsius = raw_to_millicelsius(raw);

    #[cfg(feature = "defmt")]
    defmt::info!("board temperature: {} mC", millicelsius);

    Ok(millicelsius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BusOp, MockBus};
    use embassy_futures::block_on;

    #[test]
    fn conversion_matches_datasheet_points() {
        assert_eq!(raw_to_millicelsius(0x0000), 0);
        assert_eq!(raw_to_millicelsius(0x0C80), 25_000);
        assert_eq!(raw_to_millicelsius(0x0001), 7);
        assert_eq!(raw_to_millicelsius(0xFF80), -1_000);
        assert_eq!(raw_to_millicelsius(0x8000), -256_000);
    }

    #[test]
    fn reads_result_register_of_sensor() {
        let mut bus = MockBus::new();
        bus.set_register16(0x0C80);

        assert_eq!(block_on(read_board_temperature(&mut bus)), Ok(25_000));
        assert_eq!(
            bus.ops(),
            [BusOp::Read16 { address: TEMPERATURE_SENSOR_ADDR, register: TEMPERATURE_REGISTER }]
        );
    }
}
