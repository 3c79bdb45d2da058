//! aperture-controller
//!
//! Aperture tuning controller firmware for the RP2350. Core 1 is the
//! controller; core 0 plays the host that talks to it through the shared
//! mailbox:
//!
//! 1. At boot core 1 configures every output expander behind the I2C mux
//!    and caches the boot presets.
//! 2. A rising edge on the preset strobe line samples the four preset
//!    select lines and raises a preset change; the control loop writes the
//!    cached preset to the expanders on its next iteration.
//! 3. The host posts requests into the mailbox and rings core 1's doorbell.
//!    The mailbox task validates and queues them (or answers with the mux
//!    probe); the control loop dispatches them.
//! 4. The host heartbeat probes the mux every few seconds and logs the
//!    answer.

#![no_std]
#![no_main]

use defmt::*;
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_executor::Executor;
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Delay, Duration, Ticker};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use aperture_tuning::command::{CMD_PRESET_SELECT, CMD_PROBE};
use aperture_tuning::diagnostics::read_board_temperature;
use aperture_tuning::{
    on_notification, send_request, ControlEvents, Controller, ControllerConfig, Mailbox,
};
use expander_driver::ExpanderBank;

// ---------------------------------------------------------------------------
// Boot block and interrupt binding
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = embassy_rp::block::ImageDef::secure_exe();

// Wire the I2C0 peripheral interrupt to Embassy's async handler.
bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

/// Request/response frame shared by both cores.
static MAILBOX: Mailbox = Mailbox::new();

/// Flags raised by the edge and mailbox tasks, consumed by the control loop.
static EVENTS: ControlEvents = ControlEvents::new();

/// Host -> controller notification.
static CONTROLLER_DOORBELL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Controller -> host notification.
static HOST_DOORBELL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Shared I2C0 bus: the control loop and the mailbox probe both reach the
/// mux through I2cDevice wrappers that serialise transactions.
static I2C_BUS: StaticCell<Mutex<CriticalSectionRawMutex, I2c<'static, I2C0, i2c::Async>>> =
    StaticCell::new();

static mut CORE1_STACK: Stack<8192> = Stack::new();
static EXECUTOR0: StaticCell<Executor> = StaticCell::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

type SharedI2c = I2cDevice<'static, CriticalSectionRawMutex, I2c<'static, I2C0, i2c::Async>>;

type Bank = ExpanderBank<SharedI2c>;

type BoardController = Controller<Bank, Output<'static>, Output<'static>, Delay>;

/// Preset select lines, least significant bit first.
const PRESET_LINES: usize = 4;

/// How long the host waits for the controller to answer.
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Core 1 tasks
// ---------------------------------------------------------------------------

/// Boot the controller, log the board temperature, then run the loop.
#[embassy_executor::task]
async fn control_task(mut controller: BoardController) -> ! {
    match controller.start().await {
        Ok(report) => info!("Controller ready, expander init: {}", report),
        Err(e) => error!("Boot presets not cached: {}", e),
    }

    match read_board_temperature(controller.bus_mut()).await {
        Ok(millicelsius) => info!("Board temperature: {} mC", millicelsius),
        Err(e) => warn!("Temperature sensor read failed: {}", Debug2Format(&e)),
    }

    controller.run(&EVENTS).await
}

/// Sample the preset select lines on every strobe edge.
///
/// Only records the preset; the control loop does the device writes.
#[embassy_executor::task]
async fn preset_edge_task(mut strobe: Input<'static>, lines: [Input<'static>; PRESET_LINES]) -> ! {
    info!("Preset input task started");

    loop {
        strobe.wait_for_rising_edge().await;

        let preset = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.is_high())
            .fold(0u8, |acc, (bit, _)| acc | (1 << bit));

        debug!("Preset strobe: {}", preset);
        EVENTS.request_preset(preset);
    }
}

/// Handle host doorbells.
#[embassy_executor::task]
async fn mailbox_task(mut probe_bank: Bank) -> ! {
    info!("Mailbox task started");

    loop {
        CONTROLLER_DOORBELL.wait().await;
        let outcome = on_notification(&MAILBOX, &EVENTS, &mut probe_bank, &HOST_DOORBELL).await;
        debug!("Mailbox notification: {}", outcome);
    }
}

// ---------------------------------------------------------------------------
// Core 0 tasks
// ---------------------------------------------------------------------------

/// Post one request and wait for the controller to answer it.
async fn transact(command: u32, payload: &[u8], response: &mut [u8]) -> Option<usize> {
    // Also drops a late answer to an earlier, timed-out request.
    let posted = send_request(&MAILBOX, command, payload, &CONTROLLER_DOORBELL, &HOST_DOORBELL);
    if let Err(e) = posted {
        warn!("Host: cmd {} not posted: {}", command, e);
        return None;
    }

    if with_timeout(RESPONSE_TIMEOUT, HOST_DOORBELL.wait()).await.is_err() {
        warn!("Host: cmd {} timed out", command);
        return None;
    }
    MAILBOX.read_response(response)
}

/// Host side: select the initial preset, then probe the mux periodically.
#[embassy_executor::task]
async fn host_task() -> ! {
    let mut response = [0u8; 3];

    if transact(CMD_PRESET_SELECT, &[0], &mut response).await.is_some() {
        info!("Host: initial preset selected");
    }

    let mut ticker = Ticker::every(Duration::from_secs(5));
    loop {
        ticker.next().await;
        match transact(CMD_PROBE, &[], &mut response).await {
            Some(3) => info!(
                "Host: probe status={} tag={=u8:#x} mux={=u8:#x}",
                response[0], response[1], response[2]
            ),
            other => warn!("Host: unexpected probe response length {}", other),
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[cortex_m_rt::entry]
fn main() -> ! {
    let p = embassy_rp::init(Default::default());
    info!("aperture-controller starting");

    // —— Pin assignments ————————————————————————————————————————————————————
    // I2C_SDA    → GP20
    // I2C_SCL    → GP21
    // PRESET_0-3 → GP2..GP5  preset select lines, LSB first
    // PRESET_STB → GP6       rising edge latches the preset lines
    // TRIGGER    → GP16      trigger pulse output
    // STROBE     → GP17      sample strobe output (test sequence)
    // ———————————————————————————————————————————————————————————————————————

    // The host must not post before the frame is initialised.
    MAILBOX.reset();

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = 400_000;
    let i2c = I2c::new_async(p.I2C0, p.PIN_21, p.PIN_20, Irqs, i2c_config);
    let i2c_bus = I2C_BUS.init(Mutex::new(i2c));

    let control_bank = ExpanderBank::new(I2cDevice::new(i2c_bus));
    let probe_bank = ExpanderBank::new(I2cDevice::new(i2c_bus));

    let trigger = Output::new(p.PIN_16, Level::Low);
    let strobe_out = Output::new(p.PIN_17, Level::Low);
    let controller = Controller::new(
        control_bank,
        trigger,
        strobe_out,
        Delay,
        ControllerConfig::default(),
    );

    let preset_lines = [
        Input::new(p.PIN_2, Pull::Down),
        Input::new(p.PIN_3, Pull::Down),
        Input::new(p.PIN_4, Pull::Down),
        Input::new(p.PIN_5, Pull::Down),
    ];
    let preset_strobe = Input::new(p.PIN_6, Pull::Down);

    spawn_core1(
        p.CORE1,
        unsafe { &mut *core::ptr::addr_of_mut!(CORE1_STACK) },
        move || {
            let executor1 = EXECUTOR1.init(Executor::new());
            executor1.run(|spawner| {
                spawner.spawn(unwrap!(control_task(controller)));
                spawner.spawn(unwrap!(preset_edge_task(preset_strobe, preset_lines)));
                spawner.spawn(unwrap!(mailbox_task(probe_bank)));
            });
        },
    );

    let executor0 = EXECUTOR0.init(Executor::new());
    executor0.run(|spawner| {
        spawner.spawn(unwrap!(host_task()));
    });
}
