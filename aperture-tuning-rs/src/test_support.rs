//! Recording mocks for host-side tests.
//!
//! Every mock appends to a shared [`Journal`] so tests can assert on the
//! interleaving of bus traffic, pin edges and delays.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

use core::convert::Infallible;

use crate::bus::DeviceBus;
use crate::command::Doorbell;
use crate::mapping::OUTPUT_REGISTER;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Select(u8),
    Write { address: u8, register: u8, data: Vec<u8> },
    Read16 { address: u8, register: u8 },
    ReadMux,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Bus(BusOp),
    Pin { name: &'static str, high: bool },
    DelayNs(u32),
}

/// Shared, ordered log of everything the mocks saw.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Event>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn bus_ops(&self) -> Vec<BusOp> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Bus(op) => Some(op.clone()),
                _ => None,
            })
            .collect()
    }

    /// Edges seen on the named pin, in order.
    pub fn pin_edges(&self, name: &str) -> Vec<bool> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Pin { name: n, high } if *n == name => Some(*high),
                _ => None,
            })
            .collect()
    }

    /// Sum of every recorded delay.
    pub fn total_delay_ns(&self) -> u64 {
        self.0
            .borrow()
            .iter()
            .map(|e| match e {
                Event::DelayNs(ns) => *ns as u64,
                _ => 0,
            })
            .sum()
    }

    /// Payloads written to the output register, in order.
    pub fn output_writes(&self) -> Vec<Vec<u8>> {
        self.bus_ops()
            .into_iter()
            .filter_map(|op| match op {
                BusOp::Write { register, data, .. } if register == OUTPUT_REGISTER => Some(data),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockBusError;

/// [`DeviceBus`] mock with scripted failures.
pub struct MockBus {
    journal: Journal,
    failing_bus: Option<u8>,
    failing_write: Option<(u8, u8)>,
    mux_value: Option<u8>,
    register16: u16,
}

impl MockBus {
    pub fn new() -> Self {
        Self::with_journal(&Journal::new())
    }

    pub fn with_journal(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            failing_bus: None,
            failing_write: None,
            mux_value: Some(0),
            register16: 0,
        }
    }

    pub fn fail_select_on(&mut self, bus: u8) {
        self.failing_bus = Some(bus);
    }

    pub fn fail_writes_to(&mut self, address: u8, register: u8) {
        self.failing_write = Some((address, register));
    }

    /// `None` makes mux reads fail.
    pub fn set_mux(&mut self, value: Option<u8>) {
        self.mux_value = value;
    }

    pub fn set_register16(&mut self, value: u16) {
        self.register16 = value;
    }

    pub fn ops(&self) -> Vec<BusOp> {
        self.journal.bus_ops()
    }

    pub fn output_writes(&self) -> Vec<Vec<u8>> {
        self.journal.output_writes()
    }
}

impl DeviceBus for MockBus {
    type Error = MockBusError;

    async fn select_bus(&mut self, bus: u8) -> Result<(), Self::Error> {
        self.journal.push(Event::Bus(BusOp::Select(bus)));
        if self.failing_bus == Some(bus) {
            return Err(MockBusError);
        }
        Ok(())
    }

    async fn write_register(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        self.journal.push(Event::Bus(BusOp::Write {
            address,
            register,
            data: data.to_vec(),
        }));
        if self.failing_write == Some((address, register)) {
            return Err(MockBusError);
        }
        Ok(())
    }

    async fn read_register16(&mut self, address: u8, register: u8) -> Result<u16, Self::Error> {
        self.journal.push(Event::Bus(BusOp::Read16 { address, register }));
        Ok(self.register16)
    }

    async fn read_mux(&mut self) -> Result<u8, Self::Error> {
        self.journal.push(Event::Bus(BusOp::ReadMux));
        self.mux_value.ok_or(MockBusError)
    }
}

/// Output pin that journals every level change.
pub struct MockPin {
    name: &'static str,
    journal: Journal,
}

impl MockPin {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
        }
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.journal.push(Event::Pin { name: self.name, high: false });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.journal.push(Event::Pin { name: self.name, high: true });
        Ok(())
    }
}

/// Delay that returns immediately and journals the requested duration.
pub struct MockDelay {
    journal: Journal,
}

impl MockDelay {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.journal.push(Event::DelayNs(ns));
    }
}

/// Doorbell that counts rings.
#[derive(Default)]
pub struct MockDoorbell {
    rings: Cell<usize>,
}

impl MockDoorbell {
    pub fn rings(&self) -> usize {
        self.rings.get()
    }
}

impl Doorbell for MockDoorbell {
    fn ring(&self) {
        self.rings.set(self.rings.get() + 1);
    }

    fn clear(&self) {
        self.rings.set(0);
    }
}
