//! Test doubles for the hardware and driver traits.

use std::cell::Cell;
use std::rc::Rc;
use std::vec::Vec;

use crate::calibration::{calibration_target, CalibrationStore, FrameMeter, Oscillator};
use crate::control::{SetupPacket, HID_GET_REPORT, HID_SET_IDLE, REPORT_TYPE_INPUT};
use crate::device::Device;
use crate::keymap::DEFAULT_KEYMAP;
use crate::keys::{Buttons, NUM_KEYS};
use crate::poll::{OverflowTimer, Watchdog};
use crate::report::REPORT_LEN;
use crate::transport::{Transport, UsbHandler};

/// Buttons with pull-ups: lines read high until pressed.
#[derive(Debug)]
pub struct FakeButtons {
    pub levels: [bool; NUM_KEYS],
    pub indicator: bool,
}

impl Default for FakeButtons {
    fn default() -> Self {
        Self {
            levels: [true; NUM_KEYS],
            indicator: false,
        }
    }
}

impl FakeButtons {
    pub fn press(&mut self, bit: usize) {
        self.levels[bit] = false;
    }

    pub fn release(&mut self, bit: usize) {
        self.levels[bit] = true;
    }
}

impl Buttons for FakeButtons {
    fn levels(&mut self) -> [bool; NUM_KEYS] {
        self.levels
    }

    fn set_indicator(&mut self, on: bool) {
        self.indicator = on;
    }
}

/// An RC oscillator whose frame length follows `curve(trim)`. Clones share
/// the trim register and the measurement counter, so one clone can act as
/// the oscillator and another as the frame meter.
#[derive(Clone)]
pub struct SimulatedClock {
    trim: Rc<Cell<u8>>,
    measurements: Rc<Cell<usize>>,
    curve: Rc<dyn Fn(u8) -> u16>,
}

impl SimulatedClock {
    pub fn new(curve: impl Fn(u8) -> u16 + 'static) -> Self {
        Self {
            trim: Rc::new(Cell::new(0)),
            measurements: Rc::new(Cell::new(0)),
            curve: Rc::new(curve),
        }
    }

    /// `offset + slope * trim` over the whole range.
    pub fn linear(offset: u16, slope: u16) -> Self {
        Self::new(move |t| offset + slope * u16::from(t))
    }

    pub fn measurements(&self) -> usize {
        self.measurements.get()
    }
}

impl Oscillator for SimulatedClock {
    fn trim(&self) -> u8 {
        self.trim.get()
    }

    fn set_trim(&mut self, value: u8) {
        self.trim.set(value);
    }
}

impl FrameMeter for SimulatedClock {
    fn measure_frame_length(&mut self) -> u16 {
        self.measurements.set(self.measurements.get() + 1);
        (self.curve)(self.trim.get())
    }
}

/// One EEPROM cell.
#[derive(Debug)]
pub struct FakeEeprom {
    pub value: u8,
    pub writes: usize,
}

impl FakeEeprom {
    pub fn new(value: u8) -> Self {
        Self { value, writes: 0 }
    }
}

impl CalibrationStore for FakeEeprom {
    fn load(&mut self) -> u8 {
        self.value
    }

    fn save(&mut self, value: u8) {
        self.value = value;
        self.writes += 1;
    }
}

#[derive(Debug, Default)]
pub struct FakeWatchdog {
    pub feeds: usize,
}

impl Watchdog for FakeWatchdog {
    fn feed(&mut self) {
        self.feeds += 1;
    }
}

#[derive(Debug, Default)]
pub struct FakeTimer {
    pub overflow: bool,
}

impl OverflowTimer for FakeTimer {
    fn take_overflow(&mut self) -> bool {
        core::mem::take(&mut self.overflow)
    }
}

/// Driver stand-in: replays queued SETUP packets and bus resets during
/// `poll` and records what the application sends.
pub struct FakeTransport {
    pub ready: bool,
    pub polls: usize,
    pub requests: Vec<SetupPacket>,
    pub responses: Vec<Vec<u8>>,
    pub reset_meter: Option<SimulatedClock>,
    pub sent: Vec<[u8; REPORT_LEN]>,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            ready: true,
            polls: 0,
            requests: Vec::new(),
            responses: Vec::new(),
            reset_meter: None,
            sent: Vec::new(),
        }
    }
}

impl FakeTransport {
    pub fn queue_get_report(&mut self) {
        self.requests.push(SetupPacket::hid_in(
            HID_GET_REPORT,
            u16::from(REPORT_TYPE_INPUT) << 8,
            0,
            REPORT_LEN as u16,
        ));
    }
}

impl Transport for FakeTransport {
    fn poll<H: UsbHandler>(&mut self, handler: &mut H) {
        self.polls += 1;
        if let Some(mut meter) = self.reset_meter.take() {
            handler.reset_ready(&mut meter);
        }
        for packet in self.requests.drain(..) {
            let data = handler.setup(&packet);
            self.responses.push(data.to_vec());
        }
    }

    fn interrupt_ready(&self) -> bool {
        self.ready
    }

    fn send_interrupt(&mut self, data: &[u8]) {
        let mut report = [0; REPORT_LEN];
        report.copy_from_slice(data);
        self.sent.push(report);
    }
}

pub type FakeDevice = Device<FakeButtons, SimulatedClock, FakeEeprom>;

/// A device wired to fakes, with the 16.5 MHz calibration target.
pub struct Rig {
    pub device: FakeDevice,
    pub transport: FakeTransport,
    pub watchdog: FakeWatchdog,
    pub timer: FakeTimer,
}

impl Rig {
    pub fn set_idle(&mut self, rate: u8) {
        let packet = SetupPacket::hid_out(HID_SET_IDLE, u16::from(rate) << 8, 0);
        assert!(self.device.setup(&packet).is_empty());
    }
}

pub fn rig() -> Rig {
    Rig {
        device: Device::new(
            FakeButtons::default(),
            SimulatedClock::linear(2000, 4),
            FakeEeprom::new(0xFF),
            &DEFAULT_KEYMAP,
            calibration_target(16_500_000),
        ),
        transport: FakeTransport::default(),
        watchdog: FakeWatchdog::default(),
        timer: FakeTimer::default(),
    }
}
