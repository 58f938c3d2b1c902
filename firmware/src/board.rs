//! ATtiny85 implementations of the core's hardware traits.
//!
//! Direct register access via avr-device, one owner per peripheral block.

use avr_device::attiny85::{CPU, EEPROM, PORTB, TC0, TC1, WDT};
use avr_device::interrupt;

use tasta_core::calibration::{CalibrationStore, Oscillator};
use tasta_core::keys::{Buttons, NUM_KEYS};
use tasta_core::poll::{OverflowTimer, Watchdog};

use crate::config::{BUTTON1_BIT, BUTTON2_BIT, LED_BIT, TIMER1_PRESCALE_1024, USB_MASK};

/// Buttons and LED on port B.
pub struct Pins {
    port: PORTB,
}

impl Pins {
    pub fn new(port: PORTB) -> Self {
        // Pull-ups for the buttons
        port.portb.modify(|r, w| unsafe {
            w.bits(r.bits() | (1 << BUTTON1_BIT) | (1 << BUTTON2_BIT))
        });
        // LED as output
        port.ddrb
            .modify(|r, w| unsafe { w.bits(r.bits() | (1 << LED_BIT)) });
        Self { port }
    }

    /// Pull D+ and D- low so the host sees a disconnect.
    pub fn usb_disconnect(&self) {
        self.port
            .portb
            .modify(|r, w| unsafe { w.bits(r.bits() & !USB_MASK) });
        self.port
            .ddrb
            .modify(|r, w| unsafe { w.bits(r.bits() | USB_MASK) });
    }

    /// Release D+ and D- back to the driver.
    pub fn usb_connect(&self) {
        self.port
            .ddrb
            .modify(|r, w| unsafe { w.bits(r.bits() & !USB_MASK) });
    }
}

impl Buttons for Pins {
    fn levels(&mut self) -> [bool; NUM_KEYS] {
        let pinb = self.port.pinb.read().bits();
        [
            pinb & (1 << BUTTON1_BIT) != 0,
            pinb & (1 << BUTTON2_BIT) != 0,
        ]
    }

    fn set_indicator(&mut self, on: bool) {
        // LED sinks current: low = on
        if on {
            self.port
                .portb
                .modify(|r, w| unsafe { w.bits(r.bits() & !(1 << LED_BIT)) });
        } else {
            self.port
                .portb
                .modify(|r, w| unsafe { w.bits(r.bits() | (1 << LED_BIT)) });
        }
    }
}

/// The internal RC oscillator's `OSCCAL` register.
pub struct Osccal {
    cpu: CPU,
}

impl Osccal {
    pub fn new(cpu: CPU) -> Self {
        Self { cpu }
    }
}

impl Oscillator for Osccal {
    fn trim(&self) -> u8 {
        self.cpu.osccal.read().bits()
    }

    fn set_trim(&mut self, value: u8) {
        self.cpu.osccal.write(|w| unsafe { w.bits(value) });
    }
}

// EECR bits
const EERE: u8 = 1 << 0;
const EEPE: u8 = 1 << 1;
const EEMPE: u8 = 1 << 2;

/// One byte of EEPROM holding the last calibration.
pub struct Eeprom {
    eeprom: EEPROM,
    addr: u16,
}

impl Eeprom {
    pub fn new(eeprom: EEPROM, addr: u16) -> Self {
        Self { eeprom, addr }
    }

    fn wait_ready(&self) {
        while self.eeprom.eecr.read().bits() & EEPE != 0 {}
    }
}

impl CalibrationStore for Eeprom {
    fn load(&mut self) -> u8 {
        self.wait_ready();
        self.eeprom.eear.write(|w| unsafe { w.bits(self.addr) });
        self.eeprom
            .eecr
            .modify(|r, w| unsafe { w.bits(r.bits() | EERE) });
        self.eeprom.eedr.read().bits()
    }

    fn save(&mut self, value: u8) {
        self.wait_ready();
        interrupt::free(|_| {
            // EEPM = 0: atomic erase and write
            self.eeprom.eecr.write(|w| unsafe { w.bits(0) });
            self.eeprom.eear.write(|w| unsafe { w.bits(self.addr) });
            self.eeprom.eedr.write(|w| unsafe { w.bits(value) });
            // EEPE must follow EEMPE within four cycles.
            self.eeprom.eecr.write(|w| unsafe { w.bits(EEMPE) });
            self.eeprom.eecr.write(|w| unsafe { w.bits(EEMPE | EEPE) });
        });
    }
}

// WDTCR bits
const WDE: u8 = 1 << 3;
const WDCE: u8 = 1 << 4;
/// WDP2..0 = 0b111: 2 s timeout
const WDTO_2S: u8 = 0b0000_0111;

pub struct Wdt {
    _wdt: WDT,
}

impl Wdt {
    /// Start the watchdog with a 2 s timeout.
    pub fn enable(wdt: WDT) -> Self {
        interrupt::free(|_| {
            avr_device::asm::wdr();
            // Timed sequence: set WDCE and WDE, then the new value within
            // four cycles.
            wdt.wdtcr.write(|w| unsafe { w.bits(WDCE | WDE) });
            wdt.wdtcr.write(|w| unsafe { w.bits(WDE | WDTO_2S) });
        });
        Self { _wdt: wdt }
    }
}

impl Watchdog for Wdt {
    fn feed(&mut self) {
        avr_device::asm::wdr();
    }
}

/// TIFR bit for Timer1 overflow.
const TOV1: u8 = 1 << 2;

/// Timer1 free-running from CK/1024 as the idle time base.
pub struct IdleClock {
    flags: TC0,
    _timer: TC1,
}

impl IdleClock {
    /// `flags` owns TIFR, which the ATtiny85 shares between both timers.
    pub fn start(flags: TC0, timer: TC1) -> Self {
        timer
            .tccr1
            .write(|w| unsafe { w.bits(TIMER1_PRESCALE_1024) });
        Self {
            flags,
            _timer: timer,
        }
    }
}

impl OverflowTimer for IdleClock {
    fn take_overflow(&mut self) -> bool {
        if self.flags.tifr.read().bits() & TOV1 == 0 {
            return false;
        }
        // Flag clears by writing a one.
        self.flags.tifr.write(|w| unsafe { w.bits(TOV1) });
        true
    }
}
