//! Two-button USB keyboard firmware for the ATtiny85.
//!
//! Runs the internal RC oscillator at 16.5 MHz and talks USB through V-USB:
//! - Button 1 sends Left GUI, button 2 sends Enter
//! - LED lit while any button is held
//! - Oscillator calibrated against the host's frame rate on every bus reset
//!   and remembered in EEPROM

#![no_std]
#![no_main]

mod board;
mod config;
mod vusb;

use avr_device::attiny85::Peripherals;

use tasta_core::{Device, PollLoop};

use board::{Eeprom, IdleClock, Osccal, Pins, Wdt};
use config::{CALIBRATION_ADDR, CALIBRATION_TARGET, DISCONNECT_MS, F_CPU, KEYMAP};
use tasta_core::poll::Watchdog;
use vusb::VUsb;

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    // Stop feeding; the watchdog resets us.
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    let mut watchdog = Wdt::enable(dp.WDT);
    let pins = Pins::new(dp.PORTB);

    let mut device = Device::new(
        pins,
        Osccal::new(dp.CPU),
        Eeprom::new(dp.EEPROM, CALIBRATION_ADDR),
        KEYMAP,
        CALIBRATION_TARGET,
    );
    // Start close to 16.5 MHz so enumeration works before recalibration.
    device.restore_calibration();

    let mut usb = VUsb::init();

    // Force re-enumeration after a reset
    device.buttons.usb_disconnect();
    for _ in 0..DISCONNECT_MS {
        watchdog.feed();
        delay_ms(1);
    }
    device.buttons.usb_connect();

    let mut timer = IdleClock::start(dp.TC0, dp.TC1);

    // V-USB needs INT0 from here on.
    unsafe { avr_device::interrupt::enable() };

    PollLoop::new().run(&mut device, &mut usb, &mut watchdog, &mut timer)
}

/// Busy-wait delay in milliseconds (approximate, assumes `F_CPU`).
fn delay_ms(ms: u16) {
    // ~4 cycles per iteration
    const LOOPS_PER_MS: u16 = (F_CPU / 1000 / 4) as u16;
    for _ in 0..ms {
        for _ in 0..LOOPS_PER_MS {
            avr_device::asm::nop();
        }
    }
}
