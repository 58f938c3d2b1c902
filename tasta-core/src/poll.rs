//! The main loop.
//!
//! One cooperative thread drives everything: the driver's housekeeping, the
//! buttons, the HID idle timer and the interrupt endpoint. None of the steps
//! block, so an iteration finishes well inside a USB frame.

use crate::calibration::{CalibrationStore, Oscillator};
use crate::device::Device;
use crate::keys::{Buttons, KeyState};
use crate::transport::Transport;

/// Idle rate units (4 ms) that elapse per timer overflow.
pub const IDLE_UNITS_PER_OVERFLOW: u8 = 3;

/// Hardware watchdog; the device resets if it is not fed in time.
pub trait Watchdog {
    fn feed(&mut self);
}

/// Free-running timer used as the idle time base.
pub trait OverflowTimer {
    /// Whether the timer overflowed since the last call. Clears the flag.
    fn take_overflow(&mut self) -> bool;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollLoop {
    last_key: KeyState,
    /// Idle units left before the next forced report.
    idle_counter: u8,
    pending: bool,
}

impl PollLoop {
    pub const fn new() -> Self {
        Self {
            last_key: KeyState::NONE,
            idle_counter: 0,
            pending: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Run one loop iteration.
    pub fn step<B, O, S, T, W, C>(
        &mut self,
        device: &mut Device<B, O, S>,
        transport: &mut T,
        watchdog: &mut W,
        timer: &mut C,
    ) where
        B: Buttons,
        O: Oscillator,
        S: CalibrationStore,
        T: Transport,
        W: Watchdog,
        C: OverflowTimer,
    {
        watchdog.feed();
        transport.poll(device);

        let key = device.sample();
        if key != self.last_key {
            self.last_key = key;
            self.pending = true;
        }

        if timer.take_overflow() {
            self.tick_idle(device.idle_rate());
        }

        if self.pending && transport.interrupt_ready() {
            self.pending = false;
            // Use the last dispatched state, not a fresh sample, so a change
            // between sampling and sending is not lost.
            let report = device.build_report(self.last_key);
            transport.send_interrupt(report.as_bytes());
        }
    }

    /// Account for one timer overflow against the host's idle rate.
    fn tick_idle(&mut self, idle_rate: u8) {
        if idle_rate == 0 {
            return;
        }
        // Strictly greater, so the period is ceil(N/3) overflows (DESIGN.md, open question 1).
        if self.idle_counter > IDLE_UNITS_PER_OVERFLOW {
            self.idle_counter -= IDLE_UNITS_PER_OVERFLOW;
        } else {
            self.idle_counter = idle_rate;
            self.pending = true;
        }
    }

    /// Loop forever.
    pub fn run<B, O, S, T, W, C>(
        mut self,
        device: &mut Device<B, O, S>,
        transport: &mut T,
        watchdog: &mut W,
        timer: &mut C,
    ) -> !
    where
        B: Buttons,
        O: Oscillator,
        S: CalibrationStore,
        T: Transport,
        W: Watchdog,
        C: OverflowTimer,
    {
        loop {
            self.step(device, transport, watchdog, timer);
        }
    }
}
