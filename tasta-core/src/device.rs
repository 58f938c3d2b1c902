//! Device state shared by the poll loop and the control callback.

use crate::calibration::{self, CalibrationStore, FrameMeter, Oscillator};
use crate::control::{SetupPacket, HID_GET_IDLE, HID_GET_REPORT, HID_SET_IDLE};
use crate::keymap::Keymap;
use crate::keys::{self, Buttons, KeyState};
use crate::report::KeyboardReport;
use crate::transport::UsbHandler;

/// Board peripherals plus the HID state the host can see.
pub struct Device<B, O, S> {
    pub buttons: B,
    pub oscillator: O,
    pub store: S,
    keymap: &'static Keymap,
    report: KeyboardReport,
    /// In 4 ms units, 0 = only report on change.
    idle_rate: u8,
    calibration_target: u16,
}

impl<B, O, S> Device<B, O, S>
where
    B: Buttons,
    O: Oscillator,
    S: CalibrationStore,
{
    pub fn new(
        buttons: B,
        oscillator: O,
        store: S,
        keymap: &'static Keymap,
        calibration_target: u16,
    ) -> Self {
        Self {
            buttons,
            oscillator,
            store,
            keymap,
            report: KeyboardReport::empty(),
            idle_rate: 0,
            calibration_target,
        }
    }

    /// Apply the calibration from the last session, if any.
    pub fn restore_calibration(&mut self) -> Option<u8> {
        calibration::restore(&mut self.oscillator, &mut self.store)
    }

    pub fn sample(&mut self) -> KeyState {
        keys::sample(&mut self.buttons)
    }

    pub fn build_report(&mut self, keys: KeyState) -> &KeyboardReport {
        self.report.build(keys, self.keymap);
        &self.report
    }

    pub fn idle_rate(&self) -> u8 {
        self.idle_rate
    }
}

impl<B, O, S> UsbHandler for Device<B, O, S>
where
    B: Buttons,
    O: Oscillator,
    S: CalibrationStore,
{
    fn setup(&mut self, packet: &SetupPacket) -> &[u8] {
        if !packet.is_class() {
            // No vendor requests implemented.
            return &[];
        }

        match packet.request {
            HID_GET_REPORT => {
                // Only one report type, wValue is not inspected.
                let keys = self.sample();
                self.report.build(keys, self.keymap);
                self.report.as_bytes()
            }
            HID_GET_IDLE => core::slice::from_ref(&self.idle_rate),
            HID_SET_IDLE => {
                self.idle_rate = packet.value_high();
                &[]
            }
            _ => &[],
        }
    }

    fn reset_ready(&mut self, meter: &mut dyn FrameMeter) {
        calibration::on_bus_reset(
            &mut self.oscillator,
            meter,
            &mut self.store,
            self.calibration_target,
        );
    }
}
