//! RC oscillator calibration against the USB frame clock.
//!
//! The host sends a Start-Of-Frame every millisecond. The driver can time the
//! distance between two of them in CPU loop units; at the nominal clock that
//! distance is [`calibration_target`]. Tuning `OSCCAL` until the measurement
//! matches brings the core clock close enough for low-speed bit timing.
//!
//! Oscillators with a split range (ATtiny25/45/85) have two overlapping
//! halves, 0..=127 and 128..=255, and are only monotonic inside a half, so
//! each half gets its own binary search.

/// Value an erased EEPROM cell reads back as.
pub const NO_CALIBRATION: u8 = 0xFF;

/// EEPROM address of the stored trim value.
pub const EEPROM_ADDR: u16 = 0;

/// Binary search steps per trim region.
pub const STEPS_PER_REGION: usize = 7;

const REGION_BASES: [u8; 2] = [0, 128];

/// Expected frame length for a CPU clock of `f_cpu` Hz, rounded to nearest.
pub const fn calibration_target(f_cpu: u32) -> u16 {
    ((1499 * f_cpu as u64 + 5_250_000) / 10_500_000) as u16
}

/// The RC oscillator trim register.
pub trait Oscillator {
    fn trim(&self) -> u8;
    fn set_trim(&mut self, value: u8);
}

/// Measures the time between two USB frame markers.
pub trait FrameMeter {
    /// Frame length in driver timing units, proportional to the CPU clock.
    fn measure_frame_length(&mut self) -> u16;
}

/// Non-volatile copy of the last calibration.
pub trait CalibrationStore {
    fn load(&mut self) -> u8;
    fn save(&mut self, value: u8);
}

/// Search both trim regions for the value whose frame length is closest to
/// `target`, apply it and return it.
pub fn calibrate<O, M>(osc: &mut O, meter: &mut M, target: u16) -> u8
where
    O: Oscillator + ?Sized,
    M: FrameMeter + ?Sized,
{
    let mut best_value = osc.trim();
    let mut best_dev = u16::MAX;

    for base in REGION_BASES {
        let mut current = base;
        let mut step = 1u8 << (STEPS_PER_REGION - 1);
        while step > 0 {
            let trial = current + step;
            osc.set_trim(trial);
            let measured = meter.measure_frame_length();
            if measured < target {
                // Clock still too slow.
                current = trial;
            }
            let dev = measured.abs_diff(target);
            if dev < best_dev {
                best_dev = dev;
                best_value = trial;
            }
            step >>= 1;
        }
    }

    osc.set_trim(best_value);
    best_value
}

/// Apply the stored calibration on cold start. Returns the value used, or
/// `None` when nothing was stored and the factory trim stays in place.
pub fn restore<O, S>(osc: &mut O, store: &mut S) -> Option<u8>
where
    O: Oscillator + ?Sized,
    S: CalibrationStore + ?Sized,
{
    match store.load() {
        NO_CALIBRATION => None,
        value => {
            osc.set_trim(value);
            Some(value)
        }
    }
}

/// Recalibrate after a bus reset and persist the result.
pub fn on_bus_reset<O, M, S>(osc: &mut O, meter: &mut M, store: &mut S, target: u16) -> u8
where
    O: Oscillator + ?Sized,
    M: FrameMeter + ?Sized,
    S: CalibrationStore + ?Sized,
{
    let value = calibrate(osc, meter, target);
    store.save(value);
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEeprom, SimulatedClock};

    #[test]
    fn target_for_common_clocks() {
        assert_eq!(calibration_target(16_500_000), 2356);
        assert_eq!(calibration_target(12_000_000), 1713);
        assert_eq!(calibration_target(12_800_000), 1827);
    }

    #[test]
    fn uses_exactly_fourteen_measurements() {
        let mut clock = SimulatedClock::linear(0, 20);
        calibrate(&mut clock.clone(), &mut clock, 1000);
        assert_eq!(clock.measurements(), 2 * STEPS_PER_REGION);
    }

    #[test]
    fn finds_exact_match_in_lower_region() {
        // Lower half runs 2000 + 4*t, upper half much faster.
        let mut osc = SimulatedClock::new(|t| {
            if t < 128 {
                2000 + 4 * t as u16
            } else {
                3000 + 4 * t as u16
            }
        });
        let mut meter = osc.clone();
        let chosen = calibrate(&mut osc, &mut meter, 2356);
        assert_eq!(chosen, 89);
        assert_eq!(osc.trim(), 89);
    }

    #[test]
    fn prefers_upper_region_when_closer() {
        // Lower half never gets fast enough.
        let mut osc = SimulatedClock::new(|t| {
            if t < 128 {
                1000 + t as u16
            } else {
                1800 + 3 * (t as u16 - 128)
            }
        });
        let mut meter = osc.clone();
        let chosen = calibrate(&mut osc, &mut meter, 2000);
        // 1800 + 3*67 = 2001, 1800 + 3*66 = 1998
        assert_eq!(chosen, 128 + 67);
    }

    #[test]
    fn restore_skips_erased_cell() {
        let mut osc = SimulatedClock::linear(0, 1);
        osc.set_trim(0x5A);

        let mut eeprom = FakeEeprom::new(NO_CALIBRATION);
        assert_eq!(restore(&mut osc, &mut eeprom), None);
        assert_eq!(osc.trim(), 0x5A);

        let mut eeprom = FakeEeprom::new(0x42);
        assert_eq!(restore(&mut osc, &mut eeprom), Some(0x42));
        assert_eq!(osc.trim(), 0x42);
    }

    #[test]
    fn bus_reset_persists_result() {
        let mut osc = SimulatedClock::linear(2000, 4);
        let mut meter = osc.clone();
        let mut eeprom = FakeEeprom::new(NO_CALIBRATION);

        let value = on_bus_reset(&mut osc, &mut meter, &mut eeprom, 2356);
        assert_eq!(eeprom.value, value);
        assert_eq!(eeprom.writes, 1);
        assert_eq!(osc.trim(), value);
    }
}
