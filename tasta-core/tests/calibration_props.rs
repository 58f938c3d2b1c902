use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use tasta_core::calibration::{calibrate, FrameMeter, Oscillator};

/// Frame length per trim value, shared between the oscillator and meter.
#[derive(Clone)]
struct Table {
    lengths: Rc<Vec<u16>>,
    trim: Rc<Cell<u8>>,
    measured: Rc<Cell<usize>>,
}

impl Oscillator for Table {
    fn trim(&self) -> u8 {
        self.trim.get()
    }

    fn set_trim(&mut self, value: u8) {
        self.trim.set(value);
    }
}

impl FrameMeter for Table {
    fn measure_frame_length(&mut self) -> u16 {
        self.measured.set(self.measured.get() + 1);
        self.lengths[usize::from(self.trim.get())]
    }
}

/// Two independently monotonic halves, like a split-range RC oscillator.
fn split_range() -> impl Strategy<Value = Vec<u16>> {
    let half = || {
        proptest::collection::vec(500u16..5000, 128).prop_map(|mut v| {
            v.sort_unstable();
            v
        })
    };
    (half(), half()).prop_map(|(mut lower, upper)| {
        lower.extend(upper);
        lower
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The chosen trim is as close to the target as any value the search can
    /// reach (the region bases themselves are never tried).
    #[test]
    fn prop_matches_brute_force(lengths in split_range(), target in 400u16..5200) {
        let table = Table {
            lengths: Rc::new(lengths),
            trim: Rc::new(Cell::new(0)),
            measured: Rc::new(Cell::new(0)),
        };
        let mut osc = table.clone();
        let mut meter = table.clone();

        let chosen = calibrate(&mut osc, &mut meter, target);

        let best = (1u8..=127)
            .chain(129u8..=255)
            .map(|t| table.lengths[usize::from(t)].abs_diff(target))
            .min()
            .unwrap();
        let got = table.lengths[usize::from(chosen)].abs_diff(target);

        prop_assert_eq!(got, best, "chose {} for target {}", chosen, target);
        prop_assert_eq!(osc.trim(), chosen);
        prop_assert_eq!(table.measured.get(), 14);
    }

    /// A strictly increasing single-range oscillator is matched exactly
    /// whenever the target is one of its lengths.
    #[test]
    fn prop_exact_hit(offset in 1000u16..2000, slope in 1u16..8, pick in 1u8..=127) {
        let lengths: Vec<u16> = (0u16..256).map(|t| offset + slope * (t % 128)).collect();
        let target = lengths[usize::from(pick)];
        let table = Table {
            lengths: Rc::new(lengths),
            trim: Rc::new(Cell::new(0)),
            measured: Rc::new(Cell::new(0)),
        };

        let chosen = calibrate(&mut table.clone(), &mut table.clone(), target);
        prop_assert_eq!(table.lengths[usize::from(chosen)], target);
    }
}
