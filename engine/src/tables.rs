//! The sine and palette lookup tables.
//!
//! Both tables are computed at compile time and live in flash. They are never
//! modified; to use a different waveform or palette you build a whole new
//! table with `from_entries` and hand that to the engine instead.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) The pico-plasma developers, 2026
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.
// -----------------------------------------------------------------------------

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use crate::config::{PALETTE_LEN, PALETTE_MAX, SINE_LEN, SINE_MAX};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// An output signal level.
///
/// There are 32 levels, `0..=31`. The firmware maps each one to an RGB colour.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Level(u8);

impl Level {
    /// The number of distinct levels
    pub const COUNT: usize = PALETTE_LEN;

    /// Make a level, wrapping out-of-range values into `0..COUNT`.
    pub const fn new(raw: u8) -> Level {
        Level(raw % (Self::COUNT as u8))
    }

    /// Get the level as a number in `0..COUNT`
    pub const fn value(self) -> u8 {
        self.0
    }
}

/// Names the two lookup tables.
///
/// The discriminants are the storage region selectors the tables were
/// originally addressed by.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TableId {
    /// The sine table
    Sine = 0x01,
    /// The palette table
    Palette = 0x02,
}

/// One full cycle of a sine wave, scaled into `0..=SINE_MAX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SineTable {
    entries: [u8; SINE_LEN],
}

impl SineTable {
    /// Build the standard sine table.
    ///
    /// Entry `i` is `sin(2πi / SINE_LEN)` moved up into the positive range
    /// and scaled so the peaks land on `0` and `SINE_MAX`.
    pub const fn generate() -> SineTable {
        let half_range = SINE_MAX as f64 / 2.0;
        let mut entries = [0u8; SINE_LEN];
        let mut i = 0;
        while i < SINE_LEN {
            let angle = (i as f64) * core::f64::consts::PI * 2.0 / (SINE_LEN as f64);
            let scaled = (const_sin(angle) + 1.0) * half_range + 0.5;
            // Float to int casts saturate, so anything below zero becomes zero.
            let value = scaled as u8;
            entries[i] = if value > SINE_MAX { SINE_MAX } else { value };
            i += 1;
        }
        SineTable { entries }
    }

    /// Build a sine table from arbitrary amplitudes.
    ///
    /// Every value is wrapped into `0..SINE_LEN`.
    pub const fn from_entries(mut entries: [u8; SINE_LEN]) -> SineTable {
        let mut i = 0;
        while i < SINE_LEN {
            entries[i] %= SINE_LEN as u8;
            i += 1;
        }
        SineTable { entries }
    }

    /// Look up an amplitude.
    ///
    /// Any index is accepted; it wraps modulo the table length, so `-1`
    /// gives the last entry.
    #[inline]
    pub const fn sine(&self, index: i32) -> u8 {
        self.entries[index.rem_euclid(SINE_LEN as i32) as usize]
    }

    /// Get the raw table contents
    pub const fn entries(&self) -> &[u8; SINE_LEN] {
        &self.entries
    }
}

/// Maps a palette index to an output [`Level`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteTable {
    entries: [Level; PALETTE_LEN],
}

impl PaletteTable {
    /// Build the standard palette.
    ///
    /// It ramps up through the even levels and back down through the odd
    /// ones, so walking the indices in a circle never jumps by more than two
    /// levels.
    pub const fn generate() -> PaletteTable {
        let half = PALETTE_LEN / 2;
        let mut entries = [Level(0); PALETTE_LEN];
        let mut i = 0;
        while i < PALETTE_LEN {
            let raw = if i < half {
                i * 2
            } else {
                (PALETTE_MAX as usize - i) * 2 + 1
            };
            entries[i] = Level::new(raw as u8);
            i += 1;
        }
        PaletteTable { entries }
    }

    /// Build a palette from arbitrary levels.
    pub const fn from_entries(entries: [Level; PALETTE_LEN]) -> PaletteTable {
        PaletteTable { entries }
    }

    /// Look up a level. The index wraps modulo the table length.
    #[inline]
    pub const fn palette(&self, index: i32) -> Level {
        self.entries[index.rem_euclid(PALETTE_LEN as i32) as usize]
    }

    /// Get the raw table contents
    pub const fn entries(&self) -> &[Level; PALETTE_LEN] {
        &self.entries
    }
}

/// Both lookup tables, as used by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    /// The sine table
    pub sine: SineTable,
    /// The palette table
    pub palette: PaletteTable,
}

impl Tables {
    /// Build the standard pair of tables
    pub const fn generate() -> Tables {
        Tables {
            sine: SineTable::generate(),
            palette: PaletteTable::generate(),
        }
    }

    /// How many entries the given table has
    pub const fn len_of(id: TableId) -> usize {
        match id {
            TableId::Sine => SINE_LEN,
            TableId::Palette => PALETTE_LEN,
        }
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The lookup tables, computed at compile time.
pub static TABLES: Tables = Tables::generate();

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// A `const` sine, using a Taylor series out to the ninth power.
///
/// Good to better than 0.01 over the whole circle, which is plenty when the
/// result ends up as one of 32 steps.
const fn const_sin(x: f64) -> f64 {
    const PI: f64 = core::f64::consts::PI;
    let mut x = x;
    while x > PI {
        x -= 2.0 * PI;
    }
    while x < -PI {
        x += 2.0 * PI;
    }
    let x2 = x * x;
    let x3 = x2 * x;
    let x5 = x3 * x2;
    let x7 = x5 * x2;
    let x9 = x7 * x2;
    x - x3 / 6.0 + x5 / 120.0 - x7 / 5040.0 + x9 / 362880.0
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sine_is_one_full_cycle() {
        let sine = &TABLES.sine;
        // zero crossings sit in the middle of the range
        assert_eq!(sine.sine(0), 16);
        assert_eq!(sine.sine(16), 16);
        // peak and trough
        assert_eq!(sine.sine(8), 31);
        assert_eq!(sine.sine(24), 0);
        // rising for the first quarter, falling for the middle half
        for i in 0..8 {
            assert!(sine.sine(i) <= sine.sine(i + 1), "not rising at {i}");
        }
        for i in 8..24 {
            assert!(sine.sine(i) >= sine.sine(i + 1), "not falling at {i}");
        }
    }

    #[test]
    fn sine_is_symmetric() {
        let sine = &TABLES.sine;
        for i in 1..16 {
            // sin(π - x) = sin(x)
            assert_eq!(sine.sine(i), sine.sine(16 - i), "index {i}");
        }
    }

    #[test]
    fn negative_index_wraps() {
        let sine = &TABLES.sine;
        assert_eq!(sine.sine(-1), sine.sine(31));
        assert_eq!(sine.sine(-32), sine.sine(0));
        assert_eq!(sine.sine(i32::MIN), sine.sine(0));
        assert_eq!(TABLES.palette.palette(-1), TABLES.palette.palette(31));
    }

    #[test]
    fn palette_is_a_ping_pong_ramp() {
        let palette = &TABLES.palette;
        assert_eq!(palette.palette(0), Level::new(0));
        assert_eq!(palette.palette(1), Level::new(2));
        assert_eq!(palette.palette(15), Level::new(30));
        assert_eq!(palette.palette(16), Level::new(31));
        assert_eq!(palette.palette(31), Level::new(1));
        for i in 0..32 {
            let here = i32::from(palette.palette(i).value());
            let next = i32::from(palette.palette(i + 1).value());
            assert!((here - next).abs() <= 2, "jump between {i} and {}", i + 1);
        }
    }

    #[test]
    fn palette_uses_every_level_once() {
        let mut seen = [false; Level::COUNT];
        for level in TABLES.palette.entries() {
            assert!(!seen[level.value() as usize], "duplicate {level:?}");
            seen[level.value() as usize] = true;
        }
        assert!(seen.iter().all(|x| *x));
    }

    #[test]
    fn from_entries_wraps_values() {
        let mut raw = [0u8; SINE_LEN];
        raw[3] = 33;
        raw[4] = 255;
        let table = SineTable::from_entries(raw);
        assert_eq!(table.sine(3), 1);
        assert_eq!(table.sine(4), 31);
        assert_eq!(Level::new(40).value(), 8);
    }

    #[test]
    fn table_ids() {
        assert_eq!(TableId::Sine as u8, 0x01);
        assert_eq!(TableId::Palette as u8, 0x02);
        assert_eq!(Tables::len_of(TableId::Sine), 32);
        assert_eq!(Tables::len_of(TableId::Palette), 32);
    }

    proptest! {
        #[test]
        fn sine_wraps_and_stays_in_range(i in any::<i32>()) {
            let sine = &TABLES.sine;
            prop_assert_eq!(sine.sine(i), sine.sine(i.rem_euclid(SINE_LEN as i32)));
            prop_assert!((sine.sine(i) as usize) < SINE_LEN);
        }

        #[test]
        fn palette_stays_in_range(p in any::<i32>()) {
            let level = TABLES.palette.palette(p);
            prop_assert!((level.value() as usize) < PALETTE_LEN);
            prop_assert_eq!(level, TABLES.palette.palette(p.rem_euclid(PALETTE_LEN as i32)));
        }
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
