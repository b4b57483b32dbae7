//! Code for handling RGB colours.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) Jonathan 'theJPster' Pallant and the Neotron Developers, 2023
// Copyright (c) The pico-term-rs developers, 2025
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

use plasma_engine::Level;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Represents two `RGBColour` pixels packed together.
///
/// The `first` pixel is packed in the lower 16-bits. This is because the PIO
/// shifts-right.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct RGBPair(pub u32);

impl RGBPair {
    pub const fn from_pixels(first: RGBColour, second: RGBColour) -> RGBPair {
        let first: u32 = first.0 as u32;
        let second: u32 = second.0 as u32;
        RGBPair((second << 16) | first)
    }
}

/// Represents a 15-bit colour value.
///
/// Each channel has five bits, and they are packed in `BGR` format. This is
/// so the PIO can shift them out right-first, and we have RED0 assigned to
/// the lowest GPIO pin.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct RGBColour(pub u16);

impl RGBColour {
    /// Black (all bits off)
    pub(crate) const BLACK: RGBColour = RGBColour::from_15bit(0x00, 0x00, 0x00);

    /// Make an [`RGBColour`] from a 15-bit RGB triplet.
    ///
    /// Only the bottom 5 bits of each colour channel are retained, as RGB colour
    /// is a 15-bit value.
    pub const fn from_15bit(red: u8, green: u8, blue: u8) -> RGBColour {
        let red5: u16 = (red & 0b11111) as u16;
        let green5: u16 = (green & 0b11111) as u16;
        let blue5: u16 = (blue & 0b11111) as u16;
        RGBColour((blue5 << 10) | (green5 << 5) | red5)
    }

    /// Get the colour we show for an output level.
    #[inline]
    pub fn from_level(level: Level) -> RGBColour {
        // Level values are always < Level::COUNT, so this never goes out of
        // bounds.
        LEVEL_COLOURS[level.value() as usize]
    }

    /// Work out a colour on the level ramp.
    ///
    /// Red rises with the level, blue falls, and green peaks in the middle,
    /// so the lowest level is pure blue and the highest is pure red.
    const fn level_ramp(level: u8) -> RGBColour {
        let top = (Level::COUNT - 1) as u8;
        let half = (Level::COUNT / 2) as u8;
        let green = if level < half {
            level * 2
        } else {
            (top - level) * 2
        };
        RGBColour::from_15bit(level, green, top - level)
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// One colour for each output level.
static LEVEL_COLOURS: [RGBColour; Level::COUNT] = {
    let mut colours = [RGBColour::BLACK; Level::COUNT];
    let mut i = 0;
    while i < Level::COUNT {
        colours[i] = RGBColour::level_ramp(i as u8);
        i += 1;
    }
    colours
};

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
