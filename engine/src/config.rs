//! Build-time constants and the runtime configuration of the engine.

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
// Types
// -----------------------------------------------------------------------------

/// Runtime settings for the engine.
///
/// Build one with [`Config::new`], which normalises the values so the rest of
/// the engine never sees a zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Vertical refreshes per animation phase step. Always `>= 1`.
    update_delay: u8,
    /// Scan-lines per row block. Always `>= 1`.
    vertical_pixel_size: u16,
    /// Visible scan-lines per frame.
    visible_lines: u16,
}

impl Config {
    /// The build-time settings, on a 480 line display.
    pub const DEFAULT: Config = Config::new(UPDATE_DELAY, VERTICAL_PIXEL_SIZE, 480);

    /// Make a new configuration.
    ///
    /// An `update_delay` of zero means "advance every refresh" and is stored
    /// as 1. A `vertical_pixel_size` of zero is likewise stored as 1.
    pub const fn new(update_delay: u8, vertical_pixel_size: u16, visible_lines: u16) -> Config {
        Config {
            update_delay: normalise_delay(update_delay),
            vertical_pixel_size: if vertical_pixel_size == 0 {
                1
            } else {
                vertical_pixel_size
            },
            visible_lines,
        }
    }

    /// Get the number of refreshes per animation step
    pub const fn update_delay(&self) -> u8 {
        self.update_delay
    }

    /// Get the height of a row block, in scan-lines
    pub const fn vertical_pixel_size(&self) -> u16 {
        self.vertical_pixel_size
    }

    /// Get the number of visible scan-lines
    pub const fn visible_lines(&self) -> u16 {
        self.visible_lines
    }

    /// Copy this configuration with a different number of visible lines.
    pub const fn with_visible_lines(self, visible_lines: u16) -> Config {
        Config {
            visible_lines,
            ..self
        }
    }

    /// Copy this configuration with a different update delay (normalised).
    pub const fn with_update_delay(self, update_delay: u8) -> Config {
        Config {
            update_delay: normalise_delay(update_delay),
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::DEFAULT
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Vertical refreshes per animation phase step.
pub const UPDATE_DELAY: u8 = 3;

/// Scan-lines which share one computed level.
pub const VERTICAL_PIXEL_SIZE: u16 = 8;

/// Highest valid index into the sine table.
pub const SINE_MAX: u8 = 0b0001_1111;

/// Highest valid index into the palette table.
pub const PALETTE_MAX: u8 = 0b0001_1111;

/// Number of entries in the sine table.
pub const SINE_LEN: usize = SINE_MAX as usize + 1;

/// Number of entries in the palette table.
pub const PALETTE_LEN: usize = PALETTE_MAX as usize + 1;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Map a zero update delay to 1; every other value is returned unchanged.
pub const fn normalise_delay(update_delay: u8) -> u8 {
    if update_delay == 0 {
        1
    } else {
        update_delay
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_constants() {
        let config = Config::default();
        assert_eq!(config.update_delay(), 3);
        assert_eq!(config.vertical_pixel_size(), 8);
        assert_eq!(config.visible_lines(), 480);
        assert_eq!(SINE_LEN, 32);
        assert_eq!(PALETTE_LEN, 32);
    }

    #[test]
    fn zeroes_are_normalised() {
        let config = Config::new(0, 0, 64);
        assert_eq!(config.update_delay(), 1);
        assert_eq!(config.vertical_pixel_size(), 1);
        assert_eq!(config.visible_lines(), 64);
        assert_eq!(config.with_update_delay(0).update_delay(), 1);
        assert_eq!(config.with_update_delay(7).update_delay(), 7);
    }

    #[test]
    fn builders_keep_other_fields() {
        let config = Config::DEFAULT.with_visible_lines(400);
        assert_eq!(config.visible_lines(), 400);
        assert_eq!(config.update_delay(), UPDATE_DELAY);
        assert_eq!(config.vertical_pixel_size(), VERTICAL_PIXEL_SIZE);
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
