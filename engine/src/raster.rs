//! The raster generator.
//!
//! Works out which level each scan-line gets, for a given animation phase.

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

use crate::{
    clock::Phase,
    config::{Config, PALETTE_LEN},
    port::PortDriver,
    tables::{Level, Tables},
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Produces the levels for a frame.
///
/// Holds no animation state of its own; everything it produces depends only on
/// the tables, the configuration and the phase you pass in.
#[derive(Debug, Copy, Clone)]
pub struct RasterGenerator<'a> {
    tables: &'a Tables,
    vertical_pixel_size: u16,
    visible_lines: u16,
}

impl<'a> RasterGenerator<'a> {
    /// Make a generator for the given tables and display geometry
    pub const fn new(tables: &'a Tables, config: &Config) -> RasterGenerator<'a> {
        RasterGenerator {
            tables,
            vertical_pixel_size: config.vertical_pixel_size(),
            visible_lines: config.visible_lines(),
        }
    }

    /// How many row blocks cover the visible lines.
    ///
    /// A partial block at the bottom of the screen counts as a block.
    pub const fn num_blocks(&self) -> u16 {
        self.visible_lines.div_ceil(self.vertical_pixel_size)
    }

    /// Which row block a scan-line belongs to
    #[inline]
    pub const fn block_of(&self, line: u16) -> u16 {
        line / self.vertical_pixel_size
    }

    /// Work out the level for a whole row block.
    #[inline]
    pub const fn block_level(&self, block: u16, phase: Phase) -> Level {
        let sine_index = block as i32 + phase.value() as i32;
        let amplitude = self.tables.sine.sine(sine_index);
        let palette_index = amplitude as usize % PALETTE_LEN;
        self.tables.palette.palette(palette_index as i32)
    }

    /// Work out the level for a single scan-line.
    #[inline]
    pub const fn line_level(&self, line: u16, phase: Phase) -> Level {
        self.block_level(self.block_of(line), phase)
    }

    /// Get every `(line, level)` pair of a frame, top to bottom.
    ///
    /// The iterator is lazy and can be cloned to start again.
    pub fn frame(&self, phase: Phase) -> Frame<'a> {
        Frame {
            generator: *self,
            phase,
            line: 0,
            cached: None,
        }
    }

    /// Send a whole frame to a port driver.
    pub fn render_frame<P>(&self, phase: Phase, port: &mut P)
    where
        P: PortDriver + ?Sized,
    {
        for (line, level) in self.frame(phase) {
            port.emit(level, line);
        }
    }
}

/// The scan-lines of one frame. See [`RasterGenerator::frame`].
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    generator: RasterGenerator<'a>,
    phase: Phase,
    /// The next line to produce
    line: u16,
    /// The block we last computed, and its level
    cached: Option<(u16, Level)>,
}

impl Iterator for Frame<'_> {
    type Item = (u16, Level);

    fn next(&mut self) -> Option<Self::Item> {
        if self.line >= self.generator.visible_lines {
            return None;
        }
        let line = self.line;
        self.line += 1;
        let block = self.generator.block_of(line);
        let level = match self.cached {
            Some((cached_block, level)) if cached_block == block => level,
            _ => {
                let level = self.generator.block_level(block, self.phase);
                self.cached = Some((block, level));
                level
            }
        };
        Some((line, level))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::from(self.generator.visible_lines.saturating_sub(self.line));
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frame<'_> {}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FrameClock, config::SINE_LEN, tables::TABLES};
    use proptest::prelude::*;

    fn generator(visible_lines: u16) -> RasterGenerator<'static> {
        RasterGenerator::new(&TABLES, &Config::new(3, 8, visible_lines))
    }

    fn collect(generator: &RasterGenerator, phase: Phase) -> Vec<(u16, Level)> {
        let mut lines = Vec::new();
        generator.render_frame(phase, &mut |level: Level, line: u16| {
            lines.push((line, level))
        });
        lines
    }

    #[test]
    fn sixty_four_lines_make_eight_blocks() {
        let generator = generator(64);
        assert_eq!(generator.num_blocks(), 8);
        let lines = collect(&generator, Phase::ZERO);
        assert_eq!(lines.len(), 64);
        for (block, chunk) in lines.chunks(8).enumerate() {
            let expected = generator.block_level(block as u16, Phase::ZERO);
            for (offset, (line, level)) in chunk.iter().enumerate() {
                assert_eq!(*line as usize, block * 8 + offset);
                assert_eq!(*level, expected, "line {line}");
            }
        }
    }

    #[test]
    fn partial_block_is_rendered() {
        let generator = generator(60);
        assert_eq!(generator.num_blocks(), 8);
        let lines = collect(&generator, Phase::new(5));
        assert_eq!(lines.len(), 60);
        let last = generator.block_level(7, Phase::new(5));
        assert!(lines[56..].iter().all(|(_, level)| *level == last));
    }

    #[test]
    fn level_follows_the_tables() {
        let generator = generator(480);
        // block 3 at phase 5 reads sine entry 8, the peak
        let amplitude = TABLES.sine.sine(8);
        assert_eq!(amplitude, 31);
        assert_eq!(
            generator.block_level(3, Phase::new(5)),
            TABLES.palette.palette(31)
        );
        // the same block wraps round the table
        assert_eq!(
            generator.block_level(30, Phase::new(4)),
            TABLES.palette.palette(i32::from(TABLES.sine.sine(2)))
        );
    }

    #[test]
    fn same_phase_gives_same_frame() {
        let generator = generator(480);
        let phase = Phase::new(17);
        assert_eq!(collect(&generator, phase), collect(&generator, phase));
        let frame = generator.frame(phase);
        let restarted = frame.clone();
        assert!(frame.eq(restarted));
    }

    #[test]
    fn advancing_phase_scrolls_by_one_block() {
        let generator = generator(480);
        for block in 0..generator.num_blocks() - 1 {
            assert_eq!(
                generator.block_level(block, Phase::new(1)),
                generator.block_level(block + 1, Phase::ZERO)
            );
        }
    }

    #[test]
    fn frame_reports_its_length() {
        let generator = generator(100);
        let mut frame = generator.frame(Phase::ZERO);
        assert_eq!(frame.len(), 100);
        frame.next();
        assert_eq!(frame.len(), 99);
        assert_eq!(frame.count(), 99);
    }

    #[test]
    fn empty_frame() {
        let generator = generator(0);
        assert_eq!(generator.num_blocks(), 0);
        assert_eq!(generator.frame(Phase::ZERO).next(), None);
    }

    #[test]
    fn block_sequence_repeats_with_clock_period() {
        let generator = generator(64);
        let mut clock = FrameClock::new(3);
        let period = SINE_LEN * 3;
        let mut history = Vec::new();
        for _ in 0..period * 2 {
            history.push(generator.block_level(2, clock.phase()));
            clock.on_vertical_refresh();
        }
        assert_eq!(history[..period], history[period..]);
    }

    proptest! {
        #[test]
        fn lines_in_a_block_agree(line in 0u16..480, phase in 0u8..32) {
            let generator = generator(480);
            let phase = Phase::new(phase);
            let first_line = (line / 8) * 8;
            prop_assert_eq!(
                generator.line_level(line, phase),
                generator.line_level(first_line, phase)
            );
            prop_assert!((generator.line_level(line, phase).value() as usize) < PALETTE_LEN);
        }
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
