//! The engine: tables, configuration and frame clock, in one place.

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
    clock::{FrameClock, Phase, Tick},
    command::Command,
    config::Config,
    port::PortDriver,
    raster::RasterGenerator,
    tables::{Level, Tables, TABLES},
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// What happened while a frame was being drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameReport {
    /// Vertical refreshes since the previous report
    pub refreshes: u32,
    /// Scan-lines which were played out before we had finished drawing them
    pub late_lines: u32,
}

/// Whether a frame pass kept up with the display.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameOutcome {
    /// Finished within one refresh, every line on time
    OnTime,
    /// Took more than one refresh, or some lines were late
    Overrun,
}

/// Holds everything the renderer needs between frames.
///
/// The tables are shared and read-only. The frame clock belongs to the engine
/// alone; the raster generator only ever sees a copy of the phase.
#[derive(Debug, Clone)]
pub struct Engine {
    tables: &'static Tables,
    config: Config,
    clock: FrameClock,
    frame_count: u32,
}

impl Engine {
    /// Make a new engine, at phase zero
    pub const fn new(config: Config, tables: &'static Tables) -> Engine {
        Engine {
            tables,
            config,
            clock: FrameClock::new(config.update_delay()),
            frame_count: 0,
        }
    }

    /// Get a raster generator for the current configuration
    pub const fn generator(&self) -> RasterGenerator<'static> {
        RasterGenerator::new(self.tables, &self.config)
    }

    /// Call this once per vertical refresh.
    pub fn on_vertical_refresh(&mut self) -> Tick {
        self.clock.on_vertical_refresh()
    }

    /// Call this when a frame pass has finished.
    ///
    /// Catches the frame clock up with every refresh that happened during the
    /// pass and decides whether the pass kept up. An overrun is counted but
    /// otherwise ignored; the next frame just uses whatever phase we have
    /// reached.
    pub fn end_of_frame(&mut self, report: FrameReport) -> FrameOutcome {
        self.frame_count = self.frame_count.wrapping_add(1);
        self.clock.on_vertical_refreshes(report.refreshes);
        if report.refreshes > 1 || report.late_lines > 0 {
            debug!(
                "Frame {=u32} overran: {=u32} refreshes, {=u32} late lines",
                self.frame_count,
                report.refreshes,
                report.late_lines
            );
            self.clock.record_overrun();
            FrameOutcome::Overrun
        } else {
            FrameOutcome::OnTime
        }
    }

    /// Work out the level for one scan-line of the current frame
    #[inline]
    pub fn line_level(&self, line: u16) -> Level {
        self.generator().line_level(line, self.clock.phase())
    }

    /// Send the whole of the current frame to a port driver
    pub fn render_frame<P>(&self, port: &mut P)
    where
        P: PortDriver + ?Sized,
    {
        self.generator().render_frame(self.clock.phase(), port);
    }

    /// Carry out a command from Core 0, and produce the reply word.
    pub fn apply(&mut self, command: Command) -> u32 {
        match command {
            Command::SetTiming(mode) => {
                self.config = self.config.with_visible_lines(mode.visible_lines());
                1
            }
            Command::SetUpdateDelay(delay) => {
                let delay = self.clock.set_update_delay(delay);
                self.config = self.config.with_update_delay(delay);
                u32::from(delay)
            }
            Command::GetFrameCount => self.frame_count,
            Command::GetPhase => u32::from(self.clock.phase().value()),
            Command::GetOverruns => self.clock.overruns(),
        }
    }

    /// Get the current animation phase
    pub const fn phase(&self) -> Phase {
        self.clock.phase()
    }

    /// Get the frame clock
    pub const fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Get the configuration in use
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Get the number of frame passes completed
    pub const fn frame_count(&self) -> u32 {
        self.frame_count
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(Config::DEFAULT, &TABLES)
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::TimingMode;

    #[test]
    fn default_engine() {
        let engine = Engine::default();
        assert_eq!(engine.phase(), Phase::ZERO);
        assert_eq!(engine.frame_count(), 0);
        assert_eq!(engine.config().visible_lines(), 480);
        assert_eq!(engine.generator().num_blocks(), 60);
    }

    #[test]
    fn refresh_events_drive_the_animation() {
        let config = Config::new(3, 8, 64);
        let mut engine = Engine::new(config, &TABLES);
        let second_block = engine.line_level(8);
        for _ in 0..3 {
            engine.on_vertical_refresh();
        }
        assert_eq!(engine.phase().value(), 1);
        // the first block now shows what the second block showed before
        assert_eq!(engine.line_level(0), second_block);
    }

    #[test]
    fn on_time_frames() {
        let mut engine = Engine::new(Config::new(3, 8, 64), &TABLES);
        let report = FrameReport {
            refreshes: 1,
            late_lines: 0,
        };
        assert_eq!(engine.end_of_frame(report), FrameOutcome::OnTime);
        assert_eq!(engine.end_of_frame(report), FrameOutcome::OnTime);
        assert_eq!(engine.end_of_frame(report), FrameOutcome::OnTime);
        assert_eq!(engine.phase().value(), 1);
        assert_eq!(engine.frame_count(), 3);
        assert_eq!(engine.clock().overruns(), 0);
        // the first frame after power-on has seen no refresh yet
        assert_eq!(engine.end_of_frame(FrameReport::default()), FrameOutcome::OnTime);
    }

    #[test]
    fn slow_frames_are_overruns() {
        let mut engine = Engine::new(Config::new(3, 8, 64), &TABLES);
        let outcome = engine.end_of_frame(FrameReport {
            refreshes: 2,
            late_lines: 0,
        });
        assert_eq!(outcome, FrameOutcome::Overrun);
        assert_eq!(engine.clock().refresh_count(), 2);
        assert_eq!(engine.clock().overruns(), 1);
        let outcome = engine.end_of_frame(FrameReport {
            refreshes: 1,
            late_lines: 4,
        });
        assert_eq!(outcome, FrameOutcome::Overrun);
        assert_eq!(engine.clock().overruns(), 2);
        // both refreshes of the slow frame still count towards the animation
        assert_eq!(engine.phase().value(), 1);
    }

    #[test]
    fn render_frame_emits_every_line() {
        let engine = Engine::new(Config::new(3, 8, 64), &TABLES);
        let mut lines = Vec::new();
        engine.render_frame(&mut |level: Level, line: u16| lines.push((line, level)));
        assert_eq!(lines.len(), 64);
        assert!(lines.iter().enumerate().all(|(i, (line, _))| usize::from(*line) == i));
        assert!(lines.iter().all(|(line, level)| *level == engine.line_level(*line)));
    }

    #[test]
    fn commands() {
        let mut engine = Engine::default();
        assert_eq!(engine.apply(Command::SetTiming(TimingMode::T640x400)), 1);
        assert_eq!(engine.config().visible_lines(), 400);
        assert_eq!(engine.generator().num_blocks(), 50);
        assert_eq!(engine.apply(Command::SetUpdateDelay(0)), 1);
        assert_eq!(engine.config().update_delay(), 1);
        engine.end_of_frame(FrameReport {
            refreshes: 5,
            late_lines: 0,
        });
        assert_eq!(engine.apply(Command::GetPhase), 5);
        assert_eq!(engine.apply(Command::GetFrameCount), 1);
        assert_eq!(engine.apply(Command::GetOverruns), 1);
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
