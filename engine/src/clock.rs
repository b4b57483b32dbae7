//! The frame clock, which turns vertical refreshes into animation steps.

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

use crate::config::{normalise_delay, SINE_LEN};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The animation phase: an offset into the sine table.
///
/// Always in `0..SINE_LEN`.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Phase(u8);

impl Phase {
    /// The phase at power-on
    pub const ZERO: Phase = Phase(0);

    /// Make a phase, wrapping into `0..SINE_LEN`.
    pub const fn new(raw: u8) -> Phase {
        Phase(raw % SINE_LEN as u8)
    }

    /// Get the phase as a number
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The phase one step further on
    pub const fn next(self) -> Phase {
        Phase::new(self.0 + 1)
    }
}

/// What happened on a vertical refresh
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// Still counting down; the phase did not move
    Waiting,
    /// The countdown expired and the phase moved on to this value
    Advanced(Phase),
}

/// Divides the vertical refresh rate down to the animation rate.
///
/// Each refresh decrements a countdown. When it reaches zero the phase moves
/// on by one and the countdown reloads with the update delay.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameClock {
    /// Refreshes per phase step, `>= 1`
    update_delay: u8,
    /// Refreshes left until the next step, in `1..=update_delay`
    countdown: u8,
    /// Current animation phase
    phase: Phase,
    /// How many refresh events we have seen
    refresh_count: u32,
    /// How many frame passes overran their time budget
    overruns: u32,
}

impl FrameClock {
    /// Make a new clock at phase zero.
    ///
    /// A zero `update_delay` is treated as 1.
    pub const fn new(update_delay: u8) -> FrameClock {
        let update_delay = normalise_delay(update_delay);
        FrameClock {
            update_delay,
            countdown: update_delay,
            phase: Phase::ZERO,
            refresh_count: 0,
            overruns: 0,
        }
    }

    /// Call this once per vertical refresh.
    pub fn on_vertical_refresh(&mut self) -> Tick {
        self.refresh_count = self.refresh_count.wrapping_add(1);
        self.countdown -= 1;
        if self.countdown > 0 {
            return Tick::Waiting;
        }
        self.phase = self.phase.next();
        self.countdown = self.update_delay;
        Tick::Advanced(self.phase)
    }

    /// Apply `count` vertical refreshes in one go.
    ///
    /// Ends in exactly the same state as calling
    /// [`FrameClock::on_vertical_refresh`] `count` times, but takes the same
    /// time however far behind we are. Returns how many phase steps were
    /// taken.
    pub fn on_vertical_refreshes(&mut self, count: u32) -> u32 {
        let delay = u64::from(self.update_delay);
        self.refresh_count = self.refresh_count.wrapping_add(count);
        let elapsed = (delay - u64::from(self.countdown)) + u64::from(count);
        let steps = elapsed / delay;
        self.countdown = (delay - (elapsed % delay)) as u8;
        let wrapped_steps = (steps % SINE_LEN as u64) as u8;
        self.phase = Phase::new(self.phase.0 + wrapped_steps);
        steps as u32
    }

    /// Change the animation speed.
    ///
    /// The countdown restarts, so the next step happens `update_delay`
    /// refreshes from now. Returns the delay actually in use.
    pub fn set_update_delay(&mut self, update_delay: u8) -> u8 {
        if update_delay == 0 {
            warn!("Update delay of 0 treated as 1");
        }
        self.update_delay = normalise_delay(update_delay);
        self.countdown = self.update_delay;
        self.update_delay
    }

    /// Note that a frame pass did not finish in time.
    pub fn record_overrun(&mut self) {
        self.overruns = self.overruns.wrapping_add(1);
    }

    /// Get the current animation phase
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Get the number of refreshes per phase step
    pub const fn update_delay(&self) -> u8 {
        self.update_delay
    }

    /// Get the number of refreshes left before the next phase step
    pub const fn countdown(&self) -> u8 {
        self.countdown
    }

    /// Get the total number of refresh events seen
    pub const fn refresh_count(&self) -> u32 {
        self.refresh_count
    }

    /// Get the number of overrunning frame passes
    pub const fn overruns(&self) -> u32 {
        self.overruns
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(clock: &mut FrameClock, refreshes: usize) {
        for _ in 0..refreshes {
            clock.on_vertical_refresh();
        }
    }

    #[test]
    fn starts_at_zero() {
        let clock = FrameClock::new(3);
        assert_eq!(clock.phase(), Phase::ZERO);
        assert_eq!(clock.countdown(), 3);
        assert_eq!(clock.refresh_count(), 0);
        assert_eq!(clock.overruns(), 0);
    }

    #[test]
    fn advances_every_third_refresh() {
        let mut clock = FrameClock::new(3);
        assert_eq!(clock.on_vertical_refresh(), Tick::Waiting);
        assert_eq!(clock.phase().value(), 0);
        assert_eq!(clock.on_vertical_refresh(), Tick::Waiting);
        assert_eq!(clock.phase().value(), 0);
        assert_eq!(clock.on_vertical_refresh(), Tick::Advanced(Phase::new(1)));
        assert_eq!(clock.phase().value(), 1);
        run(&mut clock, 6);
        assert_eq!(clock.phase().value(), 3);
        assert_eq!(clock.refresh_count(), 9);
    }

    #[test]
    fn zero_delay_advances_every_refresh() {
        let mut clock = FrameClock::new(0);
        assert_eq!(clock.update_delay(), 1);
        for expected in 1..=40u32 {
            assert!(matches!(clock.on_vertical_refresh(), Tick::Advanced(_)));
            assert_eq!(u32::from(clock.phase().value()), expected % 32);
        }
    }

    #[test]
    fn phase_wraps() {
        let mut clock = FrameClock::new(1);
        run(&mut clock, 31);
        assert_eq!(clock.phase().value(), 31);
        assert_eq!(clock.on_vertical_refresh(), Tick::Advanced(Phase::ZERO));
    }

    #[test]
    fn new_delay_applies_from_next_refresh() {
        let mut clock = FrameClock::new(3);
        run(&mut clock, 2);
        assert_eq!(clock.set_update_delay(5), 5);
        run(&mut clock, 4);
        assert_eq!(clock.phase().value(), 0);
        run(&mut clock, 1);
        assert_eq!(clock.phase().value(), 1);
        assert_eq!(clock.set_update_delay(0), 1);
        run(&mut clock, 1);
        assert_eq!(clock.phase().value(), 2);
    }

    #[test]
    fn overruns_are_counted() {
        let mut clock = FrameClock::new(3);
        clock.record_overrun();
        clock.record_overrun();
        assert_eq!(clock.overruns(), 2);
        // overruns don't disturb the animation
        assert_eq!(clock.phase(), Phase::ZERO);
        assert_eq!(clock.countdown(), 3);
    }

    #[test]
    fn batched_refreshes() {
        let mut clock = FrameClock::new(3);
        assert_eq!(clock.on_vertical_refreshes(0), 0);
        assert_eq!(clock.countdown(), 3);
        assert_eq!(clock.on_vertical_refreshes(2), 0);
        assert_eq!(clock.countdown(), 1);
        assert_eq!(clock.on_vertical_refreshes(1), 1);
        assert_eq!(clock.phase().value(), 1);
        assert_eq!(clock.countdown(), 3);
        assert_eq!(clock.on_vertical_refreshes(u32::MAX), u32::MAX / 3);
        assert_eq!(clock.refresh_count(), 2);
    }

    proptest! {
        #[test]
        fn batched_matches_one_at_a_time(
            delay in 0u8..=8,
            before in 0usize..50,
            count in 0u32..300,
        ) {
            let mut single = FrameClock::new(delay);
            run(&mut single, before);
            let mut batched = single.clone();
            run(&mut single, count as usize);
            batched.on_vertical_refreshes(count);
            prop_assert_eq!(single, batched);
        }

        #[test]
        fn phase_tracks_refresh_count(delay in 1u8..=16, refreshes in 0usize..2000) {
            let mut clock = FrameClock::new(delay);
            let mut previous = clock.phase();
            for _ in 0..refreshes {
                let tick = clock.on_vertical_refresh();
                let step = (clock.phase().value() + SINE_LEN as u8 - previous.value()) % SINE_LEN as u8;
                match tick {
                    Tick::Waiting => prop_assert_eq!(step, 0),
                    Tick::Advanced(p) => {
                        prop_assert_eq!(step, 1);
                        prop_assert_eq!(p, clock.phase());
                    }
                }
                prop_assert!(clock.countdown() >= 1 && clock.countdown() <= delay);
                previous = clock.phase();
            }
            let expected = (refreshes / delay as usize) % SINE_LEN;
            prop_assert_eq!(clock.phase().value() as usize, expected);
        }
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
