//! Core 0's end of the link to the renderer on Core 1.
//!
//! Core 1 only looks at its FIFO once per frame, so every request waits a few
//! frames for the answer. Anything in the FIFO that starts with a fault marker
//! is Core 1 telling us it has crashed.

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
    command::{Command, TimingMode, FAULT_HARDFAULT, FAULT_PANIC, FAULT_PANIC_NO_LOCATION},
};
use embedded_hal::delay::DelayNs;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A word-at-a-time channel to the other core.
///
/// On the RP2040 this is the SIO FIFO.
pub trait InterCoreFifo {
    /// Take a word out of the FIFO, if there is one
    fn read(&mut self) -> Option<u32>;

    /// Put a word into the FIFO, waiting for space if need be
    fn write_blocking(&mut self, value: u32);
}

/// How Core 1 died
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Panicked at this line of some Core 1 source file
    Panic { line: u32 },
    /// Panicked, and didn't say where
    PanicNoLocation,
    /// Took a HardFault. Registers are r0, r1, r2, r3, r12, lr and pc.
    HardFault { registers: [u32; 7] },
    /// Started a fault report but never finished it
    Truncated { marker: u32 },
}

/// Why a request to Core 1 failed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Core 1 didn't answer this command in time
    Timeout(Command),
    /// Core 1 has crashed
    Fault(Fault),
}

impl From<Fault> for LinkError {
    fn from(fault: Fault) -> Self {
        LinkError::Fault(fault)
    }
}

/// What Core 1 told us when we last asked.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// Frames drawn since start-up
    pub frame_count: u32,
    /// Frames drawn since the last poll
    pub frames_since_last: u32,
    /// Where the animation has got to
    pub phase: Phase,
    /// Frame passes that overran since start-up
    pub overruns: u32,
    /// Frame passes that overran since the last poll
    pub overruns_since_last: u32,
}

/// Our end of the link to Core 1.
pub struct Supervisor<F> {
    fifo: F,
    last_frame_count: u32,
    last_overruns: u32,
}

impl<F> Supervisor<F>
where
    F: InterCoreFifo,
{
    /// How long we wait for any one word from Core 1.
    ///
    /// Several frames, even at 60 Hz.
    pub const REPLY_TIMEOUT_MS: u32 = 100;

    /// How often we look at the FIFO while waiting
    const POLL_INTERVAL_US: u32 = 100;

    /// Take over the FIFO. Core 1 must already be running.
    pub fn new(fifo: F) -> Supervisor<F> {
        Supervisor {
            fifo,
            last_frame_count: 0,
            last_overruns: 0,
        }
    }

    /// Tell Core 1 which video timing and animation speed to use.
    ///
    /// Returns the update delay Core 1 actually chose.
    pub fn configure<D>(
        &mut self,
        delay: &mut D,
        mode: TimingMode,
        update_delay: u8,
    ) -> Result<u8, LinkError>
    where
        D: DelayNs,
    {
        self.transact(delay, Command::SetTiming(mode))?;
        let in_use = self.transact(delay, Command::SetUpdateDelay(update_delay))?;
        Ok(in_use as u8)
    }

    /// Ask Core 1 how it is getting on.
    pub fn poll<D>(&mut self, delay: &mut D) -> Result<Status, LinkError>
    where
        D: DelayNs,
    {
        let frame_count = self.transact(delay, Command::GetFrameCount)?;
        let phase = Phase::new(self.transact(delay, Command::GetPhase)? as u8);
        let overruns = self.transact(delay, Command::GetOverruns)?;
        let status = Status {
            frame_count,
            frames_since_last: frame_count.wrapping_sub(self.last_frame_count),
            phase,
            overruns,
            overruns_since_last: overruns.wrapping_sub(self.last_overruns),
        };
        self.last_frame_count = frame_count;
        self.last_overruns = overruns;
        Ok(status)
    }

    /// Look for a fault report without sending anything.
    ///
    /// Any other word waiting in the FIFO is an answer nobody is waiting for
    /// any more, and is thrown away.
    pub fn check<D>(&mut self, delay: &mut D) -> Result<(), LinkError>
    where
        D: DelayNs,
    {
        while let Some(word) = self.fifo.read() {
            if is_fault_marker(word) {
                return Err(self.read_fault(word, delay).into());
            }
            warn!("Unexpected word 0x{=u32:08x} from Core 1", word);
        }
        Ok(())
    }

    /// Send one command and wait for its reply.
    ///
    /// A reply that happens to look like a fault marker is taken as a fault.
    /// Counters would have to run for years to get that high.
    fn transact<D>(&mut self, delay: &mut D, command: Command) -> Result<u32, LinkError>
    where
        D: DelayNs,
    {
        self.check(delay)?;
        self.fifo.write_blocking(command.encode());
        let Some(reply) = self.read_word(delay) else {
            return Err(LinkError::Timeout(command));
        };
        if is_fault_marker(reply) {
            return Err(self.read_fault(reply, delay).into());
        }
        Ok(reply)
    }

    /// Wait up to [`Self::REPLY_TIMEOUT_MS`] for a word from Core 1.
    fn read_word<D>(&mut self, delay: &mut D) -> Option<u32>
    where
        D: DelayNs,
    {
        let attempts = (Self::REPLY_TIMEOUT_MS * 1000) / Self::POLL_INTERVAL_US;
        for _ in 0..attempts {
            if let Some(word) = self.fifo.read() {
                return Some(word);
            }
            delay.delay_us(Self::POLL_INTERVAL_US);
        }
        None
    }

    /// Read the rest of a fault report. Core 1 may still be writing it.
    fn read_fault<D>(&mut self, marker: u32, delay: &mut D) -> Fault
    where
        D: DelayNs,
    {
        match marker {
            FAULT_PANIC => match self.read_word(delay) {
                Some(line) => Fault::Panic { line },
                None => Fault::Truncated { marker },
            },
            FAULT_HARDFAULT => {
                let mut registers = [0u32; 7];
                for register in registers.iter_mut() {
                    let Some(value) = self.read_word(delay) else {
                        return Fault::Truncated { marker };
                    };
                    *register = value;
                }
                Fault::HardFault { registers }
            }
            _ => Fault::PanicNoLocation,
        }
    }
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Does this word start a fault report?
const fn is_fault_marker(word: u32) -> bool {
    matches!(
        word,
        FAULT_PANIC | FAULT_PANIC_NO_LOCATION | FAULT_HARDFAULT
    )
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Stands in for Core 1: each command written gets the next canned answer.
    #[derive(Default)]
    struct FakeCore1 {
        incoming: VecDeque<u32>,
        answers: VecDeque<Vec<u32>>,
        sent: Vec<u32>,
    }

    impl FakeCore1 {
        fn answering(answers: &[&[u32]]) -> FakeCore1 {
            FakeCore1 {
                answers: answers.iter().map(|a| a.to_vec()).collect(),
                ..FakeCore1::default()
            }
        }
    }

    impl InterCoreFifo for FakeCore1 {
        fn read(&mut self) -> Option<u32> {
            self.incoming.pop_front()
        }

        fn write_blocking(&mut self, value: u32) {
            self.sent.push(value);
            if let Some(answer) = self.answers.pop_front() {
                self.incoming.extend(answer);
            }
        }
    }

    /// Keeps track of how long we were asked to wait
    #[derive(Default)]
    struct FakeDelay {
        waited_ns: u64,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.waited_ns += u64::from(ns);
        }
    }

    #[test]
    fn configure_sends_timing_then_delay() {
        let mut supervisor = Supervisor::new(FakeCore1::answering(&[&[1], &[3]]));
        let mut delay = FakeDelay::default();
        let in_use = supervisor.configure(&mut delay, TimingMode::T640x400, 3);
        assert_eq!(in_use, Ok(3));
        assert_eq!(
            supervisor.fifo.sent,
            [
                Command::SetTiming(TimingMode::T640x400).encode(),
                Command::SetUpdateDelay(3).encode()
            ]
        );
        assert_eq!(delay.waited_ns, 0);
    }

    #[test]
    fn poll_reports_progress_since_last_time() {
        let mut supervisor = Supervisor::new(FakeCore1::answering(&[
            &[120],
            &[7],
            &[2],
            &[240],
            &[40],
            &[2],
        ]));
        let mut delay = FakeDelay::default();
        let first = supervisor.poll(&mut delay).unwrap();
        assert_eq!(first.frame_count, 120);
        assert_eq!(first.frames_since_last, 120);
        assert_eq!(first.phase, Phase::new(7));
        assert_eq!(first.overruns_since_last, 2);
        let second = supervisor.poll(&mut delay).unwrap();
        assert_eq!(second.frames_since_last, 120);
        assert_eq!(second.phase, Phase::new(8));
        assert_eq!(second.overruns, 2);
        assert_eq!(second.overruns_since_last, 0);
    }

    #[test]
    fn silence_is_a_timeout() {
        let mut supervisor = Supervisor::new(FakeCore1::default());
        let mut delay = FakeDelay::default();
        assert_eq!(
            supervisor.poll(&mut delay),
            Err(LinkError::Timeout(Command::GetFrameCount))
        );
        let timeout_ns = u64::from(Supervisor::<FakeCore1>::REPLY_TIMEOUT_MS) * 1_000_000;
        assert_eq!(delay.waited_ns, timeout_ns);
    }

    #[test]
    fn panic_instead_of_reply() {
        let mut supervisor = Supervisor::new(FakeCore1::answering(&[&[FAULT_PANIC, 42]]));
        let mut delay = FakeDelay::default();
        assert_eq!(
            supervisor.poll(&mut delay),
            Err(LinkError::Fault(Fault::Panic { line: 42 }))
        );

        let mut supervisor =
            Supervisor::new(FakeCore1::answering(&[&[FAULT_PANIC_NO_LOCATION]]));
        assert_eq!(
            supervisor.poll(&mut delay),
            Err(LinkError::Fault(Fault::PanicNoLocation))
        );
    }

    #[test]
    fn hardfault_registers() {
        let mut supervisor = Supervisor::new(FakeCore1::answering(&[&[
            FAULT_HARDFAULT,
            1,
            2,
            3,
            4,
            12,
            0x1004_0123,
            0x1004_0456,
        ]]));
        let mut delay = FakeDelay::default();
        assert_eq!(
            supervisor.poll(&mut delay),
            Err(LinkError::Fault(Fault::HardFault {
                registers: [1, 2, 3, 4, 12, 0x1004_0123, 0x1004_0456]
            }))
        );
    }

    #[test]
    fn half_a_fault_report() {
        let mut supervisor =
            Supervisor::new(FakeCore1::answering(&[&[FAULT_HARDFAULT, 1, 2]]));
        let mut delay = FakeDelay::default();
        assert_eq!(
            supervisor.poll(&mut delay),
            Err(LinkError::Fault(Fault::Truncated {
                marker: FAULT_HARDFAULT
            }))
        );

        let mut supervisor = Supervisor::new(FakeCore1::answering(&[&[FAULT_PANIC]]));
        assert_eq!(
            supervisor.poll(&mut delay),
            Err(LinkError::Fault(Fault::Truncated {
                marker: FAULT_PANIC
            }))
        );
    }

    #[test]
    fn fault_waiting_before_we_ask() {
        let mut core1 = FakeCore1::answering(&[&[5]]);
        core1.incoming.extend([FAULT_PANIC, 99]);
        let mut supervisor = Supervisor::new(core1);
        let mut delay = FakeDelay::default();
        assert_eq!(
            supervisor.configure(&mut delay, TimingMode::T640x480, 3),
            Err(LinkError::Fault(Fault::Panic { line: 99 }))
        );
        // we never got as far as sending anything
        assert!(supervisor.fifo.sent.is_empty());
    }

    #[test]
    fn stale_replies_are_dropped() {
        let mut core1 = FakeCore1::answering(&[&[1], &[4]]);
        // left over from a request that timed out
        core1.incoming.push_back(77);
        let mut supervisor = Supervisor::new(core1);
        let mut delay = FakeDelay::default();
        assert_eq!(supervisor.check(&mut delay), Ok(()));
        assert_eq!(
            supervisor.configure(&mut delay, TimingMode::T640x480, 4),
            Ok(4)
        );
    }

    #[test]
    fn fault_markers() {
        assert!(is_fault_marker(FAULT_PANIC));
        assert!(is_fault_marker(FAULT_PANIC_NO_LOCATION));
        assert!(is_fault_marker(FAULT_HARDFAULT));
        assert!(!is_fault_marker(0xDDDD_0004));
        assert!(!is_fault_marker(1));
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
