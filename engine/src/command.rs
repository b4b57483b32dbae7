//! Commands sent from Core 0 to the renderer on Core 1.
//!
//! Each command is one 32-bit SIO FIFO word: the top eight bits say what to do
//! and the bottom 24 bits carry an argument. Every command gets exactly one
//! word back.

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

/// The video timings the renderer can generate.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimingMode {
    /// 640 x 480 @ 60 Hz
    #[default]
    T640x480 = 0,
    /// 640 x 400 @ 70 Hz
    T640x400 = 1,
}

impl TimingMode {
    /// Convert from the wire value
    pub const fn from_u8(value: u8) -> Option<TimingMode> {
        match value {
            0 => Some(TimingMode::T640x480),
            1 => Some(TimingMode::T640x400),
            _ => None,
        }
    }

    /// How many visible scan-lines this timing has
    pub const fn visible_lines(self) -> u16 {
        match self {
            TimingMode::T640x480 => 480,
            TimingMode::T640x400 => 400,
        }
    }
}

/// A request from Core 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Switch video timing. Replies `1`.
    SetTiming(TimingMode),
    /// Change the animation speed. Replies with the delay now in use.
    SetUpdateDelay(u8),
    /// Replies with the number of frames rendered.
    GetFrameCount,
    /// Replies with the current animation phase.
    GetPhase,
    /// Replies with the number of frame passes that overran.
    GetOverruns,
}

impl Command {
    const SET_TIMING: u32 = 0xB0;
    const SET_UPDATE_DELAY: u32 = 0xB1;
    const GET_FRAME_COUNT: u32 = 0xB2;
    const GET_PHASE: u32 = 0xB3;
    const GET_OVERRUNS: u32 = 0xB4;

    /// Pack this command into a FIFO word
    pub const fn encode(self) -> u32 {
        let (command, arg) = match self {
            Command::SetTiming(mode) => (Self::SET_TIMING, mode as u32),
            Command::SetUpdateDelay(delay) => (Self::SET_UPDATE_DELAY, delay as u32),
            Command::GetFrameCount => (Self::GET_FRAME_COUNT, 0),
            Command::GetPhase => (Self::GET_PHASE, 0),
            Command::GetOverruns => (Self::GET_OVERRUNS, 0),
        };
        (command << 24) | arg
    }

    /// Unpack a FIFO word.
    ///
    /// Returns `None` for unknown commands and bad arguments.
    pub const fn decode(word: u32) -> Option<Command> {
        let command = word >> 24;
        let arg = word & 0xFF_FFFF;
        match command {
            Self::SET_TIMING => {
                if arg > 0xFF {
                    return None;
                }
                match TimingMode::from_u8(arg as u8) {
                    Some(mode) => Some(Command::SetTiming(mode)),
                    None => None,
                }
            }
            Self::SET_UPDATE_DELAY => {
                if arg > 0xFF {
                    return None;
                }
                Some(Command::SetUpdateDelay(arg as u8))
            }
            Self::GET_FRAME_COUNT => Some(Command::GetFrameCount),
            Self::GET_PHASE => Some(Command::GetPhase),
            Self::GET_OVERRUNS => Some(Command::GetOverruns),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Core 1 sends this, then a line number, when it panics.
pub const FAULT_PANIC: u32 = 0xDDDD_0001;

/// Core 1 sends this when it panics without a location.
pub const FAULT_PANIC_NO_LOCATION: u32 = 0xDDDD_0002;

/// Core 1 sends this, then seven registers, when it takes a HardFault.
pub const FAULT_HARDFAULT: u32 = 0xDDDD_0003;

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_survive_the_fifo() {
        for command in [
            Command::SetTiming(TimingMode::T640x480),
            Command::SetTiming(TimingMode::T640x400),
            Command::SetUpdateDelay(0),
            Command::SetUpdateDelay(255),
            Command::GetFrameCount,
            Command::GetPhase,
            Command::GetOverruns,
        ] {
            assert_eq!(Command::decode(command.encode()), Some(command));
        }
    }

    #[test]
    fn wire_format() {
        assert_eq!(Command::SetTiming(TimingMode::T640x400).encode(), 0xB000_0001);
        assert_eq!(Command::SetUpdateDelay(3).encode(), 0xB100_0003);
        assert_eq!(Command::GetOverruns.encode(), 0xB400_0000);
    }

    #[test]
    fn junk_is_rejected() {
        assert_eq!(Command::decode(0), None);
        assert_eq!(Command::decode(0xA000_0001), None);
        assert_eq!(Command::decode(0xB000_0002), None);
        assert_eq!(Command::decode(0xB000_0100), None);
        // a delay of 256 must not quietly become 0
        assert_eq!(Command::decode(0xB100_0100), None);
        assert_eq!(Command::decode(0xB1FF_FFFF), None);
        assert_eq!(Command::decode(FAULT_PANIC), None);
    }

    #[test]
    fn timing_modes() {
        assert_eq!(TimingMode::default().visible_lines(), 480);
        assert_eq!(TimingMode::T640x400.visible_lines(), 400);
        assert_eq!(TimingMode::from_u8(1), Some(TimingMode::T640x400));
        assert_eq!(TimingMode::from_u8(2), None);
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
