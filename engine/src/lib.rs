//! # Plasma raster effect engine
//!
//! Generates a scrolling "plasma" raster effect from two small lookup tables.
//!
//! Once per frame the engine walks the visible scan-lines in blocks of
//! [`config::VERTICAL_PIXEL_SIZE`] lines, turns the block number and the
//! current animation phase into an index into the [`tables::SineTable`],
//! folds the amplitude it finds into the [`tables::PaletteTable`], and hands
//! the resulting output [`tables::Level`] to a [`port::PortDriver`] for every
//! line of the block.
//!
//! The animation phase is advanced by the [`clock::FrameClock`], once every
//! `update_delay` vertical refreshes.
//!
//! [`supervisor::Supervisor`] is Core 0's side of the command link, written
//! against the [`supervisor::InterCoreFifo`] trait.
//!
//! This crate knows nothing about the hardware. The firmware in `core1` drives
//! the VGA output and implements [`port::PortDriver`] on top of its scan-line
//! buffers.

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

#![cfg_attr(not(test), no_std)]

// -----------------------------------------------------------------------------
// Logging
// -----------------------------------------------------------------------------

// These forward to `defmt` when the `defmt` feature is on, and vanish
// otherwise, so the host tests don't need a global logger.

macro_rules! warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)*);
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);
    };
}

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod port;
pub mod raster;
pub mod supervisor;
pub mod tables;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

pub use clock::{FrameClock, Phase, Tick};
pub use command::{Command, TimingMode};
pub use config::Config;
pub use engine::{Engine, FrameOutcome, FrameReport};
pub use port::PortDriver;
pub use raster::{Frame, RasterGenerator};
pub use supervisor::{Fault, InterCoreFifo, LinkError, Status, Supervisor};
pub use tables::{Level, PaletteTable, SineTable, TableId, Tables, TABLES};

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
