//! The boundary between the engine and whatever drives the display.

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

use crate::tables::Level;

/// Something that can put a level on a scan-line.
///
/// `emit` is called once per physical scan-line, in raster order, and must
/// return well within one line time. It must not block.
pub trait PortDriver {
    /// Output `level` for the whole of scan-line `line`.
    fn emit(&mut self, level: Level, line: u16);
}

impl<F> PortDriver for F
where
    F: FnMut(Level, u16),
{
    fn emit(&mut self, level: Level, line: u16) {
        self(level, line)
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
