//! # pico-plasma
//!
//! Rust Firmware for a VGA plasma effect on the RP2040.
//!
//! This is the firmware for Core 0. It brings the board up, starts the
//! renderer on Core 1, and then keeps an eye on it.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
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

#![no_std]
#![no_main]

mod hw;

use defmt::*;
use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use panic_probe as _;
use plasma_engine::{config::UPDATE_DELAY, LinkError, Supervisor, TimingMode};
use rp2040_hal as hal;

use hal::pac;

#[link_section = ".boot2"]
#[no_mangle]
#[used]
pub static BOOT2_FIRMWARE: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

/// The video timing we ask Core 1 for at start-up
const TIMING_MODE: TimingMode = TimingMode::T640x480;

/// How long between status checks
const POLL_PERIOD_MS: u32 = 2000;

#[hal::entry]
fn main() -> ! {
    info!(
        "Firmware {} {} starting up",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let Some(periph) = pac::Peripherals::take() else {
        defmt::panic!("Peripherals already taken");
    };

    let hw = match hw::Hardware::init(periph) {
        Ok(hw) => hw,
        Err(e) => defmt::panic!("Hardware init failed: {}", e),
    };
    let mut delay = hw.delay;
    let mut supervisor = Supervisor::new(hw.fifo);

    match supervisor.configure(&mut delay, TIMING_MODE, UPDATE_DELAY) {
        Ok(update_delay) => info!(
            "Core 1 running {} with update delay {=u8}",
            TIMING_MODE, update_delay
        ),
        Err(e) => link_failed(e),
    }

    info!("Looping...");

    loop {
        delay.delay_ms(POLL_PERIOD_MS);
        let status = match supervisor.poll(&mut delay) {
            Ok(status) => status,
            Err(e) => link_failed(e),
        };
        info!(
            "Frame {=u32} ({=u32} fps), phase {}",
            status.frame_count,
            status.frames_since_last / (POLL_PERIOD_MS / 1000),
            status.phase
        );
        if status.overruns_since_last != 0 {
            warn!(
                "{=u32} frames overran ({=u32} in total)",
                status.overruns_since_last,
                status.overruns
            );
        }
    }
}

/// Core 1 has stopped talking to us.
///
/// Core 1 can't be restarted on its own, so we reboot the whole chip.
fn link_failed(error: LinkError) -> ! {
    match error {
        LinkError::Timeout(command) => {
            error!("Core 1 didn't answer {}", command);
        }
        LinkError::Fault(fault) => {
            error!("Core 1 crashed: {}", fault);
        }
    }
    hw::watchdog_reboot();
}

// End of file
