//! The firmware that runs on Core 1
//!
//! This core assumes that all the GPIO set-up has been done on Core 0 already.
//!
//! All this firmware does is work out the plasma level for each scan-line,
//! fill the scan-line buffers, and push them out using PIO0. It answers
//! commands from Core 0 once per frame.

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

mod vga;

use cortex_m_rt::exception;
use plasma_engine::command::{FAULT_HARDFAULT, FAULT_PANIC, FAULT_PANIC_NO_LOCATION};
use rp2040_hal::{self as hal, pac};

extern "C" {
    static FLASH_ORIGIN: u32;
}

/// The entry point to this firmare
///
/// # Safety
///
/// Do not call this function manually - only let the Boot ROM call this
/// function.
#[cortex_m_rt::entry]
fn main() -> ! {
    // Note: Core 0 is going to be using most of these so we must be careful.
    let Some(periph) = pac::Peripherals::take() else {
        panic!("Peripherals taken twice");
    };
    // only keep the FIFO - we don't want to touch anything else
    let sio = hal::sio::Sio::new(periph.SIO);
    let fifo = sio.fifo;
    let pio = periph.PIO0;
    let dma = periph.DMA;
    let ppb = periph.PPB;
    let mut resets = periph.RESETS;

    // set up our vector table (we have our own, different to Core 0)
    ppb.vtor().write(|w| {
        unsafe {
            w.bits(core::ptr::addr_of!(FLASH_ORIGIN) as u32);
        }
        w
    });

    vga::init(pio, dma, &mut resets);

    // We are on Core 1, so these interrupts will run on Core 1
    unsafe {
        cortex_m::peripheral::NVIC::unpend(crate::pac::Interrupt::PIO0_IRQ_1);
        cortex_m::peripheral::NVIC::unmask(crate::pac::Interrupt::PIO0_IRQ_1);
        cortex_m::interrupt::enable();
    }

    vga::render_loop(fifo);
}

/// Tell Core 0 where we were, then stop.
#[exception(trampoline = true)]
unsafe fn HardFault(frame: &cortex_m_rt::ExceptionFrame) -> ! {
    fifo_write(FAULT_HARDFAULT);
    for register in [
        frame.r0(),
        frame.r1(),
        frame.r2(),
        frame.r3(),
        frame.r12(),
        frame.lr(),
        frame.pc(),
    ] {
        fifo_write(register);
    }
    loop {}
}

#[panic_handler]
fn panic_handler(info: &core::panic::PanicInfo) -> ! {
    if let Some(location) = info.location() {
        fifo_write(FAULT_PANIC);
        fifo_write(location.line());
    } else {
        fifo_write(FAULT_PANIC_NO_LOCATION);
    }
    loop {}
}

fn fifo_ready() -> bool {
    let sio = unsafe { &(*pac::SIO::ptr()) };
    sio.fifo_st().read().rdy().bit_is_set()
}

/// Write to the inter-core FIFO without needing the `SioFifo`.
///
/// For the fault handlers, which can't get at the one the render loop owns.
pub fn fifo_write(value: u32) {
    while !fifo_ready() {
        core::hint::spin_loop();
    }

    let sio = unsafe { &(*pac::SIO::ptr()) };
    sio.fifo_wr().write(|w| unsafe { w.bits(value) });
    // Wake the other core, in case it is sitting in `wfe`
    cortex_m::asm::sev();
}

// End of file
