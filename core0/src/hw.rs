//! HW related code for Core 0

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

use fugit::RateExtU32;
use rp2040_hal::{
    clocks,
    gpio::{
        bank0, Function, FunctionPio0, FunctionSioOutput, OutputDriveStrength, OutputSlewRate,
        Pin, PinId, Pins, PullNone, PullType, ValidFunction,
    },
    multicore, pac, pll,
    sio::SioFifo,
    xosc, Clock as _, Sio, Timer, Watchdog,
};
use plasma_engine::InterCoreFifo;

/// On-board crystal frequency, in Hz.
const XOSC_CRYSTAL_FREQ: u32 = 12_000_000;

/// What we leave in watchdog scratch register 7 once Core 0 is up
const RUNNING_MARKER: u32 = 0xDEAD_C0DE;

extern "C" {
    /// This is the start of Core1's vector table
    static CORE1_VECTOR_TABLE: MiniVectorTable;
}

#[repr(C)]
struct MiniVectorTable {
    pub stack_pointer: usize,
    pub reset_function: extern "C" fn() -> !,
}

/// Something went wrong bringing the board up.
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub enum InitError {
    /// The crystal oscillator didn't start
    Xosc,
    /// The system PLL didn't lock
    SysPll,
    /// The USB PLL didn't lock
    UsbPll,
    /// The clock tree wouldn't switch over to the PLLs
    Clocks,
    /// Core 1's vector table holds this stack pointer, which isn't in RAM
    Core1VectorTable(usize),
    /// Someone already took the Core 1 stack
    Core1Stack,
    /// Core 1 wouldn't start
    Core1Spawn,
}

pub struct RedPins {
    /// Red colour data bit 0 (the LSB)
    _bit0: Pin<bank0::Gpio0, FunctionPio0, PullNone>,
    /// Red colour data bit 1
    _bit1: Pin<bank0::Gpio1, FunctionPio0, PullNone>,
    /// Red colour data bit 2
    _bit2: Pin<bank0::Gpio2, FunctionPio0, PullNone>,
    /// Red colour data bit 3
    _bit3: Pin<bank0::Gpio3, FunctionPio0, PullNone>,
    /// Red colour data bit 4 (the MSB)
    _bit4: Pin<bank0::Gpio4, FunctionPio0, PullNone>,
}

pub struct GreenPins {
    /// Green colour data bit 0 (the LSB)
    _bit0: Pin<bank0::Gpio6, FunctionPio0, PullNone>,
    /// Green colour data bit 1
    _bit1: Pin<bank0::Gpio7, FunctionPio0, PullNone>,
    /// Green colour data bit 2
    _bit2: Pin<bank0::Gpio8, FunctionPio0, PullNone>,
    /// Green colour data bit 3
    _bit3: Pin<bank0::Gpio9, FunctionPio0, PullNone>,
    /// Green colour data bit 4 (the MSB)
    _bit4: Pin<bank0::Gpio10, FunctionPio0, PullNone>,
}

pub struct BluePins {
    /// Blue colour data bit 0 (the LSB)
    _bit0: Pin<bank0::Gpio11, FunctionPio0, PullNone>,
    /// Blue colour data bit 1
    _bit1: Pin<bank0::Gpio12, FunctionPio0, PullNone>,
    /// Blue colour data bit 2
    _bit2: Pin<bank0::Gpio13, FunctionPio0, PullNone>,
    /// Blue colour data bit 3
    _bit3: Pin<bank0::Gpio14, FunctionPio0, PullNone>,
    /// Blue colour data bit 4 (the MSB)
    _bit4: Pin<bank0::Gpio15, FunctionPio0, PullNone>,
}

pub struct VgaPins {
    /// Analog value for the red channel, over five bits
    _red_pins: RedPins,
    /// Analog value for the green channel, over five bits
    _green_pins: GreenPins,
    /// Analog value for the blue channel, over five bits
    _blue_pins: BluePins,
    /// Horizontal Sync pin
    _h_sync: Pin<bank0::Gpio16, FunctionPio0, PullNone>,
    /// Vertical Sync pin
    _v_sync: Pin<bank0::Gpio17, FunctionPio0, PullNone>,
}

pub struct Hardware {
    /// Our pins for VGA video output
    ///
    /// These pins are all controlled by PIO0, which is driven from the Core 1
    /// firmware. We just set them up on this side whilst we set up all the
    /// other pins.
    pub _vga_pins: VgaPins,
    /// Our blinky LED. Core 1 toggles it through the SIO while it draws.
    pub _led: Pin<bank0::Gpio25, FunctionSioOutput, PullNone>,
    /// Our FIFO, for talking to Core 1
    pub fifo: Core1Fifo,
    /// The microsecond timer, which we use for delays
    pub delay: Timer,
}

/// The SIO FIFO, as the supervisor sees it
pub struct Core1Fifo(SioFifo);

impl InterCoreFifo for Core1Fifo {
    fn read(&mut self) -> Option<u32> {
        self.0.read()
    }

    fn write_blocking(&mut self, value: u32) {
        self.0.write_blocking(value);
    }
}

impl Hardware {
    /// Call this once on start-up to initialise the hardware and start Core 1
    pub fn init(mut periph: pac::Peripherals) -> Result<Hardware, InitError> {
        // Check if stuff is running that shouldn't be. If so, do a full watchdog reboot.
        if stuff_running(&mut periph) {
            watchdog_reboot();
        }

        let mut watchdog = Watchdog::new(periph.WATCHDOG);
        let sio = Sio::new(periph.SIO);

        defmt::info!("Configuring clocks...");

        // Run at 151.2 MHz SYS_PLL, 48 MHz, USB_PLL. This is important, we as clock
        // the PIO at ÷ 6, to give 25.2 MHz (which is close enough to the 25.175
        // MHz standard VGA pixel clock).

        // Step 1. Turn on the crystal.
        let xosc = xosc::setup_xosc_blocking(periph.XOSC, XOSC_CRYSTAL_FREQ.Hz())
            .map_err(|_| InitError::Xosc)?;
        // Step 2. Configure watchdog tick generation to tick over every microsecond.
        watchdog.enable_tick_generation((XOSC_CRYSTAL_FREQ / 1_000_000) as u8);
        // Step 3. Create a clocks manager.
        let mut clocks = clocks::ClocksManager::new(periph.CLOCKS);
        // Step 4. Set up the system PLL.
        //
        // 12 MHz × 126 gives a FOUTVCO of 1512 MHz (it must be in the range
        // 750 MHz - 1600 MHz). Then ÷5 and ÷2 on the post dividers gives
        // 151.2 MHz.
        //
        // From the RP2040 Datasheet, Section 2.18.2.1:
        //
        // > Jitter is minimised by running the VCO at the highest possible
        // > frequency, so that higher post-divide values can be used.
        let pll_sys = pll::setup_pll_blocking(
            periph.PLL_SYS,
            xosc.operating_frequency(),
            pll::PLLConfig {
                vco_freq: 1512.MHz(),
                refdiv: 1,
                post_div1: 5,
                post_div2: 2,
            },
            &mut clocks,
            &mut periph.RESETS,
        )
        .map_err(|_| InitError::SysPll)?;
        // Step 5. Set up a 48 MHz PLL for the USB system.
        let pll_usb = pll::setup_pll_blocking(
            periph.PLL_USB,
            xosc.operating_frequency(),
            pll::common_configs::PLL_USB_48MHZ,
            &mut clocks,
            &mut periph.RESETS,
        )
        .map_err(|_| InitError::UsbPll)?;
        // Step 6. Set the system to run from the PLLs we just configured.
        clocks
            .init_default(&xosc, &pll_sys, &pll_usb)
            .map_err(|_| InitError::Clocks)?;

        defmt::info!(
            "Clocks OK! System clock is {=u32} Hz",
            clocks.system_clock.freq().to_Hz()
        );

        defmt::info!("Configuring pins...");

        let hal_pins = Pins::new(
            periph.IO_BANK0,
            periph.PADS_BANK0,
            sio.gpio_bank0,
            &mut periph.RESETS,
        );

        let vga_pins = VgaPins {
            _red_pins: RedPins {
                _bit0: vga_pin(hal_pins.gpio0),
                _bit1: vga_pin(hal_pins.gpio1),
                _bit2: vga_pin(hal_pins.gpio2),
                _bit3: vga_pin(hal_pins.gpio3),
                _bit4: vga_pin(hal_pins.gpio4),
            },
            _green_pins: GreenPins {
                _bit0: vga_pin(hal_pins.gpio6),
                _bit1: vga_pin(hal_pins.gpio7),
                _bit2: vga_pin(hal_pins.gpio8),
                _bit3: vga_pin(hal_pins.gpio9),
                _bit4: vga_pin(hal_pins.gpio10),
            },
            _blue_pins: BluePins {
                _bit0: vga_pin(hal_pins.gpio11),
                _bit1: vga_pin(hal_pins.gpio12),
                _bit2: vga_pin(hal_pins.gpio13),
                _bit3: vga_pin(hal_pins.gpio14),
                _bit4: vga_pin(hal_pins.gpio15),
            },
            _h_sync: vga_pin(hal_pins.gpio16),
            _v_sync: vga_pin(hal_pins.gpio17),
        };

        let led = hal_pins.gpio25.reconfigure();

        // Runs off the watchdog tick we set up above
        let timer = Timer::new(periph.TIMER, &mut periph.RESETS, &clocks);

        let mut sio_fifo = sio.fifo;
        defmt::info!("Setting up Core 1...");
        start_core1(
            periph.DMA,
            periph.PIO0,
            periph.RESETS,
            &mut periph.PSM,
            &mut periph.PPB,
            &mut sio_fifo,
        )?;
        defmt::info!("HW init complete");

        Ok(Hardware {
            _vga_pins: vga_pins,
            _led: led,
            fifo: Core1Fifo(sio_fifo),
            delay: timer,
        })
    }
}

/// Hand a pin over to PIO0, set up for driving the VGA DAC.
fn vga_pin<I, F, P>(pin: Pin<I, F, P>) -> Pin<I, FunctionPio0, PullNone>
where
    I: PinId + ValidFunction<FunctionPio0>,
    F: Function,
    P: PullType,
{
    let mut pin = pin.reconfigure();
    pin.set_drive_strength(OutputDriveStrength::EightMilliAmps);
    pin.set_slew_rate(OutputSlewRate::Fast);
    pin
}

/// Check if the rest of the system appears to be running already.
///
/// If so, returns `true`, else `false`.
///
/// This probably means Core 0 reset but the rest of the system did not, and you
/// should do a hard reset to get everything back into sync.
fn stuff_running(p: &mut pac::Peripherals) -> bool {
    // Zero means a full clean boot-up. The marker means we were running and
    // Core 0 restarted without restarting everything else.
    let scratch = p.WATCHDOG.scratch7().read().bits();
    defmt::info!("WD Scratch is 0x{=u32:08x}", scratch);
    if scratch == RUNNING_MARKER {
        // we need a hard reset
        true
    } else {
        // set the marker so we know Core 0 has booted up
        p.WATCHDOG
            .scratch7()
            .write(|w| unsafe { w.bits(RUNNING_MARKER) });
        false
    }
}

/// Clear the scratch register so we don't force a full watchdog reboot on the
/// next boot.
fn clear_scratch() {
    let p = unsafe { pac::Peripherals::steal() };
    p.WATCHDOG.scratch7().write(|w| unsafe { w.bits(0) });
}

/// Do a full watchdog reboot, taking Core 1 and all the peripherals with us.
pub fn watchdog_reboot() -> ! {
    clear_scratch();
    let p = unsafe { pac::Peripherals::steal() };
    let mut watchdog = Watchdog::new(p.WATCHDOG);
    watchdog.start(fugit::Duration::<u32, 1, 1000000>::millis(10));
    loop {
        cortex_m::asm::wfi();
    }
}

/// Start the video renderer on Core 1.
///
/// Core 1 will use the RESETS, DMA and PIO0 peripherals, so we take ownership
/// of those objects away from the Core 0 firmware.
fn start_core1(
    _dma: pac::DMA,
    _pio: pac::PIO0,
    _resets: pac::RESETS,
    psm: &mut pac::PSM,
    ppb: &mut pac::PPB,
    fifo: &mut SioFifo,
) -> Result<(), InitError> {
    static CORE1_STACK: multicore::Stack<4096> = multicore::Stack::new();

    let mut multicore = multicore::Multicore::new(psm, ppb, fifo);
    let core1 = &mut multicore.cores()[1];
    let core1_vector_table = unsafe { &CORE1_VECTOR_TABLE };
    defmt::info!(
        "Core 1 sp=0x{=usize:08x}, reset=0x{=usize:08x}",
        core1_vector_table.stack_pointer,
        core1_vector_table.reset_function as usize
    );
    // off the top of the chip? (or blank...)
    if !(0x2000_0000..=0x2004_2000).contains(&core1_vector_table.stack_pointer) {
        return Err(InitError::Core1VectorTable(
            core1_vector_table.stack_pointer,
        ));
    }
    defmt::info!("Spawning Core 1...");
    // give Core 1 some of our stack, rather than trusting its stack pointer
    let stack = CORE1_STACK.take().ok_or(InitError::Core1Stack)?;
    let reset_func = core1_vector_table.reset_function;
    core1
        .spawn(stack, move || reset_func())
        .map_err(|_| InitError::Core1Spawn)
}

// End of file
