//! # VGA Plasma Renderer for the RP2040 VGA board.
//!
//! VGA output uses 17 GPIO pins and two PIO state machines.
//!
//! It can generate 640x480@60Hz and 640x400@70Hz standard VGA video, with a
//! 25.2 MHz pixel clock (the standard is 25.175 MHz, so we are 0.1% off). The
//! assumption is that the CPU is clocked at 151.2 MHz, i.e. 6x the pixel clock.
//! All of the PIO code relies on this assumption!
//!
//! The picture is a full-screen plasma, produced one scan-line at a time by
//! the [`plasma_engine::Engine`]. Every visible line is a single colour, so a
//! scan-line buffer only needs filling when the level changes.
//!
//! This code is derived from the pico-term-rs VGA driver, which in turn came
//! from the Neotron PICO BIOS.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) Jonathan 'theJPster' Pallant and the Neotron Developers, 2023
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

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

mod rgb;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use crate::hal::{self, pac::interrupt, pio::PIOExt};
use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, AtomicUsize, Ordering},
};
use plasma_engine::{Command, Engine, FrameReport, Level, PortDriver, TimingMode};
use rp2040_hal::sio::SioFifo;

pub use rgb::{RGBColour, RGBPair};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Describes the polarity of a sync pulse.
///
/// Some pulses are positive (active-high), some are negative (active-low).
#[derive(Copy, Clone)]
enum SyncPolarity {
    /// An active-high pulse
    Positive,
    /// An active-low pulse
    Negative,
}

impl SyncPolarity {
    const fn enabled(&self) -> bool {
        match self {
            SyncPolarity::Positive => true,
            SyncPolarity::Negative => false,
        }
    }

    const fn disabled(&self) -> bool {
        !self.enabled()
    }
}

/// Holds some data necessary to run the Video.
///
/// This structure is owned entirely by the render loop. Data handled under
/// interrupt is stored in various statics.
struct RenderEngine {
    /// Works out what colour each line is, and owns the animation state
    engine: Engine,
    /// Writes levels into the scan-line buffers
    port: ScanLinePort,
    /// The value of [`REFRESH_COUNT`] at the end of the last frame
    seen_refreshes: u32,
    /// The value of [`LATE_LINE_COUNT`] at the end of the last frame
    seen_late_lines: u32,
}

impl RenderEngine {
    // Initialise the render-loop resources
    pub fn new() -> RenderEngine {
        RenderEngine {
            // Should match the default value of CURRENT_TIMING_MODE
            engine: Engine::default(),
            port: ScanLinePort,
            seen_refreshes: REFRESH_COUNT.load(Ordering::Relaxed),
            seen_late_lines: LATE_LINE_COUNT.load(Ordering::Relaxed),
        }
    }

    /// Call this once per frame, after the last visible line is drawn.
    pub fn new_frame(&mut self, fifo: &mut SioFifo) {
        let refreshes = REFRESH_COUNT.load(Ordering::Relaxed);
        let late_lines = LATE_LINE_COUNT.load(Ordering::Relaxed);
        let report = FrameReport {
            refreshes: refreshes.wrapping_sub(self.seen_refreshes),
            late_lines: late_lines.wrapping_sub(self.seen_late_lines),
        };
        self.seen_refreshes = refreshes;
        self.seen_late_lines = late_lines;
        self.engine.end_of_frame(report);

        while let Some(read_value) = fifo.read() {
            let Some(command) = Command::decode(read_value) else {
                // ignored
                continue;
            };
            let reply = self.engine.apply(command);
            if let Command::SetTiming(mode) = command {
                // Tell the ISR to now generate our newly chosen timing
                CURRENT_TIMING_MODE.store(mode as usize, Ordering::Relaxed);
            }
            fifo.write_blocking(reply);
        }
    }

    /// Draw a line of pixels into the relevant pixel buffer (either
    /// [`PIXEL_DATA_BUFFER_ODD`] or [`PIXEL_DATA_BUFFER_EVEN`]).
    ///
    /// The `current_line_num` goes from `0..NUM_LINES`.
    #[link_section = ".data"]
    pub fn draw_next_line(&mut self, current_line_num: u16) {
        let level = self.engine.line_level(current_line_num);
        self.port.emit(level, current_line_num);
    }

    /// The last visible line in the current video mode
    fn last_visible_line(&self) -> u16 {
        self.engine.config().visible_lines() - 1
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        RenderEngine::new()
    }
}

/// Puts levels onto the screen by filling scan-line buffers.
struct ScanLinePort;

impl PortDriver for ScanLinePort {
    #[link_section = ".data"]
    fn emit(&mut self, level: Level, line: u16) {
        // Pick a buffer to render into based on the line number we are drawing.
        // It's safe to write to this buffer because it's the the other one that
        // is currently being DMA'd out to the Pixel SM.
        let scan_line_buffer = if (line & 1) == 0 {
            &PIXEL_DATA_BUFFER_EVEN
        } else {
            &PIXEL_DATA_BUFFER_ODD
        };
        scan_line_buffer.fill(level);
    }
}

/// Describes one scan-line's worth of pixels, including the length word required by the Pixel FIFO.
#[repr(C, align(16))]
struct LineBuffer {
    /// Must be one less than the number of pixel-pairs in `pixels`
    length: u32,
    /// Pixels to be displayed, grouped into pairs (to save FIFO space and reduce DMA bandwidth)
    pixels: UnsafeCell<[RGBPair; MAX_NUM_PIXEL_PAIRS_PER_LINE]>,
    /// Which level `pixels` currently holds, or [`LineBuffer::NO_LEVEL`].
    ///
    /// Not sent to the PIO; the DMA stops after `pixels`.
    level: AtomicU8,
}

impl LineBuffer {
    /// Marks a buffer which has never been filled
    const NO_LEVEL: u8 = 0xFF;

    /// Make a new, black, LineBuffer
    const fn new() -> LineBuffer {
        LineBuffer {
            length: (MAX_NUM_PIXEL_PAIRS_PER_LINE as u32) - 1,
            pixels: UnsafeCell::new(
                [RGBPair::from_pixels(RGBColour::BLACK, RGBColour::BLACK);
                    MAX_NUM_PIXEL_PAIRS_PER_LINE],
            ),
            level: AtomicU8::new(Self::NO_LEVEL),
        }
    }

    /// Get a pointer to the entire linebuffer.
    ///
    /// This produces a 32-bit address that the DMA engine understands.
    fn as_ptr(&self) -> u32 {
        self as *const _ as usize as u32
    }

    /// Get a pointer to the pixel data
    fn pixel_ptr(&self) -> *mut RGBPair {
        self.pixels.get() as *mut RGBPair
    }

    /// Make every pixel in this line the colour for `level`.
    ///
    /// Does nothing if the buffer already holds that level.
    #[link_section = ".data"]
    fn fill(&self, level: Level) {
        if self.level.load(Ordering::Relaxed) == level.value() {
            return;
        }
        let colour = RGBColour::from_level(level);
        let pair = RGBPair::from_pixels(colour, colour);
        let mut scan_line_buffer_ptr = self.pixel_ptr();
        for _ in 0..MAX_NUM_PIXEL_PAIRS_PER_LINE {
            // Note (unsafe): We write exactly as many pairs as the buffer
            // holds, and the DMA is reading the other buffer.
            unsafe {
                scan_line_buffer_ptr.write(pair);
                scan_line_buffer_ptr = scan_line_buffer_ptr.add(1);
            }
        }
        self.level.store(level.value(), Ordering::Relaxed);
    }
}

unsafe impl Sync for LineBuffer {}

/// The kind of IRQ we want to raise
#[derive(Debug, Copy, Clone)]
enum RaiseIrq {
    None,
    Irq0,
    Irq1,
}

impl RaiseIrq {
    const IRQ0_INSTR: u16 = pio::InstructionOperands::IRQ {
        clear: false,
        wait: false,
        index: 0,
        relative: false,
    }
    .encode();

    const IRQ1_INSTR: u16 = pio::InstructionOperands::IRQ {
        clear: false,
        wait: false,
        index: 1,
        relative: false,
    }
    .encode();

    const IRQ_NONE_INSTR: u16 = pio::InstructionOperands::MOV {
        destination: pio::MovDestination::Y,
        op: pio::MovOperation::None,
        source: pio::MovSource::Y,
    }
    .encode();

    /// Produces a PIO command that raises the appropriate IRQ
    #[inline]
    pub const fn into_command(self) -> u16 {
        match self {
            RaiseIrq::None => Self::IRQ_NONE_INSTR,
            RaiseIrq::Irq0 => Self::IRQ0_INSTR,
            RaiseIrq::Irq1 => Self::IRQ1_INSTR,
        }
    }
}

/// Which part of the frame a scan-line belongs to, vertically.
#[derive(Debug, Copy, Clone)]
enum VerticalPortion {
    /// Pixels are shown on this line
    Visible,
    /// Blanking, either side of the sync pulse
    Porch,
    /// The V-Sync pulse
    Sync,
}

/// Holds the four scan-line timing FIFO words we need for one scan-line.
///
/// See `make_timing` for a function which can generate these words. We DMA
/// them into the timing FIFO, so they must sit on a 16-byte boundary.
#[repr(C, align(16))]
struct ScanlineTimingBuffer {
    data: [u32; 4],
}

impl ScanlineTimingBuffer {
    const CLOCKS_PER_PIXEL: u32 = 6;

    /// Make the timing words for one scan-line.
    ///
    /// The `timings` are in the order (front-porch, sync, back-porch,
    /// visible) and are in pixel clocks. Every line raises IRQ 1 at the start
    /// of its front porch. Visible lines also raise IRQ 0 to start the pixel
    /// state machine, and borrow a few clocks from the back-porch to cover the
    /// interrupt and state machine start latency.
    const fn new(
        portion: VerticalPortion,
        hsync: SyncPolarity,
        vsync: SyncPolarity,
        timings: (u32, u32, u32, u32),
    ) -> ScanlineTimingBuffer {
        let vsync_level = match portion {
            VerticalPortion::Sync => vsync.enabled(),
            VerticalPortion::Visible | VerticalPortion::Porch => vsync.disabled(),
        };
        let (latency, visible_irq) = match portion {
            VerticalPortion::Visible => (10, RaiseIrq::Irq0),
            VerticalPortion::Porch | VerticalPortion::Sync => (0, RaiseIrq::None),
        };
        ScanlineTimingBuffer {
            data: [
                // Front porch
                Self::make_timing(
                    timings.0 * Self::CLOCKS_PER_PIXEL,
                    hsync.disabled(),
                    vsync_level,
                    RaiseIrq::Irq1,
                ),
                // Sync pulse
                Self::make_timing(
                    timings.1 * Self::CLOCKS_PER_PIXEL,
                    hsync.enabled(),
                    vsync_level,
                    RaiseIrq::None,
                ),
                // Back porch
                Self::make_timing(
                    (timings.2 * Self::CLOCKS_PER_PIXEL) - latency,
                    hsync.disabled(),
                    vsync_level,
                    RaiseIrq::None,
                ),
                // Visible portion. Lengthened by whatever we took off the
                // back porch so the line stays the right length.
                Self::make_timing(
                    (timings.3 * Self::CLOCKS_PER_PIXEL) + latency,
                    hsync.disabled(),
                    vsync_level,
                    visible_irq,
                ),
            ],
        }
    }

    /// Generate a 32-bit value we can send to the Timing FIFO.
    ///
    /// * `period` - The length of this portion of the scan-line, in system clock ticks
    /// * `hsync` - true if the H-Sync pin should be high during this period, else false
    /// * `vsync` - true if the V-Sync pin should be high during this period, else false
    /// * `raise_irq` - which IRQ the timing statemachine should raise at the start of this period
    ///
    /// Returns a 32-bit value you can post to the Timing FIFO.
    #[inline]
    const fn make_timing(period: u32, hsync: bool, vsync: bool, raise_irq: RaiseIrq) -> u32 {
        let command = raise_irq.into_command() as u32;
        let mut value: u32 = 0;
        if hsync {
            value |= 1 << 0;
        }
        if vsync {
            value |= 1 << 1;
        }
        value |= (period - FIXED_CLOCKS_PER_TIMING_PULSE) << 2;
        value | command << 16
    }
}

/// Holds the different kinds of scan-line timing buffers we need for various
/// portions of the screen.
#[repr(C)]
struct TimingBuffer {
    /// We use this when there are visible pixels on screen
    visible_line: ScanlineTimingBuffer,
    /// We use this during the v-sync front-porch and v-sync back-porch
    vblank_porch_buffer: ScanlineTimingBuffer,
    /// We use this during the v-sync sync pulse
    vblank_sync_buffer: ScanlineTimingBuffer,
    /// The last visible scan-line,
    visible_lines_ends_at: u16,
    /// The last scan-line of the front porch
    front_porch_end_at: u16,
    /// The last scan-line of the sync pulse
    sync_pulse_ends_at: u16,
    /// The last scan-line of the back-porch (and the frame)
    back_porch_ends_at: u16,
}

impl TimingBuffer {
    /// Horizontal timings shared by both our modes, in pixels.
    const H_TIMINGS: (u32, u32, u32, u32) = (16, 96, 48, 640);

    /// Make a timing buffer from the vertical timings, in lines.
    const fn new(
        vsync: SyncPolarity,
        visible_lines: u16,
        front_porch: u16,
        sync_pulse: u16,
        back_porch: u16,
    ) -> TimingBuffer {
        let visible_lines_ends_at = visible_lines - 1;
        let front_porch_end_at = visible_lines_ends_at + front_porch;
        let sync_pulse_ends_at = front_porch_end_at + sync_pulse;
        TimingBuffer {
            visible_line: ScanlineTimingBuffer::new(
                VerticalPortion::Visible,
                SyncPolarity::Negative,
                vsync,
                Self::H_TIMINGS,
            ),
            vblank_porch_buffer: ScanlineTimingBuffer::new(
                VerticalPortion::Porch,
                SyncPolarity::Negative,
                vsync,
                Self::H_TIMINGS,
            ),
            vblank_sync_buffer: ScanlineTimingBuffer::new(
                VerticalPortion::Sync,
                SyncPolarity::Negative,
                vsync,
                Self::H_TIMINGS,
            ),
            visible_lines_ends_at,
            front_porch_end_at,
            sync_pulse_ends_at,
            back_porch_ends_at: sync_pulse_ends_at + back_porch,
        }
    }

    /// Make a timing buffer suitable for 640 x 400 @ 70 Hz
    const fn make_640x400() -> TimingBuffer {
        TimingBuffer::new(
            SyncPolarity::Positive,
            TimingMode::T640x400.visible_lines(),
            12,
            2,
            35,
        )
    }

    /// Make a timing buffer suitable for 640 x 480 @ 60 Hz
    const fn make_640x480() -> TimingBuffer {
        TimingBuffer::new(
            SyncPolarity::Negative,
            TimingMode::T640x480.visible_lines(),
            10,
            2,
            33,
        )
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// How many pixels per scan-line.
///
/// Adjust the pixel PIO program to run at the right speed to the screen is
/// filled. For example, if this is only 320 but you are aiming at 640x480,
/// make the pixel PIO take twice as long per pixel.
pub const MAX_NUM_PIXELS_PER_LINE: usize = 640;

/// How many pixel pairs we send out.
///
/// Each pixel is two 15-bit values packed into one 32-bit word(an `RGBPair`).
/// This is to make more efficient use of DMA and FIFO resources.
const MAX_NUM_PIXEL_PAIRS_PER_LINE: usize = MAX_NUM_PIXELS_PER_LINE / 2;

/// Stores timing data which we DMA into the timing PIO State Machine.
///
/// Indexed by [`TimingMode`].
#[link_section = ".data"]
static TIMING_BUFFER: [TimingBuffer; 2] =
    [TimingBuffer::make_640x480(), TimingBuffer::make_640x400()];

/// Tracks which timing mode we use
///
/// Ensure this matches the default chosen in [`RenderEngine::new()`]
static CURRENT_TIMING_MODE: AtomicUsize = AtomicUsize::new(TimingMode::T640x480 as usize);

/// Tracks which scan-line will be shown next, therefore which one you should be drawing right now.
///
/// This is for timing purposes, therefore it goes from
/// `0..TIMING_BUFFER.back_porch_ends_at`.
///
/// Set by the PIO IRQ.
static NEXT_SCAN_LINE: AtomicU16 = AtomicU16::new(0);

/// Indicates that we should draw the current scan-line given by [`NEXT_SCAN_LINE`].
///
/// Set by the PIO IRQ, cleared by the render loop.
static DRAW_THIS_LINE: AtomicBool = AtomicBool::new(false);

/// How many vertical refreshes have happened.
///
/// Only written by the PIO IRQ. Wraps.
static REFRESH_COUNT: AtomicU32 = AtomicU32::new(0);

/// How many scan-lines the render loop failed to pick up before the next one
/// was due.
///
/// Only written by the PIO IRQ. Wraps.
static LATE_LINE_COUNT: AtomicU32 = AtomicU32::new(0);

/// DMA channel for the timing FIFO
const TIMING_DMA_CHAN: usize = 0;

/// DMA channel for the pixel FIFO
const PIXEL_DMA_CHAN: usize = 1;

/// One scan-line's worth of 15-bit pixels, used for the even scan-lines (0, 2, 4 ... NUM_LINES-2).
///
/// Gets read by DMA, which pushes them into the pixel state machine's FIFO.
///
/// Gets written to by `RenderEngine` running on Core 1.
static PIXEL_DATA_BUFFER_EVEN: LineBuffer = LineBuffer::new();

/// One scan-line's worth of 15-bit pixels, used for the odd scan-lines (1, 3, 5 ... NUM_LINES-1).
///
/// Gets read by DMA, which pushes them into the pixel state machine's FIFO.
///
/// Gets written to by `RenderEngine` running on Core 1.
static PIXEL_DATA_BUFFER_ODD: LineBuffer = LineBuffer::new();

/// How many fixed clock cycles there are per timing pulse.
const FIXED_CLOCKS_PER_TIMING_PULSE: u32 = 5;

/// The SIO GPIO_OUT_SET register
const GPIO_OUT_SET: *mut u32 = 0xd000_0014 as *mut u32;

/// The SIO GPIO_OUT_CLR register
const GPIO_OUT_CLR: *mut u32 = 0xd000_0018 as *mut u32;

/// The LED shows how busy the render loop is
const LED_PIN: u32 = 25;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Initialise all the static data and peripherals we need for our video display.
///
/// We need to keep `pio` and `dma` to run the video. We need `resets` to set
/// things up, so we only borrow that.
pub fn init(pio: super::pac::PIO0, dma: super::pac::DMA, resets: &mut super::pac::RESETS) {
    // Grab PIO0 and the state machines it contains
    let (mut pio, sm0, sm1, _sm2, _sm3) = pio.split(resets);

    // Reset the DMA Peripheral.
    resets.reset().modify(|_r, w| w.dma().set_bit());
    cortex_m::asm::nop();
    resets.reset().modify(|_r, w| w.dma().clear_bit());
    while resets.reset_done().read().dma().bit_is_clear() {}

    // The timing program. We post one word per portion of a scan-line:
    //
    // <instruction:16> <clock_cycles:14> <vsync:1> <hsync:1>
    //
    // It sets the sync pins, executes the instruction (a NOP, or an IRQ to
    // wake the CPU or the pixel state machine), then busy-waits. The wait is
    // `clock_cycles + FIXED_CLOCKS_PER_TIMING_PULSE` clocks long in total.
    //
    // Note: autopull should be set to 32-bits, OSR is set to shift right.
    let timing_program = pio_proc::pio_asm!(
        ".wrap_target"
        // Sync pins (1 clock)
        "out pins, 2"
        // Loop count (1 clock)
        "out x, 14"
        // Instruction (2 clocks)
        "out exec, 16"
        // X + 1 clocks
        "loop0:"
            "jmp x-- loop0"
        ".wrap"
    );

    // The pixel program. Waits for IRQ 0 from the timing program, reads a
    // length word (pixel pairs, minus one), then clocks out 16-bit pixels
    // until the line is done.
    //
    // Note autopull should be set to 32-bits, OSR is set to shift right.
    let pixel_program = pio_proc::pio_asm!(
        ".wrap_target"
        "wait 1 irq 0"
        "out x, 32"
        "loop1:"
            // 6 clocks per pixel
            "out pins, 16 [5]"
            // 6 clocks per pixel, including the jump
            "out pins, 16 [4]"
            "jmp x-- loop1"
        // Black after the visible section
        "mov pins null"
        ".wrap"
    );

    let timing_installed = pio.install(&timing_program.program).unwrap();
    let (mut timing_sm, _, timing_fifo) =
        hal::pio::PIOBuilder::from_installed_program(timing_installed)
            .buffers(hal::pio::Buffers::OnlyTx)
            .out_pins(16, 2) // H-Sync is GPIO16, V-Sync is GPIO17
            .autopull(true)
            .out_shift_direction(hal::pio::ShiftDirection::Right)
            .pull_threshold(32)
            .build(sm0);
    timing_sm.set_pindirs([
        (16, hal::pio::PinDir::Output),
        (17, hal::pio::PinDir::Output),
    ]);

    // No clock divider on the pixel state machine; it adds jitter to the
    // start of every line.
    let pixels_installed = pio.install(&pixel_program.program).unwrap();
    let (mut pixel_sm, _, pixel_fifo) =
        hal::pio::PIOBuilder::from_installed_program(pixels_installed)
            .buffers(hal::pio::Buffers::OnlyTx)
            .out_pins(0, 16) // Red0 is GPIO0, Blue4 is GPIO15.
            .autopull(true)
            .out_shift_direction(hal::pio::ShiftDirection::Right)
            .pull_threshold(32) // We read all 32-bits in each FIFO word
            .build(sm1);
    pixel_sm.set_pindirs((0..=15).map(|x| (x, hal::pio::PinDir::Output)));

    pio.irq1().enable_sm_interrupt(1);

    let timing_buffer = &TIMING_BUFFER[TimingMode::T640x480 as usize];
    configure_dma_channel(
        &dma,
        TIMING_DMA_CHAN,
        timing_fifo.dreq_value(),
        &raw const timing_buffer.visible_line.data as u32,
        timing_fifo.fifo_address() as usize as u32,
        timing_buffer.visible_line.data.len() as u32,
    );
    // The length word, plus the pixels
    configure_dma_channel(
        &dma,
        PIXEL_DMA_CHAN,
        pixel_fifo.dreq_value(),
        PIXEL_DATA_BUFFER_EVEN.as_ptr(),
        pixel_fifo.fifo_address() as usize as u32,
        MAX_NUM_PIXEL_PAIRS_PER_LINE as u32 + 1,
    );

    // Enable the DMA
    dma.multi_chan_trigger()
        .write(|w| unsafe { w.bits((1 << PIXEL_DMA_CHAN) | (1 << TIMING_DMA_CHAN)) });

    timing_sm.start();
    pixel_sm.start();

    // We drop our state-machine and PIO objects here - this means the video
    // cannot be reconfigured at a later time, but they do keep on running
    // as-is.
}

/// Set up a DMA channel to copy words from memory into a PIO FIFO, paced by
/// the FIFO's DREQ.
fn configure_dma_channel(
    dma: &super::pac::DMA,
    channel: usize,
    dreq: u8,
    read_addr: u32,
    write_addr: u32,
    count: u32,
) {
    dma.ch(channel).ch_ctrl_trig().write(|w| {
        w.data_size().size_word();
        w.incr_read().set_bit();
        w.incr_write().clear_bit();
        unsafe { w.treq_sel().bits(dreq) };
        unsafe { w.chain_to().bits(channel as u8) };
        unsafe { w.ring_size().bits(0) };
        w.ring_sel().clear_bit();
        w.bswap().clear_bit();
        w.irq_quiet().clear_bit();
        w.en().set_bit();
        w.sniff_en().clear_bit();
        w
    });
    dma.ch(channel)
        .ch_read_addr()
        .write(|w| unsafe { w.bits(read_addr) });
    dma.ch(channel)
        .ch_write_addr()
        .write(|w| unsafe { w.bits(write_addr) });
    dma.ch(channel)
        .ch_trans_count()
        .write(|w| unsafe { w.bits(count) });
}

/// This function runs the video processing loop on Core 1.
///
/// It keeps the odd/even scan-line buffers filled with the right level for
/// the line about to be shown, and moves the animation on between frames.
#[link_section = ".data"]
pub fn render_loop(mut fifo: SioFifo) -> ! {
    let mut render_engine = RenderEngine::new();

    loop {
        // Wait for a free DMA buffer. Can't do a compare-and-swap on ARMv6-M :/
        while !DRAW_THIS_LINE.load(Ordering::Acquire) {
            cortex_m::asm::wfe();
        }
        DRAW_THIS_LINE.store(false, Ordering::Relaxed);

        // The one we draw *now* is the one that is *shown* next
        let this_line = NEXT_SCAN_LINE.load(Ordering::Relaxed);

        // The LED pin was configured in the code that ran on Core 0. Rather
        // than try and move the pin over to this core, we just poke the SIO
        // registers to set/clear it.
        unsafe {
            GPIO_OUT_SET.write(1 << LED_PIN);
        }

        render_engine.draw_next_line(this_line);

        unsafe {
            GPIO_OUT_CLR.write(1 << LED_PIN);
        }

        // we've just drawn the last visible line, so move the animation on
        // and take a moment to inspect the FIFO
        if this_line == render_engine.last_visible_line() {
            render_engine.new_frame(&mut fifo)
        }
    }
}

/// This function is called whenever the Timing State Machine starts a
/// scan-line.
///
/// Timing wise, we should be at the start of the front-porch (i.e. just after
/// the visible portion finishes). This is because it is the 'front porch' part
/// of the timing data sent to the Timing State Machine that contains a "Raise
/// IRQ 1" instruction, and that IRQ triggers this function.
///
/// The visible section contains a "Raise IRQ 0" instruction, but that only
/// triggers the Pixel State Machine and not a CPU interrupt.
///
/// This is also our vertical refresh source: each time the timing line wraps
/// back to zero, a refresh is counted.
///
/// # Safety
///
/// Only call this from the PIO IRQ handler.
#[link_section = ".data"]
#[interrupt]
unsafe fn PIO0_IRQ_1() {
    let pio = unsafe { &*crate::pac::PIO0::ptr() };
    let dma = unsafe { &*crate::pac::DMA::ptr() };

    // Clear the interrupt
    pio.irq().write_with_zero(|w| w.irq().bits(1 << 1));

    // Current timing mode
    let current_mode_nr = CURRENT_TIMING_MODE.load(Ordering::Relaxed);
    let timing_data = &TIMING_BUFFER[current_mode_nr];

    // This is now the line we are currently in the middle of playing;
    // timing-wise anyway - the pixels will be along in moment once we've told
    // the DMA which pixels to play.
    let current_timing_line = NEXT_SCAN_LINE.load(Ordering::Relaxed);
    // This is the line we should cue up to play next
    let next_timing_line = if current_timing_line >= timing_data.back_porch_ends_at {
        // Wrap around. That's one vertical refresh done.
        REFRESH_COUNT.store(
            REFRESH_COUNT.load(Ordering::Relaxed).wrapping_add(1),
            Ordering::Relaxed,
        );
        0
    } else {
        // Keep going
        current_timing_line + 1
    };

    // Are we in the visible portion *right* now? If so, copy some pixels into
    // the Pixel SM FIFO using DMA. Hopefully the render loop has them ready
    // for us (though we're playing them, ready or not).
    if current_timing_line <= timing_data.visible_lines_ends_at {
        let buffer = if (current_timing_line & 1) != 0 {
            &PIXEL_DATA_BUFFER_ODD
        } else {
            &PIXEL_DATA_BUFFER_EVEN
        };
        dma.ch(PIXEL_DMA_CHAN)
            .ch_al3_read_addr_trig()
            .write(|w| w.bits(buffer.as_ptr()));
        // The data will start pouring into the FIFO, but the output is corked until
        // the timing SM generates the second interrupt, just before the visible
        // portion.
    }

    // Set this before we set the `DRAW_THIS_LINE` flag.
    NEXT_SCAN_LINE.store(next_timing_line, Ordering::Relaxed);

    // Work out what sort of sync pulses we need on the *next* scan-line, and
    // also tell the render loop what to draw ready for the *next* scan-line.
    let buffer = if next_timing_line <= timing_data.visible_lines_ends_at {
        if DRAW_THIS_LINE.load(Ordering::Relaxed) {
            // The render loop never picked up the last line we asked for
            LATE_LINE_COUNT.store(
                LATE_LINE_COUNT.load(Ordering::Relaxed).wrapping_add(1),
                Ordering::Relaxed,
            );
        }
        // A visible line is *up next* so start drawing it *right now*.
        DRAW_THIS_LINE.store(true, Ordering::Release);
        &raw const timing_data.visible_line
    } else if next_timing_line <= timing_data.front_porch_end_at {
        // VGA front porch before VGA sync pulse
        &raw const timing_data.vblank_porch_buffer
    } else if next_timing_line <= timing_data.sync_pulse_ends_at {
        // Sync pulse
        &raw const timing_data.vblank_sync_buffer
    } else {
        // VGA back porch following VGA sync pulse.
        &raw const timing_data.vblank_porch_buffer
    };
    // Start transferring the next block of timing info into the FIFO, ready for
    // the next line. We will be back in this interrupt once it starts actually
    // playing.
    dma.ch(TIMING_DMA_CHAN)
        .ch_al3_read_addr_trig()
        .write(|w| w.bits(buffer as u32));
}

// End of file
