#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

//! SSD2805 MIPI bridge driver for command mode smart panels
//! The implementation is based on the SSD2805 advance information and drives the bridge
//! over its 8080 style MCU interface. The bridge forwards DCS commands to the attached panel,
//! see [`target`] for how the shared address space is split.
//!
//! ```rust,ignore
//! let interface = ssd2805::interface::ParallelInterface::new(pmp, cs, dc, rst, bl, vdd, vddp, delay);
//! let mut display = ssd2805::Ssd2805::new(interface, ssd2805::Config::default());
//! display.reset_device()?;
//! display.set_color(0x001F);
//! display.clear_device()?;
//! display.put_pixel(10, 20)?;
//! ```

pub mod command;
pub mod config;
pub mod interface;
pub mod packet_format;
mod register;

#[cfg(test)]
mod fake;

pub use crate::config::Config;
pub use crate::register::{target, Target};

use crate::config::BYTES_PER_PIXEL;
use crate::interface::{BridgeInterface, BusWord, PowerRail};
use crate::packet_format::PacketFormat;
use core::fmt;
use core::time::Duration;

/// Controller Error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// bridge interface error
    Interface(interface::Error),
    /// a bounded status poll gave up
    BusTimeout,
    /// the window origin is outside the canvas
    UnsupportedWindow {
        /// requested column
        x: u16,
        /// requested page
        y: u16,
    },
    /// driver not initialized, call reset_device first
    NotInitialized,
    /// the panel answered a read with zero bytes
    EmptyResponse,
    /// the address belongs to the bridge, not to the panel
    NotAPanelCommand(u8),
    /// a full frame does not fit into the 32 bit packet size of the bridge
    CanvasTooLarge {
        /// configured width
        width: u16,
        /// configured height
        height: u16,
    },
    /// the configured PLL output is outside the VCO range of the bridge
    PllOutOfRange {
        /// configured PLL output
        vco_hz: u32,
    },
}

impl From<interface::Error> for Error {
    fn from(e: interface::Error) -> Self {
        Error::Interface(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Interface(e) => write!(f, "interface error: {e}"),
            Error::BusTimeout => write!(f, "bridge did not respond in time"),
            Error::UnsupportedWindow { x, y } => {
                write!(f, "window origin ({x}, {y}) is outside the canvas")
            }
            Error::NotInitialized => write!(f, "driver not initialized"),
            Error::EmptyResponse => write!(f, "panel returned no data"),
            Error::NotAPanelCommand(address) => {
                write!(f, "{address:#04x} is a bridge register, not a DCS command")
            }
            Error::CanvasTooLarge { width, height } => {
                write!(f, "canvas {width}x{height} exceeds the packet size of the bridge")
            }
            Error::PllOutOfRange { vco_hz } => write!(f, "PLL output {vco_hz}Hz out of range"),
        }
    }
}

// reset timing, the panel dominates most of them
const POWER_SETTLE: Duration = Duration::from_millis(300);
const RESET_PULSE: Duration = Duration::from_millis(10);
const RESET_RECOVERY: Duration = Duration::from_millis(1);
const PANEL_POWER_SETTLE: Duration = Duration::from_millis(10);
const SLEEP_OUT_DELAY: Duration = Duration::from_millis(100);
const SLEEP_IN_DELAY: Duration = Duration::from_millis(5);

/// SSD2805 driver
/// Holds the drawing state of one display, the board is reached through the interface
pub struct Ssd2805<I> {
    interface: I,
    config: Config,
    color: u16,
    clip: Option<Rectangle>,
    transparent: Option<u16>,
    initialized: bool,
}

impl<I> Ssd2805<I>
where
    I: BridgeInterface,
{
    /// Creates a new driver object
    /// Call reset_device afterwards to power up and initialize bridge and panel
    pub fn new(interface: I, config: Config) -> Ssd2805<I> {
        Ssd2805 {
            interface,
            color: config.power_on_color,
            config,
            clip: None,
            transparent: None,
            initialized: false,
        }
    }

    /// Give back the interface
    pub fn release(self) -> I {
        self.interface
    }

    /// Configuration the driver was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// true after reset_device completed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Always false, every transfer completes before the call returns
    pub fn is_device_busy(&self) -> bool {
        false
    }

    // init -----------------------------------------------------------------------------------------------------------

    /// Power up and reset bridge and panel, lock the PLL and bring the panel into display on
    /// The panel is cleared to the power on color of the config
    pub fn reset_device(&mut self) -> Result<(), Error> {
        self.initialized = false;

        if !self.config.pll_in_range() {
            return Err(Error::PllOutOfRange {
                vco_hz: self.config.pll_output_hz(),
            });
        }
        self.frame_size()?;
        log::debug!("bus width {:?}", <I::Word as BusWord>::WIDTH);

        self.interface.power_rail_enable(PowerRail::Bridge)?;
        self.interface.set_command_phase()?;
        self.interface.deassert_chip_select()?;
        self.interface.backlight_on()?;

        // bridge runs on the oscillator until the PLL is locked
        self.interface
            .configure_bus(self.config.pre_lock_timing())?;

        self.interface.reset_line_release()?;
        self.interface.delay(POWER_SETTLE)?;
        self.interface.reset_line_assert()?;
        self.interface.delay(RESET_PULSE)?;
        self.interface.reset_line_release()?;
        self.interface.delay(RESET_RECOVERY)?;

        self.interface.power_rail_enable(PowerRail::Panel)?;
        self.interface.delay(PANEL_POWER_SETTLE)?;

        self.write_register(register::PLCR, self.config.pll.into_arg())?;
        self.write_register(register::PCR, register::PCR_PEN)?;
        log::debug!("PLL programmed");
        self.wait_for_pll_lock()?;
        log::debug!("PLL locked at {}Hz", self.config.pll_output_hz());

        let timing = self.config.post_lock_timing();
        self.interface.configure_bus(timing)?;
        log::debug!("bus reclocked, strobe {}ns", timing.min_strobe_ns);

        self.write_register(register::CCR, self.config.clock_control.into_arg())?;
        if self.config.sys_clk_output {
            self.write_register(register::TR, register::TR_SYS_CLK_OUT)?;
        }
        self.write_register(register::CFGR, self.config.packet_format.into_arg())?;
        self.write_register(register::VCR, self.config.virtual_channel)?;

        self.set_packet_size(0)?;
        self.interface.write_command(command::EXIT_SLEEP_MODE)?;
        self.interface.delay(SLEEP_OUT_DELAY)?;
        log::debug!("panel awake");

        self.set_packet_size(1)?;
        self.interface.write_command(command::SET_PIXEL_FORMAT)?;
        self.interface
            .write_data(I::Word::from_byte(command::PIXEL_FORMAT_16BIT))?;

        self.color = self.config.power_on_color;
        self.fill_screen(self.color)?;

        // the fill leaves a frame sized packet in the bridge
        self.set_packet_size(0)?;
        self.interface.write_command(command::SET_DISPLAY_ON)?;
        log::debug!("display on");

        self.initialized = true;
        Ok(())
    }

    fn wait_for_pll_lock(&mut self) -> Result<(), Error> {
        match self.config.pll_lock {
            config::PllLockWait::FixedDelay(duration) => {
                self.interface.delay(duration)?;
                Ok(())
            }
            config::PllLockWait::PollStatus(poll) => {
                self.wait_for_status(register::ISR_PLS, poll)
            }
        }
    }

    // register access ------------------------------------------------------------------------------------------------

    /// Write a 16 bit value to a register
    /// Sent low byte first on a 8 bit bus, the address is not checked
    pub fn write_register(&mut self, reg: u8, value: u16) -> Result<(), Error> {
        log::trace!("write register {reg:#04x} = {value:#06x}");
        self.interface.transaction(|bus| {
            bus.set_command_phase()?;
            bus.bus_write(I::Word::from_byte(reg))?;
            bus.set_data_phase()?;
            I::Word::write_le(bus, value)
        })?;
        Ok(())
    }

    /// Read a 16 bit value from a register
    pub fn read_register(&mut self, reg: u8) -> Result<u16, Error> {
        let value = self.interface.transaction(|bus| {
            bus.set_command_phase()?;
            bus.bus_write(I::Word::from_byte(reg))?;
            bus.set_data_phase()?;
            I::Word::read_le(bus)
        })?;
        Ok(value)
    }

    fn set_packet_size(&mut self, bytes: u32) -> Result<(), Error> {
        self.write_register(register::PSCR1, bytes as u16)?;
        self.write_register(register::PSCR2, (bytes >> 16) as u16)?;
        Ok(())
    }

    fn wait_for_status(&mut self, mask: u16, poll: config::PollSetting) -> Result<(), Error> {
        let attempts = poll.attempts.max(1);
        for attempt in 1..=attempts {
            if self.read_register(register::ISR)? & mask != 0 {
                return Ok(());
            }
            if attempt < attempts {
                self.interface.delay(poll.interval)?;
            }
        }
        log::warn!("status bit {mask:#06x} not set after {attempts} polls");
        Err(Error::BusTimeout)
    }

    // panel commands -------------------------------------------------------------------------------------------------

    /// Send a DCS command with parameters to the panel
    pub fn send_dcs(&mut self, opcode: u8, params: &[u8]) -> Result<(), Error> {
        if target(opcode) == Target::Bridge {
            return Err(Error::NotAPanelCommand(opcode));
        }
        log::trace!("dcs {opcode:#04x} {params:02x?}");
        self.set_packet_size(params.len() as u32)?;
        self.interface.transaction(|bus| {
            bus.set_command_phase()?;
            bus.bus_write(I::Word::from_byte(opcode))?;
            bus.set_data_phase()?;
            for param in params {
                bus.bus_write(I::Word::from_byte(*param))?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Read a panel register through the bridge
    /// Returns the last byte of the response, use read_panel_register_bytes for longer responses
    pub fn read_panel_register(&mut self, opcode: u8) -> Result<u8, Error> {
        let mut last = 0;
        self.read_panel(opcode, |_, byte| last = byte)?;
        Ok(last)
    }

    /// Read a panel register through the bridge into `buf`
    /// Returns the number of bytes stored, bytes which do not fit into `buf` are dropped
    pub fn read_panel_register_bytes(&mut self, opcode: u8, buf: &mut [u8]) -> Result<usize, Error> {
        let count = self.read_panel(opcode, |index, byte| {
            if let Some(slot) = buf.get_mut(index) {
                *slot = byte;
            }
        })?;
        Ok(count.min(buf.len()))
    }

    fn read_panel<F>(&mut self, opcode: u8, sink: F) -> Result<usize, Error>
    where
        F: FnMut(usize, u8),
    {
        if target(opcode) == Target::Bridge {
            return Err(Error::NotAPanelCommand(opcode));
        }
        let saved = self.read_register(register::CFGR)?;
        self.write_register(register::CFGR, saved | PacketFormat::READ_REQUEST)?;

        let result = self.fetch_panel_response(opcode, sink);

        // restore the packet format also if the panel did not answer
        self.write_register(register::CFGR, saved)?;
        result
    }

    fn fetch_panel_response<F>(&mut self, opcode: u8, mut sink: F) -> Result<usize, Error>
    where
        F: FnMut(usize, u8),
    {
        // header only request
        self.set_packet_size(0)?;
        self.interface.write_command(opcode)?;

        self.wait_for_status(register::ISR_RDR, self.config.read_poll)?;

        let count = self.read_register(register::RCR)? as usize;
        if count == 0 {
            return Err(Error::EmptyResponse);
        }

        self.interface.transaction(|bus| {
            bus.set_command_phase()?;
            bus.bus_write(I::Word::from_byte(register::READ_DATA))?;
            bus.set_data_phase()?;
            let mut index = 0;
            I::Word::read_bytes(bus, count, |byte| {
                sink(index, byte);
                index += 1;
            })
        })?;
        Ok(count)
    }

    /// Enter sleep mode, frame memory is kept
    pub fn sleep(&mut self) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.send_dcs(command::ENTER_SLEEP_MODE, &[])?;
        self.interface.delay(SLEEP_IN_DELAY)?;
        Ok(())
    }

    /// Leave sleep mode
    pub fn wake(&mut self) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.send_dcs(command::EXIT_SLEEP_MODE, &[])?;
        self.interface.delay(SLEEP_OUT_DELAY)?;
        Ok(())
    }

    /// Show the frame memory
    pub fn display_on(&mut self) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.send_dcs(command::SET_DISPLAY_ON, &[])
    }

    /// Blank the panel
    pub fn display_off(&mut self) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.send_dcs(command::SET_DISPLAY_OFF, &[])
    }

    /// Switch the backlight
    pub fn set_backlight(&mut self, on: bool) -> Result<(), Error> {
        self.ensure_initialized()?;
        if on {
            self.interface.backlight_on()?;
        } else {
            self.interface.backlight_off()?;
        }
        Ok(())
    }

    // drawing state --------------------------------------------------------------------------------------------------

    /// Set the current color (RGB 5-6-5), used by all pixel writes
    pub fn set_color(&mut self, color: u16) {
        self.color = color;
    }

    /// Current color
    pub fn color(&self) -> u16 {
        self.color
    }

    /// Limit embedded graphics drawing to an area, None draws on the whole canvas
    pub fn set_clip(&mut self, clip: Option<Rectangle>) {
        self.clip = clip;
    }

    /// Current clip area
    pub fn clip(&self) -> Option<Rectangle> {
        self.clip
    }

    /// Pixels of this color are skipped when drawing with embedded graphics
    pub fn set_transparent_color(&mut self, color: Option<u16>) {
        self.transparent = color;
    }

    /// Current transparent color
    pub fn transparent_color(&self) -> Option<u16> {
        self.transparent
    }

    // pixel functions ------------------------------------------------------------------------------------------------

    /// Set the address window to start at (x, y) and end at the canvas edge
    /// Only windows ending at the canvas edge can be expressed
    pub fn set_address_window(&mut self, x: u16, y: u16) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.write_window(x, y)
    }

    /// Write the current color to (x, y)
    pub fn put_pixel(&mut self, x: u16, y: u16) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.write_pixel(x, y, self.color)
    }

    /// Read back the color at (x, y)
    /// Unverified on hardware, the panel may not return its frame memory this way
    pub fn get_pixel(&mut self, x: u16, y: u16) -> Result<u16, Error> {
        self.ensure_initialized()?;
        self.write_window(x, y)?;
        let low = self.read_panel_register(command::READ_MEMORY_START)?;
        let high = self.read_panel_register(command::READ_MEMORY_START)?;
        Ok(((high as u16) << 8) | low as u16)
    }

    /// Fill the whole canvas with the current color
    pub fn clear_device(&mut self) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.fill_screen(self.color)
    }

    fn ensure_initialized(&self) -> Result<(), Error> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn write_window(&mut self, x: u16, y: u16) -> Result<(), Error> {
        let max_x = self.config.dimensions.max_x();
        let max_y = self.config.dimensions.max_y();
        if x > max_x || y > max_y {
            return Err(Error::UnsupportedWindow { x, y });
        }

        self.set_packet_size(4)?;
        self.write_address(command::SET_COLUMN_ADDRESS, x, max_x)?;
        self.write_address(command::SET_PAGE_ADDRESS, y, max_y)?;
        Ok(())
    }

    fn write_address(&mut self, opcode: u8, start: u16, end: u16) -> Result<(), Error> {
        self.interface.transaction(|bus| {
            bus.set_command_phase()?;
            bus.bus_write(I::Word::from_byte(opcode))?;
            bus.set_data_phase()?;
            I::Word::write_be(bus, start)?;
            I::Word::write_be(bus, end)
        })?;
        Ok(())
    }

    fn write_pixel(&mut self, x: u16, y: u16, color: u16) -> Result<(), Error> {
        self.write_window(x, y)?;
        self.set_packet_size(BYTES_PER_PIXEL)?;
        self.interface.transaction(|bus| {
            bus.set_command_phase()?;
            bus.bus_write(I::Word::from_byte(command::WRITE_MEMORY_START))?;
            bus.set_data_phase()?;
            I::Word::write_le(bus, color)
        })?;
        Ok(())
    }

    fn fill_screen(&mut self, color: u16) -> Result<(), Error> {
        let byte_count = self.frame_size()?;
        let pixel_count = byte_count / BYTES_PER_PIXEL;

        self.write_window(0, 0)?;
        self.set_packet_size(byte_count)?;
        self.write_register(register::PSCR3, register::PSCR3_MAX_THRESHOLD)?;

        self.interface.transaction(|bus| {
            bus.set_command_phase()?;
            bus.bus_write(I::Word::from_byte(command::WRITE_MEMORY_START))?;
            bus.set_data_phase()?;
            for _ in 0..pixel_count {
                I::Word::write_le(bus, color)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    fn frame_size(&self) -> Result<u32, Error> {
        let dimensions = self.config.dimensions;
        dimensions.byte_count().ok_or(Error::CanvasTooLarge {
            width: dimensions.width,
            height: dimensions.height,
        })
    }

    fn drawable_area(&self) -> Rectangle {
        let canvas = self.bounding_box();
        match self.clip {
            Some(clip) => canvas.intersection(&clip),
            None => canvas,
        }
    }
}

// --------------------------- embedded graphics support --------------------------------------

use embedded_graphics_core::{
    pixelcolor::{IntoStorage, Rgb565},
    prelude::*,
    primitives::Rectangle,
    Pixel,
};

impl<I> DrawTarget for Ssd2805<I>
where
    I: BridgeInterface,
{
    type Color = Rgb565;

    type Error = Error;

    fn draw_iter<P>(&mut self, pixels: P) -> Result<(), Self::Error>
    where
        P: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.ensure_initialized()?;
        let area = self.drawable_area();
        for Pixel(coord, color) in pixels.into_iter() {
            let raw = color.into_storage();
            if !area.contains(coord) || self.transparent == Some(raw) {
                continue;
            }
            self.write_pixel(coord.x as u16, coord.y as u16, raw)?;
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let raw = color.into_storage();
        if *area == self.bounding_box() && self.clip.is_none() && self.transparent != Some(raw) {
            self.ensure_initialized()?;
            return self.fill_screen(raw);
        }
        self.fill_contiguous(area, core::iter::repeat(color))
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.set_color(color.into_storage());
        self.clear_device()
    }
}

impl<I> OriginDimensions for Ssd2805<I> {
    fn size(&self) -> Size {
        let dimensions = self.config.dimensions;
        Size::new(dimensions.width as u32, dimensions.height as u32)
    }
}
