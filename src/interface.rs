//! Contains the board interface of the bridge
//!
//! [`BridgeInterface`] is what the driver needs from the board: the 8080 style parallel bus,
//! the chip select and command/data lines, reset, the two supply rails, the backlight and a delay.
//! The bus primitive (one chip select framed transaction) is provided on top of it.
//! [`ParallelInterface`] implements it with embedded_hal pins and a board specific [`ParallelBus`].

use core::fmt;
use core::time::Duration;
use embedded_hal::{delay::DelayNs, digital::OutputPin};

/// Interface Error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The bus peripheral rejected a transfer
    BusError,
    /// A error in the gpio driver
    GPIOError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BusError => write!(f, "parallel bus transfer failed"),
            Error::GPIOError => write!(f, "control line could not be driven"),
        }
    }
}

/// Clock the bridge is running on while the bus is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    /// PLL not locked yet, the bridge runs on its external oscillator
    PreLock,
    /// PLL locked, full speed
    PostLock,
}

/// Bus timing requested from the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTiming {
    /// clock phase of the bridge
    pub phase: ClockPhase,
    /// minimum WR#/RD# low and high time, three periods of the bridge clock
    pub min_strobe_ns: u32,
}

impl BusTiming {
    /// Timing for a bridge clocked with `clock_hz`
    pub fn for_clock(phase: ClockPhase, clock_hz: u32) -> Self {
        let min_strobe_ns = if clock_hz == 0 {
            u32::MAX
        } else {
            (3_000_000_000u64).div_ceil(clock_hz as u64) as u32
        };
        BusTiming {
            phase,
            min_strobe_ns,
        }
    }
}

/// Switchable supply rails on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerRail {
    /// VDDIO of the bridge
    Bridge,
    /// VDDIO of the panel
    Panel,
}

/// Width of the data bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusWidth {
    /// 8 data lines
    Bits8,
    /// 16 data lines
    Bits16,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// Word transferred per strobe, u8 for a 8 bit bus and u16 for a 16 bit bus
///
/// All encodings which depend on the bus width live here, the driver never checks the width itself.
/// Register values are sent low byte first, DCS address fields high byte first.
pub trait BusWord: Copy + fmt::Debug + PartialEq + sealed::Sealed {
    /// width of the bus
    const WIDTH: BusWidth;

    /// a command byte or single parameter byte as bus word
    fn from_byte(byte: u8) -> Self;

    /// write a 16bit value, low byte first
    fn write_le<B>(bus: &mut B, value: u16) -> Result<(), Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized;

    /// write a 16bit value, high byte first on the MIPI link
    fn write_be<B>(bus: &mut B, value: u16) -> Result<(), Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized;

    /// read a 16bit value, low byte first
    fn read_le<B>(bus: &mut B) -> Result<u16, Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized;

    /// read `count` bytes and hand them to `sink` in link order
    fn read_bytes<B, F>(bus: &mut B, count: usize, sink: F) -> Result<(), Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized,
        F: FnMut(u8);
}

impl BusWord for u8 {
    const WIDTH: BusWidth = BusWidth::Bits8;

    fn from_byte(byte: u8) -> Self {
        byte
    }

    fn write_le<B>(bus: &mut B, value: u16) -> Result<(), Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized,
    {
        bus.bus_write(value as u8)?;
        bus.bus_write((value >> 8) as u8)
    }

    fn write_be<B>(bus: &mut B, value: u16) -> Result<(), Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized,
    {
        bus.bus_write((value >> 8) as u8)?;
        bus.bus_write(value as u8)
    }

    fn read_le<B>(bus: &mut B) -> Result<u16, Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized,
    {
        let low = bus.bus_read()?;
        let high = bus.bus_read()?;
        Ok(u16::from_le_bytes([low, high]))
    }

    fn read_bytes<B, F>(bus: &mut B, count: usize, mut sink: F) -> Result<(), Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized,
        F: FnMut(u8),
    {
        for _ in 0..count {
            sink(bus.bus_read()?);
        }
        Ok(())
    }
}

impl BusWord for u16 {
    const WIDTH: BusWidth = BusWidth::Bits16;

    fn from_byte(byte: u8) -> Self {
        byte as u16
    }

    fn write_le<B>(bus: &mut B, value: u16) -> Result<(), Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized,
    {
        bus.bus_write(value)
    }

    fn write_be<B>(bus: &mut B, value: u16) -> Result<(), Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized,
    {
        // the bridge sends the low byte of a word first
        bus.bus_write(value.swap_bytes())
    }

    fn read_le<B>(bus: &mut B) -> Result<u16, Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized,
    {
        bus.bus_read()
    }

    fn read_bytes<B, F>(bus: &mut B, count: usize, mut sink: F) -> Result<(), Error>
    where
        B: BridgeInterface<Word = Self> + ?Sized,
        F: FnMut(u8),
    {
        let mut remaining = count;
        while remaining > 0 {
            let [low, high] = bus.bus_read()?.to_le_bytes();
            sink(low);
            remaining -= 1;
            if remaining > 0 {
                sink(high);
                remaining -= 1;
            }
        }
        Ok(())
    }
}

/// Trait to describe the board the bridge is connected to
///
/// The required methods map one to one to board operations, the driver only talks to the
/// hardware through them. The provided methods form the bus primitive: every transfer is
/// framed by chip select and chip select is never left asserted when they return.
pub trait BridgeInterface {
    /// bus width of the board
    type Word: BusWord;

    /// (re)configure the bus peripheral timing, the peripheral is disabled while it changes
    fn configure_bus(&mut self, timing: BusTiming) -> Result<(), Error>;

    /// drive chip select active
    fn assert_chip_select(&mut self) -> Result<(), Error>;

    /// drive chip select inactive
    fn deassert_chip_select(&mut self) -> Result<(), Error>;

    /// select the command phase on the command/data line
    fn set_command_phase(&mut self) -> Result<(), Error>;

    /// select the data phase on the command/data line
    fn set_data_phase(&mut self) -> Result<(), Error>;

    /// one write strobe
    fn bus_write(&mut self, word: Self::Word) -> Result<(), Error>;

    /// one read strobe
    fn bus_read(&mut self) -> Result<Self::Word, Error>;

    /// drive the reset line active (low)
    fn reset_line_assert(&mut self) -> Result<(), Error>;

    /// release the reset line (high)
    fn reset_line_release(&mut self) -> Result<(), Error>;

    /// switch a supply rail on
    fn power_rail_enable(&mut self, rail: PowerRail) -> Result<(), Error>;

    /// switch the backlight on
    fn backlight_on(&mut self) -> Result<(), Error>;

    /// switch the backlight off
    fn backlight_off(&mut self) -> Result<(), Error>;

    /// wait
    fn delay(&mut self, duration: Duration) -> Result<(), Error>;

    /// run `f` with chip select asserted
    /// chip select is released even if `f` fails, the first error is returned
    fn transaction<R, F>(&mut self, f: F) -> Result<R, Error>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<R, Error>,
    {
        self.assert_chip_select()?;
        let result = f(self);
        let released = self.deassert_chip_select();
        let value = result?;
        released?;
        Ok(value)
    }

    /// issue a command byte
    fn write_command(&mut self, cmd: u8) -> Result<(), Error>
    where
        Self: Sized,
    {
        self.transaction(|bus| {
            bus.set_command_phase()?;
            bus.bus_write(<Self::Word as BusWord>::from_byte(cmd))
        })
    }

    /// write a single data word
    fn write_data(&mut self, data: Self::Word) -> Result<(), Error>
    where
        Self: Sized,
    {
        self.transaction(|bus| {
            bus.set_data_phase()?;
            bus.bus_write(data)
        })
    }

    /// read a single data word
    fn read_data(&mut self) -> Result<Self::Word, Error>
    where
        Self: Sized,
    {
        self.transaction(|bus| {
            bus.set_data_phase()?;
            bus.bus_read()
        })
    }
}

/// The parallel bus peripheral of the board (PMP, FSMC, EBI, ...)
/// strobes WR# and RD#, chip select and command/data are driven by [`ParallelInterface`]
pub trait ParallelBus {
    /// bus width
    type Word: BusWord;

    /// apply the timing, disabling the peripheral while it changes
    fn configure(&mut self, timing: BusTiming) -> Result<(), Error>;

    /// write one word
    fn write(&mut self, word: Self::Word) -> Result<(), Error>;

    /// read one word
    fn read(&mut self) -> Result<Self::Word, Error>;
}

/// Output pin with a configurable active level
pub struct Switch<P> {
    pin: P,
    active_high: bool,
}

impl<P: OutputPin> Switch<P> {
    /// pin is high when switched on
    pub fn active_high(pin: P) -> Self {
        Switch {
            pin,
            active_high: true,
        }
    }

    /// pin is low when switched on, e.g. a P-channel mosfet in the supply line
    pub fn active_low(pin: P) -> Self {
        Switch {
            pin,
            active_high: false,
        }
    }

    fn set(&mut self, on: bool) -> Result<(), Error> {
        if on == self.active_high {
            self.pin.set_high().map_err(|_| Error::GPIOError)
        } else {
            self.pin.set_low().map_err(|_| Error::GPIOError)
        }
    }
}

/// Placeholder for a line which is not wired on the board
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPin;

impl embedded_hal::digital::ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Implements the bridge interface for a 8080 parallel bus
/// Uses embedded_hal gpio pins for the control lines and a embedded_hal delay driver
pub struct ParallelInterface<BUS, CS, DC, RST, BL, VDD, VDDP, DELAY> {
    bus: BUS,
    cs: CS,
    dc: DC,
    rst: RST,
    backlight: Switch<BL>,
    bridge_supply: Switch<VDD>,
    panel_supply: Switch<VDDP>,
    delay: DELAY,
}

impl<BUS, CS, DC, RST, BL, VDD, VDDP, DELAY> ParallelInterface<BUS, CS, DC, RST, BL, VDD, VDDP, DELAY>
where
    BUS: ParallelBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BL: OutputPin,
    VDD: OutputPin,
    VDDP: OutputPin,
    DELAY: DelayNs,
{
    /// Create a new parallel bridge interface
    /// chip select and reset are active low, the command/data line is low for commands
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: BUS,
        cs: CS,
        dc: DC,
        rst: RST,
        backlight: Switch<BL>,
        bridge_supply: Switch<VDD>,
        panel_supply: Switch<VDDP>,
        delay: DELAY,
    ) -> Self {
        ParallelInterface {
            bus,
            cs,
            dc,
            rst,
            backlight,
            bridge_supply,
            panel_supply,
            delay,
        }
    }

    /// Give back the bus peripheral and pins
    #[allow(clippy::type_complexity)]
    pub fn release(self) -> (BUS, CS, DC, RST, BL, VDD, VDDP, DELAY) {
        (
            self.bus,
            self.cs,
            self.dc,
            self.rst,
            self.backlight.pin,
            self.bridge_supply.pin,
            self.panel_supply.pin,
            self.delay,
        )
    }
}

impl<BUS, CS, DC, RST, BL, VDD, VDDP, DELAY> BridgeInterface
    for ParallelInterface<BUS, CS, DC, RST, BL, VDD, VDDP, DELAY>
where
    BUS: ParallelBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BL: OutputPin,
    VDD: OutputPin,
    VDDP: OutputPin,
    DELAY: DelayNs,
{
    type Word = BUS::Word;

    fn configure_bus(&mut self, timing: BusTiming) -> Result<(), Error> {
        self.bus.configure(timing)
    }

    fn assert_chip_select(&mut self) -> Result<(), Error> {
        self.cs.set_low().map_err(|_| Error::GPIOError)
    }

    fn deassert_chip_select(&mut self) -> Result<(), Error> {
        self.cs.set_high().map_err(|_| Error::GPIOError)
    }

    fn set_command_phase(&mut self) -> Result<(), Error> {
        self.dc.set_low().map_err(|_| Error::GPIOError)
    }

    fn set_data_phase(&mut self) -> Result<(), Error> {
        self.dc.set_high().map_err(|_| Error::GPIOError)
    }

    fn bus_write(&mut self, word: Self::Word) -> Result<(), Error> {
        self.bus.write(word)
    }

    fn bus_read(&mut self) -> Result<Self::Word, Error> {
        self.bus.read()
    }

    fn reset_line_assert(&mut self) -> Result<(), Error> {
        self.rst.set_low().map_err(|_| Error::GPIOError)
    }

    fn reset_line_release(&mut self) -> Result<(), Error> {
        self.rst.set_high().map_err(|_| Error::GPIOError)
    }

    fn power_rail_enable(&mut self, rail: PowerRail) -> Result<(), Error> {
        match rail {
            PowerRail::Bridge => self.bridge_supply.set(true),
            PowerRail::Panel => self.panel_supply.set(true),
        }
    }

    fn backlight_on(&mut self) -> Result<(), Error> {
        self.backlight.set(true)
    }

    fn backlight_off(&mut self) -> Result<(), Error> {
        self.backlight.set(false)
    }

    fn delay(&mut self, duration: Duration) -> Result<(), Error> {
        self.delay.delay_us(duration.as_micros() as u32);
        Ok(())
    }
}
