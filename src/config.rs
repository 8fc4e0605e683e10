//! Board and panel settings, fixed when the driver is created

use crate::interface::{BusTiming, ClockPhase};
use crate::packet_format::PacketFormat;
use core::time::Duration;

/// Color depth of the panel interface
pub const BITS_PER_PIXEL: u32 = 16;
/// Bytes of one pixel on the MIPI link
pub const BYTES_PER_PIXEL: u32 = BITS_PER_PIXEL / 8;

/// Minimum VCO frequency of the bridge PLL
pub const PLL_MIN_HZ: u32 = 225_000_000;
/// Maximum VCO frequency of the bridge PLL, limited by 350Mbps per lane
pub const PLL_MAX_HZ: u32 = 350_000_000;

/// Canvas size of the connected panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// horizontal resolution in pixel
    pub width: u16,
    /// vertical resolution in pixel
    pub height: u16,
}

impl Dimensions {
    /// last addressable column
    pub fn max_x(&self) -> u16 {
        self.width.saturating_sub(1)
    }

    /// last addressable page
    pub fn max_y(&self) -> u16 {
        self.height.saturating_sub(1)
    }

    /// number of pixels of the canvas
    pub fn pixel_count(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// size of a full frame on the MIPI link, None if it exceeds the 32 bit packet size
    pub fn byte_count(&self) -> Option<u32> {
        self.pixel_count().checked_mul(BYTES_PER_PIXEL)
    }
}

/// PLL configuration
/// PLL = clock * (multiplier + 1) / ((pre_divider + 1) * (divider + 1))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PllSetting {
    /// MUL, bits [7:0]
    pub multiplier: u8,
    /// DIV, bits [11:8], 4 bit
    pub divider: u8,
    /// PDIV, bits [15:12], 4 bit
    pub pre_divider: u8,
}

impl Default for PllSetting {
    fn default() -> Self {
        // 20MHz * 16 = 320MHz
        Self {
            multiplier: 0x0F,
            divider: 0,
            pre_divider: 0,
        }
    }
}

impl PllSetting {
    pub(crate) fn into_arg(self) -> u16 {
        let pre_divider = (self.pre_divider & 0x0F) as u16;
        let divider = (self.divider & 0x0F) as u16;
        (pre_divider << 12) | (divider << 8) | self.multiplier as u16
    }

    /// PLL output for the given reference clock
    pub fn output_hz(&self, reference_hz: u32) -> u32 {
        let mul = self.multiplier as u64 + 1;
        let div = ((self.pre_divider & 0x0F) as u64 + 1) * ((self.divider & 0x0F) as u64 + 1);
        (reference_hz as u64 * mul / div) as u32
    }
}

/// Clock control settings
/// SYS_CLK = TX_CLK / (sys_clk_divider + 1)
/// LP clock = PLL / (8 * (lp_clk_divider + 1))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockControl {
    /// bits [7:6], 2 bit
    pub sys_clk_divider: u8,
    /// bits [5:0], 6 bit
    pub lp_clk_divider: u8,
}

impl Default for ClockControl {
    fn default() -> Self {
        // SYS_CLK = 20MHz / 2 = 10MHz, LP = 320MHz / 40 = 8MHz
        Self {
            sys_clk_divider: 1,
            lp_clk_divider: 4,
        }
    }
}

impl ClockControl {
    pub(crate) fn into_arg(self) -> u16 {
        let sys = (self.sys_clk_divider & 0x03) as u16;
        let lp = (self.lp_clk_divider & 0x3F) as u16;
        (sys << 6) | lp
    }
}

/// Bound for a status poll on the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSetting {
    /// number of status reads before giving up
    pub attempts: u32,
    /// wait between two status reads
    pub interval: Duration,
}

impl Default for PollSetting {
    fn default() -> Self {
        Self {
            attempts: 1000,
            interval: Duration::from_micros(100),
        }
    }
}

/// How the reset sequence waits for the PLL lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PllLockWait {
    /// wait a fixed time, the lock bit is not read
    FixedDelay(Duration),
    /// poll the PLL lock bit of the status register
    PollStatus(PollSetting),
}

impl Default for PllLockWait {
    fn default() -> Self {
        PllLockWait::FixedDelay(Duration::from_millis(2))
    }
}

/// Driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// canvas size
    pub dimensions: Dimensions,
    /// external oscillator of the bridge, the bus runs on it until the PLL is locked
    pub oscillator_hz: u32,
    /// PLL multiplier and dividers
    pub pll: PllSetting,
    /// PLL lock strategy
    pub pll_lock: PllLockWait,
    /// SYS_CLK and LP clock dividers
    pub clock_control: ClockControl,
    /// route SYS_CLK to its pin for debugging
    pub sys_clk_output: bool,
    /// MIPI packet format
    pub packet_format: PacketFormat,
    /// virtual channel of the panel
    pub virtual_channel: u16,
    /// color used to clear the panel during reset
    pub power_on_color: u16,
    /// bound for the read ready poll of panel reads
    pub read_poll: PollSetting,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dimensions: Dimensions {
                width: 240,
                height: 240,
            },
            oscillator_hz: 20_000_000,
            pll: PllSetting::default(),
            pll_lock: PllLockWait::default(),
            clock_control: ClockControl::default(),
            sys_clk_output: true,
            packet_format: PacketFormat::default(),
            virtual_channel: 0,
            power_on_color: 0x0000,
            read_poll: PollSetting::default(),
        }
    }
}

impl Config {
    /// canvas size
    pub fn with_dimensions(mut self, width: u16, height: u16) -> Self {
        self.dimensions = Dimensions { width, height };
        self
    }

    /// bridge oscillator and PLL setting
    pub fn with_clock(mut self, oscillator_hz: u32, pll: PllSetting) -> Self {
        self.oscillator_hz = oscillator_hz;
        self.pll = pll;
        self
    }

    /// PLL lock strategy
    pub fn with_pll_lock(mut self, pll_lock: PllLockWait) -> Self {
        self.pll_lock = pll_lock;
        self
    }

    /// SYS_CLK and LP clock dividers
    pub fn with_clock_control(mut self, clock_control: ClockControl) -> Self {
        self.clock_control = clock_control;
        self
    }

    /// enable or disable the SYS_CLK debug output
    pub fn with_sys_clk_output(mut self, enabled: bool) -> Self {
        self.sys_clk_output = enabled;
        self
    }

    /// MIPI packet format
    pub fn with_packet_format(mut self, packet_format: PacketFormat) -> Self {
        self.packet_format = packet_format;
        self
    }

    /// color shown after reset
    pub fn with_power_on_color(mut self, color: u16) -> Self {
        self.power_on_color = color;
        self
    }

    /// bound for panel reads
    pub fn with_read_poll(mut self, read_poll: PollSetting) -> Self {
        self.read_poll = read_poll;
        self
    }

    /// VCO frequency after lock
    pub fn pll_output_hz(&self) -> u32 {
        self.pll.output_hz(self.oscillator_hz)
    }

    /// bus timing before the PLL is locked, the bridge runs on the oscillator
    pub fn pre_lock_timing(&self) -> BusTiming {
        BusTiming::for_clock(ClockPhase::PreLock, self.oscillator_hz)
    }

    /// bus timing after the PLL is locked
    pub fn post_lock_timing(&self) -> BusTiming {
        BusTiming::for_clock(ClockPhase::PostLock, self.pll_output_hz())
    }

    pub(crate) fn pll_in_range(&self) -> bool {
        (PLL_MIN_HZ..=PLL_MAX_HZ).contains(&self.pll_output_hz())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_board() {
        let config = Config::default();
        assert_eq!(config.pll.into_arg(), 0x000F);
        assert_eq!(config.pll_output_hz(), 320_000_000);
        assert!(config.pll_in_range());
        assert_eq!(config.clock_control.into_arg(), 0x0044);
        assert_eq!(config.dimensions.byte_count(), Some(115_200));
    }

    macro_rules! pll_tests {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (multiplier, divider, pre_divider, arg, hz) = $value;
                let pll = PllSetting { multiplier, divider, pre_divider };
                assert_eq!(arg, pll.into_arg());
                assert_eq!(hz, pll.output_hz(20_000_000));
            }
        )*
        }
    }

    pll_tests! {
        pll_x16: (0x0F, 0, 0, 0x000F, 320_000_000),
        pll_div2: (0x1F, 1, 0, 0x011F, 320_000_000),
        pll_pdiv2_div2: (0x2F, 1, 1, 0x112F, 240_000_000),
        pll_masks_nibbles: (0x00, 0x1F, 0x10, 0x0F00, 1_250_000),
    }

    #[test]
    fn pll_out_of_range() {
        let config = Config::default().with_clock(
            20_000_000,
            PllSetting {
                multiplier: 0x1F,
                divider: 0,
                pre_divider: 0,
            },
        );
        assert_eq!(config.pll_output_hz(), 640_000_000);
        assert!(!config.pll_in_range());
    }

    #[test]
    fn bus_timing_follows_clock_plan() {
        let config = Config::default();
        let slow = config.pre_lock_timing();
        let fast = config.post_lock_timing();
        assert_eq!(slow.phase, ClockPhase::PreLock);
        assert_eq!(slow.min_strobe_ns, 150);
        assert_eq!(fast.phase, ClockPhase::PostLock);
        assert_eq!(fast.min_strobe_ns, 10);
    }

    #[test]
    fn dimensions() {
        let dim = Dimensions {
            width: 320,
            height: 240,
        };
        assert_eq!(dim.max_x(), 319);
        assert_eq!(dim.max_y(), 239);
        assert_eq!(dim.pixel_count(), 76_800);
        assert_eq!(dim.byte_count(), Some(153_600));
    }

    #[test]
    fn largest_canvas_overflows_packet_size() {
        let dim = Dimensions {
            width: u16::MAX,
            height: u16::MAX,
        };
        assert_eq!(dim.pixel_count(), 4_294_836_225);
        assert_eq!(dim.byte_count(), None);
        let fits = Dimensions {
            width: u16::MAX,
            height: 32_768,
        };
        assert_eq!(fits.byte_count(), Some(4_294_901_760));
    }
}
