// ---- SSD2805 Registers defines -----------------------------------------------------------------
//
// The MCU interface shares one 8 bit address space between the bridge and the panel.
// 0xB0..=0xD9 are local registers of the bridge, every other address is a DCS opcode
// which the bridge forwards to the panel controller over the MIPI link.

/// First bridge local register address
pub const BRIDGE_FIRST: u8 = 0xB0;
/// Last bridge local register address
pub const BRIDGE_LAST: u8 = 0xD9;

//Configuration Registers
pub const CFGR: u8 = 0xB7; //Configuration Register (packet format, direction, HS/LP)
pub const VCR: u8 = 0xB8; //Virtual Channel Control Register
pub const PCR: u8 = 0xB9; //PLL Control Register
pub const PLCR: u8 = 0xBA; //PLL Configuration Register
pub const CCR: u8 = 0xBB; //Clock Control Register
pub const PSCR1: u8 = 0xBC; //Packet Size Control Register 1, TDC[15:0]
pub const PSCR2: u8 = 0xBD; //Packet Size Control Register 2, TDC[31:16]
pub const PSCR3: u8 = 0xBE; //Packet Size Control Register 3, block write threshold

//Status Registers
pub const RCR: u8 = 0xC2; //Read Count Register, bytes returned by the panel
pub const ISR: u8 = 0xC6; //Interrupt Status Register

//Debug
pub const TR: u8 = 0xD6; //Test Register, SYS_CLK output for debug

//Read data port of the bridge, returns the bytes received from the panel
pub const READ_DATA: u8 = 0xD7;

// ---- register bits ----------------------------------------------------------------------------

pub const ISR_RDR: u16 = 0x0001; //read data ready
pub const ISR_PLS: u16 = 0x0080; //PLL lock status

pub const PCR_PEN: u16 = 0x0001; //PLL enable

pub const TR_SYS_CLK_OUT: u16 = 0x0100;

/// maximum block write threshold, bridge streams a whole block without re-triggering
pub const PSCR3_MAX_THRESHOLD: u16 = 0x0400;

/// Device behind an address of the shared address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// local configuration or status register of the bridge
    Bridge,
    /// DCS opcode forwarded verbatim to the panel controller
    Panel,
}

/// Classifies an address of the shared address space
pub const fn target(address: u8) -> Target {
    if address >= BRIDGE_FIRST && address <= BRIDGE_LAST {
        Target::Bridge
    } else {
        Target::Panel
    }
}
