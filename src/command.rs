//! MIPI DCS opcodes understood by the panel controller
//!
//! The bridge forwards these verbatim, use them with
//! [`Ssd2805::send_dcs`](crate::Ssd2805::send_dcs) and
//! [`Ssd2805::read_panel_register`](crate::Ssd2805::read_panel_register).

/// no operation
pub const NOP: u8 = 0x00;
/// software reset of the panel controller
pub const SOFT_RESET: u8 = 0x01;
/// read the power mode, 1 byte response
pub const GET_POWER_MODE: u8 = 0x0A;
/// read the interface pixel format, 1 byte response
pub const GET_PIXEL_FORMAT: u8 = 0x0C;
/// enter sleep mode
pub const ENTER_SLEEP_MODE: u8 = 0x10;
/// exit sleep mode, the panel needs ~100ms before it accepts further commands
pub const EXIT_SLEEP_MODE: u8 = 0x11;
/// blank the panel without touching the frame memory
pub const SET_DISPLAY_OFF: u8 = 0x28;
/// show the frame memory
pub const SET_DISPLAY_ON: u8 = 0x29;
/// column address set: SC[15:0], EC[15:0], big endian
pub const SET_COLUMN_ADDRESS: u8 = 0x2A;
/// page address set: SP[15:0], EP[15:0], big endian
pub const SET_PAGE_ADDRESS: u8 = 0x2B;
/// start a frame memory write at the window origin
pub const WRITE_MEMORY_START: u8 = 0x2C;
/// start a frame memory read at the window origin
pub const READ_MEMORY_START: u8 = 0x2E;
/// set the interface pixel format, 1 byte argument
pub const SET_PIXEL_FORMAT: u8 = 0x3A;

/// SET_PIXEL_FORMAT argument for 16 bit (5-6-5) colors
pub const PIXEL_FORMAT_16BIT: u8 = 0x05;
