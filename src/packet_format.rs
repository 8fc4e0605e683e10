//! Settings for the MIPI packet format register of the bridge

/// Link mode used to send packets to the panel
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionMode {
    /// low power mode, slow but always supported
    LowPower = 0,
    /// high speed mode
    HighSpeed = 1,
}

/// Packet type of the commands forwarded to the panel
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// generic packets
    Generic = 0,
    /// display command set packets
    Dcs = 1,
}

/// Direction of the next panel transaction
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// write to the panel
    Write = 0,
    /// read back from the panel
    Read = 1,
}

/// Packet format settings
/// programmed once during reset, the read path flips the direction temporarily
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketFormat {
    /// HS or LP data transmission
    pub mode: TransmissionMode,
    /// keep the clock lane running
    pub clock_lane_enable: bool,
    /// DCS or generic packets
    pub packet_type: PacketType,
    /// read or write
    pub direction: Direction,
    /// append an end of transmission packet
    pub eot_packet: bool,
}

impl Default for PacketFormat {
    fn default() -> Self {
        Self {
            mode: TransmissionMode::HighSpeed,
            clock_lane_enable: true,
            packet_type: PacketType::Dcs,
            direction: Direction::Write,
            eot_packet: true,
        }
    }
}

impl PacketFormat {
    /// Bits set on top of the current packet format to request a DCS read
    pub const READ_REQUEST: u16 = ((Direction::Read as u16) << 7) | ((PacketType::Dcs as u16) << 6);

    pub(crate) fn into_arg(self) -> u16 {
        let mode = self.mode as u16;
        let clock_lane = self.clock_lane_enable as u16;
        let packet_type = self.packet_type as u16;
        let direction = self.direction as u16;
        let eot = self.eot_packet as u16;
        (eot << 9) | (direction << 7) | (packet_type << 6) | (clock_lane << 1) | mode
    }
}
