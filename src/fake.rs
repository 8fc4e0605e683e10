//! Simulated bridge for the driver tests
//!
//! Keeps a register file, answers status and read count registers, queues panel responses
//! for DCS reads and logs every board operation.

use crate::interface::{BridgeInterface, BusTiming, BusWord, Error, PowerRail};
use crate::packet_format::PacketFormat;
use crate::register::{self, Target};
use core::time::Duration;
use std::collections::VecDeque;

/// Bus word helpers only the simulation needs
pub trait FakeWord: BusWord + Default {
    fn split_le(value: u16) -> Vec<Self>;
    fn join_le(words: &[Self]) -> u16;
    fn pack(bytes: &[u8]) -> Vec<Self>;
    fn low(self) -> u8;
}

impl FakeWord for u8 {
    fn split_le(value: u16) -> Vec<Self> {
        value.to_le_bytes().to_vec()
    }

    fn join_le(words: &[Self]) -> u16 {
        u16::from_le_bytes([words[0], words[1]])
    }

    fn pack(bytes: &[u8]) -> Vec<Self> {
        bytes.to_vec()
    }

    fn low(self) -> u8 {
        self
    }
}

impl FakeWord for u16 {
    fn split_le(value: u16) -> Vec<Self> {
        vec![value]
    }

    fn join_le(words: &[Self]) -> u16 {
        words[0]
    }

    fn pack(bytes: &[u8]) -> Vec<Self> {
        bytes
            .chunks(2)
            .map(|c| u16::from_le_bytes([c[0], c.get(1).copied().unwrap_or(0)]))
            .collect()
    }

    fn low(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event<W> {
    ChipSelect(bool),
    Command(u8),
    Data(W),
    Read(W),
    Configure(BusTiming),
    Reset(bool),
    Rail(PowerRail),
    Backlight(bool),
    Delay(Duration),
}

pub struct FakeBridge<W> {
    pub events: Vec<Event<W>>,
    pub registers: [u16; 256],
    /// responses of the panel per DCS opcode
    pub responses: Vec<(u8, Vec<u8>)>,
    /// the read ready bit never gets set
    pub never_ready: bool,
    /// the PLL lock bit follows the PLL enable bit
    pub pll_locks: bool,
    cs: bool,
    data_phase: bool,
    address: Option<u8>,
    pending: Vec<W>,
    read_queue: VecDeque<W>,
    response: Option<Vec<u8>>,
}

impl<W: FakeWord> FakeBridge<W> {
    pub fn new() -> Self {
        let mut registers = [0u16; 256];
        registers[register::CFGR as usize] = 0x0243;
        FakeBridge {
            events: Vec::new(),
            registers,
            responses: Vec::new(),
            never_ready: false,
            pll_locks: true,
            cs: false,
            data_phase: false,
            address: None,
            pending: Vec::new(),
            read_queue: VecDeque::new(),
            response: None,
        }
    }

    pub fn respond(&mut self, opcode: u8, bytes: &[u8]) {
        self.responses.push((opcode, bytes.to_vec()));
    }

    pub fn chip_selected(&self) -> bool {
        self.cs
    }

    fn register_value(&self, address: u8) -> u16 {
        match address {
            register::ISR => {
                let mut status = 0;
                if self.response.is_some() && !self.never_ready {
                    status |= register::ISR_RDR;
                }
                if self.pll_locks && self.registers[register::PCR as usize] & register::PCR_PEN != 0
                {
                    status |= register::ISR_PLS;
                }
                status
            }
            register::RCR => self.response.as_ref().map_or(0, |r| r.len() as u16),
            _ => self.registers[address as usize],
        }
    }

    fn select(&mut self, address: u8) {
        self.address = Some(address);
        self.pending.clear();
        self.read_queue.clear();
        match register::target(address) {
            Target::Bridge if address == register::READ_DATA => {
                let bytes = self.response.take().unwrap_or_default();
                self.read_queue = W::pack(&bytes).into();
            }
            Target::Bridge => {
                self.read_queue = W::split_le(self.register_value(address)).into();
            }
            Target::Panel => {
                let read_request = PacketFormat::READ_REQUEST;
                if self.registers[register::CFGR as usize] & read_request == read_request {
                    self.response = self
                        .responses
                        .iter()
                        .find(|(opcode, _)| *opcode == address)
                        .map(|(_, bytes)| bytes.clone())
                        .or(Some(Vec::new()));
                }
            }
        }
    }

    /// register writes in issue order
    pub fn register_writes(&self) -> Vec<(u8, u16)> {
        let mut writes = Vec::new();
        let mut current: Option<(u8, Vec<W>)> = None;
        for event in &self.events {
            match event {
                Event::Command(address) => {
                    if let Some((a, words)) = current.take() {
                        if !words.is_empty() {
                            writes.push((a, W::join_le(&words)));
                        }
                    }
                    if register::target(*address) == Target::Bridge {
                        current = Some((*address, Vec::new()));
                    }
                }
                Event::Data(word) => {
                    if let Some((_, words)) = current.as_mut() {
                        words.push(*word);
                    }
                }
                _ => {}
            }
        }
        if let Some((a, words)) = current {
            if !words.is_empty() {
                writes.push((a, W::join_le(&words)));
            }
        }
        writes
    }

    /// commands addressed to the panel in issue order
    pub fn dcs_commands(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Command(a) if register::target(*a) == Target::Panel => Some(*a),
                _ => None,
            })
            .collect()
    }

    /// data words written after the last occurrence of `command`
    pub fn data_after(&self, command: u8) -> Vec<W> {
        let start = self
            .events
            .iter()
            .rposition(|e| *e == Event::Command(command))
            .expect("command not issued");
        self.events[start + 1..]
            .iter()
            .take_while(|e| !matches!(e, Event::Command(_)))
            .filter_map(|e| match e {
                Event::Data(w) => Some(*w),
                _ => None,
            })
            .collect()
    }

    pub fn reads_of(&self, address: u8) -> usize {
        self.events
            .iter()
            .filter(|e| **e == Event::Command(address))
            .count()
    }
}

impl<W: FakeWord> BridgeInterface for FakeBridge<W> {
    type Word = W;

    fn configure_bus(&mut self, timing: BusTiming) -> Result<(), Error> {
        self.events.push(Event::Configure(timing));
        Ok(())
    }

    fn assert_chip_select(&mut self) -> Result<(), Error> {
        assert!(!self.cs, "chip select asserted twice");
        self.cs = true;
        self.events.push(Event::ChipSelect(true));
        Ok(())
    }

    fn deassert_chip_select(&mut self) -> Result<(), Error> {
        self.cs = false;
        self.events.push(Event::ChipSelect(false));
        Ok(())
    }

    fn set_command_phase(&mut self) -> Result<(), Error> {
        self.data_phase = false;
        Ok(())
    }

    fn set_data_phase(&mut self) -> Result<(), Error> {
        self.data_phase = true;
        Ok(())
    }

    fn bus_write(&mut self, word: W) -> Result<(), Error> {
        assert!(self.cs, "bus write without chip select");
        if !self.data_phase {
            let address = word.low();
            self.events.push(Event::Command(address));
            self.select(address);
            return Ok(());
        }
        self.events.push(Event::Data(word));
        if let Some(address) = self.address {
            if register::target(address) == Target::Bridge && address != register::READ_DATA {
                self.pending.push(word);
                if self.pending.len() == W::split_le(0).len() {
                    self.registers[address as usize] = W::join_le(&self.pending);
                    self.pending.clear();
                }
            }
        }
        Ok(())
    }

    fn bus_read(&mut self) -> Result<W, Error> {
        assert!(self.cs && self.data_phase, "bus read outside data phase");
        let word = self.read_queue.pop_front().unwrap_or_default();
        self.events.push(Event::Read(word));
        Ok(word)
    }

    fn reset_line_assert(&mut self) -> Result<(), Error> {
        self.events.push(Event::Reset(true));
        Ok(())
    }

    fn reset_line_release(&mut self) -> Result<(), Error> {
        self.events.push(Event::Reset(false));
        Ok(())
    }

    fn power_rail_enable(&mut self, rail: PowerRail) -> Result<(), Error> {
        self.events.push(Event::Rail(rail));
        Ok(())
    }

    fn backlight_on(&mut self) -> Result<(), Error> {
        self.events.push(Event::Backlight(true));
        Ok(())
    }

    fn backlight_off(&mut self) -> Result<(), Error> {
        self.events.push(Event::Backlight(false));
        Ok(())
    }

    fn delay(&mut self, duration: Duration) -> Result<(), Error> {
        self.events.push(Event::Delay(duration));
        Ok(())
    }
}
