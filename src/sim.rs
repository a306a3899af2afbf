// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory stand-in for the memory mapped registers.
//!
//! [SimBus] models the hardware side effects that the register
//! protocols depend on: the self-clearing conversion start bit,
//! the ADCL/ADCH result latch and write-one-to-clear interrupt flags.

use crate::{
    gpio::{Direction, DigitalIo, Level, Port},
    map::RegisterMap,
    reg::{Bit, Reg, RegisterBus},
};
use core::cell::Cell;

const DATA_SPACE: usize = 0x100;
const MAX_RESULT_READS: usize = 8;

/// Number of status polls a simulated conversion stays busy.
pub const DEFAULT_CONVERSION_POLLS: u16 = 3;

/// The ADCL/ADCH reads, in access order.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ResultReads {
    regs: [Reg; MAX_RESULT_READS],
    len: usize,
}

impl ResultReads {
    const fn new() -> Self {
        Self {
            regs: [Reg(0); MAX_RESULT_READS],
            len: 0,
        }
    }

    fn push(&mut self, reg: Reg) {
        if self.len < MAX_RESULT_READS {
            self.regs[self.len] = reg;
            self.len += 1;
        }
    }

    pub fn as_slice(&self) -> &[Reg] {
        &self.regs[..self.len]
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Conversion {
    Idle,
    Busy(u16),
    Stuck,
}

pub struct SimBus {
    map: &'static RegisterMap,
    mem: [Cell<u8>; DATA_SPACE],
    irq_enabled: Cell<bool>,
    inputs: Cell<[u16; 16]>,
    conversion: Cell<Conversion>,
    conversion_polls: Cell<u16>,
    stuck: Cell<bool>,
    latched: Cell<bool>,
    result_reads: Cell<ResultReads>,
}

impl SimBus {
    /// All registers start out as zero, like after reset.
    pub fn new(map: &'static RegisterMap) -> Self {
        Self {
            map,
            mem: [const { Cell::new(0) }; DATA_SPACE],
            irq_enabled: Cell::new(false),
            inputs: Cell::new([0; 16]),
            conversion: Cell::new(Conversion::Idle),
            conversion_polls: Cell::new(DEFAULT_CONVERSION_POLLS),
            stuck: Cell::new(false),
            latched: Cell::new(false),
            result_reads: Cell::new(ResultReads::new()),
        }
    }

    /// Raw register contents, without any hardware side effect.
    pub fn peek(&self, reg: Reg) -> u8 {
        self.cell(reg).map_or(0, Cell::get)
    }

    /// Raw register store, without any hardware side effect.
    pub fn poke(&self, reg: Reg, value: u8) {
        if let Some(cell) = self.cell(reg) {
            cell.set(value);
        }
    }

    /// The 10 bit code that a conversion of `channel` produces.
    pub fn set_adc_input(&self, channel: u8, code: u16) {
        let mut inputs = self.inputs.get();
        if let Some(input) = inputs.get_mut(channel as usize) {
            *input = code & 0x3FF;
        }
        self.inputs.set(inputs);
    }

    /// Number of status polls before a started conversion completes.
    pub fn set_conversion_polls(&self, polls: u16) {
        self.conversion_polls.set(polls);
    }

    /// Started conversions never complete.
    pub fn set_conversion_stuck(&self, stuck: bool) {
        self.stuck.set(stuck);
    }

    pub fn raise_external_flag(&self, line: usize) {
        self.set_flag(self.map.exint.lines[line].flag);
    }

    pub fn raise_pin_change_flag(&self, bank: usize) {
        self.set_flag(self.map.pcint.banks[bank].flag);
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.irq_enabled.get()
    }

    pub fn result_reads(&self) -> ResultReads {
        self.result_reads.get()
    }

    pub fn clear_result_reads(&self) {
        self.result_reads.set(ResultReads::new());
    }

    fn cell(&self, reg: Reg) -> Option<&Cell<u8>> {
        self.mem.get(reg.addr() as usize)
    }

    fn set_flag(&self, flag: Bit) {
        self.poke(flag.reg, self.peek(flag.reg) | flag.mask());
    }

    fn is_flag_register(&self, reg: Reg) -> bool {
        reg == self.map.exint.eifr || reg == self.map.pcint.pcifr
    }

    fn start_conversion(&self) {
        let conversion = if self.stuck.get() {
            Conversion::Stuck
        } else {
            Conversion::Busy(self.conversion_polls.get())
        };
        self.conversion.set(conversion);
    }

    /// One status register poll of a running conversion.
    fn poll_conversion(&self) {
        match self.conversion.get() {
            Conversion::Idle | Conversion::Stuck => (),
            Conversion::Busy(0) => {
                self.conversion.set(Conversion::Idle);
                self.complete_conversion();
            }
            Conversion::Busy(n) => {
                self.conversion.set(Conversion::Busy(n - 1));
            }
        }
    }

    fn complete_conversion(&self) {
        let adc = &self.map.adc;
        let adsc = adc.adsc;
        self.poke(adsc.reg, self.peek(adsc.reg) & !adsc.mask());

        // The data registers stay locked between an ADCL and an ADCH read.
        if self.latched.get() {
            return;
        }
        let channel = adc.mux.decode(self.peek(adc.mux.reg));
        let code = self.inputs.get().get(channel as usize).copied().unwrap_or(0);
        let left_adjust = self.peek(adc.adlar.reg) & adc.adlar.mask() != 0;
        let (high, low) = if left_adjust {
            ((code >> 2) as u8, ((code & 0x3) << 6) as u8)
        } else {
            ((code >> 8) as u8, (code & 0xFF) as u8)
        };
        self.poke(adc.adch, high);
        self.poke(adc.adcl, low);
    }
}

impl RegisterBus for SimBus {
    fn read(&self, reg: Reg) -> u8 {
        let adc = &self.map.adc;
        if reg == adc.adsc.reg {
            self.poll_conversion();
        } else if reg == adc.adcl {
            self.latched.set(true);
            let mut reads = self.result_reads.get();
            reads.push(reg);
            self.result_reads.set(reads);
        } else if reg == adc.adch {
            self.latched.set(false);
            let mut reads = self.result_reads.get();
            reads.push(reg);
            self.result_reads.set(reads);
        }
        self.peek(reg)
    }

    fn write(&self, reg: Reg, value: u8) {
        if self.is_flag_register(reg) {
            self.poke(reg, self.peek(reg) & !value);
            return;
        }
        self.poke(reg, value);

        let adc = &self.map.adc;
        if reg != adc.adsc.reg {
            return;
        }
        if self.conversion.get() != Conversion::Idle {
            // Writing zero to ADSC has no effect on a running conversion.
            self.poke(reg, value | adc.adsc.mask());
        } else if value & adc.adsc.mask() != 0 {
            if value & adc.aden.mask() != 0 && adc.aden.reg == reg {
                self.start_conversion();
            } else {
                // A disabled converter does not start.
                self.poke(reg, value & !adc.adsc.mask());
            }
        }
    }

    fn enable_interrupts(&self) {
        self.irq_enabled.set(true);
    }

    fn disable_interrupts(&self) {
        self.irq_enabled.set(false);
    }
}

fn port_index(port: Port) -> usize {
    match port {
        Port::B => 0,
        Port::C => 1,
        Port::D => 2,
    }
}

/// [DigitalIo] over three simulated ports.
pub struct SimPins {
    ddr: [Cell<u8>; 3],
    port: [Cell<u8>; 3],
    pin: [Cell<u8>; 3],
    direction_changes: Cell<u16>,
}

impl SimPins {
    pub fn new() -> Self {
        Self {
            ddr: [const { Cell::new(0) }; 3],
            port: [const { Cell::new(0) }; 3],
            pin: [const { Cell::new(0) }; 3],
            direction_changes: Cell::new(0),
        }
    }

    pub fn is_output(&self, port: Port, pin: u8) -> bool {
        self.ddr[port_index(port)].get() & (1 << pin) != 0
    }

    pub fn output_level(&self, port: Port, pin: u8) -> Level {
        (self.port[port_index(port)].get() & (1 << pin) != 0).into()
    }

    /// Drive the external level of an input pin.
    pub fn set_input_level(&self, port: Port, pin: u8, level: Level) {
        let cell = &self.pin[port_index(port)];
        if bool::from(level) {
            cell.set(cell.get() | (1 << pin));
        } else {
            cell.set(cell.get() & !(1 << pin));
        }
    }

    pub fn direction_changes(&self) -> u16 {
        self.direction_changes.get()
    }
}

impl Default for SimPins {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitalIo for SimPins {
    fn set_direction(&self, port: Port, pin: u8, direction: Direction) {
        let ddr = &self.ddr[port_index(port)];
        match direction {
            Direction::Input => ddr.set(ddr.get() & !(1 << pin)),
            Direction::Output => ddr.set(ddr.get() | (1 << pin)),
        }
        self.direction_changes.set(self.direction_changes.get() + 1);
    }

    fn write(&self, port: Port, pin: u8, level: Level) {
        let cell = &self.port[port_index(port)];
        if bool::from(level) {
            cell.set(cell.get() | (1 << pin));
        } else {
            cell.set(cell.get() & !(1 << pin));
        }
    }

    fn read(&self, port: Port, pin: u8) -> Level {
        (self.pin[port_index(port)].get() & (1 << pin) != 0).into()
    }

    fn toggle(&self, port: Port, pin: u8) {
        let cell = &self.port[port_index(port)];
        cell.set(cell.get() ^ (1 << pin));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{map::ATMEGA328P, reg::RegisterAccess};

    #[test]
    fn test_flags_write_one_to_clear() {
        let bus = SimBus::new(&ATMEGA328P);
        let eifr = ATMEGA328P.exint.eifr;
        bus.raise_external_flag(0);
        bus.raise_external_flag(1);
        assert_eq!(bus.peek(eifr), 0b11);
        bus.write(eifr, 0b01);
        assert_eq!(bus.peek(eifr), 0b10);
        bus.write(eifr, 0b00);
        assert_eq!(bus.peek(eifr), 0b10);
    }

    #[test]
    fn test_conversion_needs_enable() {
        let bus = SimBus::new(&ATMEGA328P);
        let adc = &ATMEGA328P.adc;
        bus.set_bit(adc.adsc);
        assert!(!bus.bit_is_set(adc.adsc));

        bus.set_bit(adc.aden);
        bus.set_conversion_polls(2);
        bus.set_bit(adc.adsc);
        assert!(bus.bit_is_set(adc.adsc));
        assert!(bus.bit_is_set(adc.adsc));
        assert!(!bus.bit_is_set(adc.adsc));
    }

    #[test]
    fn test_result_latch() {
        let bus = SimBus::new(&ATMEGA328P);
        let adc = &ATMEGA328P.adc;
        bus.set_adc_input(0, 0x155);
        bus.set_bit(adc.aden);
        bus.set_conversion_polls(0);
        bus.set_bit(adc.adsc);
        while bus.bit_is_set(adc.adsc) {}
        assert_eq!(bus.read(adc.adcl), 0x55);

        // A conversion that completes while locked does not replace the data.
        bus.set_adc_input(0, 0x2AA);
        bus.set_bit(adc.adsc);
        while bus.bit_is_set(adc.adsc) {}
        assert_eq!(bus.read(adc.adch), 0x01);
        assert_eq!(
            bus.result_reads().as_slice(),
            &[adc.adcl, adc.adch]
        );
    }

    #[test]
    fn test_pins() {
        let pins = SimPins::new();
        pins.set_direction(Port::D, 6, Direction::Output);
        assert!(pins.is_output(Port::D, 6));
        assert!(!pins.is_output(Port::D, 5));
        pins.write(Port::D, 6, Level::High);
        assert_eq!(pins.output_level(Port::D, 6), Level::High);
        pins.toggle(Port::D, 6);
        assert_eq!(pins.output_level(Port::D, 6), Level::Low);
        pins.set_input_level(Port::B, 0, Level::High);
        assert_eq!(pins.read(Port::B, 0), Level::High);
        assert_eq!(pins.direction_changes(), 1);
    }
}

// vim: ts=4 sw=4 expandtab
