// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! External (INTx) and pin-change (PCINTx) interrupt configuration.
//!
//! The enable calls return a [VectorSelector].
//! It names the hardware vector that will fire.
//! Binding a handler to that vector happens at build time
//! in the interrupt vector table, not here.
//!
//! Once an interrupt is enabled, its handler runs asynchronously to the
//! main context. The pin-change mask and enable registers are modified with
//! read-modify-write sequences. If a handler modifies them too, the main
//! context must call into this module with interrupts disabled.

use crate::{
    error::Error,
    log::{log_debug, log_warn},
    map::{ExtIntMap, ExtLineMap, PinChangeBankMap, PinChangeMap, RegisterMap},
    reg::{RegisterAccess, RegisterBus},
};
use derive_more::Into;

/// Number of pin-change interrupt sources (PCINT0..PCINT23).
pub const PIN_CHANGE_PINS: u8 = 24;

const PINS_PER_BANK: u8 = 8;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExternalLine {
    Int0,
    Int1,
}

/// Interrupt sense control.
/// The discriminant is the two bit ISCn field encoding.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SenseMode {
    LowLevel = 0,
    AnyChange = 1,
    FallingEdge = 2,
    RisingEdge = 3,
}

impl SenseMode {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::LowLevel,
            1 => Self::AnyChange,
            2 => Self::FallingEdge,
            _ => Self::RisingEdge,
        }
    }
}

/// Identifies the interrupt vector that an enabled source fires.
///
/// The number is the vector table index (`INT0_vect_num` etc.).
#[derive(Copy, Clone, PartialEq, Eq, Debug, Into)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VectorSelector(u8);

impl VectorSelector {
    #[inline]
    pub const fn number(self) -> u8 {
        self.0
    }
}

/// A group of 8 pin-change sources sharing one mask register and one vector.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinChangeBank {
    Bank0,
    Bank1,
    Bank2,
}

impl PinChangeBank {
    /// The bank of pin-change source `pin`.
    pub const fn of(pin: u8) -> Result<Self, Error> {
        match pin / PINS_PER_BANK {
            0 => Ok(Self::Bank0),
            1 => Ok(Self::Bank1),
            2 => Ok(Self::Bank2),
            _ => Err(Error::InvalidPinChange(pin)),
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

pub struct InterruptController<'a, B> {
    bus: &'a B,
    exint: &'a ExtIntMap,
    pcint: &'a PinChangeMap,
}

impl<'a, B: RegisterBus> InterruptController<'a, B> {
    /// No register is touched until a source is enabled.
    pub fn new(bus: &'a B, map: &'a RegisterMap) -> Self {
        Self {
            bus,
            exint: &map.exint,
            pcint: &map.pcint,
        }
    }

    fn line(&self, line: ExternalLine) -> &'a ExtLineMap {
        match line {
            ExternalLine::Int0 => &self.exint.lines[0],
            ExternalLine::Int1 => &self.exint.lines[1],
        }
    }

    fn bank(&self, bank: PinChangeBank) -> &'a PinChangeBankMap {
        &self.pcint.banks[bank.index()]
    }

    /// Enable interrupts globally and arm `line` with the sense `mode`.
    ///
    /// Changing ISCn can raise INTFn, so the line is masked while the
    /// sense field changes and its flag is dropped before it is unmasked.
    /// A request that was pending on `line` before this call is lost.
    /// The other line is not touched.
    pub fn enable_external(&self, line: ExternalLine, mode: SenseMode) -> VectorSelector {
        let l = self.line(line);
        self.bus.clear_bit(l.enable);
        self.bus.write_field(l.sense, mode as u8);
        self.bus.write_one_to_clear(l.flag);
        self.bus.enable_interrupts();
        self.bus.set_bit(l.enable);
        log_debug!("exint: {} on {} -> vector {=u8}", line, mode, l.vector);
        VectorSelector(l.vector)
    }

    /// Mask `line`. The sense mode and the global enable flag stay as they are.
    pub fn disable_external(&self, line: ExternalLine) {
        self.bus.clear_bit(self.line(line).enable);
    }

    pub fn sense_mode(&self, line: ExternalLine) -> SenseMode {
        SenseMode::from_bits(self.bus.read_field(self.line(line).sense))
    }

    /// Whether `line` has a pending request.
    pub fn external_flag(&self, line: ExternalLine) -> bool {
        self.bus.bit_is_set(self.line(line).flag)
    }

    /// Drop a pending request of `line`.
    /// The flag of the other line is not affected.
    pub fn clear_external_flag(&self, line: ExternalLine) {
        self.bus.write_one_to_clear(self.line(line).flag);
    }

    /// Enable interrupts globally and arm the pin-change source `pin` (0..=23).
    ///
    /// All pins of a bank fire the same vector.
    pub fn enable_pin_change(&self, pin: u8) -> Result<VectorSelector, Error> {
        let bank = PinChangeBank::of(pin).inspect_err(|_| {
            log_warn!("pcint: pin {=u8} out of range", pin);
        })?;
        let b = self.bank(bank);
        self.bus.enable_interrupts();
        self.bus.set_bit(b.enable);
        self.bus.set_bit(b.mask.bit(pin % PINS_PER_BANK));
        log_debug!("pcint: pin {=u8} -> vector {=u8}", pin, b.vector);
        Ok(VectorSelector(b.vector))
    }

    /// Disarm the pin-change source `pin`.
    ///
    /// Only the pin's mask bit is cleared.
    /// The bank stays enabled, even if no pin of it is armed anymore.
    pub fn disable_pin_change(&self, pin: u8) -> Result<(), Error> {
        let bank = PinChangeBank::of(pin).inspect_err(|_| {
            log_warn!("pcint: pin {=u8} out of range", pin);
        })?;
        self.bus.clear_bit(self.bank(bank).mask.bit(pin % PINS_PER_BANK));
        Ok(())
    }

    /// Disable all pin-change banks. The per-pin masks are kept.
    pub fn disable_all_pin_change(&self) {
        for bank in &self.pcint.banks {
            self.bus.clear_bit(bank.enable);
        }
    }

    pub fn pin_change_flag(&self, bank: PinChangeBank) -> bool {
        self.bus.bit_is_set(self.bank(bank).flag)
    }

    pub fn clear_pin_change_flag(&self, bank: PinChangeBank) {
        self.bus.write_one_to_clear(self.bank(bank).flag);
    }
}


// vim: ts=4 sw=4 expandtab
