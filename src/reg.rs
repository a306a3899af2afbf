// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed access to the 8-bit memory mapped I/O registers.

/// Data-space address of one 8-bit I/O register.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reg(pub u16);

impl Reg {
    #[inline]
    pub const fn addr(self) -> u16 {
        self.0
    }

    /// A single bit of this register.
    #[inline]
    pub const fn bit(self, bit: u8) -> Bit {
        Bit { reg: self, bit }
    }

    /// A `width` bits wide field starting at bit `shift`.
    #[inline]
    pub const fn field(self, shift: u8, width: u8) -> Field {
        Field {
            reg: self,
            shift,
            width,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bit {
    pub reg: Reg,
    pub bit: u8,
}

impl Bit {
    #[inline]
    pub const fn mask(self) -> u8 {
        1 << self.bit
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    pub reg: Reg,
    pub shift: u8,
    pub width: u8,
}

impl Field {
    #[inline]
    pub const fn mask(self) -> u8 {
        ((((1_u16) << self.width) - 1) as u8) << self.shift
    }

    /// Move `value` into the field position.
    /// Bits of `value` that don't fit into the field are dropped.
    #[inline]
    pub const fn encode(self, value: u8) -> u8 {
        (value << self.shift) & self.mask()
    }

    #[inline]
    pub const fn decode(self, raw: u8) -> u8 {
        (raw & self.mask()) >> self.shift
    }
}

/// The hardware seam.
///
/// Everything in this crate that touches the peripherals does so
/// through an implementation of this trait.
pub trait RegisterBus {
    fn read(&self, reg: Reg) -> u8;

    fn write(&self, reg: Reg, value: u8);

    /// Set the global interrupt enable flag.
    fn enable_interrupts(&self);

    /// Clear the global interrupt enable flag.
    fn disable_interrupts(&self);
}

/// Read-modify-write helpers on top of [RegisterBus].
///
/// None of these are atomic with respect to interrupts.
pub trait RegisterAccess: RegisterBus {
    #[inline]
    fn modify<F: FnOnce(u8) -> u8>(&self, reg: Reg, f: F) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    #[inline]
    fn set_bit(&self, bit: Bit) {
        self.modify(bit.reg, |v| v | bit.mask());
    }

    #[inline]
    fn clear_bit(&self, bit: Bit) {
        self.modify(bit.reg, |v| v & !bit.mask());
    }

    #[inline]
    fn bit_is_set(&self, bit: Bit) -> bool {
        self.read(bit.reg) & bit.mask() != 0
    }

    /// Replace the field contents.
    /// The old field bits are cleared first. The other bits are preserved.
    #[inline]
    fn write_field(&self, field: Field, value: u8) {
        self.modify(field.reg, |v| (v & !field.mask()) | field.encode(value));
    }

    #[inline]
    fn read_field(&self, field: Field) -> u8 {
        field.decode(self.read(field.reg))
    }

    /// Clear an interrupt flag.
    ///
    /// Interrupt flags are cleared by writing a one.
    /// This is a plain write, not a read-modify-write,
    /// so that other pending flags in the same register are not lost.
    #[inline]
    fn write_one_to_clear(&self, bit: Bit) {
        self.write(bit.reg, bit.mask());
    }
}

impl<B: RegisterBus + ?Sized> RegisterAccess for B {}

/// Direct volatile access to the live I/O registers.
#[cfg(target_arch = "avr")]
pub struct Mmio(());

#[cfg(target_arch = "avr")]
impl Mmio {
    /// # SAFETY
    ///
    /// The register map that is used together with this bus
    /// must describe the chip that the code runs on.
    /// Register accesses through this bus are not synchronized
    /// with interrupt handlers. See the crate documentation.
    #[inline(always)]
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

#[cfg(target_arch = "avr")]
impl RegisterBus for Mmio {
    #[inline(always)]
    fn read(&self, reg: Reg) -> u8 {
        // SAFETY: The address comes from the register map,
        //         which the `Mmio::new` contract ties to this chip.
        unsafe { core::ptr::read_volatile(reg.addr() as usize as *const u8) }
    }

    #[inline(always)]
    fn write(&self, reg: Reg, value: u8) {
        // SAFETY: See `read`.
        unsafe { core::ptr::write_volatile(reg.addr() as usize as *mut u8, value) }
    }

    #[inline(always)]
    fn enable_interrupts(&self) {
        // SAFETY: Enabling interrupts is what the caller asked for.
        //         Handlers must be bound to the returned vectors at build time.
        unsafe { avr_device::interrupt::enable() };
    }

    #[inline(always)]
    fn disable_interrupts(&self) {
        avr_device::interrupt::disable();
    }
}


// vim: ts=4 sw=4 expandtab
