// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(unused_unsafe)]

use crate::hw::mcu;
use avr_periph::{Direction, DigitalIo, Level, Port};

#[allow(non_snake_case)]
pub struct Ports {
    pub PORTB: mcu::PORTB,
    pub PORTC: mcu::PORTC,
    pub PORTD: mcu::PORTD,
}

/// Run `$body` with `$reg` bound to register `$b`, `$c` or `$d` of `$port`.
macro_rules! with_port_reg {
    ($self:ident, $port:expr, $b:ident, $c:ident, $d:ident, |$reg:ident| $body:block) => {
        match $port {
            Port::B => {
                let $reg = $self.PORTB.$b();
                $body
            }
            Port::C => {
                let $reg = $self.PORTC.$c();
                $body
            }
            Port::D => {
                let $reg = $self.PORTD.$d();
                $body
            }
        }
    };
}

fn pin_input(_bit: usize) -> u8 {
    0
}
fn pin_output(bit: usize) -> u8 {
    1 << bit
}
fn pin_low(_bit: usize) -> u8 {
    0
}
fn pin_floating(_bit: usize) -> u8 {
    0
}
fn pin_pullup(bit: usize) -> u8 {
    1 << bit
}

impl Ports {
    /// # SAFETY
    ///
    /// Must only be called during init with IRQs disabled.
    pub unsafe fn setup(&self) {
        // PORTC: the analog inputs are switched by the converter on first use.
        self.PORTC.portc().write(|w| {
            // SAFETY: We are running in init with IRQs disabled.
            unsafe {
                w.bits(
                    pin_floating(0) | // potentiometer, ADC0
                    pin_floating(1) | // n/c
                    pin_floating(2) | // n/c
                    pin_floating(3) | // n/c
                    pin_floating(4) | // n/c
                    pin_floating(5), // n/c
                )
            }
        });

        // PORTD: OC0A is switched to output by the PWM generator.
        self.PORTD.portd().write(|w| {
            // SAFETY: We are running in init with IRQs disabled.
            unsafe {
                w.bits(
                    pin_floating(0) | // RXD
                    pin_floating(1) | // TXD
                    pin_pullup(2) | // push button, INT0, active low
                    pin_floating(3) | // n/c
                    pin_pullup(4) | // mode switch, PCINT20
                    pin_low(5) | // OC0B, n/c
                    pin_low(6) | // OC0A, LED
                    pin_low(7), // status LED
                )
            }
        });
        self.PORTD.ddrd().write(|w| {
            // SAFETY: We are running in init with IRQs disabled.
            unsafe {
                w.bits(
                    pin_input(0) | // RXD
                    pin_input(1) | // TXD
                    pin_input(2) | // push button, INT0, active low
                    pin_input(3) | // n/c
                    pin_input(4) | // mode switch, PCINT20
                    pin_input(5) | // OC0B, n/c
                    pin_input(6) | // OC0A, LED
                    pin_output(7), // status LED
                )
            }
        });
    }
}

impl DigitalIo for Ports {
    fn set_direction(&self, port: Port, pin: u8, direction: Direction) {
        let mask = 1 << pin;
        with_port_reg!(self, port, ddrb, ddrc, ddrd, |ddr| {
            ddr.modify(|r, w| {
                let bits = match direction {
                    Direction::Input => r.bits() & !mask,
                    Direction::Output => r.bits() | mask,
                };
                // SAFETY: Every bit pattern is valid for the DDR registers.
                unsafe { w.bits(bits) }
            });
        })
    }

    fn write(&self, port: Port, pin: u8, level: Level) {
        let mask = 1 << pin;
        with_port_reg!(self, port, portb, portc, portd, |reg| {
            reg.modify(|r, w| {
                let bits = match level {
                    Level::Low => r.bits() & !mask,
                    Level::High => r.bits() | mask,
                };
                // SAFETY: Every bit pattern is valid for the PORT registers.
                unsafe { w.bits(bits) }
            });
        })
    }

    fn read(&self, port: Port, pin: u8) -> Level {
        let mask = 1 << pin;
        with_port_reg!(self, port, pinb, pinc, pind, |reg| {
            (reg.read().bits() & mask != 0).into()
        })
    }

    fn toggle(&self, port: Port, pin: u8) {
        // Writing a one to PINx toggles PORTx.
        with_port_reg!(self, port, pinb, pinc, pind, |reg| {
            // SAFETY: Only the addressed pin is toggled.
            reg.write(|w| unsafe { w.bits(1 << pin) });
        })
    }
}

// vim: ts=4 sw=4 expandtab
