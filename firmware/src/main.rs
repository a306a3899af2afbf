// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod hw;
mod ports;
mod system;

use crate::{
    hw::{mcu::Peripherals, unwrap_option, wdt_init, wdt_poke},
    ports::Ports,
    system::System,
};
use avr_periph::{map::CHIP, reg::Mmio};

#[avr_device::entry]
fn main() -> ! {
    wdt_init();

    let dp = unwrap_option(Peripherals::take());

    let ports = Ports {
        PORTB: dp.PORTB,
        PORTC: dp.PORTC,
        PORTD: dp.PORTD,
    };
    // SAFETY: Interrupts are still disabled.
    unsafe { ports.setup() };

    // SAFETY: CHIP is the register map of the ATmega328P that we are built for.
    let bus = unsafe { Mmio::new() };

    // This enables interrupts.
    let mut system = System::init(&bus, CHIP, &ports);

    loop {
        system.run();
        wdt_poke();
    }
}

// vim: ts=4 sw=4 expandtab
