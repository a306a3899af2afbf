// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

pub use avr_device::atmega328p as mcu;
pub use avr_device::interrupt;

/// Vector table index of INT0.
/// Must match what the interrupt controller returns for [avr_periph::ExternalLine::Int0].
pub const VECTOR_INT0: u8 = 1;
/// Vector table index of PCINT2 (PCINT23..16).
pub const VECTOR_PCINT2: u8 = 5;

macro_rules! define_isr {
    ($name:ident, $handler:path) => {
        #[avr_device::interrupt(atmega328p)]
        fn $name() {
            $handler();
        }
    };
}

define_isr!(INT0, crate::system::irq_handler_int0);
define_isr!(PCINT2, crate::system::irq_handler_pcint2);

/// Enable the watchdog with a 64 ms timeout.
pub fn wdt_init() {
    // SAFETY: The asm code only accesses the WDT register
    //         which is not accessed from anywhere else in the program.
    //         The second store must follow the first one within 4 cycles.
    unsafe {
        core::arch::asm!(
            "ldi {tmp}, 0x18", // WDCE=1, WDE=1
            "sts {WDTCSR}, {tmp}",
            "ldi {tmp}, 0x0A", // WDE=1, WDP=0b0010
            "sts {WDTCSR}, {tmp}",
            tmp = out(reg_upper) _,
            WDTCSR = const 0x60,
            options(nostack, preserves_flags)
        );
    }
}

#[inline(always)]
pub fn wdt_poke() {
    avr_device::asm::wdr();
}

/// Cheaper Option::unwrap() alternative.
///
/// This is cheaper, because it doesn't call into the panic unwind path.
#[inline(always)]
pub fn unwrap_option<T>(value: Option<T>) -> T {
    match value {
        Some(value) => value,
        None => reset_system(),
    }
}

/// Cheaper Result::unwrap() alternative.
#[inline(always)]
pub fn unwrap_result<T, E>(value: Result<T, E>) -> T {
    match value {
        Ok(value) => value,
        Err(_) => reset_system(),
    }
}

/// Reset the system.
#[inline(always)]
#[allow(clippy::empty_loop)]
pub fn reset_system() -> ! {
    interrupt::disable();
    loop {
        // Wait for the watchdog timer to trigger and reset the system.
    }
}

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    reset_system();
}

// vim: ts=4 sw=4 expandtab
