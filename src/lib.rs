// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Register protocols of the 8-bit AVR analog converter, timer PWM and
//! external/pin-change interrupt controller.
//!
//! All hardware access goes through the [RegisterBus] seam.
//! On the target that is [reg::Mmio]; on the host the [sim::SimBus]
//! stands in for the memory mapped registers.
//!
//! # Interrupt context
//!
//! None of the components lock the registers they modify.
//! Every operation is a plain read-modify-write sequence.
//! If an interrupt handler touches the same register as the main context
//! (e.g. a pin-change mask that the handler re-arms), then the caller must
//! run the main context call with interrupts disabled.

#![no_std]

#[cfg(test)]
extern crate std;

mod log;

pub mod adc;
pub mod error;
pub mod gpio;
pub mod interrupt;
pub mod map;
pub mod pwm;
pub mod reg;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use crate::{
    adc::{AnalogConverter, ConversionMode, Prescaler, PrescalerSelection},
    error::Error,
    gpio::{Direction, DigitalIo, Level, PinId, Port},
    interrupt::{ExternalLine, InterruptController, PinChangeBank, SenseMode, VectorSelector},
    map::RegisterMap,
    pwm::{PwmChannel, PwmGenerator, PwmOutput},
    reg::{RegisterAccess, RegisterBus},
};

/// Fixed reference voltage of the converter and the PWM output, in millivolts.
pub const VREF_MV: u16 = 5000;

/// Fixed reference voltage of the converter and the PWM output, in volts.
pub const VREF_V: u16 = VREF_MV / 1000;

// vim: ts=4 sw=4 expandtab
