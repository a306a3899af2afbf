// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    hw::{VECTOR_INT0, VECTOR_PCINT2, interrupt, reset_system, unwrap_result},
    ports::Ports,
};
use avr_atomic::AvrAtomic;
use avr_periph::{
    AnalogConverter, ConversionMode, DigitalIo, ExternalLine, InterruptController, Level,
    PinChangeBank, Port, PwmChannel, PwmGenerator, PwmOutput, RegisterBus, RegisterMap,
    SenseMode,
};

/// Potentiometer on ADC0.
const POT_CHANNEL: u8 = 0;
/// ADC clock = 16 MHz / 128 = 125 kHz.
const ADC_PRESCALER: u8 = 128;
/// Mode switch on PD4.
const MODE_SWITCH_PCINT: u8 = 20;
const MODE_SWITCH: (Port, u8) = (Port::D, 4);
/// Lit while the potentiometer cannot be read.
const STATUS_LED: (Port, u8) = (Port::D, 7);

static BUTTON_PRESSED: AvrAtomic<bool> = AvrAtomic::new();
static MODE_CHANGED: AvrAtomic<bool> = AvrAtomic::new();

/// INT0: push button.
pub fn irq_handler_int0() {
    BUTTON_PRESSED.store(true);
}

/// PCINT2: mode switch.
pub fn irq_handler_pcint2() {
    MODE_CHANGED.store(true);
}

/// Fetch and reset an event flag that an interrupt handler sets.
fn take_event(flag: &AvrAtomic<bool>) -> bool {
    interrupt::free(|_cs| {
        let event = flag.load();
        flag.store(false);
        event
    })
}

/// Potentiometer -> LED brightness.
///
/// The button toggles the LED output and the mode switch halves the brightness.
pub struct System<'a, B> {
    ports: &'a Ports,
    adc: AnalogConverter<'a, B>,
    pwm: PwmGenerator<'a, B>,
    output_on: bool,
    half_scale: bool,
}

impl<'a, B: RegisterBus> System<'a, B> {
    pub fn init(bus: &'a B, map: &'a RegisterMap, ports: &'a Ports) -> Self {
        let (adc, _) =
            AnalogConverter::configure(bus, &map.adc, ADC_PRESCALER, ConversionMode::TenBit);
        let pwm = PwmGenerator::configure(bus, &map.timer, ports, PwmChannel::A);

        let ic = InterruptController::new(bus, map);
        ic.clear_pin_change_flag(unwrap_result(PinChangeBank::of(MODE_SWITCH_PCINT)));
        let int0 = ic.enable_external(ExternalLine::Int0, SenseMode::FallingEdge);
        let pcint = unwrap_result(ic.enable_pin_change(MODE_SWITCH_PCINT));

        // The handlers in hw.rs are bound to these vectors.
        if int0.number() != VECTOR_INT0 || pcint.number() != VECTOR_PCINT2 {
            reset_system();
        }

        Self {
            ports,
            adc,
            pwm,
            output_on: true,
            half_scale: ports.read(MODE_SWITCH.0, MODE_SWITCH.1) == Level::Low,
        }
    }

    pub fn run(&mut self) {
        if take_event(&BUTTON_PRESSED) {
            self.output_on = !self.output_on;
            if self.output_on {
                self.pwm.connect(self.ports, PwmOutput::A);
            } else {
                self.pwm.disconnect(PwmOutput::A);
            }
        }

        if take_event(&MODE_CHANGED) {
            self.half_scale = self.ports.read(MODE_SWITCH.0, MODE_SWITCH.1) == Level::Low;
        }

        match self.adc.read(self.ports, POT_CHANNEL) {
            Ok(code) => {
                let mut volts = f32::from(self.adc.to_millivolts(code)) / 1000.0;
                if self.half_scale {
                    volts /= 2.0;
                }
                unwrap_result(self.pwm.set_duty_cycle(PwmOutput::A.into(), volts));
                self.ports.write(STATUS_LED.0, STATUS_LED.1, Level::Low);
            }
            Err(_) => {
                self.pwm.set_compare(PwmOutput::A, 0);
                self.ports.write(STATUS_LED.0, STATUS_LED.1, Level::High);
            }
        }
    }
}

// vim: ts=4 sw=4 expandtab
