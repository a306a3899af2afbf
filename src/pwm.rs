// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fast PWM on the two compare outputs of an 8 bit timer.

use crate::{
    VREF_V,
    error::Error,
    gpio::{Direction, DigitalIo, PinId},
    log::{log_debug, log_trace, log_warn},
    map::PwmTimerMap,
    reg::{Field, Reg, RegisterAccess, RegisterBus},
};

/// WGM0[2:0] = 3: fast PWM, TOP = 0xFF.
/// WGM02 must be zero, otherwise TOP is OCR0A.
const WGM_FAST_PWM: u8 = 0b11;
/// CS0 = 1: timer clock = CPU clock.
const CS_NO_PRESCALING: u8 = 0b001;
/// COM0x = 2: clear on compare match, set at BOTTOM.
const COM_CLEAR_ON_MATCH: u8 = 0b10;
/// COM0x = 0: normal port operation.
const COM_DISCONNECTED: u8 = 0b00;

/// Compare outputs selected at configuration time.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmChannel {
    A,
    B,
    Both,
}

impl PwmChannel {
    pub const fn outputs(self) -> &'static [PwmOutput] {
        match self {
            Self::A => &[PwmOutput::A],
            Self::B => &[PwmOutput::B],
            Self::Both => &[PwmOutput::A, PwmOutput::B],
        }
    }

    /// The single output this channel names, if it names exactly one.
    pub const fn single(self) -> Option<PwmOutput> {
        match self {
            Self::A => Some(PwmOutput::A),
            Self::B => Some(PwmOutput::B),
            Self::Both => None,
        }
    }
}

/// One compare output.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmOutput {
    A,
    B,
}

impl From<PwmOutput> for PwmChannel {
    fn from(output: PwmOutput) -> Self {
        match output {
            PwmOutput::A => Self::A,
            PwmOutput::B => Self::B,
        }
    }
}

/// Compare value for an output voltage.
///
/// Linear against the 5 V reference and truncated.
/// Voltages outside of `0.0..=5.0` are not clamped.
/// The scaled value wraps at the 8 bit boundary instead.
pub fn compare_value(volts: f32) -> u8 {
    let scaled = volts * 255.0 / f32::from(VREF_V);
    scaled as i32 as u8
}

pub struct PwmGenerator<'a, B> {
    bus: &'a B,
    map: &'a PwmTimerMap,
}

impl<'a, B: RegisterBus> PwmGenerator<'a, B> {
    /// Run the timer in fast PWM mode from the undivided CPU clock
    /// and connect the compare output(s) of `channel`.
    ///
    /// Connected output pins are switched to output.
    pub fn configure<P: DigitalIo>(
        bus: &'a B,
        map: &'a PwmTimerMap,
        pins: &P,
        channel: PwmChannel,
    ) -> Self {
        bus.write_field(map.wgm, WGM_FAST_PWM);
        bus.clear_bit(map.wgm2);
        bus.write_field(map.cs, CS_NO_PRESCALING);

        let pwm = Self { bus, map };
        for &output in channel.outputs() {
            pwm.connect(pins, output);
        }
        log_debug!("pwm: configured {}", channel);
        pwm
    }

    fn pin(&self, output: PwmOutput) -> PinId {
        match output {
            PwmOutput::A => self.map.pin_a,
            PwmOutput::B => self.map.pin_b,
        }
    }

    fn com(&self, output: PwmOutput) -> Field {
        match output {
            PwmOutput::A => self.map.com_a,
            PwmOutput::B => self.map.com_b,
        }
    }

    fn ocr(&self, output: PwmOutput) -> Reg {
        match output {
            PwmOutput::A => self.map.ocra,
            PwmOutput::B => self.map.ocrb,
        }
    }

    /// Connect a compare output to its pin.
    pub fn connect<P: DigitalIo>(&self, pins: &P, output: PwmOutput) {
        let pin = self.pin(output);
        pins.set_direction(pin.port, pin.pin, Direction::Output);
        self.bus.write_field(self.com(output), COM_CLEAR_ON_MATCH);
    }

    /// Return the pin to normal digital I/O.
    ///
    /// Disconnecting an already disconnected output is harmless.
    pub fn disconnect(&self, output: PwmOutput) {
        self.bus.write_field(self.com(output), COM_DISCONNECTED);
    }

    /// Set the duty cycle of one output from a voltage, see [compare_value].
    ///
    /// `channel` must name exactly one output.
    /// [PwmChannel::Both] is rejected and nothing is written.
    /// Returns the compare value that was written.
    pub fn set_duty_cycle(&self, channel: PwmChannel, volts: f32) -> Result<u8, Error> {
        let Some(output) = channel.single() else {
            log_warn!("pwm: duty cycle write to {}", channel);
            return Err(Error::InvalidPwmChannel);
        };
        let value = compare_value(volts);
        self.set_compare(output, value);
        Ok(value)
    }

    /// Write the raw compare value of one output.
    pub fn set_compare(&self, output: PwmOutput, value: u8) {
        log_trace!("pwm: {} compare {=u8}", output, value);
        self.bus.write(self.ocr(output), value);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        gpio::Port,
        map::ATMEGA328P,
        sim::{SimBus, SimPins},
    };

    static TIMER: &PwmTimerMap = &ATMEGA328P.timer;

    #[test]
    fn test_configure_a() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        PwmGenerator::configure(&bus, TIMER, &pins, PwmChannel::A);

        assert_eq!(bus.read_field(TIMER.wgm), 0b11);
        assert_eq!(bus.read_field(TIMER.cs), 0b001);
        assert_eq!(bus.read_field(TIMER.com_a), 0b10);
        assert_eq!(bus.read_field(TIMER.com_b), 0b00);
        assert!(pins.is_output(Port::D, 6));
        assert!(!pins.is_output(Port::D, 5));
    }

    #[test]
    fn test_configure_both() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        PwmGenerator::configure(&bus, TIMER, &pins, PwmChannel::Both);

        assert_eq!(bus.peek(TIMER.tccra), 0b1010_0011);
        assert_eq!(bus.peek(TIMER.tccrb), 0b0000_0001);
        assert!(pins.is_output(Port::D, 6));
        assert!(pins.is_output(Port::D, 5));
    }

    #[test]
    fn test_configure_clears_wgm2() {
        for preset in [0b0000_1000, 0b0000_1101] {
            let bus = SimBus::new(&ATMEGA328P);
            let pins = SimPins::new();
            bus.poke(TIMER.tccrb, preset);
            bus.poke(TIMER.tccra, 0b0000_0001);
            PwmGenerator::configure(&bus, TIMER, &pins, PwmChannel::A);

            assert!(!bus.bit_is_set(TIMER.wgm2));
            assert_eq!(bus.read_field(TIMER.wgm), 0b11);
            assert_eq!(bus.peek(TIMER.tccrb), 0b0000_0001);
        }
    }

    #[test]
    fn test_configure_order_independent() {
        let bus_ab = SimBus::new(&ATMEGA328P);
        let pins_ab = SimPins::new();
        let pwm = PwmGenerator::configure(&bus_ab, TIMER, &pins_ab, PwmChannel::A);
        pwm.connect(&pins_ab, PwmOutput::B);

        let bus_ba = SimBus::new(&ATMEGA328P);
        let pins_ba = SimPins::new();
        let pwm = PwmGenerator::configure(&bus_ba, TIMER, &pins_ba, PwmChannel::B);
        pwm.connect(&pins_ba, PwmOutput::A);

        assert_eq!(bus_ab.peek(TIMER.tccra), bus_ba.peek(TIMER.tccra));
        assert_eq!(bus_ab.peek(TIMER.tccrb), bus_ba.peek(TIMER.tccrb));
    }

    #[test]
    fn test_compare_value() {
        assert_eq!(compare_value(0.0), 0);
        assert_eq!(compare_value(5.0), 255);
        assert_eq!(compare_value(2.5), 127);
        assert_eq!(compare_value(1.0), 51);
        assert_eq!(compare_value(0.01), 0);

        let mut prev = 0;
        for mv in (0..=5000).step_by(7) {
            let value = compare_value(mv as f32 / 1000.0);
            assert!(value >= prev);
            prev = value;
        }
    }

    #[test]
    fn test_compare_value_wraps() {
        // 6 V -> 306 -> 306 - 256
        assert_eq!(compare_value(6.0), 50);
        // -1 V -> -51 -> 256 - 51
        assert_eq!(compare_value(-1.0), 205);
    }

    #[test]
    fn test_set_duty_cycle() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        let pwm = PwmGenerator::configure(&bus, TIMER, &pins, PwmChannel::Both);

        assert_eq!(pwm.set_duty_cycle(PwmChannel::A, 2.5), Ok(127));
        assert_eq!(bus.peek(TIMER.ocra), 127);
        assert_eq!(bus.peek(TIMER.ocrb), 0);

        assert_eq!(pwm.set_duty_cycle(PwmChannel::B, 5.0), Ok(255));
        assert_eq!(bus.peek(TIMER.ocrb), 255);
        assert_eq!(pwm.set_duty_cycle(PwmChannel::B, 0.0), Ok(0));
        assert_eq!(bus.peek(TIMER.ocrb), 0);
        assert_eq!(bus.peek(TIMER.ocra), 127);
    }

    #[test]
    fn test_set_duty_cycle_both() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        let pwm = PwmGenerator::configure(&bus, TIMER, &pins, PwmChannel::Both);
        pwm.set_compare(PwmOutput::A, 10);
        pwm.set_compare(PwmOutput::B, 20);

        assert_eq!(pwm.set_duty_cycle(PwmChannel::Both, 2.5), Err(Error::InvalidPwmChannel));
        assert_eq!(bus.peek(TIMER.ocra), 10);
        assert_eq!(bus.peek(TIMER.ocrb), 20);
    }

    #[test]
    fn test_disconnect() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        let pwm = PwmGenerator::configure(&bus, TIMER, &pins, PwmChannel::Both);

        pwm.disconnect(PwmOutput::A);
        assert_eq!(bus.read_field(TIMER.com_a), 0);
        assert_eq!(bus.read_field(TIMER.com_b), 0b10);
        assert_eq!(bus.read_field(TIMER.wgm), 0b11);

        pwm.disconnect(PwmOutput::A);
        assert_eq!(bus.read_field(TIMER.com_a), 0);

        // Both COM bits are cleared, not only the one configure sets.
        bus.poke(TIMER.tccra, bus.peek(TIMER.tccra) | 0b0001_0000);
        pwm.disconnect(PwmOutput::B);
        assert_eq!(bus.read_field(TIMER.com_b), 0);
    }
}

// vim: ts=4 sw=4 expandtab
