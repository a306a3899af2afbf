// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-shot analog conversions.

use crate::{
    VREF_MV, VREF_V,
    error::Error,
    gpio::{Direction, DigitalIo},
    log::{log_debug, log_trace, log_warn},
    map::AdcMap,
    reg::{RegisterAccess, RegisterBus},
};

/// Status polls that [AnalogConverter::read] waits for the end of one conversion.
///
/// A conversion takes at most 25 converter clocks.
/// With the slowest prescaler that is 3200 CPU cycles,
/// which is far less than this many polls.
pub const DEFAULT_POLL_LIMIT: u16 = 0xFFFF;

/// Result resolution.
///
/// The converter always converts with 10 bits.
/// In 8 bit mode the result is left adjusted and only the high byte is read.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionMode {
    EightBit,
    TenBit,
}

impl ConversionMode {
    /// The largest code a read returns in this mode.
    #[inline]
    pub const fn full_scale(self) -> u16 {
        match self {
            Self::EightBit => 0xFF,
            Self::TenBit => 0x3FF,
        }
    }
}

/// Converter clock divider.
/// The discriminant is the ADPS field encoding.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Prescaler {
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
}

impl Prescaler {
    /// Used for divisors that the hardware doesn't have.
    pub const FALLBACK: Self = Self::Div8;

    pub const fn from_divisor(divisor: u8) -> Option<Self> {
        match divisor {
            2 => Some(Self::Div2),
            4 => Some(Self::Div4),
            8 => Some(Self::Div8),
            16 => Some(Self::Div16),
            32 => Some(Self::Div32),
            64 => Some(Self::Div64),
            128 => Some(Self::Div128),
            _ => None,
        }
    }

    /// Decode an ADPS field value.
    /// The encodings 0 and 1 both divide by two.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x7 {
            0 | 1 => Self::Div2,
            2 => Self::Div4,
            3 => Self::Div8,
            4 => Self::Div16,
            5 => Self::Div32,
            6 => Self::Div64,
            _ => Self::Div128,
        }
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn divisor(self) -> u8 {
        1 << self.bits()
    }
}

/// The prescaler that [AnalogConverter::configure] programmed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrescalerSelection {
    /// The requested divisor.
    Requested(Prescaler),
    /// The requested divisor does not exist. [Prescaler::FALLBACK] was used.
    Fallback(Prescaler),
}

impl PrescalerSelection {
    #[inline]
    pub const fn prescaler(self) -> Prescaler {
        match self {
            Self::Requested(p) | Self::Fallback(p) => p,
        }
    }

    #[inline]
    pub const fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// The analog-to-digital converter.
///
/// The only way to get one is [AnalogConverter::configure],
/// so no conversion can run on an unconfigured converter.
/// The conversion mode lives here and every read and scale uses it.
pub struct AnalogConverter<'a, B> {
    bus: &'a B,
    map: &'a AdcMap,
    mode: ConversionMode,
    prescaler: Prescaler,
    poll_limit: u16,
}

impl<'a, B: RegisterBus> AnalogConverter<'a, B> {
    /// Enable the converter, select the result alignment for `mode`
    /// and program the clock prescaler.
    ///
    /// Divisors other than 2, 4, 8, 16, 32, 64 and 128
    /// fall back to [Prescaler::FALLBACK].
    /// The returned selection tells whether that happened.
    pub fn configure(
        bus: &'a B,
        map: &'a AdcMap,
        divisor: u8,
        mode: ConversionMode,
    ) -> (Self, PrescalerSelection) {
        bus.set_bit(map.aden);

        match mode {
            ConversionMode::EightBit => bus.set_bit(map.adlar),
            ConversionMode::TenBit => bus.clear_bit(map.adlar),
        }

        let selection = match Prescaler::from_divisor(divisor) {
            Some(prescaler) => PrescalerSelection::Requested(prescaler),
            None => {
                log_warn!("adc: no prescaler /{=u8}, using fallback", divisor);
                PrescalerSelection::Fallback(Prescaler::FALLBACK)
            }
        };
        let prescaler = selection.prescaler();
        bus.write_field(map.adps, prescaler.bits());
        log_debug!("adc: {} prescaler {}", mode, prescaler);

        (
            Self {
                bus,
                map,
                mode,
                prescaler,
                poll_limit: DEFAULT_POLL_LIMIT,
            },
            selection,
        )
    }

    #[inline]
    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    #[inline]
    pub fn prescaler(&self) -> Prescaler {
        self.prescaler
    }

    /// Change the number of status polls a read waits for the conversion.
    pub fn set_poll_limit(&mut self, polls: u16) {
        self.poll_limit = polls;
    }

    /// Convert `channel` and return the result.
    ///
    /// The channel's digital pin, if it has one, is switched to input first.
    /// The call blocks until the conversion is done.
    /// If the hardware does not finish within the poll limit,
    /// [Error::ConversionTimeout] is returned.
    ///
    /// The returned code is in `0..=255` in 8 bit mode
    /// and in `0..=1023` in 10 bit mode.
    pub fn read<P: DigitalIo>(&self, pins: &P, channel: u8) -> Result<u16, Error> {
        let Some(pin) = self.map.channels.get(channel as usize) else {
            log_warn!("adc: channel {=u8} out of range", channel);
            return Err(Error::InvalidAdcChannel(channel));
        };
        if let Some(pin) = pin {
            pins.set_direction(pin.port, pin.pin, Direction::Input);
        }

        // The multiplexer bits are not self-clearing.
        self.bus.write_field(self.map.mux, channel);
        self.bus.set_bit(self.map.adsc);
        self.wait_conversion()?;

        let code = self.fetch_result();
        log_trace!("adc: channel {=u8} -> {=u16}", channel, code);
        Ok(code)
    }

    fn wait_conversion(&self) -> Result<(), Error> {
        let mut polls: u16 = 0;
        while self.bus.bit_is_set(self.map.adsc) {
            if polls >= self.poll_limit {
                log_warn!("adc: conversion timeout");
                return Err(Error::ConversionTimeout);
            }
            polls += 1;
        }
        Ok(())
    }

    fn fetch_result(&self) -> u16 {
        match self.mode {
            ConversionMode::EightBit => self.bus.read(self.map.adch).into(),
            ConversionMode::TenBit => {
                // ADCL must be read first.
                // Reading ADCL locks both data registers and reading ADCH releases them.
                let low = self.bus.read(self.map.adcl);
                let high = self.bus.read(self.map.adch);
                (u16::from(high & 0x03) << 8) | u16::from(low)
            }
        }
    }

    /// Scale a code to whole volts against the 5 V reference.
    ///
    /// The result is truncated to the volt.
    /// Codes above the mode's full scale read as full scale.
    pub fn to_voltage(&self, code: u16) -> u16 {
        self.scale(code, VREF_V)
    }

    /// Scale a code to millivolts against the 5 V reference, rounding down.
    /// Codes above the mode's full scale read as full scale.
    pub fn to_millivolts(&self, code: u16) -> u16 {
        self.scale(code, VREF_MV)
    }

    fn scale(&self, code: u16, vref: u16) -> u16 {
        let full_scale = self.mode.full_scale();
        let code = code.min(full_scale);
        // code <= full_scale, so the quotient is at most vref.
        (u32::from(code) * u32::from(vref) / u32::from(full_scale)) as u16
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

    static ADC: &AdcMap = &ATMEGA328P.adc;

    #[test]
    fn test_prescaler_encoding() {
        for (divisor, bits) in [(2, 1), (4, 2), (8, 3), (16, 4), (32, 5), (64, 6), (128, 7)] {
            let bus = SimBus::new(&ATMEGA328P);
            let (adc, sel) = AnalogConverter::configure(&bus, ADC, divisor, ConversionMode::TenBit);
            assert_eq!(sel, PrescalerSelection::Requested(adc.prescaler()));
            assert_eq!(bus.read_field(ADC.adps), bits);
            assert_eq!(Prescaler::from_bits(bus.read_field(ADC.adps)).divisor(), divisor);
        }
    }

    #[test]
    fn test_prescaler_fallback() {
        for divisor in [0, 1, 3, 5, 100, 255] {
            let bus = SimBus::new(&ATMEGA328P);
            let (adc, sel) = AnalogConverter::configure(&bus, ADC, divisor, ConversionMode::EightBit);
            assert!(sel.is_fallback());
            assert_eq!(sel.prescaler(), Prescaler::Div8);
            assert_eq!(adc.prescaler().divisor(), 8);
            assert_eq!(bus.read_field(ADC.adps), 3);
        }
        assert_eq!(Prescaler::from_bits(0), Prescaler::Div2);
    }

    #[test]
    fn test_reconfigure() {
        let bus = SimBus::new(&ATMEGA328P);
        AnalogConverter::configure(&bus, ADC, 128, ConversionMode::EightBit);
        assert!(bus.bit_is_set(ADC.adlar));
        let (adc, _) = AnalogConverter::configure(&bus, ADC, 4, ConversionMode::TenBit);
        assert_eq!(bus.read_field(ADC.adps), 2);
        assert!(!bus.bit_is_set(ADC.adlar));
        assert!(bus.bit_is_set(ADC.aden));
        assert_eq!(adc.mode(), ConversionMode::TenBit);
    }

    #[test]
    fn test_read_ten_bit() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        let (adc, sel) = AnalogConverter::configure(&bus, ADC, 16, ConversionMode::TenBit);
        assert_eq!(sel, PrescalerSelection::Requested(Prescaler::Div16));

        // 687 = 0x2AF
        bus.set_adc_input(2, 0x2AF);
        assert_eq!(adc.read(&pins, 2), Ok(687));
        assert_eq!(adc.to_voltage(687), 3);
        assert_eq!(adc.to_millivolts(687), 3357);
        assert_eq!(bus.result_reads().as_slice(), &[ADC.adcl, ADC.adch]);
    }

    #[test]
    fn test_read_eight_bit() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        let (adc, _) = AnalogConverter::configure(&bus, ADC, 64, ConversionMode::EightBit);

        bus.set_adc_input(0, 0x3FF);
        assert_eq!(adc.read(&pins, 0), Ok(255));
        bus.set_adc_input(0, 0x2AB);
        assert_eq!(adc.read(&pins, 0), Ok(0x2AB >> 2));
        assert_eq!(adc.to_voltage(255), 5);
        assert_eq!(bus.result_reads().as_slice(), &[ADC.adch, ADC.adch]);
    }

    #[test]
    fn test_read_range() {
        for (mode, max) in [(ConversionMode::EightBit, 255), (ConversionMode::TenBit, 1023)] {
            let bus = SimBus::new(&ATMEGA328P);
            let pins = SimPins::new();
            let (adc, _) = AnalogConverter::configure(&bus, ADC, 128, mode);
            for code in (0..=0x3FF).step_by(31).chain([0x3FF]) {
                bus.set_adc_input(1, code);
                let value = adc.read(&pins, 1).unwrap();
                assert!(value <= max);
            }
        }
    }

    #[test]
    fn test_channel_select() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        let (adc, _) = AnalogConverter::configure(&bus, ADC, 128, ConversionMode::TenBit);
        bus.set_adc_input(7, 700);
        bus.set_adc_input(1, 100);

        assert_eq!(adc.read(&pins, 7), Ok(700));
        assert_eq!(bus.read_field(ADC.mux), 7);
        assert_eq!(adc.read(&pins, 1), Ok(100));
        assert_eq!(bus.read_field(ADC.mux), 1);
        // The alignment bit shares the register with the mux field.
        assert!(!bus.bit_is_set(ADC.adlar));
    }

    #[test]
    fn test_channel_pin_input() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        pins.set_direction(Port::C, 3, Direction::Output);
        let (adc, _) = AnalogConverter::configure(&bus, ADC, 128, ConversionMode::TenBit);

        adc.read(&pins, 3).unwrap();
        assert!(!pins.is_output(Port::C, 3));
        assert_eq!(pins.direction_changes(), 2);

        // ADC6 has no digital pin.
        adc.read(&pins, 6).unwrap();
        assert_eq!(pins.direction_changes(), 2);
    }

    #[test]
    fn test_invalid_channel() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        let (adc, _) = AnalogConverter::configure(&bus, ADC, 128, ConversionMode::TenBit);
        adc.read(&pins, 5).unwrap();
        let admux = bus.peek(ADC.admux);

        assert_eq!(adc.read(&pins, 8), Err(Error::InvalidAdcChannel(8)));
        assert_eq!(adc.read(&pins, 0xFF), Err(Error::InvalidAdcChannel(0xFF)));
        assert_eq!(bus.peek(ADC.admux), admux);
        assert_eq!(pins.direction_changes(), 1);
    }

    #[test]
    fn test_timeout() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        let (mut adc, _) = AnalogConverter::configure(&bus, ADC, 128, ConversionMode::TenBit);
        adc.set_poll_limit(100);

        bus.set_conversion_polls(99);
        assert_eq!(adc.read(&pins, 0), Ok(0));

        bus.set_conversion_polls(101);
        assert_eq!(adc.read(&pins, 0), Err(Error::ConversionTimeout));
    }

    #[test]
    fn test_stuck() {
        let bus = SimBus::new(&ATMEGA328P);
        let pins = SimPins::new();
        let (adc, _) = AnalogConverter::configure(&bus, ADC, 128, ConversionMode::TenBit);
        bus.set_conversion_stuck(true);
        assert_eq!(adc.read(&pins, 0), Err(Error::ConversionTimeout));
    }

    #[test]
    fn test_to_voltage() {
        for mode in [ConversionMode::EightBit, ConversionMode::TenBit] {
            let bus = SimBus::new(&ATMEGA328P);
            let (adc, _) = AnalogConverter::configure(&bus, ADC, 128, mode);
            assert_eq!(adc.to_voltage(0), 0);
            assert_eq!(adc.to_millivolts(0), 0);
            assert_eq!(adc.to_voltage(mode.full_scale()), 5);
            assert_eq!(adc.to_millivolts(mode.full_scale()), 5000);

            let mut prev = 0;
            for code in 0..=mode.full_scale() {
                let v = adc.to_millivolts(code);
                assert!(v >= prev);
                assert!(adc.to_voltage(code) >= adc.to_voltage(code.saturating_sub(1)));
                prev = v;
            }
        }
    }

    #[test]
    fn test_scale_above_full_scale() {
        for mode in [ConversionMode::EightBit, ConversionMode::TenBit] {
            let bus = SimBus::new(&ATMEGA328P);
            let (adc, _) = AnalogConverter::configure(&bus, ADC, 128, mode);

            let mut prev = 0;
            for code in (mode.full_scale()..=u16::MAX).step_by(13).chain([3342, 3343, u16::MAX]) {
                let mv = adc.to_millivolts(code);
                assert_eq!(mv, 5000);
                assert_eq!(adc.to_voltage(code), 5);
                assert!(mv >= prev);
                prev = mv;
            }
        }
    }
}

// vim: ts=4 sw=4 expandtab
