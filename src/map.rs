// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-chip register tables.
//!
//! The components never hardcode an address, bit or vector number.
//! They take everything from one of these tables.

use crate::{
    gpio::{PinId, Port},
    reg::{Bit, Field, Reg},
};

pub struct AdcMap {
    pub admux: Reg,
    pub adcsra: Reg,
    pub adcl: Reg,
    pub adch: Reg,
    /// Converter enable.
    pub aden: Bit,
    /// Start conversion. Reads as one while the conversion runs.
    pub adsc: Bit,
    /// Left adjust result.
    pub adlar: Bit,
    /// Multiplexer channel select.
    pub mux: Field,
    /// Clock prescaler select.
    pub adps: Field,
    /// Multiplexer channels. The index is the channel number.
    /// Channels that share a digital pin carry that pin.
    pub channels: &'static [Option<PinId>],
}

impl AdcMap {
    /// Highest multiplexer channel.
    /// A table without channels reports zero.
    #[inline]
    pub const fn max_channel(&self) -> u8 {
        let last = self.channels.len().saturating_sub(1);
        if last > u8::MAX as usize {
            u8::MAX
        } else {
            last as u8
        }
    }
}

pub struct PwmTimerMap {
    pub tccra: Reg,
    pub tccrb: Reg,
    pub ocra: Reg,
    pub ocrb: Reg,
    /// Waveform generation mode, lower two bits.
    pub wgm: Field,
    /// Waveform generation mode, top bit.
    pub wgm2: Bit,
    /// Clock select.
    pub cs: Field,
    /// Compare output mode, channel A.
    pub com_a: Field,
    /// Compare output mode, channel B.
    pub com_b: Field,
    pub pin_a: PinId,
    pub pin_b: PinId,
}

pub struct ExtLineMap {
    /// Interrupt sense control.
    pub sense: Field,
    pub enable: Bit,
    pub flag: Bit,
    pub vector: u8,
}

pub struct ExtIntMap {
    pub eicra: Reg,
    pub eimsk: Reg,
    pub eifr: Reg,
    pub lines: [ExtLineMap; 2],
}

pub struct PinChangeBankMap {
    pub mask: Reg,
    pub enable: Bit,
    pub flag: Bit,
    pub vector: u8,
}

pub struct PinChangeMap {
    pub pcicr: Reg,
    pub pcifr: Reg,
    pub banks: [PinChangeBankMap; 3],
}

pub struct RegisterMap {
    pub name: &'static str,
    pub adc: AdcMap,
    pub timer: PwmTimerMap,
    pub exint: ExtIntMap,
    pub pcint: PinChangeMap,
}

const ADMUX: Reg = Reg(0x7C);
const ADCSRA: Reg = Reg(0x7A);
const ADCH: Reg = Reg(0x79);
const ADCL: Reg = Reg(0x78);

const TCCR0A: Reg = Reg(0x44);
const TCCR0B: Reg = Reg(0x45);
const OCR0A: Reg = Reg(0x47);
const OCR0B: Reg = Reg(0x48);

const EICRA: Reg = Reg(0x69);
const EIMSK: Reg = Reg(0x3D);
const EIFR: Reg = Reg(0x3C);

const PCICR: Reg = Reg(0x68);
const PCIFR: Reg = Reg(0x3B);
const PCMSK0: Reg = Reg(0x6B);
const PCMSK1: Reg = Reg(0x6C);
const PCMSK2: Reg = Reg(0x6D);

/// ATmega328P, ATmega168P and ATmega88P.
///
/// Timer/Counter0 drives OC0A (PD6) and OC0B (PD5).
/// ADC6 and ADC7 only exist on the 32 pin packages and have no digital pin.
#[rustfmt::skip]
pub static ATMEGA328P: RegisterMap = RegisterMap {
    name: "ATmega328P",
    adc: AdcMap {
        admux: ADMUX,
        adcsra: ADCSRA,
        adcl: ADCL,
        adch: ADCH,
        aden: ADCSRA.bit(7),
        adsc: ADCSRA.bit(6),
        adlar: ADMUX.bit(5),
        mux: ADMUX.field(0, 4),
        adps: ADCSRA.field(0, 3),
        channels: &[
            Some(PinId::new(Port::C, 0)),
            Some(PinId::new(Port::C, 1)),
            Some(PinId::new(Port::C, 2)),
            Some(PinId::new(Port::C, 3)),
            Some(PinId::new(Port::C, 4)),
            Some(PinId::new(Port::C, 5)),
            None, // ADC6
            None, // ADC7
        ],
    },
    timer: PwmTimerMap {
        tccra: TCCR0A,
        tccrb: TCCR0B,
        ocra: OCR0A,
        ocrb: OCR0B,
        wgm: TCCR0A.field(0, 2),
        wgm2: TCCR0B.bit(3),
        cs: TCCR0B.field(0, 3),
        com_a: TCCR0A.field(6, 2),
        com_b: TCCR0A.field(4, 2),
        pin_a: PinId::new(Port::D, 6),
        pin_b: PinId::new(Port::D, 5),
    },
    exint: ExtIntMap {
        eicra: EICRA,
        eimsk: EIMSK,
        eifr: EIFR,
        lines: [
            ExtLineMap { // INT0
                sense: EICRA.field(0, 2),
                enable: EIMSK.bit(0),
                flag: EIFR.bit(0),
                vector: 1,
            },
            ExtLineMap { // INT1
                sense: EICRA.field(2, 2),
                enable: EIMSK.bit(1),
                flag: EIFR.bit(1),
                vector: 2,
            },
        ],
    },
    pcint: PinChangeMap {
        pcicr: PCICR,
        pcifr: PCIFR,
        banks: [
            PinChangeBankMap { // PCINT7..0
                mask: PCMSK0,
                enable: PCICR.bit(0),
                flag: PCIFR.bit(0),
                vector: 3,
            },
            PinChangeBankMap { // PCINT15..8
                mask: PCMSK1,
                enable: PCICR.bit(1),
                flag: PCIFR.bit(1),
                vector: 4,
            },
            PinChangeBankMap { // PCINT23..16
                mask: PCMSK2,
                enable: PCICR.bit(2),
                flag: PCIFR.bit(2),
                vector: 5,
            },
        ],
    },
};

/// The register table of the chip selected by Cargo feature.
#[cfg(feature = "atmega328p")]
pub static CHIP: &RegisterMap = &ATMEGA328P;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_atmega328p_layout() {
        let m = &ATMEGA328P;
        assert_eq!(m.adc.max_channel(), 7);
        assert_eq!(m.adc.mux.mask(), 0x0F);
        assert_eq!(m.adc.adps.mask(), 0x07);
        assert_eq!(m.timer.com_a.mask(), 0xC0);
        assert_eq!(m.timer.com_b.mask(), 0x30);
        assert_eq!(m.timer.wgm2.reg, m.timer.tccrb);
        assert_eq!(m.timer.wgm2.mask(), 0x08);
        assert_eq!(m.exint.lines[0].sense.mask(), 0x03);
        assert_eq!(m.exint.lines[1].sense.mask(), 0x0C);
        for (i, bank) in m.pcint.banks.iter().enumerate() {
            assert_eq!(bank.enable.bit as usize, i);
            assert_eq!(bank.flag.bit as usize, i);
            assert_eq!(bank.vector as usize, 3 + i);
        }
    }

    fn adc_with_channels(channels: &'static [Option<PinId>]) -> AdcMap {
        AdcMap {
            channels,
            ..ATMEGA328P.adc
        }
    }

    #[test]
    fn test_max_channel_bounds() {
        assert_eq!(adc_with_channels(&[]).max_channel(), 0);
        assert_eq!(adc_with_channels(&[None]).max_channel(), 0);
        static MANY: [Option<PinId>; 300] = [None; 300];
        assert_eq!(adc_with_channels(&MANY).max_channel(), u8::MAX);
    }
}

// vim: ts=4 sw=4 expandtab
