// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use derive_more::Display;

/// Rejected requests.
///
/// Out-of-range selectors are always reported.
/// No operation silently ignores a selector.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The multiplexer has no such channel.
    #[display("ADC channel {_0} is out of range")]
    InvalidAdcChannel(u8),
    /// A compare register write must name exactly one output.
    #[display("PWM compare write needs exactly one output channel")]
    InvalidPwmChannel,
    /// Pin-change interrupts exist for PCINT0..PCINT23 only.
    #[display("pin-change index {_0} is out of range")]
    InvalidPinChange(u8),
    /// The conversion-complete condition did not show up within the poll limit.
    #[display("ADC conversion timed out")]
    ConversionTimeout,
}

impl core::error::Error for Error {}

#[cfg(test)]
mod test {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::InvalidAdcChannel(9).to_string(),
            "ADC channel 9 is out of range"
        );
        assert_eq!(
            Error::InvalidPinChange(24).to_string(),
            "pin-change index 24 is out of range"
        );
        assert_eq!(Error::ConversionTimeout.to_string(), "ADC conversion timed out");
    }
}

// vim: ts=4 sw=4 expandtab
