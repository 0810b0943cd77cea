// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use derive_more::{Add, AddAssign};

/// Number of conversions averaged into one result.
pub const ADC_OVERSAMPLING: u8 = 16;

/// Full scale of the 10 bit converter.
pub const ADC_MAX: u16 = 0x3FF;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum AdcChannel {
    /// Eye inverter output voltage divider.
    Eye,
    /// Geiger inverter output voltage divider.
    Geiger,
}

impl AdcChannel {
    pub const COUNT: usize = 2;

    pub const fn mask(&self) -> u8 {
        1 << *self as usize
    }

    pub fn select_next(&self) -> AdcChannel {
        match self {
            Self::Eye => Self::Geiger,
            Self::Geiger => Self::Eye,
        }
    }
}

#[derive(Clone, Copy, Default, Add, AddAssign)]
struct AdcSum(u32);

/// Free running oversampling of all ADC channels.
///
/// The converter hardware is driven by the caller:
/// it selects [Self::channel], converts and hands the raw result to [Self::push].
pub struct Oversampler {
    chan: AdcChannel,
    count: u8,
    sum: AdcSum,
    result: [i16; AdcChannel::COUNT],
    ok: u8,
}

impl Oversampler {
    pub const fn new() -> Self {
        Self {
            chan: AdcChannel::Eye,
            count: 0,
            sum: AdcSum(0),
            result: [0; AdcChannel::COUNT],
            ok: 0,
        }
    }

    /// The channel that the next conversion must be done on.
    pub fn channel(&self) -> AdcChannel {
        self.chan
    }

    /// Feed one raw conversion result of [Self::channel].
    ///
    /// Returns true, if the channel changed and the converter mux must be switched.
    pub fn push(&mut self, raw: u16) -> bool {
        self.sum += AdcSum(raw.min(ADC_MAX).into());
        self.count += 1;
        if self.count < ADC_OVERSAMPLING {
            return false;
        }

        let avg = self.sum.0 / ADC_OVERSAMPLING as u32;
        self.result[self.chan as usize] = avg as i16;
        self.ok |= self.chan.mask();

        self.sum = AdcSum::default();
        self.count = 0;
        self.chan = self.chan.select_next();
        true
    }

    pub fn get_result(&self, chan: AdcChannel) -> Option<i16> {
        if self.ok & chan.mask() == 0 {
            None
        } else {
            Some(self.result[chan as usize])
        }
    }
}

impl Default for Oversampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_robin_average() {
        let mut adc = Oversampler::new();
        assert_eq!(adc.get_result(AdcChannel::Eye), None);
        assert_eq!(adc.get_result(AdcChannel::Geiger), None);

        assert_eq!(adc.channel(), AdcChannel::Eye);
        for i in 0..ADC_OVERSAMPLING {
            let switched = adc.push(if i % 2 == 0 { 100 } else { 110 });
            assert_eq!(switched, i == ADC_OVERSAMPLING - 1);
        }
        assert_eq!(adc.get_result(AdcChannel::Eye), Some(105));
        assert_eq!(adc.get_result(AdcChannel::Geiger), None);

        assert_eq!(adc.channel(), AdcChannel::Geiger);
        for _ in 0..ADC_OVERSAMPLING {
            adc.push(0xFFFF);
        }
        assert_eq!(adc.get_result(AdcChannel::Geiger), Some(ADC_MAX as i16));
        assert_eq!(adc.channel(), AdcChannel::Eye);
    }
}

// vim: ts=4 sw=4 expandtab
