// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(unused_unsafe)]

use crate::hw::mcu;
use avr_context::{InitCtx, InitCtxCell};
use tubectl::{System, analog::AdcChannel};

// ADMUX: REFS0 with REFS2 = 0 selects the external reference on AREF.
const REFS_AREF: u8 = 1 << 6;

#[allow(non_snake_case)]
pub struct Dp {
    pub ADC: mcu::ADC,
}

// SAFETY: Is initialized in the init context.
pub static DP: InitCtxCell<Dp> = unsafe { InitCtxCell::uninit() };

const fn mux(chan: AdcChannel) -> u8 {
    match chan {
        AdcChannel::Eye => 1,    // ADC1, PA1
        AdcChannel::Geiger => 2, // ADC2, PA2
    }
}

impl Dp {
    fn select(&self, chan: AdcChannel) {
        // SAFETY: Valid reference and single ended channel selection.
        unsafe { self.ADC.admux().write(|w| w.bits(REFS_AREF | mux(chan))) };
    }

    #[rustfmt::skip]
    #[inline]
    fn start_conversion(&self) {
        self.ADC.adcsra().modify(|_, w| {
            w.adif().set_bit()
             .adsc().set_bit()
        });
    }

    #[inline]
    fn conversion_done(&self) -> bool {
        self.ADC.adcsra().read().adif().bit_is_set()
    }

    #[rustfmt::skip]
    fn setup(&self, _: &InitCtx, chan: AdcChannel) {
        // SAFETY: Clear the high speed mode and the reference extension bits.
        unsafe { self.ADC.adcsrb().write(|w| w.bits(0)) };
        self.ADC.adcsra().write(|w| {
            w.adps().prescaler_64()
             .adie().clear_bit()
             .adif().set_bit()
             .adsc().clear_bit()
             .aden().set_bit()
        });
        self.select(chan);
        self.start_conversion();
    }
}

/// Polled conversions for the [System] oversampler.
pub struct Adc {
    discard: bool,
}

impl Adc {
    pub fn new(c: &InitCtx, adc: mcu::ADC, sys: &System) -> Self {
        DP.init(c, Dp { ADC: adc });
        DP.setup(c, sys.adc_channel());
        Self { discard: true }
    }

    pub fn run(&mut self, sys: &mut System) {
        if !DP.conversion_done() {
            return;
        }
        let raw = DP.ADC.adc().read().bits();
        if self.discard {
            // First conversion after a mux change.
            self.discard = false;
        } else if sys.adc_sample(raw) {
            DP.select(sys.adc_channel());
            self.discard = true;
        }
        DP.start_conversion();
    }
}

// vim: ts=4 sw=4 expandtab
