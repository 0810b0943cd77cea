// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Magic eye display animation.
//!
//! The eye slowly breathes around a base level.
//! Each discharge flashes the eye to full scale and raises the base level,
//! which then decays back while no discharges happen.

use crate::{
    debug::Debug,
    fixpt::{Fixpt, fixpt},
};
use curveipo::Curve;

const AMPLITUDE: Fixpt = fixpt!(30);
const GAIN: Fixpt = fixpt!(21 / 20);
const PERIOD: i16 = 300;
const NOMINAL_BASE: Fixpt = fixpt!(70);
const BASE_STEP: Fixpt = fixpt!(25);
const MAX_BASE: Fixpt = fixpt!(170);
const BASE_DECAY_INTERVAL: i16 = 10;
const TICKS_TO_MAX: i16 = 7;
const TICKS_AT_MAX: i16 = 30;
const TICKS_BACK_TO_BASE: i16 = 50;
const FULL_SCALE: Fixpt = fixpt!(255);

/// One period of the breathing wave.
const WAVE: Curve<Fixpt, (Fixpt, Fixpt), 4> = Curve::new([
    (fixpt!(0), fixpt!(0)),
    (fixpt!(75), fixpt!(-30)),
    (fixpt!(225), fixpt!(30)),
    (fixpt!(300), fixpt!(0)),
]);

fn wave(tick: i16) -> Fixpt {
    let y = WAVE.lin_inter(tick.into()) * GAIN;
    y.const_min(AMPLITUDE).const_max(-AMPLITUDE)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
    Normal,
    RaisingToMax,
    StayAtMax,
    BackingToNormal,
}

pub struct Animation {
    mode: Mode,
    counter: i16,
    value: Fixpt,
    step: Fixpt,
    base: Fixpt,
}

impl Animation {
    pub const fn new() -> Self {
        Self {
            mode: Mode::Normal,
            counter: 0,
            value: fixpt!(0),
            step: fixpt!(0),
            base: NOMINAL_BASE,
        }
    }

    /// Advance by one tick and return the new display value.
    ///
    /// `pulse` tells whether discharges happened since the previous tick.
    pub fn tick(&mut self, pulse: bool) -> u8 {
        if pulse {
            if self.mode != Mode::Normal && self.base < MAX_BASE {
                self.base += BASE_STEP;
            }
            self.counter = 0;
            self.mode = Mode::RaisingToMax;
            self.step = (FULL_SCALE - self.value) / Fixpt::from_int(TICKS_TO_MAX);
        }

        match self.mode {
            Mode::Normal => {
                if self.counter >= PERIOD {
                    self.counter = 0;
                }
                if self.counter % BASE_DECAY_INTERVAL == 0 && self.base > NOMINAL_BASE {
                    self.base -= fixpt!(1);
                }
                self.value = self.base + wave(self.counter);
                self.counter += 1;
            }
            Mode::RaisingToMax => {
                if self.counter < TICKS_TO_MAX {
                    self.counter += 1;
                    self.value += self.step;
                } else {
                    self.mode = Mode::StayAtMax;
                    self.counter = 0;
                }
            }
            Mode::StayAtMax => {
                if self.counter < TICKS_AT_MAX {
                    self.counter += 1;
                } else {
                    self.mode = Mode::BackingToNormal;
                    self.counter = 0;
                    self.step = (self.value - self.base) / Fixpt::from_int(TICKS_BACK_TO_BASE);
                }
            }
            Mode::BackingToNormal => {
                if self.counter < TICKS_BACK_TO_BASE {
                    self.counter += 1;
                    self.value -= self.step;
                } else {
                    self.mode = Mode::Normal;
                    self.counter = 0;
                    self.value = self.base;
                }
            }
        }

        Debug::Animation.log_fixpt(self.value);
        self.value.to_int().clamp(0, 0xFF) as u8
    }

    pub fn base(&self) -> Fixpt {
        self.base
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::new()
    }
}


// vim: ts=4 sw=4 expandtab
