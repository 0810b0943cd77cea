// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer PID controller.
//!
//! Gains are stored as unsigned numbers with [PARAM_SHIFT] fractional bits.
//! All intermediate values are computed in wide integers and saturated,
//! so the controller can never overflow or wrap around.

use crate::fixpt::{Fixpt, fixpt};

const PARAM_SHIFT: u32 = 8;
const PARAM_BITS: u32 = 16;
const PARAM_MULT: i64 = 1 << PARAM_SHIFT;

/// Largest representable gain.
const PARAM_MAX: Fixpt = Fixpt::from_int((((1_i32 << PARAM_BITS) - 1) >> PARAM_SHIFT) as i16);

const INTEG_MAX: i64 = i32::MAX as i64;
const INTEG_MIN: i64 = i32::MIN as i64;
const DERIV_MAX: i32 = i16::MAX as i32;
const DERIV_MIN: i32 = i16::MIN as i32;

/// Convert a gain to its integer parameter representation.
///
/// Negative, too big and too small (but nonzero) gains disable the term.
const fn gain_to_param(gain: Fixpt) -> u32 {
    if gain.to_q() < 0 || gain.to_q() > PARAM_MAX.to_q() {
        return 0;
    }
    let param = gain.to_q() >> (Fixpt::SHIFT as u32 - PARAM_SHIFT);
    param as u32
}

#[derive(Clone, Copy, Debug)]
pub struct PidParams {
    pub kp: Fixpt,
    pub ki: Fixpt,
    pub kd: Fixpt,
    /// Rate at which [Pid::step] is called.
    pub hz: u16,
    pub out_min: i16,
    pub out_max: i16,
}

pub struct Pid {
    // Configuration
    p: u32,
    i: u32,
    d: u32,
    out_max: i64,
    out_min: i64,

    // State
    last_sp: i16,
    last_out: i16,
    sum: i64,
    last_err: i32,
}

impl Pid {
    pub const fn new(params: &PidParams) -> Self {
        let hz = Fixpt::from_int(params.hz as i16);
        Self {
            p: gain_to_param(params.kp),
            i: gain_to_param(params.ki.div(hz)),
            d: gain_to_param(params.kd.mul(hz)),
            out_max: params.out_max as i64 * PARAM_MULT,
            out_min: params.out_min as i64 * PARAM_MULT,
            last_sp: 0,
            last_out: 0,
            sum: 0,
            last_err: 0,
        }
    }

    /// Reset the transient controller state.
    pub fn clear(&mut self) {
        self.last_sp = 0;
        self.last_out = 0;
        self.sum = 0;
        self.last_err = 0;
    }

    pub fn step(&mut self, sp: i16, fb: i16) -> i16 {
        // deviation
        let err = sp as i32 - fb as i32;

        // P term
        let mut p: i64 = 0;
        if self.p != 0 {
            p = self.p as i64 * err as i64;
        }

        // I term
        let mut i: i64 = 0;
        if self.i != 0 {
            self.sum += err as i64 * self.i as i64;
            // Saturate instead of overflow. This is the anti-windup.
            self.sum = self.sum.clamp(INTEG_MIN, INTEG_MAX);
            i = self.sum;
        }

        // D term
        let mut d: i64 = 0;
        if self.d != 0 {
            // Setpoint changes do not kick the derivative.
            let deriv = (err - self.last_err) - (sp as i32 - self.last_sp as i32);
            self.last_sp = sp;
            self.last_err = err;

            let deriv = deriv.clamp(DERIV_MIN, DERIV_MAX);
            d = self.d as i64 * deriv as i64;
        }

        let out = (p + i + d).clamp(self.out_min, self.out_max);

        // Remove the scaling and round half up.
        let mut y = (out >> PARAM_SHIFT) as i16;
        if out & (1 << (PARAM_SHIFT - 1)) != 0 {
            y += 1;
        }
        self.last_out = y;

        y
    }

    pub fn last_output(&self) -> i16 {
        self.last_out
    }

    pub fn integral_sum(&self) -> i64 {
        self.sum
    }
}

/// Convenience gain helper for const parameter tables.
pub const fn gain(numerator: i32, denominator: i32) -> Fixpt {
    Fixpt::from_fraction(numerator, denominator)
}

/// Gain that disables a term.
pub const NO_GAIN: Fixpt = fixpt!(0);


// vim: ts=4 sw=4 expandtab
