// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::fixpt::Fixpt;
use core::cell::Cell;
use critical_section::Mutex;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Debug {
    EyeAdc,
    EyePwm,
    GeigerAdc,
    GeigerPwm,
    TubeState,
    GeigerCounts,
    EdgeOverflow,
    Animation,
}
pub const NRVALUES: usize = 8;

static VALUES: Mutex<[Cell<u16>; NRVALUES]> = Mutex::new([
    Cell::new(0),
    Cell::new(0),
    Cell::new(0),
    Cell::new(0),
    Cell::new(0),
    Cell::new(0),
    Cell::new(0),
    Cell::new(0),
]);

impl Debug {
    pub fn log_u16(&self, value: u16) {
        critical_section::with(|cs| {
            let id = *self as usize;
            let values = VALUES.borrow(cs);
            if id < values.len() {
                values[id].set(value);
            }
        });
    }

    pub fn log_u8(&self, value: u8) {
        self.log_u16(value.into())
    }

    pub fn log_i16(&self, value: i16) {
        self.log_u16(value as _)
    }

    pub fn log_fixpt(&self, value: Fixpt) {
        self.log_i16(value.to_int());
    }
}

/// Read back a logged value by its numeric id.
pub fn debug_value(id: u8) -> Option<u16> {
    critical_section::with(|cs| {
        VALUES
            .borrow(cs)
            .get(id as usize)
            .map(|value| value.get())
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_log_and_read() {
        // Other tests log concurrently.
        critical_section::with(|_| {
            Debug::EdgeOverflow.log_i16(-2);
            assert_eq!(debug_value(Debug::EdgeOverflow as u8), Some(0xFFFE));
            Debug::Animation.log_fixpt(crate::fixpt::fixpt!(7 / 2));
            assert_eq!(debug_value(Debug::Animation as u8), Some(4));
            Debug::Animation.log_fixpt(crate::fixpt::fixpt!(-9 / 4));
            assert_eq!(debug_value(Debug::Animation as u8), Some(0xFFFE));
            Debug::Animation.log_fixpt(crate::fixpt::fixpt!(-5 / 2));
            assert_eq!(debug_value(Debug::Animation as u8), Some(0xFFFD));
        });
        assert_eq!(debug_value(NRVALUES as u8), None);
    }
}

// vim: ts=4 sw=4 expandtab
