// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Rate of the main control tick.
pub const TICK_HZ: u16 = 100;

/// Microseconds per timestamp tick.
pub const TIMER_TICK_US: u8 = 1;

/// Convert seconds to control ticks.
pub const fn secs_to_ticks(secs: u16, tick_hz: u16) -> u32 {
    secs as u32 * tick_hz as u32
}

/// Free running timer value. Wraps around.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Timestamp(pub u32);

impl Timestamp {
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn from_micros(us: u32) -> Self {
        Self(us / TIMER_TICK_US as u32)
    }
}

impl core::ops::Sub for Timestamp {
    type Output = RelTimestamp;

    /// Distance between two stamps less than half the timer range apart.
    #[inline]
    fn sub(self, other: Self) -> RelTimestamp {
        RelTimestamp(self.0.wrapping_sub(other.0) as i32)
    }
}

/// Signed distance between two [Timestamp]s.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
pub struct RelTimestamp(pub i32);

impl RelTimestamp {
    #[inline]
    pub const fn from_micros(us: i32) -> Self {
        Self(us / TIMER_TICK_US as i32)
    }
}


// vim: ts=4 sw=4 expandtab
