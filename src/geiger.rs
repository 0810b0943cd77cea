// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{debug::Debug, timer::secs_to_ticks};
use core::cell::Cell;
use critical_section::Mutex;

/// Cycle length after reset, in seconds.
pub const DEFAULT_CYCLE_LENGTH: u16 = 300;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct GeigerSnapshot {
    pub counts_current: u16,
    pub counts_previous: u16,
    pub cycle_length: u16,
    pub ticks_elapsed: u32,
    pub progress_seconds: u16,
    pub has_new_cycle_started: bool,
    pub has_cycle_ever_completed: bool,
}

/// Counts validated discharges in fixed length cycles.
pub struct GeigerCounter {
    /// Written from the discharge path, rolled over from the tick path.
    live: Mutex<Cell<u16>>,
    previous: u16,
    cycle_length: u16,
    tick_hz: u16,
    ticks: u32,
    has_new_cycle_started: bool,
    has_cycle_ever_completed: bool,
}

impl GeigerCounter {
    pub const fn new(tick_hz: u16) -> Self {
        Self {
            live: Mutex::new(Cell::new(0)),
            previous: 0,
            cycle_length: DEFAULT_CYCLE_LENGTH,
            tick_hz,
            ticks: 0,
            has_new_cycle_started: false,
            has_cycle_ever_completed: false,
        }
    }

    /// Count one validated discharge.
    pub fn on_pulse(&self) {
        critical_section::with(|cs| {
            let live = self.live.borrow(cs);
            live.set(live.get().saturating_add(1));
        });
    }

    pub fn tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
        if self.ticks >= secs_to_ticks(self.cycle_length, self.tick_hz) {
            self.previous = critical_section::with(|cs| self.live.borrow(cs).replace(0));
            self.has_new_cycle_started = true;
            self.has_cycle_ever_completed = true;
            self.ticks = 0;
        }
        Debug::GeigerCounts.log_u16(self.counts_current());
    }

    pub fn counts_current(&self) -> u16 {
        critical_section::with(|cs| self.live.borrow(cs).get())
    }

    /// Get the counter state.
    /// Reading the state consumes the new-cycle flag.
    pub fn get_snapshot(&mut self) -> GeigerSnapshot {
        let snapshot = GeigerSnapshot {
            counts_current: self.counts_current(),
            counts_previous: self.previous,
            cycle_length: self.cycle_length,
            ticks_elapsed: self.ticks,
            progress_seconds: (self.ticks / self.tick_hz.max(1) as u32) as u16,
            has_new_cycle_started: self.has_new_cycle_started,
            has_cycle_ever_completed: self.has_cycle_ever_completed,
        };
        self.has_new_cycle_started = false;
        snapshot
    }

    /// Zero all counters and flags. The cycle length is kept.
    pub fn clean(&mut self) {
        critical_section::with(|cs| self.live.borrow(cs).set(0));
        self.previous = 0;
        self.ticks = 0;
        self.has_new_cycle_started = false;
        self.has_cycle_ever_completed = false;
    }

    /// Set a new cycle length in seconds and restart counting.
    pub fn configure(&mut self, cycle_length: u16) {
        self.cycle_length = cycle_length.max(1);
        self.clean();
    }

    pub fn cycle_length(&self) -> u16 {
        self.cycle_length
    }
}


// vim: ts=4 sw=4 expandtab
