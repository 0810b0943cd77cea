// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timer 0 in 16 bit mode as the microsecond time base and the control tick.

#![allow(unused_unsafe)]

use crate::{
    board,
    hw::mcu,
};
use avr_context::{InitCtx, InitCtxCell};
use avr_atomic::AvrAtomic;
use core::cell::Cell;
use critical_section::{CriticalSection, Mutex};
use tubectl::timer::{TICK_HZ, TIMER_TICK_US, Timestamp};

const FCPU: u32 = 8_000_000;
const TC0_PS: u32 = 8;
const _: () = assert!(FCPU / TC0_PS == 1_000_000 / TIMER_TICK_US as u32);

/// Timer 0 ticks per control tick.
const TICK_PERIOD: u16 = (1_000_000 / (TIMER_TICK_US as u32 * TICK_HZ as u32)) as u16;

// TCCR0A
const TCW0: u8 = 1 << 7;
// TCCR0B: CK/8
const CS0_PS8: u8 = 0x02;
// TIFR and TIMSK
const OCF0A: u8 = 1 << 4;
const TOV0: u8 = 1 << 1;
const OCIE0A: u8 = 1 << 4;

#[allow(non_snake_case)]
pub struct Dp {
    pub TC0: mcu::TC0,
}

// SAFETY: Is initialized in the init context.
pub static DP: InitCtxCell<Dp> = unsafe { InitCtxCell::uninit() };

static TIMER_UPPER: Mutex<Cell<u16>> = Mutex::new(Cell::new(0));
static NEXT_TICK: Mutex<Cell<u16>> = Mutex::new(Cell::new(0));

/// Set by the compare interrupt at [TICK_HZ].
static TICK: AvrAtomic<bool> = AvrAtomic::new();

impl Dp {
    #[rustfmt::skip]
    pub fn setup(&self, _: &InitCtx) {
        // SAFETY: Raw timer register values. Called with interrupts disabled.
        //         The 16 bit registers are written high byte first.
        unsafe {
            self.TC0.tccr0b().write(|w| w.bits(0));
            self.TC0.tccr0a().write(|w| w.bits(TCW0));
            self.TC0.tcnt0h().write(|w| w.bits(0));
            self.TC0.tcnt0l().write(|w| w.bits(0));
            self.TC0.ocr0b().write(|w| w.bits((TICK_PERIOD >> 8) as u8));
            self.TC0.ocr0a().write(|w| w.bits(TICK_PERIOD as u8));
            board::DP.TC1.tifr().write(|w| w.bits(OCF0A | TOV0));
            board::DP.TC1.timsk().modify(|r, w| w.bits(r.bits() | OCIE0A));
            self.TC0.tccr0b().write(|w| w.bits(CS0_PS8));
        }
    }
}

pub fn timer_init(c: &InitCtx, tc0: mcu::TC0) {
    DP.init(c, Dp { TC0: tc0 });
    critical_section::with(|cs| NEXT_TICK.borrow(cs).set(TICK_PERIOD));
    DP.setup(c);
}

#[inline(always)]
fn read_lower() -> u16 {
    // The high byte is latched when reading the low byte.
    let lo = DP.TC0.tcnt0l().read().bits();
    let hi = DP.TC0.tcnt0h().read().bits();
    u16::from_le_bytes([lo, hi])
}

/// Get the current time.
///
/// The overflow flag is polled instead of using the overflow interrupt.
/// This must be called at least once per 65 ms, which the main loop does.
#[inline(never)]
pub fn timer_get(cs: CriticalSection<'_>) -> Timestamp {
    let upper = TIMER_UPPER.borrow(cs);
    let mut lower = read_lower();

    // Increment the upper part, if the lower part had an overflow.
    if board::DP.TC1.tifr().read().bits() & TOV0 != 0 {
        // SAFETY: Writing a one clears only this flag.
        unsafe { board::DP.TC1.tifr().write(|w| w.bits(TOV0)) };
        lower = read_lower();
        upper.set(upper.get().wrapping_add(1));
    }

    Timestamp(((upper.get() as u32) << 16) | lower as u32)
}

/// Returns true once per control tick.
#[inline(always)]
pub fn tick_pending() -> bool {
    critical_section::with(|_| {
        let pending = TICK.load();
        TICK.store(false);
        pending
    })
}

pub fn irq_handler_timer0_compa(cs: CriticalSection<'_>) {
    let next = NEXT_TICK.borrow(cs);
    next.set(next.get().wrapping_add(TICK_PERIOD));
    let [lo, hi] = next.get().to_le_bytes();
    // SAFETY: Any compare value is valid. High byte first.
    unsafe {
        DP.TC0.ocr0b().write(|w| w.bits(hi));
        DP.TC0.ocr0a().write(|w| w.bits(lo));
    }
    TICK.store(true);
}

// vim: ts=4 sw=4 expandtab
