// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timer 1 PWM outputs and the heater switches.
//!
//! OC1A (PB1): Eye control grid value, filtered to a DC level.
//! OC1B (PB3): Geiger inverter gate, idle low.
//! OC1D (PB5): Eye inverter gate, idle high.
//!
//! A disabled gate output is disconnected from the timer
//! and the PORTB output latch drives its idle level.

#![allow(unused_unsafe)]

use crate::{
    hw::{Peripherals, mcu},
    ports::{PA_HEATER_FULL, PA_HEATER_LIMITED, PB_EYE_GATE, PB_GEIGER_GATE, PORTA},
};
use avr_context::{InitCtx, InitCtxCell};
use tubectl::{
    Board,
    inverter::{Inverter, InverterPwm, PWM_TOP},
    lifecycle::HeaterStage,
};

// TCCR1A
const COM1A1: u8 = 1 << 7;
const COM1B1: u8 = 1 << 5;
const PWM1A: u8 = 1 << 1;
const PWM1B: u8 = 1 << 0;

// TCCR1C
// COM1A1S and COM1B1S are shadows of the TCCR1A bits.
const COM1A1S: u8 = 1 << 7;
const COM1B1S: u8 = 1 << 5;
const COM1D1: u8 = 1 << 3;
const PWM1D: u8 = 1 << 0;

// TCCR1B: CK/1, no prescaler.
const CS1_CK: u8 = 0x01;

#[allow(non_snake_case)]
pub struct Dp {
    pub TC1: mcu::TC1,
}

// SAFETY: Is initialized in the init context.
pub static DP: InitCtxCell<Dp> = unsafe { InitCtxCell::uninit() };

#[rustfmt::skip]
fn write_com(tc1: &mcu::TC1, geiger: bool, eye: bool) {
    let tccr1a = COM1A1 | PWM1A | PWM1B | if geiger { COM1B1 } else { 0 };
    let tccr1c = COM1A1S | PWM1D
        | if geiger { COM1B1S } else { 0 }
        | if eye { COM1D1 } else { 0 };
    // SAFETY: Raw timer control bits. All bit combinations are valid.
    unsafe {
        tc1.tccr1a().write(|w| w.bits(tccr1a));
        tc1.tccr1c().write(|w| w.bits(tccr1c));
    }
}

impl Dp {
    /// Fast PWM, TOP = OCR1C, all gates disconnected.
    #[rustfmt::skip]
    pub fn setup(&self, _: &InitCtx) {
        // SAFETY: Raw timer register values. Called with interrupts disabled.
        unsafe {
            self.TC1.tccr1b().write(|w| w.bits(0));
            self.TC1.tccr1d().write(|w| w.bits(0)); // WGM1 = fast PWM
            self.TC1.tccr1e().write(|w| w.bits(0));
            self.TC1.dt1().write(|w| w.bits(0));
            self.TC1.tc1h().write(|w| w.bits(0));
            self.TC1.tcnt1().write(|w| w.bits(0));
            self.TC1.ocr1a().write(|w| w.bits(0));
            self.TC1.ocr1b().write(|w| w.bits(0));
            self.TC1.ocr1c().write(|w| w.bits(PWM_TOP as u8));
            self.TC1.ocr1d().write(|w| w.bits(0));
        }
        write_com(&self.TC1, false, false);
        // SAFETY: See above.
        unsafe { self.TC1.tccr1b().write(|w| w.bits(CS1_CK)) };
    }
}

/// The high voltage board.
pub struct HvBoard {
    geiger_enabled: bool,
    eye_enabled: bool,
}

impl HvBoard {
    pub fn new(_: &InitCtx) -> Self {
        Self {
            geiger_enabled: false,
            eye_enabled: false,
        }
    }
}

impl InverterPwm for HvBoard {
    fn set_duty(&mut self, inverter: Inverter, duty: u16) {
        let duty = duty.min(PWM_TOP) as u8;
        // SAFETY: Any compare value is valid.
        unsafe {
            match inverter {
                Inverter::Geiger => DP.TC1.ocr1b().write(|w| w.bits(duty)),
                Inverter::Eye => DP.TC1.ocr1d().write(|w| w.bits(duty)),
            }
        }
    }

    fn set_output_enabled(&mut self, inverter: Inverter, enabled: bool) {
        match inverter {
            Inverter::Geiger => self.geiger_enabled = enabled,
            Inverter::Eye => self.eye_enabled = enabled,
        }
        write_com(&DP.TC1, self.geiger_enabled, self.eye_enabled);
    }

    #[inline(never)]
    fn force_safe_state() {
        // SAFETY: This may run before initialization and from the fail-stop path.
        //         It only disconnects the gates from the timer and
        //         forces the output latches to the idle levels.
        //         Concurrent owners of these registers are stopped or not yet running.
        let dp = unsafe { Peripherals::steal() };
        write_com(&dp.TC1, false, false);
        // SAFETY: Read-modify-write of the port latch and direction bits.
        unsafe {
            dp.PORTB.portb().modify(|r, w| {
                w.bits((r.bits() | (1 << PB_EYE_GATE)) & !(1 << PB_GEIGER_GATE))
            });
            dp.PORTB
                .ddrb()
                .modify(|r, w| w.bits(r.bits() | (1 << PB_EYE_GATE) | (1 << PB_GEIGER_GATE)));
        }
    }
}

impl Board for HvBoard {
    fn set_heater(&mut self, stage: HeaterStage, on: bool) {
        match stage {
            HeaterStage::Limited => PORTA.set(PA_HEATER_LIMITED, on),
            HeaterStage::Full => PORTA.set(PA_HEATER_FULL, on),
        }
    }

    fn set_eye_display_value(&mut self, value: u8) {
        // SAFETY: Any compare value is valid.
        unsafe { DP.TC1.ocr1a().write(|w| w.bits(value)) };
    }
}

// vim: ts=4 sw=4 expandtab
