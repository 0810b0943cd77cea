// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    hw::mcu,
    ports::{PB_SENSE, PORTB},
    timer::timer_get,
};
use avr_context::{InitCtx, InitCtxCell};
use critical_section::CriticalSection;
use tubectl::{
    EdgeQueue,
    discharge::{DischargeEvent, Edge},
};

#[allow(non_snake_case)]
pub struct ExInt {
    pub EXINT: mcu::EXINT,
}

// SAFETY: Is initialized in the init context.
pub static EXINT: InitCtxCell<ExInt> = unsafe { InitCtxCell::uninit() };

/// Sense line edges, drained by the main loop.
pub static EDGES: EdgeQueue = EdgeQueue::new();

const PCINT_ENA_8: bool = false; // PB0: SDA
const PCINT_ENA_9: bool = false;
const PCINT_ENA_10: bool = false; // PB2: SCL
const PCINT_ENA_11: bool = false;
const PCINT_ENA_12: bool = false;
const PCINT_ENA_13: bool = false;
const PCINT_ENA_14: bool = true; // PB6: Geiger sense line.
const PCINT_ENA_15: bool = false;

// PCIE1 covers PCINT 0..7 and 12..15.
const PCIE1: u8 = 0x2;

impl ExInt {
    #[allow(clippy::identity_op)]
    fn setup(&self, _: &InitCtx) {
        self.EXINT.pcmsk0().write(|w| w.set(0));
        self.EXINT.pcmsk1().write(|w| {
            w.set(
                ((PCINT_ENA_8 as u8) << 0)
                    | ((PCINT_ENA_9 as u8) << 1)
                    | ((PCINT_ENA_10 as u8) << 2)
                    | ((PCINT_ENA_11 as u8) << 3)
                    | ((PCINT_ENA_12 as u8) << 4)
                    | ((PCINT_ENA_13 as u8) << 5)
                    | ((PCINT_ENA_14 as u8) << 6)
                    | ((PCINT_ENA_15 as u8) << 7),
            )
        });
        self.EXINT.gifr().write(|w| w.pcif().set_bit());
        self.EXINT.gimsk().write(|w| w.pcie().set(PCIE1));
    }
}

pub fn exint_init(c: &InitCtx, exint: mcu::EXINT) {
    EXINT.init(c, ExInt { EXINT: exint });
    EXINT.setup(c);
}

pub fn irq_handler_pcint(cs: CriticalSection<'_>) {
    let stamp = timer_get(cs);
    let edge = if PORTB.get(PB_SENSE) {
        Edge::Rising
    } else {
        Edge::Falling
    };
    EDGES.push(cs, DischargeEvent { edge, stamp });
}

// vim: ts=4 sw=4 expandtab
