// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

pub use attiny::{self as mcu, Peripherals};
pub use avr_device::attiny861a as attiny;
pub use avr_device::interrupt;

macro_rules! define_isr {
    ($name:ident, $handler:path) => {
        #[avr_device::interrupt(attiny861a)]
        fn $name() {
            // Interrupts are disabled inside of the handler.
            critical_section::with(|cs| $handler(cs));
        }
    };
}

define_isr!(PCINT, crate::exint::irq_handler_pcint);
define_isr!(TIMER0_COMPA, crate::timer::irq_handler_timer0_compa);

// vim: ts=4 sw=4 expandtab
