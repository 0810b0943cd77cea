// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(unused_unsafe)]

use crate::hw::mcu;
use avr_context::{InitCtx, InitCtxCell};

pub const PA_HEATER_LIMITED: usize = 4;
pub const PA_HEATER_FULL: usize = 5;
pub const PA_DEBUG: usize = 7;

pub const PB_SDA: usize = 0;
pub const PB_SCL: usize = 2;
pub const PB_GEIGER_GATE: usize = 3;
pub const PB_EYE_GATE: usize = 5;
pub const PB_SENSE: usize = 6;

#[rustfmt::skip]
macro_rules! impl_port {
    (
        $struct:ident,
        $name:ident,
        $port:ident,
        $pin:ident,
        $ddr:ident,
        $bit0:ident,
        $bit1:ident,
        $bit2:ident,
        $bit3:ident,
        $bit4:ident,
        $bit5:ident,
        $bit6:ident,
        $bit7:ident
    ) => {
        #[allow(non_snake_case)]
        pub struct $struct {
            pub $name: mcu::$name,
        }

        // SAFETY: Is initialized in the init context.
        pub static $name: InitCtxCell<$struct> = unsafe { InitCtxCell::uninit() };

        impl $struct {
            #[inline(always)]
            pub fn get(&self, bit: usize) -> bool {
                match bit {
                    0 => self.$name.$pin().read().$bit0().bit(),
                    1 => self.$name.$pin().read().$bit1().bit(),
                    2 => self.$name.$pin().read().$bit2().bit(),
                    3 => self.$name.$pin().read().$bit3().bit(),
                    4 => self.$name.$pin().read().$bit4().bit(),
                    5 => self.$name.$pin().read().$bit5().bit(),
                    6 => self.$name.$pin().read().$bit6().bit(),
                    _ => self.$name.$pin().read().$bit7().bit(),
                }
            }

            #[inline(always)]
            pub fn set(&self, bit: usize, value: bool) {
                critical_section::with(|_| match bit {
                    0 => self.$name.$port().modify(|_, w| w.$bit0().bit(value)),
                    1 => self.$name.$port().modify(|_, w| w.$bit1().bit(value)),
                    2 => self.$name.$port().modify(|_, w| w.$bit2().bit(value)),
                    3 => self.$name.$port().modify(|_, w| w.$bit3().bit(value)),
                    4 => self.$name.$port().modify(|_, w| w.$bit4().bit(value)),
                    5 => self.$name.$port().modify(|_, w| w.$bit5().bit(value)),
                    6 => self.$name.$port().modify(|_, w| w.$bit6().bit(value)),
                    _ => self.$name.$port().modify(|_, w| w.$bit7().bit(value)),
                });
            }

            #[inline(always)]
            pub fn output(&self, bit: usize) {
                critical_section::with(|_| match bit {
                    0 => self.$name.$ddr().modify(|_, w| w.$bit0().set_bit()),
                    1 => self.$name.$ddr().modify(|_, w| w.$bit1().set_bit()),
                    2 => self.$name.$ddr().modify(|_, w| w.$bit2().set_bit()),
                    3 => self.$name.$ddr().modify(|_, w| w.$bit3().set_bit()),
                    4 => self.$name.$ddr().modify(|_, w| w.$bit4().set_bit()),
                    5 => self.$name.$ddr().modify(|_, w| w.$bit5().set_bit()),
                    6 => self.$name.$ddr().modify(|_, w| w.$bit6().set_bit()),
                    _ => self.$name.$ddr().modify(|_, w| w.$bit7().set_bit()),
                });
            }

            #[inline(always)]
            pub fn input(&self, bit: usize) {
                critical_section::with(|_| match bit {
                    0 => self.$name.$ddr().modify(|_, w| w.$bit0().clear_bit()),
                    1 => self.$name.$ddr().modify(|_, w| w.$bit1().clear_bit()),
                    2 => self.$name.$ddr().modify(|_, w| w.$bit2().clear_bit()),
                    3 => self.$name.$ddr().modify(|_, w| w.$bit3().clear_bit()),
                    4 => self.$name.$ddr().modify(|_, w| w.$bit4().clear_bit()),
                    5 => self.$name.$ddr().modify(|_, w| w.$bit5().clear_bit()),
                    6 => self.$name.$ddr().modify(|_, w| w.$bit6().clear_bit()),
                    _ => self.$name.$ddr().modify(|_, w| w.$bit7().clear_bit()),
                });
            }
        }
    };
}

impl_port!(
    PortA, PORTA, porta, pina, ddra, pa0, pa1, pa2, pa3, pa4, pa5, pa6, pa7
);
impl_port!(
    PortB, PORTB, portb, pinb, ddrb, pb0, pb1, pb2, pb3, pb4, pb5, pb6, pb7
);

const fn pin_input(_bit: usize) -> u8 {
    0
}
const fn pin_output(bit: usize) -> u8 {
    1 << bit
}
const fn pin_low(_bit: usize) -> u8 {
    0
}
const fn pin_high(bit: usize) -> u8 {
    1 << bit
}
const fn pin_floating(_bit: usize) -> u8 {
    0
}

impl PortA {
    pub fn setup(&self, _: &InitCtx) {
        // SAFETY: Called with interrupts disabled. Ensured by &InitCtx.
        unsafe {
            self.PORTA.porta().write(|w| {
                w.bits(
                    pin_low(0) | // NC
                    pin_floating(1) | // eye divider, single ended ADC
                    pin_floating(2) | // geiger divider, single ended ADC
                    pin_floating(3) | // AREF 2.5 V
                    pin_low(PA_HEATER_LIMITED) |
                    pin_low(PA_HEATER_FULL) |
                    pin_low(6) | // NC
                    pin_low(PA_DEBUG),
                )
            });
            self.PORTA.ddra().write(|w| {
                w.bits(
                    pin_output(0) | // NC
                    pin_input(1) | // eye divider, single ended ADC
                    pin_input(2) | // geiger divider, single ended ADC
                    pin_input(3) | // AREF 2.5 V
                    pin_output(PA_HEATER_LIMITED) |
                    pin_output(PA_HEATER_FULL) |
                    pin_output(6) | // NC
                    pin_output(PA_DEBUG),
                )
            });
        }
    }
}

impl PortB {
    pub fn setup(&self, _: &InitCtx) {
        // SAFETY: Called with interrupts disabled. Ensured by &InitCtx.
        unsafe {
            self.PORTB.portb().write(|w| {
                w.bits(
                    pin_high(PB_SDA) | // I2C SDA, released
                    pin_low(1) | // OC1A eye display value
                    pin_high(PB_SCL) | // I2C SCL, released
                    pin_low(PB_GEIGER_GATE) | // OC1B, idle low
                    pin_low(4) | // NC
                    pin_high(PB_EYE_GATE) | // OC1D, idle high
                    pin_floating(PB_SENSE) | // Geiger sense line
                    pin_floating(7), // RESET, Debug-Wire
                )
            });
            self.PORTB.ddrb().write(|w| {
                w.bits(
                    pin_input(PB_SDA) | // I2C SDA
                    pin_output(1) | // OC1A eye display value
                    pin_output(PB_SCL) | // I2C SCL
                    pin_output(PB_GEIGER_GATE) | // OC1B
                    pin_output(4) | // NC
                    pin_output(PB_EYE_GATE) | // OC1D
                    pin_input(PB_SENSE) | // Geiger sense line
                    pin_input(7), // RESET, Debug-Wire
                )
            });
        }
    }
}

pub fn ports_init(c: &InitCtx, porta: mcu::PORTA, portb: mcu::PORTB) {
    PORTA.init(c, PortA { PORTA: porta });
    PORTB.init(c, PortB { PORTB: portb });
    PORTA.setup(c);
    PORTB.setup(c);
}

/// Drive the debug pin.
#[inline(always)]
pub fn debug_pin(active: bool) {
    if cfg!(feature = "debug") {
        PORTA.set(PA_DEBUG, active);
    }
}

// vim: ts=4 sw=4 expandtab
