// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod analog;
mod board;
mod exint;
mod fault;
mod hw;
mod ports;
mod timer;
mod usi_twi;

use crate::{
    analog::Adc,
    board::HvBoard,
    exint::{EDGES, exint_init},
    fault::unwrap_option,
    hw::{Peripherals, interrupt},
    ports::{debug_pin, ports_init},
    timer::{tick_pending, timer_get, timer_init},
    usi_twi::Twi,
};
use avr_context::{InitCtx, MainCtx};
use tubectl::System;

fn wdt_init() {
    // SAFETY: The asm code only accesses the WDT registers
    //         which are not accessed from anywhere else in the program.
    unsafe {
        // Enable WDT with timeout 32.5 ms
        core::arch::asm!(
            "ldi {tmp}, 0x10", // WDCE=1
            "out {WDTCR}, {tmp}",
            "ldi {tmp}, 0x19", // WDCE=1, WDE=1, WDP2=0, WDP1=0, WDP0=1
            "out {WDTCR}, {tmp}",
            tmp = out(reg_upper) _,
            WDTCR = const 0x21,
            options(nostack, preserves_flags)
        );
    }
}

#[avr_device::entry]
fn main() -> ! {
    // The gate outputs are floating after reset.
    System::set_pwm_outputs_to_safe_state::<HvBoard>();

    wdt_init();

    let dp = unwrap_option(Peripherals::take());

    let mut sys = System::new();
    let mut board = None;
    let mut adc = None;
    let mut twi = None;

    let init_static_vars = |c: &InitCtx| {
        ports_init(c, dp.PORTA, dp.PORTB);
        board::DP.init(c, board::Dp { TC1: dp.TC1 });
        board::DP.setup(c);
        timer_init(c, dp.TC0);
        exint_init(c, dp.EXINT);
        board = Some(HvBoard::new(c));
        adc = Some(Adc::new(c, dp.ADC, &sys));
        twi = Some(Twi::new(c, dp.USI));
    };

    // SAFETY: Constructed once, before interrupts are enabled.
    //         The returned handle proves main() context.
    let _m = unsafe { MainCtx::new_with_init(init_static_vars) };
    let mut board = unwrap_option(board);
    let mut adc = unwrap_option(adc);
    let mut twi = unwrap_option(twi);

    sys.init(&mut board);

    // SAFETY: All static peripheral handles have been initialized.
    unsafe { interrupt::enable() };

    loop {
        let now = critical_section::with(timer_get);
        sys.run_edges(&EDGES, now);

        adc.run(&mut sys);

        if tick_pending() {
            debug_pin(true);
            sys.tick(&mut board);
            debug_pin(false);
        }

        twi.poll(|frame, reply| sys.handle_command(&mut board, frame, reply));

        avr_device::asm::wdr();
    }
}

// vim: ts=4 sw=4 expandtab
