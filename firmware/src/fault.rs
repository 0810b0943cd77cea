// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{board::HvBoard, hw::interrupt};
use tubectl::System;

/// Cheaper Option::unwrap() alternative.
///
/// This is cheaper, because it doesn't call into the panic unwind path.
/// Therefore, it does not impose caller-saves overhead onto the calling function.
#[inline(always)]
pub fn unwrap_option<T>(value: Option<T>) -> T {
    match value {
        Some(value) => value,
        None => fail_stop(),
    }
}

/// Switch off the high voltage and stop.
#[inline(never)]
#[allow(clippy::empty_loop)]
pub fn fail_stop() -> ! {
    interrupt::disable();
    System::set_pwm_outputs_to_safe_state::<HvBoard>();
    loop {
        // Wait for the watchdog timer to trigger and reset the system.
        // Nothing pokes the watchdog anymore.
    }
}

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    fail_stop();
}

// vim: ts=4 sw=4 expandtab
