// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::cell::RefCell;
use critical_section::{CriticalSection, Mutex};

struct Slots<T, const SIZE: usize> {
    buf: [T; SIZE],
    /// Index of the oldest element.
    rd: u8,
    len: u8,
}

/// Bounded FIFO shared between an interrupt and the main loop.
///
/// A push into a full ring is refused. Queued elements are never overwritten.
pub struct Ring<T, const SIZE: usize>(Mutex<RefCell<Slots<T, SIZE>>>);

impl<T: Copy, const SIZE: usize> Ring<T, SIZE> {
    /// Create an empty ring. `fill` is only a placeholder for the free slots.
    pub const fn new(fill: T) -> Self {
        const { assert!(SIZE > 0 && SIZE <= u8::MAX as usize) };
        Self(Mutex::new(RefCell::new(Slots {
            buf: [fill; SIZE],
            rd: 0,
            len: 0,
        })))
    }

    /// Append `value`. Returns false, if the ring is full.
    pub fn push(&self, cs: CriticalSection<'_>, value: T) -> bool {
        let mut s = self.0.borrow_ref_mut(cs);
        if s.len as usize >= SIZE {
            return false;
        }
        let wr = (s.rd as usize + s.len as usize) % SIZE;
        s.buf[wr] = value;
        s.len += 1;
        true
    }

    /// Remove the oldest element.
    pub fn pop(&self, cs: CriticalSection<'_>) -> Option<T> {
        let mut s = self.0.borrow_ref_mut(cs);
        if s.len == 0 {
            return None;
        }
        let value = s.buf[s.rd as usize];
        s.rd = ((s.rd as usize + 1) % SIZE) as u8;
        s.len -= 1;
        Some(value)
    }
}


// vim: ts=4 sw=4 expandtab
