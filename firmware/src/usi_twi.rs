// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Polled I2C slave on the USI.
//!
//! The USI holds SCL low after a start condition and after each
//! counter overflow until [Twi::poll] has handled it.
//! A write transaction delivers one request frame.
//! The frame is executed on the following stop or repeated start
//! and its reply is read back by the next read transaction.

#![allow(unused_unsafe)]

use crate::{
    hw::mcu,
    ports::{PB_SCL, PB_SDA, PORTB},
};
use avr_context::{InitCtx, InitCtxCell};
use tubectl::protocol::{MAX_REPLY, MAX_REQUEST};

pub const TWI_ADDR: u8 = 0x12;

// USICR
const USIWM_TWI: u8 = 0x2 << 4;
const USIWM_TWI_HOLD: u8 = 0x3 << 4;
const USICS_EXT_POS: u8 = 0x2 << 2;

// USISR
const USISIF: u8 = 1 << 7;
const USIOIF: u8 = 1 << 6;
const USIPF: u8 = 1 << 5;
const USIDC: u8 = 1 << 4;

/// Counter preset for one acknowledge bit (two clock edges).
const CNT_ACK: u8 = 0x0E;
/// Counter preset for one data byte.
const CNT_BYTE: u8 = 0x00;

#[allow(non_snake_case)]
pub struct Dp {
    pub USI: mcu::USI,
}

// SAFETY: Is initialized in the init context.
pub static DP: InitCtxCell<Dp> = unsafe { InitCtxCell::uninit() };

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for a start condition.
    Idle,
    CheckAddress,
    SendData,
    RequestReplyAck,
    CheckReplyAck,
    RequestData,
    GetData,
}

#[inline(always)]
fn sda_output(output: bool) {
    if output {
        PORTB.output(PB_SDA);
    } else {
        PORTB.input(PB_SDA);
    }
}

impl Dp {
    fn write_cr(&self, bits: u8) {
        // SAFETY: Raw USI control bits. All bit combinations are valid.
        unsafe { self.USI.usicr().write(|w| w.bits(bits)) };
    }

    fn write_sr(&self, flags: u8, count: u8) {
        // SAFETY: Writing ones clears the flags. Any counter value is valid.
        unsafe { self.USI.usisr().write(|w| w.bits(flags | (count & 0x0F))) };
    }

    /// Wait for the next start condition.
    fn listen(&self) {
        self.write_cr(USIWM_TWI | USICS_EXT_POS);
        self.write_sr(USIOIF | USIPF | USIDC, 0);
    }

    #[inline(always)]
    fn send_ack(&self) {
        self.USI.usidr().write(|w| w.set(0));
        sda_output(true);
        self.write_sr(USIOIF | USIPF | USIDC, CNT_ACK);
    }

    #[inline(always)]
    fn read_ack(&self) {
        sda_output(false);
        self.USI.usidr().write(|w| w.set(0));
        self.write_sr(USIOIF | USIPF | USIDC, CNT_ACK);
    }

    #[inline(always)]
    fn send_byte(&self, data: u8) {
        self.USI.usidr().write(|w| w.set(data));
        sda_output(true);
        self.write_sr(USIOIF | USIPF | USIDC, CNT_BYTE);
    }

    #[inline(always)]
    fn read_byte(&self) {
        sda_output(false);
        self.write_sr(USIOIF | USIPF | USIDC, CNT_BYTE);
    }
}

pub struct Twi {
    state: State,
    request: [u8; MAX_REQUEST],
    request_len: usize,
    /// A complete request frame is waiting for execution.
    request_pending: bool,
    reply: [u8; MAX_REPLY],
    reply_len: usize,
    reply_pos: usize,
}

impl Twi {
    pub fn new(c: &InitCtx, usi: mcu::USI) -> Self {
        DP.init(c, Dp { USI: usi });
        // SAFETY: USI pins on PB0 and PB2.
        unsafe { DP.USI.usipp().write(|w| w.bits(0)) };
        DP.USI.usidr().write(|w| w.set(0xFF));
        PORTB.set(PB_SDA, true);
        PORTB.set(PB_SCL, true);
        PORTB.output(PB_SCL);
        sda_output(false);
        DP.listen();
        Self {
            state: State::Idle,
            request: [0; MAX_REQUEST],
            request_len: 0,
            request_pending: false,
            reply: [0; MAX_REPLY],
            reply_len: 0,
            reply_pos: 0,
        }
    }

    fn execute<F>(&mut self, handler: &mut F)
    where
        F: FnMut(&[u8], &mut [u8; MAX_REPLY]) -> usize,
    {
        if self.request_pending {
            self.request_pending = false;
            self.reply_len = handler(&self.request[..self.request_len], &mut self.reply);
            self.reply_pos = 0;
        }
    }

    fn next_reply_byte(&mut self) -> u8 {
        let data = if self.reply_pos < self.reply_len {
            self.reply[self.reply_pos]
        } else {
            0xFF
        };
        self.reply_pos = self.reply_pos.saturating_add(1);
        data
    }

    fn abort(&mut self) {
        sda_output(false);
        DP.listen();
        self.state = State::Idle;
    }

    fn handle_start<F>(&mut self, handler: &mut F)
    where
        F: FnMut(&[u8], &mut [u8; MAX_REPLY]) -> usize,
    {
        // Repeated start after a write.
        self.execute(handler);

        sda_output(false);
        // Wait for the master to complete the start condition.
        while PORTB.get(PB_SCL) && !PORTB.get(PB_SDA) {}
        DP.write_cr(USIWM_TWI_HOLD | USICS_EXT_POS);
        DP.write_sr(USISIF | USIOIF | USIPF | USIDC, CNT_BYTE);
        self.state = State::CheckAddress;
    }

    fn handle_overflow(&mut self) {
        match self.state {
            State::Idle => self.abort(),
            State::CheckAddress => {
                let data = DP.USI.usidr().read().bits();
                if data >> 1 != TWI_ADDR {
                    self.abort();
                    return;
                }
                if data & 1 != 0 {
                    self.state = State::SendData;
                } else {
                    self.request_len = 0;
                    self.request_pending = false;
                    self.state = State::RequestData;
                }
                DP.send_ack();
            }
            State::SendData | State::CheckReplyAck => {
                if self.state == State::CheckReplyAck && DP.USI.usidr().read().bits() != 0 {
                    // NACK. The master is done reading.
                    self.abort();
                    return;
                }
                let data = self.next_reply_byte();
                DP.send_byte(data);
                self.state = State::RequestReplyAck;
            }
            State::RequestReplyAck => {
                DP.read_ack();
                self.state = State::CheckReplyAck;
            }
            State::RequestData => {
                DP.read_byte();
                self.state = State::GetData;
            }
            State::GetData => {
                let data = DP.USI.usidr().read().bits();
                if self.request_len < MAX_REQUEST {
                    self.request[self.request_len] = data;
                    self.request_len += 1;
                }
                self.request_pending = true;
                DP.send_ack();
                self.state = State::RequestData;
            }
        }
    }

    /// Handle pending bus events.
    /// `handler` executes a request frame and returns the reply length.
    pub fn poll<F>(&mut self, mut handler: F)
    where
        F: FnMut(&[u8], &mut [u8; MAX_REPLY]) -> usize,
    {
        let sr = DP.USI.usisr().read().bits();
        if sr & USISIF != 0 {
            self.handle_start(&mut handler);
        } else if sr & USIOIF != 0 {
            self.handle_overflow();
        } else if sr & USIPF != 0 {
            DP.write_sr(USIPF, 0);
            self.execute(&mut handler);
            if self.state != State::Idle {
                self.abort();
            }
        }
    }
}

// vim: ts=4 sw=4 expandtab
