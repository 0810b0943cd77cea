// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geiger counter and magic eye tube controller.
//!
//! This crate holds the complete control logic of the board:
//! high voltage inverter regulation, tube heater sequencing,
//! Geiger discharge detection and counting, and the eye animation.
//! The hardware is reached through the [inverter::InverterPwm]
//! and [system::Board] traits.

#![no_std]

pub mod analog;
pub mod animation;
pub mod debug;
pub mod discharge;
pub mod fixpt;
pub mod geiger;
pub mod inverter;
pub mod lifecycle;
pub mod pid;
pub mod protocol;
pub mod ring;
pub mod system;
pub mod timer;

pub use crate::system::{Board, EdgeQueue, System};

// vim: ts=4 sw=4 expandtab
