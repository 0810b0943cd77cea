// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geiger tube discharge detection on the sense line.
//!
//! A genuine avalanche discharge holds the sense line high for longer than
//! [DischargeConfig::min_discharge]. Shorter pulses are noise.

use crate::timer::{RelTimestamp, Timestamp};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Edge {
    Rising,
    Falling,
}

/// One sense line edge, as captured by the edge interrupt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DischargeEvent {
    pub edge: Edge,
    pub stamp: Timestamp,
}

impl DischargeEvent {
    pub const fn new() -> Self {
        Self {
            edge: Edge::Falling,
            stamp: Timestamp::new(),
        }
    }
}

impl Default for DischargeEvent {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DischargeState {
    WaitingForRisingEdge,
    WaitingForFallingEdge,
    Recovery,
}

pub struct DischargeConfig {
    /// Pulses up to and including this width are noise.
    pub min_discharge: RelTimestamp,
    /// Dead time after a counted discharge.
    pub recovery: RelTimestamp,
}

pub const DISCHARGE_CONFIG: DischargeConfig = DischargeConfig {
    min_discharge: RelTimestamp::from_micros(60),
    recovery: RelTimestamp::from_micros(200),
};

pub struct Detector {
    config: &'static DischargeConfig,
    state: DischargeState,
    rising: Timestamp,
    falling: Timestamp,
}

impl Detector {
    pub const fn new(config: &'static DischargeConfig) -> Self {
        Self {
            config,
            state: DischargeState::WaitingForRisingEdge,
            rising: Timestamp::new(),
            falling: Timestamp::new(),
        }
    }

    pub fn state(&self) -> DischargeState {
        self.state
    }

    /// The edge that the sense interrupt shall trigger on next.
    pub fn armed_edge(&self) -> Edge {
        match self.state {
            DischargeState::WaitingForRisingEdge | DischargeState::Recovery => Edge::Rising,
            DischargeState::WaitingForFallingEdge => Edge::Falling,
        }
    }

    /// Process one sense line edge.
    ///
    /// Returns true, if the edge completed a valid discharge.
    pub fn on_edge(&mut self, event: DischargeEvent) -> bool {
        match (self.state, event.edge) {
            (DischargeState::WaitingForRisingEdge, Edge::Rising)
            | (DischargeState::WaitingForFallingEdge, Edge::Rising) => {
                // A repeated rising edge means we missed the falling one.
                // Restart the measurement.
                self.rising = event.stamp;
                self.state = DischargeState::WaitingForFallingEdge;
                false
            }
            (DischargeState::WaitingForFallingEdge, Edge::Falling) => {
                let width = event.stamp - self.rising;
                if width > self.config.min_discharge {
                    self.falling = event.stamp;
                    self.state = DischargeState::Recovery;
                    true
                } else {
                    self.state = DischargeState::WaitingForRisingEdge;
                    false
                }
            }
            (DischargeState::WaitingForRisingEdge, Edge::Falling) | (DischargeState::Recovery, _) => {
                false
            }
        }
    }

    /// Leave the recovery dead time, if it has elapsed at `now`.
    pub fn run(&mut self, now: Timestamp) {
        if self.state == DischargeState::Recovery && now - self.falling >= self.config.recovery {
            self.state = DischargeState::WaitingForRisingEdge;
        }
    }
}


// vim: ts=4 sw=4 expandtab
