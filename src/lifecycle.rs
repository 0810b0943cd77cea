// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Magic eye tube power sequencing.
//!
//! The heater is brought up in two stages before the anode voltage
//! is switched on. A tube that was switched off only shortly before
//! is still warm and skips the limited heating stage.

use crate::{
    debug::Debug,
    timer::{TICK_HZ, secs_to_ticks},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum TubeState {
    Disabled = 0,
    HeatingLimited = 1,
    HeatingFull = 2,
    Running = 3,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum HeaterStage {
    /// Heater through the series resistor.
    Limited,
    /// Series resistor bypassed.
    Full,
}

/// Outputs switched by the lifecycle.
pub trait TubeOutputs {
    fn set_heater(&mut self, stage: HeaterStage, on: bool);
    fn set_eye_inverter_enabled(&mut self, enabled: bool);
}

pub struct LifecycleConfig {
    pub preheat_secs: u16,
    pub postheat_secs: u16,
    /// Re-enabling within this time after disabling skips the limited stage.
    pub max_secs_without_preheat: u16,
    pub tick_hz: u16,
}

impl LifecycleConfig {
    const fn ticks(&self, secs: u16) -> u16 {
        let ticks = secs_to_ticks(secs, self.tick_hz);
        if ticks > u16::MAX as u32 {
            u16::MAX
        } else {
            ticks as u16
        }
    }
}

pub const LIFECYCLE_CONFIG: LifecycleConfig = LifecycleConfig {
    preheat_secs: 8,
    postheat_secs: 5,
    max_secs_without_preheat: 5,
    tick_hz: TICK_HZ,
};

pub struct TubeLifecycle {
    config: &'static LifecycleConfig,
    state: TubeState,
    /// Ticks since the last state change. Saturating.
    ticks: u16,
}

impl TubeLifecycle {
    pub const fn new(config: &'static LifecycleConfig) -> Self {
        Self {
            config,
            state: TubeState::Disabled,
            ticks: u16::MAX,
        }
    }

    pub fn state(&self) -> TubeState {
        self.state
    }

    pub fn tick(&mut self, out: &mut impl TubeOutputs) {
        self.ticks = self.ticks.saturating_add(1);

        match self.state {
            TubeState::HeatingLimited if self.ticks >= self.config.ticks(self.config.preheat_secs) => {
                out.set_heater(HeaterStage::Full, true);
                self.state = TubeState::HeatingFull;
                self.ticks = 0;
            }
            TubeState::HeatingFull if self.ticks >= self.config.ticks(self.config.postheat_secs) => {
                out.set_eye_inverter_enabled(true);
                self.state = TubeState::Running;
                self.ticks = 0;
            }
            _ => (),
        }

        Debug::TubeState.log_u8(self.state as u8);
    }

    pub fn set_enabled(&mut self, out: &mut impl TubeOutputs, enabled: bool) {
        if enabled && self.state == TubeState::Disabled {
            let warm = self.ticks < self.config.ticks(self.config.max_secs_without_preheat);
            out.set_eye_inverter_enabled(false);
            out.set_heater(HeaterStage::Limited, true);
            if warm {
                out.set_heater(HeaterStage::Full, true);
                self.state = TubeState::HeatingFull;
            } else {
                self.state = TubeState::HeatingLimited;
            }
            self.ticks = 0;
        } else if !enabled && self.state != TubeState::Disabled {
            out.set_eye_inverter_enabled(false);
            out.set_heater(HeaterStage::Limited, false);
            out.set_heater(HeaterStage::Full, false);
            self.state = TubeState::Disabled;
            self.ticks = 0;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    pub struct MockOutputs {
        pub heater: [bool; 2],
        pub eye: bool,
    }

    impl TubeOutputs for MockOutputs {
        fn set_heater(&mut self, stage: HeaterStage, on: bool) {
            self.heater[stage as usize] = on;
        }

        fn set_eye_inverter_enabled(&mut self, enabled: bool) {
            self.eye = enabled;
        }
    }

    fn ticks(lc: &mut TubeLifecycle, out: &mut MockOutputs, n: u32) {
        for _ in 0..n {
            lc.tick(out);
        }
    }

    #[test]
    fn test_full_sequence() {
        let mut out = MockOutputs::default();
        let mut lc = TubeLifecycle::new(&LIFECYCLE_CONFIG);
        assert_eq!(lc.state(), TubeState::Disabled);
        ticks(&mut lc, &mut out, 10);
        assert_eq!(lc.state(), TubeState::Disabled);

        lc.set_enabled(&mut out, true);
        assert_eq!(lc.state(), TubeState::HeatingLimited);
        assert_eq!(out.heater, [true, false]);
        assert!(!out.eye);

        ticks(&mut lc, &mut out, 799);
        assert_eq!(lc.state(), TubeState::HeatingLimited);
        ticks(&mut lc, &mut out, 1);
        assert_eq!(lc.state(), TubeState::HeatingFull);
        assert_eq!(out.heater, [true, true]);
        assert!(!out.eye);

        ticks(&mut lc, &mut out, 499);
        assert_eq!(lc.state(), TubeState::HeatingFull);
        assert!(!out.eye);
        ticks(&mut lc, &mut out, 1);
        assert_eq!(lc.state(), TubeState::Running);
        assert!(out.eye);

        ticks(&mut lc, &mut out, 100_000);
        assert_eq!(lc.state(), TubeState::Running);

        lc.set_enabled(&mut out, false);
        assert_eq!(lc.state(), TubeState::Disabled);
        assert_eq!(out.heater, [false, false]);
        assert!(!out.eye);
    }

    #[test]
    fn test_warm_restart() {
        let mut out = MockOutputs::default();
        let mut lc = TubeLifecycle::new(&LIFECYCLE_CONFIG);
        lc.set_enabled(&mut out, true);
        ticks(&mut lc, &mut out, 20);
        lc.set_enabled(&mut out, false);
        ticks(&mut lc, &mut out, 499);
        lc.set_enabled(&mut out, true);
        assert_eq!(lc.state(), TubeState::HeatingFull);
        assert_eq!(out.heater, [true, true]);
        assert!(!out.eye);

        ticks(&mut lc, &mut out, 500);
        assert_eq!(lc.state(), TubeState::Running);
        assert!(out.eye);
    }

    #[test]
    fn test_cold_restart() {
        let mut out = MockOutputs::default();
        let mut lc = TubeLifecycle::new(&LIFECYCLE_CONFIG);
        lc.set_enabled(&mut out, true);
        lc.set_enabled(&mut out, false);
        ticks(&mut lc, &mut out, 500);
        lc.set_enabled(&mut out, true);
        assert_eq!(lc.state(), TubeState::HeatingLimited);
        assert_eq!(out.heater, [true, false]);
    }

    #[test]
    fn test_idempotent_commands() {
        let mut out = MockOutputs::default();
        let mut lc = TubeLifecycle::new(&LIFECYCLE_CONFIG);

        // Disabling a disabled tube does not restart the cooldown time.
        lc.set_enabled(&mut out, false);
        assert_eq!(lc.state(), TubeState::Disabled);
        lc.set_enabled(&mut out, true);
        assert_eq!(lc.state(), TubeState::HeatingLimited);

        ticks(&mut lc, &mut out, 400);
        lc.set_enabled(&mut out, true);
        assert_eq!(lc.state(), TubeState::HeatingLimited);
        ticks(&mut lc, &mut out, 400);
        assert_eq!(lc.state(), TubeState::HeatingFull);
    }
}

// vim: ts=4 sw=4 expandtab
