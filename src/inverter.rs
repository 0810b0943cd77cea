// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! High voltage inverter regulation.
//!
//! Each inverter is a PWM driven boost converter with a resistive divider
//! from the high voltage output to an ADC input.
//! A PID controller turns the divider readout into the PWM duty cycle.

use crate::{
    analog::{ADC_MAX, AdcChannel, Oversampler},
    debug::Debug,
    fixpt::fixpt,
    pid::{NO_GAIN, Pid, PidParams},
    timer::TICK_HZ,
};

/// Highest brightness level of the eye.
pub const MAX_BRIGHTNESS: u8 = 5;

/// PWM timer counts per period.
pub const PWM_TOP: u16 = 0xFF;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Inverter {
    /// Magic eye anode supply.
    Eye,
    /// Geiger-Müller tube supply.
    Geiger,
}

impl Inverter {
    pub const fn adc_channel(&self) -> AdcChannel {
        match self {
            Self::Eye => AdcChannel::Eye,
            Self::Geiger => AdcChannel::Geiger,
        }
    }
}

/// Gate pin level while the PWM is disconnected.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IdleLevel {
    Low,
    High,
}

/// Gate drive polarity.
/// Inverted channels switch the transistor on during the low phase.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Polarity {
    Normal,
    Inverted,
}

/// PWM hardware of both inverters.
pub trait InverterPwm {
    /// Write the duty cycle in timer counts.
    fn set_duty(&mut self, inverter: Inverter, duty: u16);

    /// Connect the timer to the gate pin or disconnect it.
    /// A disconnected gate pin is driven to the channel's [IdleLevel].
    fn set_output_enabled(&mut self, inverter: Inverter, enabled: bool);

    /// Drive all gate pins to their idle level.
    ///
    /// This must work in any context, with interrupts disabled,
    /// before any initialization and without any object state.
    fn force_safe_state();
}

/// High voltage divider in 100 Ohm units and ADC reference in millivolts.
#[derive(Clone, Copy, Debug)]
pub struct DividerConfig {
    pub upper: u32,
    pub lower: u32,
    pub vref_mv: u32,
}

/// ADC readout that corresponds to `volts` at the divider input.
pub const fn desired_adc_readout(divider: &DividerConfig, volts: u16) -> i16 {
    let num = volts as u64 * 1000 * divider.lower as u64 * ADC_MAX as u64;
    let den = (divider.upper as u64 + divider.lower as u64) * divider.vref_mv as u64;
    let adc = num / den;
    if adc > ADC_MAX as u64 {
        ADC_MAX as i16
    } else {
        adc as i16
    }
}

const fn brightness_table<const N: usize>(divider: &DividerConfig, volts: &[u16; N]) -> [i16; N] {
    let mut table = [0; N];
    let mut i = 0;
    while i < N {
        table[i] = desired_adc_readout(divider, volts[i]);
        i += 1;
    }
    table
}

pub struct ChannelConfig {
    pub min_duty: u16,
    pub max_duty: u16,
    pub idle: IdleLevel,
    pub polarity: Polarity,
    pub pid: PidParams,
}

impl ChannelConfig {
    pub const fn mid_duty(&self) -> u16 {
        (self.min_duty + self.max_duty) / 2
    }

    fn clamp_duty(&self, duty: i16) -> u16 {
        let duty = duty.max(0) as u16;
        duty.clamp(self.min_duty, self.max_duty)
    }
}

const fn duty(fraction_percent: u16) -> u16 {
    ((PWM_TOP as u32 * fraction_percent as u32) / 100) as u16
}

pub const EYE_DIVIDER: DividerConfig = DividerConfig {
    upper: 5400,
    lower: 47,
    vref_mv: 2500,
};

pub const GEIGER_DIVIDER: DividerConfig = DividerConfig {
    upper: 18800,
    lower: 47,
    vref_mv: 2500,
};

/// Geiger tube operating voltage.
pub const GEIGER_VOLTAGE: u16 = 390;

/// Eye anode voltage per brightness level.
pub const EYE_BRIGHTNESS_VOLTS: [u16; MAX_BRIGHTNESS as usize + 1] = [150, 170, 190, 210, 230, 250];

const EYE_BRIGHTNESS_TABLE: [i16; MAX_BRIGHTNESS as usize + 1] =
    brightness_table(&EYE_DIVIDER, &EYE_BRIGHTNESS_VOLTS);

pub const GEIGER_DESIRED_ADC_READOUT: i16 = desired_adc_readout(&GEIGER_DIVIDER, GEIGER_VOLTAGE);

pub const EYE_CONFIG: ChannelConfig = ChannelConfig {
    min_duty: duty(35),
    max_duty: duty(70),
    idle: IdleLevel::High,
    polarity: Polarity::Inverted,
    pid: PidParams {
        kp: fixpt!(1 / 8),
        ki: fixpt!(3),
        kd: NO_GAIN,
        hz: TICK_HZ,
        out_min: duty(35) as i16,
        out_max: duty(70) as i16,
    },
};

pub const GEIGER_CONFIG: ChannelConfig = ChannelConfig {
    min_duty: duty(5),
    max_duty: duty(26),
    idle: IdleLevel::Low,
    polarity: Polarity::Normal,
    pid: PidParams {
        kp: fixpt!(1 / 16),
        ki: fixpt!(2),
        kd: NO_GAIN,
        hz: TICK_HZ,
        out_min: duty(5) as i16,
        out_max: duty(26) as i16,
    },
};

pub struct InverterChannel {
    config: &'static ChannelConfig,
    target: i16,
    readout: i16,
    duty: u16,
    pid: Pid,
    enabled: bool,
}

impl InverterChannel {
    pub const fn new(config: &'static ChannelConfig, target: i16) -> Self {
        Self {
            config,
            target,
            readout: 0,
            duty: config.mid_duty(),
            pid: Pid::new(&config.pid),
            enabled: false,
        }
    }

    fn regulate(&mut self, readout: i16) -> u16 {
        self.readout = readout;
        let y = self.pid.step(self.target, readout);
        let y = match self.config.polarity {
            Polarity::Normal => y,
            Polarity::Inverted => {
                (self.config.min_duty as i16 + self.config.max_duty as i16).saturating_sub(y)
            }
        };
        // Independent of the controller bounds.
        self.duty = self.config.clamp_duty(y);
        self.duty
    }

    pub fn target(&self) -> i16 {
        self.target
    }

    pub fn readout(&self) -> i16 {
        self.readout
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn config(&self) -> &'static ChannelConfig {
        self.config
    }
}

pub struct InverterRegulator {
    eye: InverterChannel,
    geiger: InverterChannel,
    brightness: u8,
}

impl InverterRegulator {
    pub const fn new() -> Self {
        Self::with_config(&EYE_CONFIG, &GEIGER_CONFIG)
    }

    pub const fn with_config(
        eye: &'static ChannelConfig,
        geiger: &'static ChannelConfig,
    ) -> Self {
        Self {
            eye: InverterChannel::new(eye, EYE_BRIGHTNESS_TABLE[MAX_BRIGHTNESS as usize]),
            geiger: InverterChannel::new(geiger, GEIGER_DESIRED_ADC_READOUT),
            brightness: MAX_BRIGHTNESS,
        }
    }

    /// Bring the PWM into its initial state:
    /// Eye inverter off, Geiger inverter running at its middle duty cycle.
    pub fn init(&mut self, pwm: &mut impl InverterPwm) {
        pwm.set_duty(Inverter::Eye, self.eye.duty);
        pwm.set_duty(Inverter::Geiger, self.geiger.duty);
        self.set_eye_enabled(pwm, false);
        self.geiger.pid.clear();
        self.geiger.enabled = true;
        pwm.set_output_enabled(Inverter::Geiger, true);
    }

    fn channel_mut(&mut self, inverter: Inverter) -> &mut InverterChannel {
        match inverter {
            Inverter::Eye => &mut self.eye,
            Inverter::Geiger => &mut self.geiger,
        }
    }

    pub fn channel(&self, inverter: Inverter) -> &InverterChannel {
        match inverter {
            Inverter::Eye => &self.eye,
            Inverter::Geiger => &self.geiger,
        }
    }

    /// Run one control step on all enabled inverters.
    pub fn tick(&mut self, adc: &Oversampler, pwm: &mut impl InverterPwm) {
        for inverter in [Inverter::Eye, Inverter::Geiger] {
            let chan = self.channel_mut(inverter);
            if let Some(readout) = adc.get_result(inverter.adc_channel()) {
                chan.readout = readout;
                if chan.enabled {
                    let duty = chan.regulate(readout);
                    pwm.set_duty(inverter, duty);
                }
            }
        }

        Debug::EyeAdc.log_i16(self.eye.readout);
        Debug::EyePwm.log_u16(self.eye.duty);
        Debug::GeigerAdc.log_i16(self.geiger.readout);
        Debug::GeigerPwm.log_u16(self.geiger.duty);
    }

    pub fn set_eye_enabled(&mut self, pwm: &mut impl InverterPwm, enabled: bool) {
        if enabled && !self.eye.enabled {
            self.eye.pid.clear();
        }
        self.eye.enabled = enabled;
        pwm.set_output_enabled(Inverter::Eye, enabled);
    }

    /// Select the eye brightness level. Levels above [MAX_BRIGHTNESS] are clamped.
    pub fn set_brightness(&mut self, level: u8) {
        let level = level.min(MAX_BRIGHTNESS);
        self.brightness = level;
        self.eye.target = EYE_BRIGHTNESS_TABLE[level as usize];
        self.eye.pid.clear();
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Drive all inverter gates to their idle level.
    /// Does not touch any regulator state.
    pub fn set_pwm_outputs_to_safe_state<P: InverterPwm>() {
        P::force_safe_state();
    }
}

impl Default for InverterRegulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering::SeqCst};

    pub static SAFE_STATE_CALLS: AtomicU32 = AtomicU32::new(0);

    #[derive(Default)]
    pub struct MockPwm {
        pub duty: [u16; 2],
        pub enabled: [bool; 2],
        pub writes: u32,
    }

    impl InverterPwm for MockPwm {
        fn set_duty(&mut self, inverter: Inverter, duty: u16) {
            self.duty[inverter as usize] = duty;
            self.writes += 1;
        }

        fn set_output_enabled(&mut self, inverter: Inverter, enabled: bool) {
            self.enabled[inverter as usize] = enabled;
        }

        fn force_safe_state() {
            SAFE_STATE_CALLS.fetch_add(1, SeqCst);
        }
    }

    fn adc_with(eye: u16, geiger: u16) -> Oversampler {
        let mut adc = Oversampler::new();
        for _ in 0..crate::analog::ADC_OVERSAMPLING {
            adc.push(eye);
        }
        for _ in 0..crate::analog::ADC_OVERSAMPLING {
            adc.push(geiger);
        }
        adc
    }

    #[test]
    fn test_targets() {
        assert_eq!(GEIGER_DESIRED_ADC_READOUT, 397);
        assert_eq!(EYE_BRIGHTNESS_TABLE[5], 882);
        assert_eq!(EYE_BRIGHTNESS_TABLE[0], 529);
        for i in 1..EYE_BRIGHTNESS_TABLE.len() {
            assert!(EYE_BRIGHTNESS_TABLE[i] > EYE_BRIGHTNESS_TABLE[i - 1]);
        }
    }

    #[test]
    fn test_init() {
        let mut pwm = MockPwm::default();
        let mut reg = InverterRegulator::new();
        reg.init(&mut pwm);
        assert!(!pwm.enabled[Inverter::Eye as usize]);
        assert!(pwm.enabled[Inverter::Geiger as usize]);
        assert_eq!(pwm.duty[Inverter::Geiger as usize], GEIGER_CONFIG.mid_duty());
        assert!(!reg.channel(Inverter::Eye).is_enabled());
        assert!(reg.channel(Inverter::Geiger).is_enabled());
    }

    #[test]
    fn test_no_readout_keeps_duty() {
        let mut pwm = MockPwm::default();
        let mut reg = InverterRegulator::new();
        reg.init(&mut pwm);
        let writes = pwm.writes;
        reg.tick(&Oversampler::new(), &mut pwm);
        assert_eq!(pwm.writes, writes);
        assert_eq!(reg.channel(Inverter::Geiger).duty(), GEIGER_CONFIG.mid_duty());
    }

    #[test]
    fn test_geiger_regulation_direction() {
        let mut pwm = MockPwm::default();
        let mut reg = InverterRegulator::new();
        reg.init(&mut pwm);

        // Voltage too low: duty goes up until the limit.
        let adc = adc_with(0, 100);
        for _ in 0..500 {
            reg.tick(&adc, &mut pwm);
            let duty = pwm.duty[Inverter::Geiger as usize];
            assert!((GEIGER_CONFIG.min_duty..=GEIGER_CONFIG.max_duty).contains(&duty));
        }
        assert_eq!(reg.channel(Inverter::Geiger).duty(), GEIGER_CONFIG.max_duty);
        assert_eq!(reg.channel(Inverter::Geiger).readout(), 100);

        // Voltage too high: duty goes down until the limit.
        let adc = adc_with(0, ADC_MAX);
        for _ in 0..2000 {
            reg.tick(&adc, &mut pwm);
        }
        assert_eq!(reg.channel(Inverter::Geiger).duty(), GEIGER_CONFIG.min_duty);
    }

    #[test]
    fn test_eye_inverted_and_gated() {
        let mut pwm = MockPwm::default();
        let mut reg = InverterRegulator::new();
        reg.init(&mut pwm);

        // Disabled eye is not regulated.
        let adc = adc_with(0, 397);
        reg.tick(&adc, &mut pwm);
        assert_eq!(reg.channel(Inverter::Eye).duty(), EYE_CONFIG.mid_duty());
        assert_eq!(reg.channel(Inverter::Eye).readout(), 0);

        reg.set_eye_enabled(&mut pwm, true);
        assert!(pwm.enabled[Inverter::Eye as usize]);
        for _ in 0..500 {
            reg.tick(&adc, &mut pwm);
            let duty = pwm.duty[Inverter::Eye as usize];
            assert!((EYE_CONFIG.min_duty..=EYE_CONFIG.max_duty).contains(&duty));
        }
        // Inverted gate: more drive means lower duty.
        assert_eq!(reg.channel(Inverter::Eye).duty(), EYE_CONFIG.min_duty);

        reg.set_eye_enabled(&mut pwm, false);
        assert!(!pwm.enabled[Inverter::Eye as usize]);
        assert!(!reg.channel(Inverter::Eye).is_enabled());
    }

    #[test]
    fn test_reenable_clears_pid() {
        let mut pwm = MockPwm::default();
        let mut reg = InverterRegulator::new();
        reg.init(&mut pwm);
        reg.set_eye_enabled(&mut pwm, true);
        let adc = adc_with(0, 397);
        for _ in 0..100 {
            reg.tick(&adc, &mut pwm);
        }
        assert_ne!(reg.eye.pid.integral_sum(), 0);
        reg.set_eye_enabled(&mut pwm, false);
        reg.set_eye_enabled(&mut pwm, true);
        assert_eq!(reg.eye.pid.integral_sum(), 0);
    }

    #[test]
    fn test_brightness() {
        let mut pwm = MockPwm::default();
        let mut reg = InverterRegulator::new();
        reg.init(&mut pwm);
        reg.set_eye_enabled(&mut pwm, true);
        assert_eq!(reg.brightness(), MAX_BRIGHTNESS);
        assert_eq!(reg.channel(Inverter::Eye).target(), 882);

        let adc = adc_with(0, 397);
        for _ in 0..10 {
            reg.tick(&adc, &mut pwm);
        }
        reg.set_brightness(0);
        assert_eq!(reg.brightness(), 0);
        assert_eq!(reg.channel(Inverter::Eye).target(), 529);
        assert_eq!(reg.eye.pid.integral_sum(), 0);

        reg.set_brightness(200);
        assert_eq!(reg.brightness(), MAX_BRIGHTNESS);
        assert_eq!(reg.channel(Inverter::Eye).target(), 882);
    }

    #[test]
    fn test_safe_state() {
        let before = SAFE_STATE_CALLS.load(SeqCst);
        InverterRegulator::set_pwm_outputs_to_safe_state::<MockPwm>();
        assert!(SAFE_STATE_CALLS.load(SeqCst) > before);
    }
}

// vim: ts=4 sw=4 expandtab
