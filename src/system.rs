// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    analog::{AdcChannel, Oversampler},
    animation::Animation,
    debug::Debug,
    discharge::{DISCHARGE_CONFIG, Detector, DischargeEvent},
    geiger::GeigerCounter,
    inverter::{Inverter, InverterPwm, InverterRegulator},
    lifecycle::{HeaterStage, LIFECYCLE_CONFIG, TubeLifecycle, TubeOutputs, TubeState},
    protocol::{DeviceState, EyeDisplayMode, GeigerState, MAX_REPLY, Request},
    ring::Ring,
    timer::{TICK_HZ, Timestamp},
};
use core::cell::Cell;
use critical_section::{CriticalSection, Mutex};

const EDGE_QUEUE_SIZE: usize = 8;

/// Sense line edges from the edge interrupt to the main loop.
pub struct EdgeQueue {
    ring: Ring<DischargeEvent, EDGE_QUEUE_SIZE>,
    overflows: Mutex<Cell<u16>>,
}

impl EdgeQueue {
    pub const fn new() -> Self {
        Self {
            ring: Ring::new(DischargeEvent::new()),
            overflows: Mutex::new(Cell::new(0)),
        }
    }

    /// Queue an edge. Called from the edge interrupt.
    pub fn push(&self, cs: CriticalSection<'_>, event: DischargeEvent) {
        if !self.ring.push(cs, event) {
            let overflows = self.overflows.borrow(cs);
            overflows.set(overflows.get().saturating_add(1));
            Debug::EdgeOverflow.log_u16(overflows.get());
        }
    }

    pub fn pop(&self) -> Option<DischargeEvent> {
        critical_section::with(|cs| self.ring.pop(cs))
    }

    pub fn overflows(&self) -> u16 {
        critical_section::with(|cs| self.overflows.borrow(cs).get())
    }
}

impl Default for EdgeQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Board hardware that is not owned by a single component.
pub trait Board: InverterPwm {
    fn set_heater(&mut self, stage: HeaterStage, on: bool);

    /// Write the eye control grid value.
    fn set_eye_display_value(&mut self, value: u8);
}

/// Routes the lifecycle outputs to the board and the eye inverter.
struct TubeDrive<'a, B> {
    regulator: &'a mut InverterRegulator,
    board: &'a mut B,
}

impl<B: Board> TubeOutputs for TubeDrive<'_, B> {
    fn set_heater(&mut self, stage: HeaterStage, on: bool) {
        self.board.set_heater(stage, on);
    }

    fn set_eye_inverter_enabled(&mut self, enabled: bool) {
        self.regulator.set_eye_enabled(&mut *self.board, enabled);
    }
}

pub struct System {
    adc: Oversampler,
    regulator: InverterRegulator,
    lifecycle: TubeLifecycle,
    detector: Detector,
    counter: GeigerCounter,
    animation: Animation,
    mode: EyeDisplayMode,
    display_value: u8,
    pulse_seen: bool,
}

impl System {
    pub const fn new() -> Self {
        Self {
            adc: Oversampler::new(),
            regulator: InverterRegulator::new(),
            lifecycle: TubeLifecycle::new(&LIFECYCLE_CONFIG),
            detector: Detector::new(&DISCHARGE_CONFIG),
            counter: GeigerCounter::new(TICK_HZ),
            animation: Animation::new(),
            mode: EyeDisplayMode::Animation,
            display_value: 0,
            pulse_seen: false,
        }
    }

    pub fn init(&mut self, board: &mut impl Board) {
        board.set_heater(HeaterStage::Limited, false);
        board.set_heater(HeaterStage::Full, false);
        board.set_eye_display_value(self.display_value);
        self.regulator.init(board);
    }

    fn drive<'a, B: Board>(&'a mut self, board: &'a mut B) -> (&'a mut TubeLifecycle, TubeDrive<'a, B>) {
        (
            &mut self.lifecycle,
            TubeDrive {
                regulator: &mut self.regulator,
                board,
            },
        )
    }

    /// The channel that the next ADC conversion must be done on.
    pub fn adc_channel(&self) -> AdcChannel {
        self.adc.channel()
    }

    /// Feed one raw ADC conversion of [Self::adc_channel].
    /// Returns true, if the converter must be switched to the next channel.
    pub fn adc_sample(&mut self, raw: u16) -> bool {
        self.adc.push(raw)
    }

    /// Drain the edge queue into the discharge detector.
    pub fn run_edges(&mut self, edges: &EdgeQueue, now: Timestamp) {
        while let Some(event) = edges.pop() {
            self.detector.run(event.stamp);
            if self.detector.on_edge(event) {
                self.counter.on_pulse();
                self.pulse_seen = true;
            }
        }
        self.detector.run(now);
    }

    /// The periodic control step.
    pub fn tick(&mut self, board: &mut impl Board) {
        self.regulator.tick(&self.adc, board);

        let (lifecycle, mut drive) = self.drive(board);
        lifecycle.tick(&mut drive);

        let pulse = core::mem::replace(&mut self.pulse_seen, false);
        let value = match self.mode {
            EyeDisplayMode::Animation => self.animation.tick(pulse),
            EyeDisplayMode::FixedValue => self.display_value,
        };
        board.set_eye_display_value(value);

        self.counter.tick();
    }

    /// Execute a request frame.
    /// The reply is written to `reply` and its length is returned.
    /// Frames that can't be decoded are ignored.
    pub fn handle_command(
        &mut self,
        board: &mut impl Board,
        frame: &[u8],
        reply: &mut [u8; MAX_REPLY],
    ) -> usize {
        let Ok(request) = Request::decode(frame) else {
            return 0;
        };
        match request {
            Request::GetDeviceState => {
                let state = self.device_state().to_bytes();
                reply[..state.len()].copy_from_slice(&state);
                state.len()
            }
            Request::GetGeigerState => {
                let state = self.geiger_state().to_bytes();
                reply[..state.len()].copy_from_slice(&state);
                state.len()
            }
            Request::SetGeigerConfiguration(conf) => {
                self.counter.configure(conf.cycle_length);
                0
            }
            Request::CleanGeigerState => {
                self.counter.clean();
                0
            }
            Request::SetEyeConfiguration(conf) => {
                let (lifecycle, mut drive) = self.drive(board);
                lifecycle.set_enabled(&mut drive, conf.enabled);
                self.mode = conf.mode;
                0
            }
            Request::SetEyeDisplayValue(value) => {
                self.display_value = value;
                0
            }
            Request::SetBrightness(level) => {
                self.regulator.set_brightness(level);
                0
            }
            #[cfg(feature = "debug")]
            Request::GetDebugValue(id) => {
                let value = crate::debug::debug_value(id).unwrap_or(0xFFFF).to_le_bytes();
                reply[..value.len()].copy_from_slice(&value);
                value.len()
            }
        }
    }

    pub fn device_state(&self) -> DeviceState {
        let eye = self.regulator.channel(Inverter::Eye);
        let geiger = self.regulator.channel(Inverter::Geiger);
        DeviceState {
            geiger_voltage: geiger.readout().max(0) as u16,
            geiger_pwm: geiger.duty() as u8,
            eye_state: self.lifecycle.state(),
            eye_mode: self.mode,
            eye_voltage: eye.readout().max(0) as u16,
            eye_pwm: eye.duty() as u8,
        }
    }

    /// Consumes the new-cycle flag.
    pub fn geiger_state(&mut self) -> GeigerState {
        let s = self.counter.get_snapshot();
        GeigerState {
            has_new_cycle_started: s.has_new_cycle_started,
            counts_current: s.counts_current,
            counts_previous: s.counts_previous,
            progress_seconds: s.progress_seconds,
            cycle_length: s.cycle_length,
        }
    }

    pub fn tube_state(&self) -> TubeState {
        self.lifecycle.state()
    }

    /// Drive all inverter gates to their idle level.
    /// Usable from any context, before and without any initialization.
    pub fn set_pwm_outputs_to_safe_state<B: Board>() {
        InverterRegulator::set_pwm_outputs_to_safe_state::<B>();
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        analog::ADC_OVERSAMPLING,
        discharge::Edge,
        inverter::{EYE_CONFIG, GEIGER_CONFIG},
        protocol::Command,
    };

    #[derive(Default)]
    struct MockBoard {
        duty: [u16; 2],
        enabled: [bool; 2],
        heater: [bool; 2],
        display: u8,
    }

    impl InverterPwm for MockBoard {
        fn set_duty(&mut self, inverter: Inverter, duty: u16) {
            self.duty[inverter as usize] = duty;
        }

        fn set_output_enabled(&mut self, inverter: Inverter, enabled: bool) {
            self.enabled[inverter as usize] = enabled;
        }

        fn force_safe_state() {}
    }

    impl Board for MockBoard {
        fn set_heater(&mut self, stage: HeaterStage, on: bool) {
            self.heater[stage as usize] = on;
        }

        fn set_eye_display_value(&mut self, value: u8) {
            self.display = value;
        }
    }

    fn setup() -> (System, MockBoard) {
        let mut sys = System::new();
        let mut board = MockBoard::default();
        sys.init(&mut board);
        (sys, board)
    }

    fn feed_adc(sys: &mut System, eye: u16, geiger: u16) {
        for _ in 0..AdcChannel::COUNT {
            let raw = match sys.adc_channel() {
                AdcChannel::Eye => eye,
                AdcChannel::Geiger => geiger,
            };
            for _ in 0..ADC_OVERSAMPLING {
                sys.adc_sample(raw);
            }
        }
    }

    fn command(sys: &mut System, board: &mut MockBoard, frame: &[u8]) -> ([u8; MAX_REPLY], usize) {
        let mut reply = [0; MAX_REPLY];
        let len = sys.handle_command(board, frame, &mut reply);
        (reply, len)
    }

    fn discharge(edges: &EdgeQueue, start: u32, width: u32) {
        critical_section::with(|cs| {
            edges.push(cs, DischargeEvent {
                edge: Edge::Rising,
                stamp: Timestamp::from_micros(start),
            });
            edges.push(cs, DischargeEvent {
                edge: Edge::Falling,
                stamp: Timestamp::from_micros(start + width),
            });
        });
    }

    #[test]
    fn test_init() {
        let (sys, board) = setup();
        assert_eq!(sys.tube_state(), TubeState::Disabled);
        assert_eq!(board.enabled, [false, true]);
        assert_eq!(board.heater, [false, false]);
        assert_eq!(board.duty[Inverter::Geiger as usize], GEIGER_CONFIG.mid_duty());
    }

    #[test]
    fn test_pulses_to_cycle_snapshot() {
        let (mut sys, mut board) = setup();
        let edges = EdgeQueue::new();

        command(&mut sys, &mut board, &[Command::SetGeigerConfiguration as u8, 1, 0]);
        for i in 0..5 {
            discharge(&edges, 1000 + i * 1000, 100);
            sys.run_edges(&edges, Timestamp::from_micros(1500 + i * 1000));
        }
        // Noise
        discharge(&edges, 9000, 20);
        sys.run_edges(&edges, Timestamp::from_micros(9500));
        assert_eq!(edges.overflows(), 0);

        for _ in 0..TICK_HZ {
            sys.tick(&mut board);
        }

        let (reply, len) = command(&mut sys, &mut board, &[Command::GetGeigerState as u8]);
        assert_eq!(len, GeigerState::SIZE);
        assert_eq!(reply, [1, 0, 0, 5, 0, 0, 0, 1, 0]);

        let (reply, _) = command(&mut sys, &mut board, &[Command::GetGeigerState as u8]);
        assert_eq!(reply, [0, 0, 0, 5, 0, 0, 0, 1, 0]);

        command(&mut sys, &mut board, &[Command::CleanGeigerState as u8]);
        let (reply, _) = command(&mut sys, &mut board, &[Command::GetGeigerState as u8]);
        assert_eq!(reply, [0, 0, 0, 0, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_eye_power_up() {
        let (mut sys, mut board) = setup();
        feed_adc(&mut sys, 500, 397);

        command(&mut sys, &mut board, &[Command::SetEyeConfiguration as u8, 1, 0]);
        assert_eq!(sys.tube_state(), TubeState::HeatingLimited);
        assert_eq!(board.heater, [true, false]);
        assert!(!board.enabled[Inverter::Eye as usize]);

        for _ in 0..(8 + 5) * TICK_HZ {
            sys.tick(&mut board);
            let eye_duty = board.duty[Inverter::Eye as usize];
            assert!(eye_duty == 0 || (EYE_CONFIG.min_duty..=EYE_CONFIG.max_duty).contains(&eye_duty));
        }
        assert_eq!(sys.tube_state(), TubeState::Running);
        assert_eq!(board.heater, [true, true]);
        assert!(board.enabled[Inverter::Eye as usize]);

        sys.tick(&mut board);
        let (reply, len) = command(&mut sys, &mut board, &[Command::GetDeviceState as u8]);
        assert_eq!(len, DeviceState::SIZE);
        let state = sys.device_state();
        assert_eq!(&reply[..len], &state.to_bytes());
        assert_eq!(state.eye_state, TubeState::Running);
        assert_eq!(state.geiger_voltage, 397);
        assert_eq!(state.eye_voltage, 500);

        command(&mut sys, &mut board, &[Command::SetEyeConfiguration as u8, 0, 0]);
        assert_eq!(sys.tube_state(), TubeState::Disabled);
        assert_eq!(board.heater, [false, false]);
        assert!(!board.enabled[Inverter::Eye as usize]);
    }

    #[test]
    fn test_display_modes() {
        let (mut sys, mut board) = setup();
        sys.tick(&mut board);
        assert_eq!(board.display, 70);

        command(&mut sys, &mut board, &[Command::SetEyeDisplayValue as u8, 123]);
        sys.tick(&mut board);
        assert_ne!(board.display, 123);

        command(&mut sys, &mut board, &[Command::SetEyeConfiguration as u8, 0, 1]);
        sys.tick(&mut board);
        assert_eq!(board.display, 123);

        command(&mut sys, &mut board, &[Command::SetEyeConfiguration as u8, 0, 0]);
        command(&mut sys, &mut board, &[Command::SetEyeConfiguration as u8, 0, 1]);
        sys.tick(&mut board);
        assert_eq!(board.display, 123);
    }

    #[test]
    fn test_brightness_command() {
        let (mut sys, mut board) = setup();
        command(&mut sys, &mut board, &[Command::SetBrightness as u8, 2]);
        assert_eq!(sys.regulator.brightness(), 2);
        command(&mut sys, &mut board, &[Command::SetBrightness as u8, 77]);
        assert_eq!(sys.regulator.brightness(), 5);
    }

    #[test]
    fn test_bad_frames() {
        let (mut sys, mut board) = setup();
        assert_eq!(command(&mut sys, &mut board, &[]).1, 0);
        assert_eq!(command(&mut sys, &mut board, &[0xEE, 1, 2]).1, 0);
        assert_eq!(command(&mut sys, &mut board, &[Command::SetBrightness as u8]).1, 0);
        assert_eq!(sys.regulator.brightness(), 5);
    }

    #[cfg(feature = "debug")]
    #[test]
    fn test_debug_value_command() {
        let (mut sys, mut board) = setup();
        let (reply, len) = command(&mut sys, &mut board, &[Command::GetDebugValue as u8, 0xFF]);
        assert_eq!(len, 2);
        assert_eq!(reply[..2], [0xFF, 0xFF]);
        let (_, len) = command(&mut sys, &mut board, &[Command::GetDebugValue as u8, Debug::TubeState as u8]);
        assert_eq!(len, 2);
    }

    #[test]
    fn test_edge_queue_overflow() {
        let edges = EdgeQueue::new();
        critical_section::with(|cs| {
            for i in 0..(EDGE_QUEUE_SIZE as u32 + 3) {
                edges.push(cs, DischargeEvent {
                    edge: Edge::Rising,
                    stamp: Timestamp::from_micros(i),
                });
            }
        });
        assert_eq!(edges.overflows(), 3);
        // The oldest edges are kept.
        let mut n = 0;
        while let Some(event) = edges.pop() {
            assert_eq!(event.stamp, Timestamp::from_micros(n));
            n += 1;
        }
        assert_eq!(n, EDGE_QUEUE_SIZE as u32);
    }
}

// vim: ts=4 sw=4 expandtab
