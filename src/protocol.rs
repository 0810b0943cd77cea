// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command payloads exchanged with the bus master.
//!
//! The first byte of each request frame is the [Command].
//! All multi byte fields are little endian and packed.
//! Framing and checksums belong to the bus transport.

use crate::lifecycle::TubeState;

/// Largest request frame, command byte included.
pub const MAX_REQUEST: usize = 3;

/// Largest reply payload.
pub const MAX_REPLY: usize = GeigerState::SIZE;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProtocolError {
    UnknownCommand(u8),
    ShortFrame,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Command {
    GetDeviceState = 1,
    GetGeigerState = 2,
    SetGeigerConfiguration = 3,
    CleanGeigerState = 4,
    SetEyeConfiguration = 5,
    SetEyeDisplayValue = 6,
    SetBrightness = 7,
    #[cfg(feature = "debug")]
    GetDebugValue = 8,
}

impl Command {
    /// Frame length including the command byte.
    pub const fn frame_len(&self) -> usize {
        match self {
            Self::GetDeviceState | Self::GetGeigerState | Self::CleanGeigerState => 1,
            Self::SetEyeDisplayValue | Self::SetBrightness => 2,
            #[cfg(feature = "debug")]
            Self::GetDebugValue => 2,
            Self::SetGeigerConfiguration | Self::SetEyeConfiguration => 3,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::GetDeviceState,
            2 => Self::GetGeigerState,
            3 => Self::SetGeigerConfiguration,
            4 => Self::CleanGeigerState,
            5 => Self::SetEyeConfiguration,
            6 => Self::SetEyeDisplayValue,
            7 => Self::SetBrightness,
            #[cfg(feature = "debug")]
            8 => Self::GetDebugValue,
            v => return Err(ProtocolError::UnknownCommand(v)),
        })
    }
}

/// Source of the eye display value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum EyeDisplayMode {
    Animation = 0,
    FixedValue = 1,
}

impl From<u8> for EyeDisplayMode {
    /// Everything except 0 selects the fixed value.
    fn from(value: u8) -> Self {
        if value == Self::Animation as u8 {
            Self::Animation
        } else {
            Self::FixedValue
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeviceState {
    pub geiger_voltage: u16,
    pub geiger_pwm: u8,
    pub eye_state: TubeState,
    pub eye_mode: EyeDisplayMode,
    pub eye_voltage: u16,
    pub eye_pwm: u8,
}

impl DeviceState {
    pub const SIZE: usize = 8;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let gv = self.geiger_voltage.to_le_bytes();
        let ev = self.eye_voltage.to_le_bytes();
        [
            gv[0],
            gv[1],
            self.geiger_pwm,
            self.eye_state as u8,
            self.eye_mode as u8,
            ev[0],
            ev[1],
            self.eye_pwm,
        ]
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GeigerState {
    pub has_new_cycle_started: bool,
    pub counts_current: u16,
    pub counts_previous: u16,
    pub progress_seconds: u16,
    pub cycle_length: u16,
}

impl GeigerState {
    pub const SIZE: usize = 9;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let cur = self.counts_current.to_le_bytes();
        let prev = self.counts_previous.to_le_bytes();
        let prog = self.progress_seconds.to_le_bytes();
        let len = self.cycle_length.to_le_bytes();
        [
            self.has_new_cycle_started as u8,
            cur[0],
            cur[1],
            prev[0],
            prev[1],
            prog[0],
            prog[1],
            len[0],
            len[1],
        ]
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GeigerConfiguration {
    pub cycle_length: u16,
}

impl GeigerConfiguration {
    pub const SIZE: usize = 2;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        match data {
            [lo, hi, ..] => Ok(Self {
                cycle_length: u16::from_le_bytes([*lo, *hi]),
            }),
            _ => Err(ProtocolError::ShortFrame),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EyeConfiguration {
    pub enabled: bool,
    pub mode: EyeDisplayMode,
}

impl EyeConfiguration {
    pub const SIZE: usize = 2;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        match data {
            [enabled, mode, ..] => Ok(Self {
                enabled: *enabled != 0,
                mode: (*mode).into(),
            }),
            _ => Err(ProtocolError::ShortFrame),
        }
    }
}

/// A decoded request frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Request {
    GetDeviceState,
    GetGeigerState,
    SetGeigerConfiguration(GeigerConfiguration),
    CleanGeigerState,
    SetEyeConfiguration(EyeConfiguration),
    SetEyeDisplayValue(u8),
    SetBrightness(u8),
    #[cfg(feature = "debug")]
    GetDebugValue(u8),
}

impl Request {
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&cmd, payload) = frame.split_first().ok_or(ProtocolError::ShortFrame)?;
        let cmd = Command::try_from(cmd)?;
        if frame.len() < cmd.frame_len() {
            return Err(ProtocolError::ShortFrame);
        }
        let byte = || payload.first().copied().ok_or(ProtocolError::ShortFrame);
        Ok(match cmd {
            Command::GetDeviceState => Self::GetDeviceState,
            Command::GetGeigerState => Self::GetGeigerState,
            Command::SetGeigerConfiguration => {
                Self::SetGeigerConfiguration(GeigerConfiguration::from_bytes(payload)?)
            }
            Command::CleanGeigerState => Self::CleanGeigerState,
            Command::SetEyeConfiguration => {
                Self::SetEyeConfiguration(EyeConfiguration::from_bytes(payload)?)
            }
            Command::SetEyeDisplayValue => Self::SetEyeDisplayValue(byte()?),
            Command::SetBrightness => Self::SetBrightness(byte()?),
            #[cfg(feature = "debug")]
            Command::GetDebugValue => Self::GetDebugValue(byte()?),
        })
    }
}


// vim: ts=4 sw=4 expandtab
