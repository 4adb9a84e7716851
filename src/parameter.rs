//! This module defines the controller parameters and their raw commands.
//!
//! Each parameter names the command code used to write it and/or read it,
//! plus an optional fixed-point scaling divisor. Engineering units are
//! `raw / scaling`; raw values are `round(engineering * scaling)`.

use strum_macros::EnumIter;

/// Model identification value reported by a TC-48-20. The rest of the
/// command table is only valid on controllers reporting this code.
pub const MODEL_CODE: i16 = 9613;

/// Named controller parameters.
///
/// Every variant carries at least one of a write or read command; a
/// parameter with neither cannot be expressed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
pub enum Parameter {
    /// __R__ - Model identification code. See [`MODEL_CODE`].
    ModelCode,
    /// __R__ - Alarm/status bit field. See [`StatusFlags`](crate::status::StatusFlags).
    StatusAlarm,
    /// __R__ - Control sensor temperature. Stored in 0.1 degrees.
    ControlTemperature,
    /// __R__ - Secondary sensor temperature. Stored in 0.1 degrees.
    ///
    /// Only meaningful while the status word reports the secondary sensor
    /// as connected.
    AuxTemperature,
    /// __R/W__ - Temperature set point. Stored in 0.1 degrees.
    Setpoint,
    /// __R/W__ - Control loop proportional bandwidth. Stored in 0.1 degrees.
    ProportionalBandwidth,
    /// __R/W__ - Control loop integral gain. Stored in 0.01 repeats/minute.
    IntegralGain,
    /// __R/W__ - Control loop differential gain. Stored in 0.01 minutes.
    DifferentialGain,
    /// __R/W__ - Output enable. `0` off, `1` on.
    OutputEnable,
    /// __R__ - Output power fraction. Stored as -511..=511 of full drive.
    OutputPower,
}

impl Parameter {
    /// Command code used to write this parameter, if it is writable.
    pub const fn write_command(self) -> Option<u8> {
        match self {
            Parameter::Setpoint => Some(0x1c),
            Parameter::ProportionalBandwidth => Some(0x1d),
            Parameter::IntegralGain => Some(0x1e),
            Parameter::DifferentialGain => Some(0x1f),
            Parameter::OutputEnable => Some(0x30),
            _ => None,
        }
    }

    /// Command code used to read this parameter, if it is readable.
    pub const fn read_command(self) -> Option<u8> {
        match self {
            Parameter::ModelCode => Some(0x00),
            Parameter::StatusAlarm => Some(0x03),
            Parameter::ControlTemperature => Some(0x01),
            Parameter::AuxTemperature => Some(0x04),
            Parameter::Setpoint => Some(0x50),
            Parameter::ProportionalBandwidth => Some(0x51),
            Parameter::IntegralGain => Some(0x52),
            Parameter::DifferentialGain => Some(0x53),
            Parameter::OutputEnable => Some(0x64),
            Parameter::OutputPower => Some(0x02),
        }
    }

    /// Divisor converting raw controller units to engineering units, or
    /// `None` for parameters exchanged as plain integers.
    pub const fn scaling(self) -> Option<f32> {
        match self {
            Parameter::ControlTemperature
            | Parameter::AuxTemperature
            | Parameter::Setpoint
            | Parameter::ProportionalBandwidth => Some(10.0),
            Parameter::IntegralGain | Parameter::DifferentialGain => Some(100.0),
            Parameter::OutputPower => Some(511.0),
            Parameter::ModelCode | Parameter::StatusAlarm | Parameter::OutputEnable => None,
        }
    }
}

/// Used to be less ambiguous about whether the output is on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputState {
    /// Output stage disabled.
    #[default]
    Off,
    /// Output stage enabled.
    On,
}

impl From<OutputState> for bool {
    fn from(value: OutputState) -> Self {
        match value {
            OutputState::Off => false,
            OutputState::On => true,
        }
    }
}

impl From<bool> for OutputState {
    fn from(value: bool) -> Self {
        match value {
            true => OutputState::On,
            false => OutputState::Off,
        }
    }
}
