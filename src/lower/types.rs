//! Typed request parameters and decoded replies.

use serde::Serialize;

/// Rotation direction as the lower MCU encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum Dir {
    Reverse = 0,
    #[default]
    Forward = 1,
}

impl Dir {
    /// `true` means reversed.
    pub fn from_reversed(reversed: bool) -> Self {
        if reversed {
            Dir::Reverse
        } else {
            Dir::Forward
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ImuEchoMode {
    Passive = 0,
    Timing = 1,
    Active = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum AccFsr {
    G2 = 0,
    G4 = 1,
    G8 = 2,
    G16 = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum GyroFsr {
    Dps250 = 0,
    Dps500 = 1,
    Dps1000 = 2,
    Dps2000 = 3,
}

/// IMU output data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum Odr {
    Sps10 = 0,
    Sps20 = 1,
    Sps25 = 2,
    Sps50 = 3,
    Sps100 = 4,
    Sps125 = 5,
    Sps250 = 6,
    Sps500 = 7,
    Sps1000 = 8,
    Sps2000 = 9,
    Sps4000 = 10,
    Sps8000 = 11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ImuFifo {
    Enable = 0,
    Disable = 1,
}

/// Chassis kinematics for `set_move_distance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum MoveType {
    Differential = 0,
    Omni = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum MoveAction {
    Stop = 0,
    Forward = 1,
    Backward = 2,
    Left = 3,
    Right = 4,
}

/// Button transition reported by a push frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ButtonState {
    NoKey = 0,
    FallingEdge = 1,
    Repeat = 2,
    Pressed = 3,
    RisingEdge = 4,
}

impl TryFrom<u8> for ButtonState {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, u8> {
        Ok(match v {
            0 => ButtonState::NoKey,
            1 => ButtonState::FallingEdge,
            2 => ButtonState::Repeat,
            3 => ButtonState::Pressed,
            4 => ButtonState::RisingEdge,
            other => return Err(other),
        })
    }
}

/// Speed controller slot addressed by `set_pid_param`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum PidSlot {
    FixedSpeed = 0,
    Rotate = 1,
}

/// Direction and magnitude for all four motors in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MotorsParam {
    pub dirs: [Dir; 4],
    pub values: [u16; 4],
}

impl MotorsParam {
    pub(crate) fn dir_bits(&self) -> u8 {
        self.dirs
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, d)| acc | ((*d as u8) << i))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// Three consecutive little-endian i16 values divided by `scale`.
    pub(crate) fn from_i16_le(b: &[u8], scale: f64) -> Self {
        use super::framer::le;
        Self {
            x: le::i16_at(b, 0) as f64 / scale,
            y: le::i16_at(b, 2) as f64 / scale,
            z: le::i16_at(b, 4) as f64 / scale,
        }
    }
}

/// Orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Euler {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl From<Vector3> for Euler {
    fn from(v: Vector3) -> Self {
        Self {
            roll: v.x,
            pitch: v.y,
            yaw: v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PowerInfo {
    pub volts: f32,
    pub percent: f32,
}

/// Voltage thresholds for the battery monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerParam {
    pub full_volts: f32,
    pub cutoff_volts: f32,
    pub alarm_volts: f32,
}

impl PowerParam {
    /// Standard Li-ion thresholds for a 2..=6 cell pack.
    pub fn for_cells(cells: u8) -> Option<Self> {
        let (full, cutoff, alarm) = match cells {
            2 => (8.4, 6.8, 7.4),
            3 => (12.6, 10.2, 11.1),
            4 => (16.8, 13.6, 14.8),
            5 => (21.0, 17.0, 18.5),
            6 => (25.2, 20.4, 22.2),
            _ => return None,
        };
        Some(Self {
            full_volts: full,
            cutoff_volts: cutoff,
            alarm_volts: alarm,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllInfo {
    pub fw_version: String,
    pub fw_build_day: String,
    pub model_index: u8,
}

/// Six-axis IMU calibration offsets and scales.
pub type ImuCalibration = [f32; 6];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_bits_pack_motor_order() {
        let p = MotorsParam {
            dirs: [Dir::Forward, Dir::Reverse, Dir::Forward, Dir::Forward],
            values: [0; 4],
        };
        assert_eq!(p.dir_bits(), 0b1101);
    }

    #[test]
    fn euler_scaling() {
        let v = Vector3::from_i16_le(&[0xE8, 0x03, 0x00, 0x00, 0x38, 0xFF], 100.0);
        let e = Euler::from(v);
        assert_eq!(e.roll, 10.0);
        assert_eq!(e.pitch, 0.0);
        assert_eq!(e.yaw, -2.0);
    }

    #[test]
    fn cell_presets() {
        let p = PowerParam::for_cells(3).unwrap();
        assert_eq!(p.full_volts, 12.6);
        assert_eq!(p.cutoff_volts, 10.2);
        assert!(PowerParam::for_cells(1).is_none());
        assert!(PowerParam::for_cells(7).is_none());
    }

    #[test]
    fn button_states() {
        assert_eq!(ButtonState::try_from(4), Ok(ButtonState::RisingEdge));
        assert_eq!(ButtonState::try_from(5), Err(5));
    }
}
