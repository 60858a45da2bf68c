//! Getters (0x21..0x2C). Replies carry data, not a status byte.
use super::channel::Channel;
use super::clock::Clock;
use super::commands::CommandId;
use super::errors::Result;
use super::framer::{le, Request};
use super::types::{Euler, PowerInfo, Vector3};
use super::LowerLink;
use crate::validation::{port_index, PortKind};

impl<C: Channel, K: Clock> LowerLink<C, K> {
    /// Fetch the fixed-length reply of a getter.
    fn query(&mut self, req: Request) -> Result<Vec<u8>> {
        let len = req.command().reply_len().unwrap_or(1);
        self.exchange(req, len)
    }

    /// `true` while the button is held.
    pub fn button_state(&mut self, num: u8) -> Result<bool> {
        let req = Request::new(CommandId::GetButtonState).u8(port_index(PortKind::Button, num)?);
        Ok(self.query(req)?[0] != 0)
    }

    /// Both buttons at once, button 1 first. The firmware reads button 1
    /// as "any flag bit set" and button 2 as "any bit from bit 1 up".
    pub fn buttons_state(&mut self) -> Result<[bool; 2]> {
        let b = self.query(Request::new(CommandId::GetButtonsState))?;
        let flags = le::u16_at(&b, 0);
        Ok([flags != 0, flags >> 1 != 0])
    }

    pub fn encoder_counter(&mut self, num: u8) -> Result<i32> {
        let req =
            Request::new(CommandId::GetEncoderCounter).u8(port_index(PortKind::Encoder, num)?);
        Ok(le::i32_at(&self.query(req)?, 0))
    }

    pub fn all_encoder_counters(&mut self) -> Result<[i32; 4]> {
        let b = self.query(Request::new(CommandId::GetAllEncoderCounter))?;
        Ok([0, 4, 8, 12].map(|at| le::i32_at(&b, at)))
    }

    /// Encoder position in output-shaft degrees.
    pub fn encoder_degrees(&mut self, num: u8) -> Result<i32> {
        let req =
            Request::new(CommandId::GetEncoderDegrees).u8(port_index(PortKind::Encoder, num)?);
        Ok(le::i32_at(&self.query(req)?, 0))
    }

    /// Roll, pitch and yaw in degrees.
    pub fn imu_euler(&mut self) -> Result<Euler> {
        let b = self.query(Request::new(CommandId::GetImuEuler))?;
        Ok(Vector3::from_i16_le(&b, 100.0).into())
    }

    /// Angular rate in degrees per second.
    pub fn imu_gyro(&mut self) -> Result<Vector3> {
        let b = self.query(Request::new(CommandId::GetImuGyro))?;
        Ok(Vector3::from_i16_le(&b, 100.0))
    }

    /// Acceleration in g.
    pub fn imu_acc(&mut self) -> Result<Vector3> {
        let b = self.query(Request::new(CommandId::GetImuAcc))?;
        Ok(Vector3::from_i16_le(&b, 1000.0))
    }

    /// Uncalibrated accelerometer reading as the IMU reports it.
    pub fn imu_raw_acc(&mut self) -> Result<[f32; 3]> {
        let b = self.query(Request::new(CommandId::GetImuRawAcc))?;
        Ok([1, 5, 9].map(|at| le::f32_at(&b, at)))
    }

    pub fn power_info(&mut self) -> Result<PowerInfo> {
        let b = self.query(Request::new(CommandId::GetPowerInfo))?;
        Ok(PowerInfo {
            volts: le::u16_at(&b, 0) as f32 / 1000.0,
            percent: b[2] as f32,
        })
    }

    /// `true` once a `set_motor_rotate` on this motor has finished.
    pub fn rotate_done(&mut self, num: u8) -> Result<bool> {
        let req = Request::new(CommandId::GetRotateState).u8(port_index(PortKind::Motor, num)?);
        Ok(self.query(req)?[0] != 0)
    }

    /// Measured speed of all four motors.
    pub fn all_motor_speeds(&mut self) -> Result<[i32; 4]> {
        let b = self.query(Request::new(CommandId::GetAllMotorSpeed))?;
        Ok([1, 5, 9, 13].map(|at| le::i32_at(&b, at)))
    }
}
