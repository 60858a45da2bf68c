//! DC motor port with its encoder.
use crate::lower::{Channel, Clock, Dir, LowerLink, PidSlot, Result};
use crate::validation::PortKind;

use super::checked;

/// Speed range every motor is given on begin.
const SPEED_RANGE: (u16, u16) = (0, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcMotor {
    num: u8,
}

impl DcMotor {
    /// Motor on port `num` (1..=4).
    pub fn new(num: u8) -> Result<Self> {
        Ok(Self {
            num: checked(PortKind::Motor, num)?,
        })
    }

    pub(crate) fn all() -> impl Iterator<Item = DcMotor> {
        (1..=PortKind::Motor.count()).map(|num| DcMotor { num })
    }

    pub fn num(&self) -> u8 {
        self.num
    }

    /// Speed range 0..100, encoder zeroed, power off. All three requests are
    /// sent even if an earlier one fails; the first failure is returned.
    pub fn begin<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<()> {
        let range = link.set_motor_speed_range(self.num, SPEED_RANGE.0, SPEED_RANGE.1);
        let reset = link.reset_encoder(self.num);
        let power = link.set_motor_power(self.num, 0);
        range.and(reset).and(power)
    }

    /// Flip the motor's output direction. The encoder direction is left alone.
    pub fn set_reverse<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        reversed: bool,
    ) -> Result<()> {
        link.set_motor_dir(self.num, Dir::from_reversed(reversed))
    }

    /// Unregulated PWM, -100..=100.
    pub fn set_power<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        power: i16,
    ) -> Result<()> {
        link.set_motor_power(self.num, power)
    }

    /// Encoder-regulated speed, -100..=100.
    pub fn set_speed<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        speed: i16,
    ) -> Result<()> {
        link.set_motor_speed(self.num, speed)
    }

    pub fn rotate_for<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        power: i16,
        degree: u16,
    ) -> Result<()> {
        link.set_motor_rotate(self.num, power, degree)
    }

    pub fn set_fixed_speed_pid<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        kp: f32,
        ki: f32,
        kd: f32,
    ) -> Result<()> {
        link.set_pid_param(self.num, PidSlot::FixedSpeed, kp, ki, kd)
    }

    pub fn set_rotate_pid<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        kp: f32,
        ki: f32,
        kd: f32,
    ) -> Result<()> {
        link.set_pid_param(self.num, PidSlot::Rotate, kp, ki, kd)
    }

    pub fn counter<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<i32> {
        link.encoder_counter(self.num)
    }

    pub fn reset_counter<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<()> {
        link.reset_encoder(self.num)
    }
}
