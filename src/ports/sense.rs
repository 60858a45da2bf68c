//! Buttons, battery monitor and the on-board IMU.
use crate::lower::{Channel, Clock, Euler, LinkError, LowerLink, PowerParam, Result, Vector3};
use crate::validation::PortKind;

use super::checked;

/// Front-panel button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    num: u8,
}

impl Button {
    /// Button 1 is "down", button 2 is "up" on the board silkscreen.
    pub fn new(num: u8) -> Result<Self> {
        Ok(Self {
            num: checked(PortKind::Button, num)?,
        })
    }

    pub fn pressed<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<bool> {
        link.button_state(self.num)
    }
}

/// Battery pack monitor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerMonitor;

impl PowerMonitor {
    /// Load the Li-ion thresholds for a `cells`-cell pack (2..=6).
    pub fn set_cells<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        cells: u8,
    ) -> Result<()> {
        let param = PowerParam::for_cells(cells).ok_or(LinkError::InvalidCellCount(cells))?;
        link.set_power_param(param)
    }

    pub fn voltage<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<f32> {
        Ok(link.power_info()?.volts)
    }

    pub fn percentage<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<f32> {
        Ok(link.power_info()?.percent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn of(self, v: Vector3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EulerAxis {
    Roll,
    Pitch,
    Yaw,
}

impl EulerAxis {
    fn of(self, e: Euler) -> f64 {
        match self {
            EulerAxis::Roll => e.roll,
            EulerAxis::Pitch => e.pitch,
            EulerAxis::Yaw => e.yaw,
        }
    }
}

/// On-board six-axis IMU, read on demand.
#[derive(Debug, Clone, Copy, Default)]
pub struct Motion;

impl Motion {
    /// Degrees per second around `axis`.
    pub fn gyro<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        axis: Axis,
    ) -> Result<f64> {
        Ok(axis.of(link.imu_gyro()?))
    }

    /// Acceleration along `axis` in g.
    pub fn accel<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        axis: Axis,
    ) -> Result<f64> {
        Ok(axis.of(link.imu_acc()?))
    }

    pub fn euler<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        axis: EulerAxis,
    ) -> Result<f64> {
        Ok(axis.of(link.imu_euler()?))
    }

    /// Zero the heading and the other IMU outputs.
    pub fn reset<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<()> {
        link.set_imu_to_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::{LinkOptions, MockChannel, StepClock};

    fn link(ch: &MockChannel) -> LowerLink<MockChannel, StepClock> {
        LowerLink::with_clock(ch.clone(), StepClock::default(), LinkOptions::default())
    }

    #[test]
    fn bad_cell_count_never_reaches_the_wire() {
        let ch = MockChannel::new();
        let mut link = link(&ch);
        assert!(matches!(
            PowerMonitor.set_cells(&mut link, 7),
            Err(LinkError::InvalidCellCount(7))
        ));
        assert!(matches!(
            PowerMonitor.set_cells(&mut link, 1),
            Err(LinkError::InvalidCellCount(1))
        ));
        assert!(ch.written().is_empty());
    }

    #[test]
    fn two_cell_pack_thresholds() {
        let ch = MockChannel::new();
        ch.respond_with(|frame| Some(vec![0x7B, 0x84, frame[2], 0x00]));
        let mut link = link(&ch);
        PowerMonitor.set_cells(&mut link, 2).unwrap();
        assert_eq!(ch.written(), vec![0x7B, 0x84, 0x0B, 84, 68, 74]);
    }

    #[test]
    fn yaw_axis_is_third_value() {
        let ch = MockChannel::new();
        ch.inject(&[0x7B, 0x84, 0x25, 0x00, 0x00, 0x00, 0x00, 0x10, 0x27]);
        let mut link = link(&ch);
        assert_eq!(Motion.euler(&mut link, EulerAxis::Yaw).unwrap(), 100.0);
    }
}
