//! Everyday motor, servo and encoder setters (0x11..0x1E, 0x41..0x42).
use super::channel::Channel;
use super::clock::Clock;
use super::commands::CommandId;
use super::errors::{RangeField, Result, StatusMap};
use super::framer::Request;
use super::types::{MotorsParam, MoveAction, MoveType, PidSlot};
use super::LowerLink;
use crate::validation::{port_mask, PortKind};

const PLAIN: StatusMap = &[];
const MOTOR_POWER: StatusMap = &[(0x02, RangeField::MotorPower)];
const MOTOR_SPEED: StatusMap = &[(0x02, RangeField::MotorSpeed)];
const SERVO_ANGLE: StatusMap = &[(0x02, RangeField::ServoAngle)];
const ALL_MOTORS: StatusMap = &[
    (0x02, RangeField::MotorChannelSpeed(1)),
    (0x03, RangeField::MotorChannelSpeed(2)),
    (0x04, RangeField::MotorChannelSpeed(3)),
    (0x05, RangeField::MotorChannelSpeed(4)),
];
const ALL_SERVOS: StatusMap = &[
    (0x02, RangeField::ServoChannelAngle(1)),
    (0x03, RangeField::ServoChannelAngle(2)),
    (0x04, RangeField::ServoChannelAngle(3)),
    (0x05, RangeField::ServoChannelAngle(4)),
];
const MOVE_DISTANCE: StatusMap = &[
    (0x02, RangeField::MoveAction),
    (0x03, RangeField::MoveSpeed),
    (0x04, RangeField::MoveEncoder),
];

impl<C: Channel, K: Clock> LowerLink<C, K> {
    /// Open-loop PWM power, -100..=100 by default range.
    pub fn set_motor_power(&mut self, num: u8, power: i16) -> Result<()> {
        let req = Request::new(CommandId::SetMotorPower)
            .u8(port_mask(PortKind::Motor, num)?)
            .u8(0)
            .i16(power);
        self.status(req, MOTOR_POWER)
    }

    /// Closed-loop speed target.
    pub fn set_motor_speed(&mut self, num: u8, speed: i16) -> Result<()> {
        let req = Request::new(CommandId::SetMotorSpeed)
            .u8(port_mask(PortKind::Motor, num)?)
            .u8(0)
            .i16(speed);
        self.status(req, MOTOR_SPEED)
    }

    /// Turn the motor `degree` degrees at up to `max_speed`.
    pub fn set_motor_rotate(&mut self, num: u8, max_speed: i16, degree: u16) -> Result<()> {
        let req = Request::new(CommandId::SetMotorRotate)
            .u8(port_mask(PortKind::Motor, num)?)
            .i16(max_speed)
            .u16(degree);
        self.status(req, PLAIN)
    }

    pub fn set_all_motor_speed(&mut self, param: &MotorsParam) -> Result<()> {
        self.status(all_motors(CommandId::SetAllMotorSpeed, param), ALL_MOTORS)
    }

    pub fn set_all_motor_power(&mut self, param: &MotorsParam) -> Result<()> {
        self.status(all_motors(CommandId::SetAllMotorPower, param), ALL_MOTORS)
    }

    pub fn set_servo_angle(&mut self, num: u8, angle: u16) -> Result<()> {
        let req = Request::new(CommandId::SetServoAngle)
            .u8(port_mask(PortKind::Servo, num)?)
            .u16(angle);
        self.status(req, SERVO_ANGLE)
    }

    pub fn set_all_servo_angle(&mut self, angles: [u16; 4]) -> Result<()> {
        let req = angles
            .iter()
            .fold(Request::new(CommandId::SetAllServoAngle), |r, a| r.u16(*a));
        self.status(req, ALL_SERVOS)
    }

    /// Chassis-level move: drive `action` at `speed` until the encoders
    /// count `encoder` pulses.
    pub fn set_move_distance(
        &mut self,
        kind: MoveType,
        action: MoveAction,
        speed: u16,
        encoder: u16,
    ) -> Result<()> {
        let req = Request::new(CommandId::SetMoveDistance)
            .u8(kind as u8)
            .u8(action as u8)
            .u16(speed)
            .u16(encoder);
        self.status(req, MOVE_DISTANCE)
    }

    pub fn reset_encoder(&mut self, num: u8) -> Result<()> {
        let req = Request::new(CommandId::ResetEncoder).u8(port_mask(PortKind::Encoder, num)?);
        self.status(req, PLAIN)
    }

    /// Gains travel as hundredths in a u16, so negative or > 655.35 values
    /// saturate.
    pub fn set_pid_param(
        &mut self,
        num: u8,
        slot: PidSlot,
        kp: f32,
        ki: f32,
        kd: f32,
    ) -> Result<()> {
        let req = Request::new(CommandId::SetPidParam)
            .u8(port_mask(PortKind::Motor, num)?)
            .u8(slot as u8)
            .u16(centi(kp))
            .u16(centi(ki))
            .u16(centi(kd));
        self.status(req, PLAIN)
    }

    pub fn brake_motor(&mut self, num: u8) -> Result<()> {
        let req = Request::new(CommandId::BrakeMotor).u8(port_mask(PortKind::Motor, num)?);
        self.status(req, PLAIN)
    }

    pub fn brake_all_motors(&mut self) -> Result<()> {
        self.status(Request::new(CommandId::BrakeAllMotors).u8(1), PLAIN)
    }

    /// Select the brake behaviour (firmware-defined type codes). The firmware
    /// takes no motor selector here: byte 0 is always 1, so `num` is only
    /// range-checked.
    pub fn set_motor_brake_type(&mut self, num: u8, brake_type: u8) -> Result<()> {
        port_mask(PortKind::Motor, num)?;
        let req = Request::new(CommandId::SetMotorBrakeType)
            .u8(1)
            .u8(brake_type);
        self.status(req, PLAIN)
    }

    pub fn set_all_motor_brake_type(&mut self, types: [u8; 4]) -> Result<()> {
        let req = Request::new(CommandId::SetAllMotorBrakeType).u8(1).bytes(&types);
        self.status(req, PLAIN)
    }
}

/// Direction bits, four u16 values and one zero pad byte: ten bytes, which
/// is what the firmware has always been sent for these two ids.
fn all_motors(command: CommandId, param: &MotorsParam) -> Request {
    param
        .values
        .iter()
        .fold(Request::new(command).u8(param.dir_bits()), |r, v| r.u16(*v))
        .u8(0)
}

fn centi(v: f32) -> u16 {
    (v * 100.0) as u16
}
