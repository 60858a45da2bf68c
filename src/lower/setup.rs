//! One-time configuration commands (0x01..0x0E, plus LED and IMU zeroing).
use std::time::Duration;

use super::channel::Channel;
use super::clock::Clock;
use super::commands::CommandId;
use super::errors::{RangeField, Result, StatusMap};
use super::framer::Request;
use super::types::{AccFsr, Dir, GyroFsr, ImuCalibration, ImuEchoMode, ImuFifo, Odr, PowerParam};
use super::LowerLink;
use crate::validation::{port_index, port_mask, PortKind};

const PLAIN: StatusMap = &[];
const SERVO_PULSE_RANGE: StatusMap = &[
    (0x02, RangeField::ServoMinPulse),
    (0x03, RangeField::ServoMaxPulse),
];
const SERVO_ANGLE_RANGE: StatusMap = &[
    (0x02, RangeField::ServoMinAngle),
    (0x03, RangeField::ServoMaxAngle),
];
const IMU_ECHO: StatusMap = &[
    (0x02, RangeField::ImuEchoMode),
    (0x03, RangeField::ImuEchoInterval),
];
const IMU_INIT: StatusMap = &[
    (0x02, RangeField::ImuAccFsr),
    (0x03, RangeField::ImuGyroFsr),
    (0x04, RangeField::ImuOdr),
];
const POWER_PARAM: StatusMap = &[(0x02, RangeField::PowerVoltRange)];

/// The power parameter ack is read with a tighter deadline than other replies.
const POWER_PARAM_READ: Duration = Duration::from_millis(5);

impl<C: Channel, K: Clock> LowerLink<C, K> {
    pub fn set_motor_dir(&mut self, num: u8, dir: Dir) -> Result<()> {
        let req = Request::new(CommandId::SetMotorDir)
            .u8(port_mask(PortKind::Motor, num)?)
            .u8(dir as u8);
        self.status(req, PLAIN)
    }

    pub fn set_encoder_dir(&mut self, num: u8, dir: Dir) -> Result<()> {
        let req = Request::new(CommandId::SetEncoderDir)
            .u8(port_mask(PortKind::Encoder, num)?)
            .u8(dir as u8);
        self.status(req, PLAIN)
    }

    pub fn set_servo_dir(&mut self, num: u8, dir: Dir) -> Result<()> {
        let req = Request::new(CommandId::SetServoDir)
            .u8(port_mask(PortKind::Servo, num)?)
            .u8(dir as u8);
        self.status(req, PLAIN)
    }

    pub fn set_motor_speed_range(&mut self, num: u8, min: u16, max: u16) -> Result<()> {
        let req = Request::new(CommandId::SetMotorSpeedRange)
            .u8(port_mask(PortKind::Motor, num)?)
            .u16(min)
            .u16(max);
        self.status(req, PLAIN)
    }

    /// Pulse width limits in microseconds.
    pub fn set_servo_pulse_range(&mut self, num: u8, min: u16, max: u16) -> Result<()> {
        let req = Request::new(CommandId::SetServoPulseRange)
            .u8(port_mask(PortKind::Servo, num)?)
            .u16(min)
            .u16(max);
        self.status(req, SERVO_PULSE_RANGE)
    }

    pub fn set_servo_angle_range(&mut self, num: u8, min: u16, max: u16) -> Result<()> {
        let req = Request::new(CommandId::SetServoAngleRange)
            .u8(port_mask(PortKind::Servo, num)?)
            .u16(min)
            .u16(max);
        self.status(req, SERVO_ANGLE_RANGE)
    }

    pub fn set_imu_echo_mode(&mut self, mode: ImuEchoMode, interval_ms: u16) -> Result<()> {
        let req = Request::new(CommandId::SetImuEchoMode)
            .u8(mode as u8)
            .u16(interval_ms);
        self.status(req, IMU_ECHO)
    }

    pub fn set_imu_init(
        &mut self,
        acc: AccFsr,
        gyro: GyroFsr,
        odr: Odr,
        fifo: ImuFifo,
    ) -> Result<()> {
        let req = Request::new(CommandId::SetImuInit)
            .u8(acc as u8)
            .u8(gyro as u8)
            .u8(odr as u8)
            .u8(fifo as u8);
        self.status(req, IMU_INIT)
    }

    /// Battery thresholds, sent as tenths of a volt.
    pub fn set_power_param(&mut self, param: PowerParam) -> Result<()> {
        let command = CommandId::SetPowerParam;
        let req = Request::new(command)
            .u8(decivolts(param.full_volts))
            .u8(decivolts(param.cutoff_volts))
            .u8(decivolts(param.alarm_volts));
        let reply = self.exchange_with(req, 1, command.default_wait(), POWER_PARAM_READ)?;
        super::errors::decode_status(command, reply[0], POWER_PARAM)
    }

    pub fn set_encoder_ppr_max_rpm(&mut self, num: u8, ppr: u16, max_rpm: u16) -> Result<()> {
        let req = Request::new(CommandId::SetEncoderPprMaxRpm)
            .u8(port_index(PortKind::Encoder, num)?)
            .u8(0)
            .u16(ppr)
            .u16(max_rpm);
        self.status(req, PLAIN)
    }

    pub fn set_all_encoder_ppr(&mut self, ppr: [u16; 4]) -> Result<()> {
        let mut req = Request::new(CommandId::SetAllEncoderPpr).u8(1).u8(0);
        for p in ppr {
            req = req.u16(p);
        }
        self.status(req, PLAIN)
    }

    pub fn set_imu_calibration(&mut self, data: ImuCalibration) -> Result<()> {
        let mut req = Request::new(CommandId::SetImuCalibration).u8(1).u8(1);
        for v in data {
            req = req.f32(v);
        }
        self.status(req, PLAIN)
    }

    /// Status LED colour as `0xRRGGBB`.
    pub fn set_state_led(&mut self, brightness: u8, rgb: u32) -> Result<()> {
        let req = Request::new(CommandId::SetStateLed)
            .u8(brightness)
            .u8((rgb >> 16) as u8)
            .u8((rgb >> 8) as u8)
            .u8(rgb as u8);
        self.status(req, PLAIN)
    }

    /// Re-zero the IMU heading. The ack takes up to a second.
    pub fn set_imu_to_zero(&mut self) -> Result<()> {
        self.status(Request::new(CommandId::SetImuToZero), PLAIN)
    }
}

/// Volts to the u8 tenths the firmware stores, truncated toward zero;
/// saturates at 25.5 V.
fn decivolts(v: f32) -> u8 {
    (v * 10.0) as u8
}
