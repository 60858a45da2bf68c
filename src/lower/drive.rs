//! Two-motor drive-base commands (0x43..0x49, 0x51..0x5F).
//!
//! A drive base pairs two motors under one module index. Every command here
//! addresses that index as its last payload byte, and every reply can come
//! back `0x07` when the index was never set up.
use super::channel::Channel;
use super::clock::Clock;
use super::commands::CommandId;
use super::errors::{decode_drive_status, decode_status, LinkError, Result, StatusMap};
use super::framer::{le, Request};
use super::types::Dir;
use super::LowerLink;
use crate::validation::{port_index, PortKind};

const PLAIN: StatusMap = &[];

/// Reply byte meaning the module index is not configured.
const UNDEFINED: u8 = 0x07;

/// Parameters shared by the degree-, time- and turn-targeted motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionEnd {
    /// Brake (rather than coast) when the target is reached.
    pub brake: bool,
    /// Return right after the lower MCU accepts the motion.
    pub nowait: bool,
}

impl<C: Channel, K: Clock> LowerLink<C, K> {
    /// Bind motors `left`/`right` with their encoder directions to module `num`.
    pub fn drive_setup(
        &mut self,
        left: u8,
        right: u8,
        left_dir: Dir,
        right_dir: Dir,
        num: u8,
    ) -> Result<()> {
        let command = CommandId::DriveSetup;
        // Motor numbers go out 1-based, unlike the module index.
        port_index(PortKind::Motor, left)?;
        port_index(PortKind::Motor, right)?;
        let req = Request::new(command)
            .u8(left)
            .u8(right)
            .u8(left_dir as u8)
            .u8(right_dir as u8)
            .u8(port_index(PortKind::DriveModule, num)?);
        let reply = self.exchange(req, 1)?;
        match reply[0] {
            0x08 => Err(LinkError::DriveParam),
            0x09 => Err(LinkError::ImuIdle),
            status => decode_status(command, status, PLAIN),
        }
    }

    pub fn drive_move_sync_pid(&mut self, kp: f32, ki: f32, kd: f32, num: u8) -> Result<()> {
        self.drive_pid(CommandId::DriveMoveSyncPid, kp, ki, kd, num)
    }

    pub fn drive_move_gyro_pid(&mut self, kp: f32, ki: f32, kd: f32, num: u8) -> Result<()> {
        self.drive_pid(CommandId::DriveMoveGyroPid, kp, ki, kd, num)
    }

    pub fn drive_turn_gyro_pid(&mut self, kp: f32, ki: f32, kd: f32, num: u8) -> Result<()> {
        self.drive_pid(CommandId::DriveTurnGyroPid, kp, ki, kd, num)
    }

    fn drive_pid(&mut self, command: CommandId, kp: f32, ki: f32, kd: f32, num: u8) -> Result<()> {
        let req = Request::new(command)
            .f32(kp)
            .f32(ki)
            .f32(kd)
            .u8(port_index(PortKind::DriveModule, num)?);
        self.status(req, PLAIN)
    }

    pub fn drive_reset_counter(&mut self, num: u8) -> Result<()> {
        let req = Request::new(CommandId::DriveResetCounter)
            .flag(true)
            .u8(port_index(PortKind::DriveModule, num)?);
        self.drive_status(req)
    }

    /// Encoder pulses per revolution of the left and right motor.
    pub fn drive_encoder_ppr(&mut self, num: u8, ppr: [u16; 2]) -> Result<()> {
        let req = Request::new(CommandId::DriveEncoderPpr)
            .u16(ppr[0])
            .u16(ppr[1])
            .u8(port_index(PortKind::DriveModule, num)?);
        self.drive_status(req)
    }

    /// Motor type code (1 = blue motor, 2 = LEGO motor).
    pub fn drive_motor_type(&mut self, num: u8, motor_type: u8) -> Result<()> {
        let req = Request::new(CommandId::DriveMotorType)
            .u8(port_index(PortKind::DriveModule, num)?)
            .u8(motor_type);
        self.drive_status(req)
    }

    /// Unregulated power on both sides until told otherwise.
    pub fn drive_move(&mut self, left: i16, right: i16, num: u8) -> Result<()> {
        self.drive_pair(CommandId::DriveMove, left, right, num)
    }

    pub fn drive_move_degrees(
        &mut self,
        left: i16,
        right: i16,
        degrees: u16,
        end: MotionEnd,
        num: u8,
    ) -> Result<()> {
        self.drive_pair_degrees(CommandId::DriveMoveDegrees, left, right, degrees, end, num)
    }

    pub fn drive_move_time(
        &mut self,
        left: i16,
        right: i16,
        millis: u32,
        end: MotionEnd,
        num: u8,
    ) -> Result<()> {
        self.drive_pair_time(CommandId::DriveMoveTime, left, right, millis, end, num)
    }

    /// Speed-synchronised straight or arc drive.
    pub fn drive_move_sync(&mut self, left: i16, right: i16, num: u8) -> Result<()> {
        self.drive_pair(CommandId::DriveMoveSync, left, right, num)
    }

    pub fn drive_move_sync_degrees(
        &mut self,
        left: i16,
        right: i16,
        degrees: u16,
        end: MotionEnd,
        num: u8,
    ) -> Result<()> {
        self.drive_pair_degrees(CommandId::DriveMoveSyncDegrees, left, right, degrees, end, num)
    }

    pub fn drive_move_sync_time(
        &mut self,
        left: i16,
        right: i16,
        millis: u32,
        end: MotionEnd,
        num: u8,
    ) -> Result<()> {
        self.drive_pair_time(CommandId::DriveMoveSyncTime, left, right, millis, end, num)
    }

    /// Gyro-held heading: `power` forward while steering to `heading`.
    pub fn drive_move_gyro(&mut self, power: i16, heading: i16, num: u8) -> Result<()> {
        self.drive_pair(CommandId::DriveMoveGyro, power, heading, num)
    }

    pub fn drive_move_gyro_degrees(
        &mut self,
        power: i16,
        heading: i16,
        degrees: u16,
        end: MotionEnd,
        num: u8,
    ) -> Result<()> {
        self.drive_pair_degrees(CommandId::DriveMoveGyroDegrees, power, heading, degrees, end, num)
    }

    pub fn drive_move_gyro_time(
        &mut self,
        power: i16,
        heading: i16,
        millis: u32,
        end: MotionEnd,
        num: u8,
    ) -> Result<()> {
        self.drive_pair_time(CommandId::DriveMoveGyroTime, power, heading, millis, end, num)
    }

    /// Rotate in place to `heading`; `mode` selects the firmware's turn style.
    pub fn drive_turn_gyro(
        &mut self,
        power: i16,
        heading: i16,
        mode: u8,
        end: MotionEnd,
        num: u8,
    ) -> Result<()> {
        let req = Request::new(CommandId::DriveTurnGyro)
            .i16(power)
            .i16(heading)
            .u8(mode)
            .flag(end.brake)
            .flag(end.nowait)
            .u8(port_index(PortKind::DriveModule, num)?);
        self.drive_status(req)
    }

    /// Stop the drive base, braking or coasting.
    pub fn drive_brake(&mut self, brake: bool, num: u8) -> Result<()> {
        let req = Request::new(CommandId::DriveBrake)
            .flag(brake)
            .u8(port_index(PortKind::DriveModule, num)?);
        self.drive_status(req)
    }

    /// `true` once the last motion on module `num` has completed.
    pub fn drive_task_done(&mut self, num: u8) -> Result<bool> {
        let command = CommandId::DriveTaskDone;
        let req = Request::new(command)
            .u8(1)
            .u8(port_index(PortKind::DriveModule, num)?);
        match self.exchange(req, 1)?[0] {
            0x01 => Ok(true),
            0x02 => Ok(false),
            UNDEFINED => Err(LinkError::ConfigurationUndefined),
            status => Err(LinkError::Device { command, status }),
        }
    }

    /// Averaged encoder count of the drive base.
    pub fn drive_counter(&mut self, num: u8) -> Result<i32> {
        self.drive_i32(CommandId::DriveCounter, num)
    }

    /// Averaged wheel travel in degrees.
    pub fn drive_degrees(&mut self, num: u8) -> Result<i32> {
        self.drive_i32(CommandId::DriveDegrees, num)
    }

    // A reply whose low byte is 0x07 reads as "undefined" even when it is a
    // genuine count; the firmware offers no way to tell the two apart.
    fn drive_i32(&mut self, command: CommandId, num: u8) -> Result<i32> {
        let req = Request::new(command).u8(port_index(PortKind::DriveModule, num)?);
        let b = self.exchange(req, 4)?;
        if b[0] == UNDEFINED {
            return Err(LinkError::ConfigurationUndefined);
        }
        Ok(le::i32_at(&b, 0))
    }

    fn drive_status(&mut self, req: Request) -> Result<()> {
        let command = req.command();
        let reply = self.exchange(req, 1)?;
        decode_drive_status(command, reply[0])
    }

    fn drive_pair(&mut self, command: CommandId, a: i16, b: i16, num: u8) -> Result<()> {
        let req = Request::new(command)
            .i16(a)
            .i16(b)
            .u8(port_index(PortKind::DriveModule, num)?);
        self.drive_status(req)
    }

    fn drive_pair_degrees(
        &mut self,
        command: CommandId,
        a: i16,
        b: i16,
        degrees: u16,
        end: MotionEnd,
        num: u8,
    ) -> Result<()> {
        let req = Request::new(command)
            .i16(a)
            .i16(b)
            .u16(degrees)
            .flag(end.brake)
            .flag(end.nowait)
            .u8(port_index(PortKind::DriveModule, num)?);
        self.drive_status(req)
    }

    fn drive_pair_time(
        &mut self,
        command: CommandId,
        a: i16,
        b: i16,
        millis: u32,
        end: MotionEnd,
        num: u8,
    ) -> Result<()> {
        let req = Request::new(command)
            .i16(a)
            .i16(b)
            .u32(millis)
            .flag(end.brake)
            .flag(end.nowait)
            .u8(port_index(PortKind::DriveModule, num)?);
        self.drive_status(req)
    }
}
