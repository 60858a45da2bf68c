//! Command id catalog shared by requests, replies and push frames.
//!
//! Payload length is never carried on the wire; both ends know it from the
//! command id. [`CommandId::reply_len`] is the host's half of that contract.

use std::time::Duration;

/// Reply deadline used by nearly every request.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(100);

/// Reply deadline for IMU zeroing, which the lower MCU acknowledges late.
pub const IMU_ZERO_WAIT: Duration = Duration::from_millis(1000);

/// One byte operation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    // setup
    SetMotorDir = 0x01,
    SetEncoderDir = 0x02,
    SetServoDir = 0x03,
    SetMotorSpeedRange = 0x04,
    SetServoPulseRange = 0x05,
    SetServoAngleRange = 0x06,
    /// Reserved; the firmware never answers it.
    SetButtonInit = 0x07,
    /// Reserved; the firmware never answers it.
    SetEncoderEchoMode = 0x08,
    SetImuEchoMode = 0x09,
    SetImuInit = 0x0A,
    SetPowerParam = 0x0B,
    SetEncoderPprMaxRpm = 0x0C,
    SetAllEncoderPpr = 0x0D,
    SetImuCalibration = 0x0E,

    // common setters
    SetMotorPower = 0x11,
    SetMotorSpeed = 0x12,
    SetMotorRotate = 0x13,
    SetAllMotorSpeed = 0x14,
    SetServoAngle = 0x15,
    SetAllServoAngle = 0x16,
    SetMoveDistance = 0x17,
    ResetEncoder = 0x18,
    SetStateLed = 0x19,
    SetImuToZero = 0x1A,
    SetPidParam = 0x1B,
    BrakeMotor = 0x1C,
    BrakeAllMotors = 0x1D,
    SetAllMotorPower = 0x1E,

    // getters
    GetButtonState = 0x21,
    GetButtonsState = 0x22,
    GetEncoderCounter = 0x23,
    GetAllEncoderCounter = 0x24,
    GetImuEuler = 0x25,
    GetImuGyro = 0x26,
    GetImuAcc = 0x27,
    GetPowerInfo = 0x28,
    GetRotateState = 0x29,
    GetAllMotorSpeed = 0x2A,
    GetImuRawAcc = 0x2B,
    GetEncoderDegrees = 0x2C,

    // unsolicited
    PushButtonState = 0x31,
    PushEncoderCounter = 0x32,
    PushImuEuler = 0x33,
    PushImuGyro = 0x34,
    PushImuAcc = 0x35,

    // two-motor drive parameters
    SetMotorBrakeType = 0x41,
    SetAllMotorBrakeType = 0x42,
    DriveSetup = 0x43,
    DriveMoveSyncPid = 0x44,
    DriveMoveGyroPid = 0x45,
    DriveTurnGyroPid = 0x46,
    DriveResetCounter = 0x47,
    DriveEncoderPpr = 0x48,
    DriveMotorType = 0x49,

    // drive motions and queries
    DriveMove = 0x51,
    DriveMoveDegrees = 0x52,
    DriveMoveTime = 0x53,
    DriveMoveSync = 0x54,
    DriveMoveSyncDegrees = 0x55,
    /// Reserved; no host operation uses it.
    DriveMoveSyncDegreesAcc = 0x56,
    DriveMoveSyncTime = 0x57,
    DriveMoveGyro = 0x58,
    DriveMoveGyroDegrees = 0x59,
    DriveMoveGyroTime = 0x5A,
    DriveTurnGyro = 0x5B,
    DriveBrake = 0x5C,
    DriveTaskDone = 0x5D,
    DriveDegrees = 0x5E,
    DriveCounter = 0x5F,

    // info
    RunAutoQc = 0xF9,
    /// Reserved; the host composes the same answer from three queries.
    ReadAllInfo = 0xFA,
    ReadModelIndex = 0xFB,
    FirmwareDescriptor = 0xFC,
    FirmwareBuildDay = 0xFD,
    FirmwareVersion = 0xFE,
    EchoTest = 0xFF,
}

impl CommandId {
    pub const ALL: [CommandId; 76] = [
        CommandId::SetMotorDir,
        CommandId::SetEncoderDir,
        CommandId::SetServoDir,
        CommandId::SetMotorSpeedRange,
        CommandId::SetServoPulseRange,
        CommandId::SetServoAngleRange,
        CommandId::SetButtonInit,
        CommandId::SetEncoderEchoMode,
        CommandId::SetImuEchoMode,
        CommandId::SetImuInit,
        CommandId::SetPowerParam,
        CommandId::SetEncoderPprMaxRpm,
        CommandId::SetAllEncoderPpr,
        CommandId::SetImuCalibration,
        CommandId::SetMotorPower,
        CommandId::SetMotorSpeed,
        CommandId::SetMotorRotate,
        CommandId::SetAllMotorSpeed,
        CommandId::SetServoAngle,
        CommandId::SetAllServoAngle,
        CommandId::SetMoveDistance,
        CommandId::ResetEncoder,
        CommandId::SetStateLed,
        CommandId::SetImuToZero,
        CommandId::SetPidParam,
        CommandId::BrakeMotor,
        CommandId::BrakeAllMotors,
        CommandId::SetAllMotorPower,
        CommandId::GetButtonState,
        CommandId::GetButtonsState,
        CommandId::GetEncoderCounter,
        CommandId::GetAllEncoderCounter,
        CommandId::GetImuEuler,
        CommandId::GetImuGyro,
        CommandId::GetImuAcc,
        CommandId::GetPowerInfo,
        CommandId::GetRotateState,
        CommandId::GetAllMotorSpeed,
        CommandId::GetImuRawAcc,
        CommandId::GetEncoderDegrees,
        CommandId::PushButtonState,
        CommandId::PushEncoderCounter,
        CommandId::PushImuEuler,
        CommandId::PushImuGyro,
        CommandId::PushImuAcc,
        CommandId::SetMotorBrakeType,
        CommandId::SetAllMotorBrakeType,
        CommandId::DriveSetup,
        CommandId::DriveMoveSyncPid,
        CommandId::DriveMoveGyroPid,
        CommandId::DriveTurnGyroPid,
        CommandId::DriveResetCounter,
        CommandId::DriveEncoderPpr,
        CommandId::DriveMotorType,
        CommandId::DriveMove,
        CommandId::DriveMoveDegrees,
        CommandId::DriveMoveTime,
        CommandId::DriveMoveSync,
        CommandId::DriveMoveSyncDegrees,
        CommandId::DriveMoveSyncDegreesAcc,
        CommandId::DriveMoveSyncTime,
        CommandId::DriveMoveGyro,
        CommandId::DriveMoveGyroDegrees,
        CommandId::DriveMoveGyroTime,
        CommandId::DriveTurnGyro,
        CommandId::DriveBrake,
        CommandId::DriveTaskDone,
        CommandId::DriveDegrees,
        CommandId::DriveCounter,
        CommandId::RunAutoQc,
        CommandId::ReadAllInfo,
        CommandId::ReadModelIndex,
        CommandId::FirmwareDescriptor,
        CommandId::FirmwareBuildDay,
        CommandId::FirmwareVersion,
        CommandId::EchoTest,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Frames the lower MCU sends without being asked.
    pub fn is_push(self) -> bool {
        matches!(
            self,
            CommandId::PushButtonState
                | CommandId::PushEncoderCounter
                | CommandId::PushImuEuler
                | CommandId::PushImuGyro
                | CommandId::PushImuAcc
        )
    }

    /// Ids that exist in the firmware table but have no host operation.
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            CommandId::SetButtonInit
                | CommandId::SetEncoderEchoMode
                | CommandId::DriveMoveSyncDegreesAcc
                | CommandId::ReadAllInfo
        )
    }

    /// Fixed payload length following the header of a reply or push frame.
    ///
    /// `None` for reserved ids and for the length-prefixed descriptor reply.
    pub fn reply_len(self) -> Option<usize> {
        use CommandId::*;
        let len = match self {
            SetButtonInit | SetEncoderEchoMode | DriveMoveSyncDegreesAcc | ReadAllInfo => {
                return None
            }
            FirmwareDescriptor => return None,
            GetButtonsState => 2,
            GetEncoderCounter | GetEncoderDegrees | DriveDegrees | DriveCounter => 4,
            GetAllEncoderCounter => 16,
            GetImuEuler | GetImuGyro | GetImuAcc => 6,
            GetPowerInfo => 3,
            GetAllMotorSpeed => 17,
            GetImuRawAcc => 13,
            FirmwareBuildDay => 4,
            PushButtonState => 2,
            PushEncoderCounter => 8,
            PushImuEuler | PushImuGyro | PushImuAcc => 6,
            _ => 1,
        };
        Some(len)
    }

    /// Reply deadline the dispatcher uses for this id.
    pub fn default_wait(self) -> Duration {
        match self {
            CommandId::SetImuToZero => IMU_ZERO_WAIT,
            _ => DEFAULT_WAIT,
        }
    }
}

impl TryFrom<u8> for CommandId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        CommandId::ALL
            .iter()
            .copied()
            .find(|id| id.as_u8() == value)
            .ok_or(value)
    }
}

impl From<CommandId> for u8 {
    fn from(id: CommandId) -> u8 {
        id.as_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_u8() {
        for id in CommandId::ALL {
            assert_eq!(CommandId::try_from(id.as_u8()), Ok(id));
        }
        assert_eq!(CommandId::try_from(0x00), Err(0x00));
        assert_eq!(CommandId::try_from(0x36), Err(0x36));
    }

    #[test]
    fn catalog_has_no_duplicate_ids() {
        let mut seen = std::collections::HashSet::new();
        for id in CommandId::ALL {
            assert!(seen.insert(id.as_u8()), "duplicate id {:#04x}", id.as_u8());
        }
    }

    #[test]
    fn push_lengths() {
        assert_eq!(CommandId::PushButtonState.reply_len(), Some(2));
        assert_eq!(CommandId::PushEncoderCounter.reply_len(), Some(8));
        assert_eq!(CommandId::PushImuGyro.reply_len(), Some(6));
        assert!(CommandId::ALL.iter().filter(|c| c.is_push()).count() == 5);
    }

    #[test]
    fn only_imu_zero_waits_long() {
        for id in CommandId::ALL {
            let expected = if id == CommandId::SetImuToZero {
                IMU_ZERO_WAIT
            } else {
                DEFAULT_WAIT
            };
            assert_eq!(id.default_wait(), expected);
        }
    }
}
