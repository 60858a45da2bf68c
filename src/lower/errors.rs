use thiserror::Error;

use super::commands::CommandId;

/// Request field the lower MCU rejected as out of range.
///
/// Each variant corresponds to one non-zero status byte of one operation;
/// the mapping lives next to the operation that can produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    ServoMinPulse,
    ServoMaxPulse,
    ServoMinAngle,
    ServoMaxAngle,
    ImuEchoMode,
    ImuEchoInterval,
    ImuAccFsr,
    ImuGyroFsr,
    ImuOdr,
    MotorSpeed,
    MotorPower,
    /// Speed of motor N (1-based) in an all-motor request.
    MotorChannelSpeed(u8),
    ServoAngle,
    /// Angle of servo N (1-based) in an all-servo request.
    ServoChannelAngle(u8),
    MoveAction,
    MoveSpeed,
    MoveEncoder,
    PowerVoltRange,
}

impl std::fmt::Display for RangeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeField::ServoMinPulse => write!(f, "servo min pulse"),
            RangeField::ServoMaxPulse => write!(f, "servo max pulse"),
            RangeField::ServoMinAngle => write!(f, "servo min angle"),
            RangeField::ServoMaxAngle => write!(f, "servo max angle"),
            RangeField::ImuEchoMode => write!(f, "IMU echo mode"),
            RangeField::ImuEchoInterval => write!(f, "IMU echo interval"),
            RangeField::ImuAccFsr => write!(f, "IMU accelerometer FSR"),
            RangeField::ImuGyroFsr => write!(f, "IMU gyro FSR"),
            RangeField::ImuOdr => write!(f, "IMU output data rate"),
            RangeField::MotorSpeed => write!(f, "motor speed"),
            RangeField::MotorPower => write!(f, "motor power"),
            RangeField::MotorChannelSpeed(n) => write!(f, "motor {} speed", n),
            RangeField::ServoAngle => write!(f, "servo angle"),
            RangeField::ServoChannelAngle(n) => write!(f, "servo {} angle", n),
            RangeField::MoveAction => write!(f, "move action"),
            RangeField::MoveSpeed => write!(f, "move speed"),
            RangeField::MoveEncoder => write!(f, "move encoder target"),
            RangeField::PowerVoltRange => write!(f, "power voltage range"),
        }
    }
}

/// Errors surfaced by the lower MCU link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No matching reply frame arrived before the request deadline.
    #[error("timed out waiting for reply to {0:?}")]
    RequestTimeout(CommandId),

    /// The reply header arrived but its payload did not.
    #[error("timed out reading {expected}-byte payload of {command:?}")]
    ReplyReadTimeout { command: CommandId, expected: usize },

    /// The lower MCU rejected one field of the request.
    #[error("value out of range: {0}")]
    OutOfRange(RangeField),

    /// Status byte not known for this operation.
    #[error("device error on {command:?}: status {status:#04x}")]
    Device { command: CommandId, status: u8 },

    /// Bring-up echo test never succeeded.
    #[error("link init failed after {attempts} echo attempts")]
    InitFailed { attempts: u32 },

    /// Drive-base module index was never configured with `drive_setup`.
    #[error("drive-base configuration undefined")]
    ConfigurationUndefined,

    /// Drive-base setup rejected its motor parameters.
    #[error("drive-base parameters rejected")]
    DriveParam,

    /// Drive-base setup refused because the IMU is still idle.
    #[error("drive-base IMU idle")]
    ImuIdle,

    /// Auto QC reported an IMU failure.
    #[error("auto QC: IMU check failed")]
    QcImuFailed,

    /// A 1-based port number outside the board's range.
    #[error("invalid {kind} channel {num} (expected 1..={max})")]
    InvalidChannel {
        kind: &'static str,
        num: u8,
        max: u8,
    },

    /// Battery pack size with no threshold preset.
    #[error("unsupported battery cell count {0} (expected 2..=6)")]
    InvalidCellCount(u8),

    /// A blocking motion never reported completion.
    #[error("drive-base task did not finish within {0:?}")]
    MotionTimeout(std::time::Duration),

    /// Underlying channel I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port failure.
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl LinkError {
    /// True for failures a caller may simply retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LinkError::RequestTimeout(_) | LinkError::ReplyReadTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Map of status byte to rejected field for one operation.
pub(crate) type StatusMap = &'static [(u8, RangeField)];

/// Decode a one-byte status reply: `0x00` is success, bytes listed in `map`
/// are range rejections, anything else is an unspecified device error.
pub(crate) fn decode_status(command: CommandId, status: u8, map: StatusMap) -> Result<()> {
    if status == 0x00 {
        return Ok(());
    }
    match map.iter().find(|(code, _)| *code == status) {
        Some((_, field)) => Err(LinkError::OutOfRange(*field)),
        None => Err(LinkError::Device { command, status }),
    }
}

/// Status decoding shared by drive-base motion, brake and reset replies.
pub(crate) fn decode_drive_status(command: CommandId, status: u8) -> Result<()> {
    match status {
        0x07 => Err(LinkError::ConfigurationUndefined),
        other => decode_status(command, other, &[(0x02, RangeField::MotorPower)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVO_ANGLE_RANGE: StatusMap = &[
        (0x02, RangeField::ServoMinAngle),
        (0x03, RangeField::ServoMaxAngle),
    ];

    #[test]
    fn servo_angle_range_status_bytes() {
        let cmd = CommandId::SetServoAngleRange;
        assert!(decode_status(cmd, 0x00, SERVO_ANGLE_RANGE).is_ok());
        assert!(matches!(
            decode_status(cmd, 0x02, SERVO_ANGLE_RANGE),
            Err(LinkError::OutOfRange(RangeField::ServoMinAngle))
        ));
        assert!(matches!(
            decode_status(cmd, 0x03, SERVO_ANGLE_RANGE),
            Err(LinkError::OutOfRange(RangeField::ServoMaxAngle))
        ));
        for other in [0x01u8, 0x04, 0x7F, 0xFF] {
            assert!(matches!(
                decode_status(cmd, other, SERVO_ANGLE_RANGE),
                Err(LinkError::Device { status, .. }) if status == other
            ));
        }
    }

    #[test]
    fn drive_status_keeps_define_distinct() {
        let cmd = CommandId::DriveMove;
        assert!(decode_drive_status(cmd, 0x00).is_ok());
        assert!(matches!(
            decode_drive_status(cmd, 0x07),
            Err(LinkError::ConfigurationUndefined)
        ));
        assert!(matches!(
            decode_drive_status(cmd, 0x02),
            Err(LinkError::OutOfRange(RangeField::MotorPower))
        ));
        assert!(matches!(
            decode_drive_status(cmd, 0x05),
            Err(LinkError::Device { status: 0x05, .. })
        ));
    }
}
