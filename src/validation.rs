//! Port number validation and 1-based to wire remapping.
//!
//! Public APIs take port numbers as printed on the board (1-based). The lower
//! MCU wants either a 0-based index or a one-hot bitmask depending on the
//! command; both conversions go through here so an out-of-range number is
//! rejected before anything reaches the wire.

use crate::lower::{LinkError, Result};

/// Kind of numbered port on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Motor,
    Encoder,
    Servo,
    Button,
    /// Drive-base module slot configured with `drive_setup`.
    DriveModule,
}

impl PortKind {
    pub fn count(self) -> u8 {
        match self {
            PortKind::Motor | PortKind::Encoder | PortKind::Servo => 4,
            // Four motors pair into at most two drive bases.
            PortKind::Button | PortKind::DriveModule => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PortKind::Motor => "motor",
            PortKind::Encoder => "encoder",
            PortKind::Servo => "servo",
            PortKind::Button => "button",
            PortKind::DriveModule => "drive module",
        }
    }
}

fn check(kind: PortKind, num: u8) -> Result<()> {
    if num == 0 || num > kind.count() {
        return Err(LinkError::InvalidChannel {
            kind: kind.name(),
            num,
            max: kind.count(),
        });
    }
    Ok(())
}

/// 0-based index for a 1-based port number.
pub fn port_index(kind: PortKind, num: u8) -> Result<u8> {
    check(kind, num)?;
    Ok(num - 1)
}

/// One-hot mask `1 << (num - 1)` for a 1-based port number.
pub fn port_mask(kind: PortKind, num: u8) -> Result<u8> {
    check(kind, num)?;
    Ok(1u8 << (num - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_masks() {
        assert_eq!(port_mask(PortKind::Motor, 1).unwrap(), 0b0001);
        assert_eq!(port_mask(PortKind::Motor, 4).unwrap(), 0b1000);
    }

    #[test]
    fn rejects_zero_and_overflow() {
        assert!(matches!(
            port_index(PortKind::Servo, 0),
            Err(LinkError::InvalidChannel { num: 0, max: 4, .. })
        ));
        assert!(port_index(PortKind::Button, 3).is_err());
        assert_eq!(port_index(PortKind::Button, 2).unwrap(), 1);
    }

    #[test]
    fn drive_module_slots() {
        assert_eq!(port_index(PortKind::DriveModule, 1).unwrap(), 0);
        assert!(port_index(PortKind::DriveModule, 3).is_err());
    }
}
