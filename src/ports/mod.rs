//! Board-level view of the lower MCU: one small facade per numbered port,
//! the drive-base retry/poll wrappers, and [`bring_up`].
//!
//! Facades only remember which port they drive. Every call borrows the
//! [`LowerLink`] mutably, so the strict request/reply alternation on the
//! wire is enforced by the borrow checker rather than a lock.
use log::{debug, info, warn};

use crate::lower::{Channel, Clock, LowerLink, Result};
use crate::validation::{port_index, PortKind};

pub mod dc;
pub mod drive;
pub mod sense;
pub mod servo;

pub use dc::DcMotor;
pub use drive::{DriveBase, DriveTuning};
pub use sense::{Axis, Button, EulerAxis, Motion, PowerMonitor};
pub use servo::Servo;

/// Begin attempts per motor during [`bring_up`].
pub const MOTOR_BEGIN_ATTEMPTS: u32 = 10;

/// Full board bring-up: link init, then every motor and servo port.
///
/// Motor ports must come up; a servo port that refuses its angle range is
/// logged and skipped.
pub fn bring_up<C: Channel, K: Clock>(link: &mut LowerLink<C, K>) -> Result<()> {
    link.init()?;

    for motor in DcMotor::all() {
        let mut last = None;
        for attempt in 1..=MOTOR_BEGIN_ATTEMPTS {
            match motor.begin(link) {
                Ok(()) => {
                    last = None;
                    break;
                }
                Err(e) => {
                    debug!("motor {} begin attempt {} failed: {}", motor.num(), attempt, e);
                    last = Some(e);
                }
            }
        }
        if let Some(e) = last {
            return Err(e);
        }
    }

    for servo in Servo::all() {
        if let Err(e) = servo.begin(link) {
            warn!("servo {} begin failed: {}", servo.num(), e);
        }
    }

    info!("board up");
    Ok(())
}

/// Accept `num` as a port of `kind`, keeping it 1-based.
pub(crate) fn checked(kind: PortKind, num: u8) -> Result<u8> {
    port_index(kind, num).map(|_| num)
}
