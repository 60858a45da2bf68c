//! RC servo port.
use crate::lower::{Channel, Clock, Dir, LowerLink, Result};
use crate::validation::PortKind;

use super::checked;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Servo {
    num: u8,
}

impl Servo {
    pub fn new(num: u8) -> Result<Self> {
        Ok(Self {
            num: checked(PortKind::Servo, num)?,
        })
    }

    pub(crate) fn all() -> impl Iterator<Item = Servo> {
        (1..=PortKind::Servo.count()).map(|num| Servo { num })
    }

    pub fn num(&self) -> u8 {
        self.num
    }

    /// Angle range 0..180.
    pub fn begin<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<()> {
        link.set_servo_angle_range(self.num, 0, 180)
    }

    // Servo direction is the inverse of the motor convention: `true` keeps
    // the firmware's forward sense.
    pub fn set_hw_dir<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        forward: bool,
    ) -> Result<()> {
        link.set_servo_dir(self.num, Dir::from_reversed(!forward))
    }

    pub fn set_angle<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        angle: u16,
    ) -> Result<()> {
        link.set_servo_angle(self.num, angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::{LinkOptions, MockChannel, StepClock};

    #[test]
    fn hw_dir_true_is_forward() {
        let ch = MockChannel::new();
        ch.respond_with(|frame| Some(vec![0x7B, 0x84, frame[2], 0x00]));
        let mut link =
            LowerLink::with_clock(ch.clone(), StepClock::default(), LinkOptions::default());
        let s = Servo::new(3).unwrap();
        s.set_hw_dir(&mut link, true).unwrap();
        s.set_hw_dir(&mut link, false).unwrap();
        assert_eq!(
            ch.written(),
            vec![0x7B, 0x84, 0x03, 0b0100, 0x01, 0x7B, 0x84, 0x03, 0b0100, 0x00]
        );
    }
}
