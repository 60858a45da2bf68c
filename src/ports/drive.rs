//! Two-motor drive base with retry and completion polling.
//!
//! The lower MCU answers a motion request before the motion is done, and
//! occasionally refuses one while it is still settling the previous task.
//! [`DriveBase`] hides both: refused requests are resent a bounded number of
//! times, and blocking motions poll `drive_task_done` until the firmware
//! reports the motion finished.
use std::time::Duration;

use log::{debug, warn};

use crate::lower::{Channel, Clock, Dir, LinkError, LowerLink, MotionEnd, Result};
use crate::metrics;
use crate::validation::PortKind;

use super::checked;

/// Retry and polling cadence of the drive-base wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveTuning {
    /// Resends of a refused motion request after the first attempt.
    pub retry_limit: u32,
    pub retry_gap: Duration,
    /// Setup attempts made by [`DriveBase::begin`].
    pub begin_attempts: u32,
    pub begin_retry_gap: Duration,
    /// Pause after a blocking motion so the motors can spin down.
    pub brake_settle: Option<Duration>,
    /// Upper bound on one blocking motion.
    pub poll_timeout: Duration,
    /// Poll interval of unregulated moves.
    pub plain_poll: Duration,
    /// Poll interval of synchronised, gyro and turn motions.
    pub sync_poll: Duration,
    /// Gap before the single resend of PID setters.
    pub pid_retry_gap: Duration,
    /// Gap before the single resend of turns and counter reads.
    pub quick_retry_gap: Duration,
}

impl Default for DriveTuning {
    fn default() -> Self {
        Self {
            retry_limit: 10,
            retry_gap: Duration::from_millis(2),
            begin_attempts: 30,
            begin_retry_gap: Duration::from_millis(100),
            brake_settle: None,
            poll_timeout: Duration::from_secs(60),
            plain_poll: Duration::from_millis(50),
            sync_poll: Duration::from_millis(10),
            pid_retry_gap: Duration::from_millis(2),
            quick_retry_gap: Duration::from_millis(1),
        }
    }
}

/// Customary settle delay when the brake delay is enabled.
pub const DEFAULT_BRAKE_SETTLE: Duration = Duration::from_millis(110);

/// Drive base made of two motors under one module index.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveBase {
    module: u8,
    left: u8,
    right: u8,
    left_dir: Dir,
    right_dir: Dir,
    tuning: DriveTuning,
}

#[derive(Clone, Copy)]
enum Poll {
    Plain,
    Sync,
}

impl DriveBase {
    /// Module `module` driving motors `left` and `right`. The reversal flags
    /// describe the encoders, not the motor outputs.
    pub fn new(
        module: u8,
        left: u8,
        right: u8,
        left_reversed: bool,
        right_reversed: bool,
        tuning: DriveTuning,
    ) -> Result<Self> {
        Ok(Self {
            module: checked(PortKind::DriveModule, module)?,
            left: checked(PortKind::Motor, left)?,
            right: checked(PortKind::Motor, right)?,
            left_dir: Dir::from_reversed(left_reversed),
            right_dir: Dir::from_reversed(right_reversed),
            tuning,
        })
    }

    pub fn module(&self) -> u8 {
        self.module
    }

    pub fn tuning(&self) -> &DriveTuning {
        &self.tuning
    }

    /// Register the motor pair with the lower MCU, retrying while it is busy
    /// (typically while the IMU is still idle after power-up).
    pub fn begin<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<()> {
        let attempts = self.tuning.begin_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = link.drive_setup(
                self.left,
                self.right,
                self.left_dir,
                self.right_dir,
                self.module,
            );
            match result {
                Ok(()) => return Ok(()),
                Err(e @ LinkError::InvalidChannel { .. }) => return Err(e),
                Err(e) if attempt >= attempts => {
                    warn!("drive {} setup gave up after {} attempts: {}", self.module, attempts, e);
                    return Err(e);
                }
                Err(e) => debug!("drive {} setup attempt {} failed: {}", self.module, attempt, e),
            }
            attempt += 1;
            link.sleep(self.tuning.begin_retry_gap);
            metrics::inc_wrapper_retries();
        }
    }

    pub fn set_move_sync_pid<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        kp: f32,
        ki: f32,
        kd: f32,
    ) -> Result<()> {
        let num = self.module;
        self.once_more(link, self.tuning.pid_retry_gap, |l| l.drive_move_sync_pid(kp, ki, kd, num))
    }

    pub fn set_move_gyro_pid<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        kp: f32,
        ki: f32,
        kd: f32,
    ) -> Result<()> {
        let num = self.module;
        self.once_more(link, self.tuning.pid_retry_gap, |l| l.drive_move_gyro_pid(kp, ki, kd, num))
    }

    pub fn set_turn_gyro_pid<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        kp: f32,
        ki: f32,
        kd: f32,
    ) -> Result<()> {
        let num = self.module;
        self.once_more(link, self.tuning.pid_retry_gap, |l| l.drive_turn_gyro_pid(kp, ki, kd, num))
    }

    /// Unregulated power on both sides; returns once accepted.
    pub fn move_<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        left: i16,
        right: i16,
    ) -> Result<()> {
        let num = self.module;
        self.retry(link, |l| l.drive_move(left, right, num))
    }

    pub fn move_degrees<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        left: i16,
        right: i16,
        degrees: u16,
        end: MotionEnd,
    ) -> Result<()> {
        let num = self.module;
        self.retry(link, |l| l.drive_move_degrees(left, right, degrees, end, num))?;
        self.finish(link, end, Poll::Plain)
    }

    pub fn move_time<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        left: i16,
        right: i16,
        run: Duration,
        end: MotionEnd,
    ) -> Result<()> {
        let (num, ms) = (self.module, millis(run));
        self.retry(link, |l| l.drive_move_time(left, right, ms, end, num))?;
        self.finish(link, end, Poll::Plain)
    }

    /// Encoder-synchronised power on both sides; returns once accepted.
    pub fn move_sync<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        left: i16,
        right: i16,
    ) -> Result<()> {
        let num = self.module;
        self.retry(link, |l| l.drive_move_sync(left, right, num))
    }

    pub fn move_sync_degrees<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        left: i16,
        right: i16,
        degrees: u16,
        end: MotionEnd,
    ) -> Result<()> {
        let num = self.module;
        self.retry(link, |l| l.drive_move_sync_degrees(left, right, degrees, end, num))?;
        self.finish(link, end, Poll::Sync)
    }

    pub fn move_sync_time<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        left: i16,
        right: i16,
        run: Duration,
        end: MotionEnd,
    ) -> Result<()> {
        let (num, ms) = (self.module, millis(run));
        self.retry(link, |l| l.drive_move_sync_time(left, right, ms, end, num))?;
        self.finish(link, end, Poll::Sync)
    }

    /// Hold `heading` (IMU yaw, -360..=360) while driving at `power`.
    pub fn move_gyro<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        power: i16,
        heading: i16,
    ) -> Result<()> {
        let num = self.module;
        self.retry(link, |l| l.drive_move_gyro(power, heading, num))
    }

    pub fn move_gyro_degrees<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        power: i16,
        heading: i16,
        degrees: u16,
        end: MotionEnd,
    ) -> Result<()> {
        let num = self.module;
        self.retry(link, |l| l.drive_move_gyro_degrees(power, heading, degrees, end, num))?;
        self.finish(link, end, Poll::Sync)
    }

    pub fn move_gyro_time<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        power: i16,
        heading: i16,
        run: Duration,
        end: MotionEnd,
    ) -> Result<()> {
        let (num, ms) = (self.module, millis(run));
        self.retry(link, |l| l.drive_move_gyro_time(power, heading, ms, end, num))?;
        self.finish(link, end, Poll::Sync)
    }

    /// Turn in place to `heading`. `mode` 0 pivots on one wheel, 1 spins on
    /// both.
    pub fn turn_gyro<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        power: i16,
        heading: i16,
        mode: u8,
        end: MotionEnd,
    ) -> Result<()> {
        let num = self.module;
        self.once_more(link, self.tuning.quick_retry_gap, |l| {
            l.drive_turn_gyro(power, heading, mode, end, num)
        })?;
        self.finish(link, end, Poll::Sync)
    }

    /// Averaged encoder count (not degrees).
    pub fn counter<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<i32> {
        let num = self.module;
        self.once_more(link, self.tuning.quick_retry_gap, |l| l.drive_counter(num))
    }

    pub fn degrees<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<i32> {
        let num = self.module;
        self.once_more(link, self.tuning.quick_retry_gap, |l| l.drive_degrees(num))
    }

    pub fn reset_counter<C: Channel, K: Clock>(&self, link: &mut LowerLink<C, K>) -> Result<()> {
        link.drive_reset_counter(self.module)
    }

    /// Stop now: `true` brakes, `false` coasts.
    pub fn brake<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        brake: bool,
    ) -> Result<()> {
        link.drive_brake(brake, self.module)
    }

    pub fn is_prev_task_done<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
    ) -> Result<bool> {
        link.drive_task_done(self.module)
    }

    /// First attempt plus up to `retry_limit` resends. The last error is
    /// returned, so a module that was never set up surfaces as
    /// `ConfigurationUndefined`.
    fn retry<C, K, T, F>(&self, link: &mut LowerLink<C, K>, mut op: F) -> Result<T>
    where
        C: Channel,
        K: Clock,
        F: FnMut(&mut LowerLink<C, K>) -> Result<T>,
    {
        let mut result = op(link);
        for _ in 0..self.tuning.retry_limit {
            match &result {
                Ok(_) | Err(LinkError::InvalidChannel { .. }) => break,
                Err(e) => debug!("drive {} request refused, retrying: {}", self.module, e),
            }
            link.sleep(self.tuning.retry_gap);
            metrics::inc_wrapper_retries();
            result = op(link);
        }
        result
    }

    fn once_more<C, K, T, F>(
        &self,
        link: &mut LowerLink<C, K>,
        gap: Duration,
        mut op: F,
    ) -> Result<T>
    where
        C: Channel,
        K: Clock,
        F: FnMut(&mut LowerLink<C, K>) -> Result<T>,
    {
        match op(link) {
            Err(e @ LinkError::InvalidChannel { .. }) => Err(e),
            Err(e) => {
                debug!("drive {} request failed once: {}", self.module, e);
                link.sleep(gap);
                metrics::inc_wrapper_retries();
                op(link)
            }
            ok => ok,
        }
    }

    /// Block until the accepted motion finishes unless `end.nowait`.
    fn finish<C: Channel, K: Clock>(
        &self,
        link: &mut LowerLink<C, K>,
        end: MotionEnd,
        poll: Poll,
    ) -> Result<()> {
        if end.nowait {
            return Ok(());
        }
        let interval = match poll {
            Poll::Plain => self.tuning.plain_poll,
            Poll::Sync => self.tuning.sync_poll,
        };
        let started = link.clock().now();
        loop {
            link.sleep(interval);
            match link.drive_task_done(self.module) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) if e.is_transient() => debug!("drive {} status poll: {}", self.module, e),
                Err(e) => return Err(e),
            }
            if link.clock().now().saturating_sub(started) >= self.tuning.poll_timeout {
                warn!("drive {} motion exceeded {:?}", self.module, self.tuning.poll_timeout);
                return Err(LinkError::MotionTimeout(self.tuning.poll_timeout));
            }
        }
        if let Some(settle) = self.tuning.brake_settle {
            link.sleep(settle);
        }
        Ok(())
    }
}

/// Run time as the u32 milliseconds the firmware takes.
fn millis(d: Duration) -> u32 {
    d.as_millis().min(u32::MAX as u128) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::{LinkOptions, MockChannel, StepClock};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn link(ch: &MockChannel) -> LowerLink<MockChannel, StepClock> {
        LowerLink::with_clock(ch.clone(), StepClock::default(), LinkOptions::default())
    }

    fn base() -> DriveBase {
        DriveBase::new(1, 1, 2, false, true, DriveTuning::default()).unwrap()
    }

    fn frames_with_id(written: &[u8], id: u8) -> usize {
        written.windows(3).filter(|w| w == &[0x7B, 0x84, id]).count()
    }

    #[test]
    fn refused_motion_is_resent_until_accepted() {
        let ch = MockChannel::new();
        let refusals = Arc::new(AtomicU32::new(3));
        let left = refusals.clone();
        ch.respond_with(move |frame| {
            let status = if left.load(Ordering::SeqCst) > 0 {
                left.fetch_sub(1, Ordering::SeqCst);
                0x01
            } else {
                0x00
            };
            Some(vec![0x7B, 0x84, frame[2], status])
        });
        let mut link = link(&ch);
        base().move_(&mut link, 50, 50).unwrap();
        assert_eq!(frames_with_id(&ch.written(), 0x51), 4);
    }

    #[test]
    fn undefined_module_surfaces_after_retry_limit() {
        let ch = MockChannel::new();
        ch.respond_with(|frame| Some(vec![0x7B, 0x84, frame[2], 0x07]));
        let mut link = link(&ch);
        let err = base().move_sync(&mut link, 30, 30).unwrap_err();
        assert!(matches!(err, LinkError::ConfigurationUndefined));
        assert_eq!(frames_with_id(&ch.written(), 0x54), 11);
    }

    #[test]
    fn blocking_move_polls_until_finished() {
        let ch = MockChannel::new();
        let busy_polls = Arc::new(AtomicU32::new(2));
        let busy = busy_polls.clone();
        ch.respond_with(move |frame| {
            let body = match frame[2] {
                0x5D if busy.load(Ordering::SeqCst) > 0 => {
                    busy.fetch_sub(1, Ordering::SeqCst);
                    0x02
                }
                0x5D => 0x01,
                _ => 0x00,
            };
            Some(vec![0x7B, 0x84, frame[2], body])
        });
        let mut link = link(&ch);
        let end = MotionEnd { brake: true, nowait: false };
        base().move_degrees(&mut link, 40, 40, 360, end).unwrap();
        assert_eq!(frames_with_id(&ch.written(), 0x5D), 3);
    }

    #[test]
    fn nowait_skips_polling() {
        let ch = MockChannel::new();
        ch.respond_with(|frame| Some(vec![0x7B, 0x84, frame[2], 0x00]));
        let mut link = link(&ch);
        let end = MotionEnd { brake: false, nowait: true };
        base()
            .move_gyro_time(&mut link, 40, 0, Duration::from_millis(1500), end)
            .unwrap();
        let written = ch.written();
        assert_eq!(frames_with_id(&written, 0x5D), 0);
        // power, heading, 1500 ms, coast, nowait, module index 0
        assert_eq!(
            written,
            vec![0x7B, 0x84, 0x5A, 40, 0, 0, 0, 0xDC, 0x05, 0, 0, 0, 1, 0]
        );
    }

    #[test]
    fn stuck_motion_times_out() {
        let ch = MockChannel::new();
        ch.respond_with(|frame| {
            let body = if frame[2] == 0x5D { 0x02 } else { 0x00 };
            Some(vec![0x7B, 0x84, frame[2], body])
        });
        let mut link = link(&ch);
        let tuning = DriveTuning {
            poll_timeout: Duration::from_millis(500),
            ..DriveTuning::default()
        };
        let drive = DriveBase::new(1, 1, 2, false, false, tuning).unwrap();
        let err = drive
            .turn_gyro(&mut link, 30, 90, 1, MotionEnd::default())
            .unwrap_err();
        assert!(matches!(err, LinkError::MotionTimeout(_)));
    }

    #[test]
    fn begin_sends_encoder_directions() {
        let ch = MockChannel::new();
        ch.respond_with(|frame| Some(vec![0x7B, 0x84, frame[2], 0x00]));
        let mut link = link(&ch);
        base().begin(&mut link).unwrap();
        assert_eq!(ch.written(), vec![0x7B, 0x84, 0x43, 1, 2, 1, 0, 0]);
    }

    #[test]
    fn begin_gives_up_after_configured_attempts() {
        let ch = MockChannel::new();
        ch.respond_with(|frame| Some(vec![0x7B, 0x84, frame[2], 0x09]));
        let mut link = link(&ch);
        let err = base().begin(&mut link).unwrap_err();
        assert!(matches!(err, LinkError::ImuIdle));
        assert_eq!(frames_with_id(&ch.written(), 0x43), 30);
    }

    #[test]
    fn counter_retries_once() {
        let ch = MockChannel::new();
        let first = Arc::new(AtomicU32::new(1));
        let f = first.clone();
        ch.respond_with(move |frame| {
            if f.swap(0, Ordering::SeqCst) == 1 {
                return None;
            }
            Some(vec![0x7B, 0x84, frame[2], 0x10, 0x00, 0x00, 0x00])
        });
        let mut link = link(&ch);
        assert_eq!(base().counter(&mut link).unwrap(), 16);
        assert_eq!(frames_with_id(&ch.written(), 0x5F), 2);
    }

    #[test]
    fn bad_ports_rejected_up_front() {
        assert!(DriveBase::new(3, 1, 2, false, false, DriveTuning::default()).is_err());
        assert!(DriveBase::new(1, 0, 2, false, false, DriveTuning::default()).is_err());
    }
}
