//! Link to the board's lower MCU.
//!
//! Every operation is one request frame followed by one reply frame, strictly
//! alternating on a half-duplex line:
//!
//! 1. [`framer`] encodes `0x7B 0x84 <id> <payload>` and writes it.
//! 2. [`scanner`] busy-polls the channel for the reply header; headers for
//!    other ids seen on the way are push frames and go to [`push`].
//! 3. The fixed-length reply payload is read with its own short deadline and
//!    the first byte is decoded into a [`LinkError`] or typed output.
//!
//! The operations themselves live in `setup`, `actuate`, `query`, `info` and
//! `drive`, each an `impl` block on [`LowerLink`].
use std::time::Duration;

use log::{debug, error, info, trace, warn};

pub mod channel;
pub mod clock;
pub mod commands;
pub mod errors;
pub mod framer;
pub mod push;
pub mod scanner;
#[cfg(feature = "serial")]
pub mod serial;
pub mod types;

mod actuate;
mod drive;
mod info;
mod query;
mod setup;

pub use channel::{Channel, MockChannel};
pub use clock::{Clock, StepClock, SystemClock};
pub use commands::CommandId;
pub use drive::MotionEnd;
pub use errors::{LinkError, RangeField, Result};
pub use framer::Request;
pub use push::{ButtonEvent, ButtonSink, PushHandler, Telemetry, TelemetryCache};
pub use scanner::{FrameScanner, LinkState, ScanEvent};
#[cfg(feature = "serial")]
pub use serial::SerialChannel;
pub use types::*;

use crate::logutil::hex_snippet;
use crate::metrics;
use errors::{decode_status, StatusMap};

/// Default serial speed of the lower MCU.
pub const DEFAULT_BAUD: u32 = 57_600;

/// Timing knobs of the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    /// Pause after opening the channel before the first echo test.
    pub settle: Duration,
    /// Echo tests attempted by [`LowerLink::init`].
    pub init_attempts: u32,
    /// Pause after every echo attempt.
    pub init_retry_gap: Duration,
    /// Deadline for a reply payload once its header matched.
    pub reply_read_timeout: Duration,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(1000),
            init_attempts: 50,
            init_retry_gap: Duration::from_millis(250),
            reply_read_timeout: Duration::from_millis(10),
        }
    }
}

/// Host side of the lower MCU link.
pub struct LowerLink<C: Channel, K: Clock = SystemClock> {
    channel: C,
    clock: K,
    scanner: FrameScanner,
    push: PushHandler,
    opts: LinkOptions,
}

impl<C: Channel> LowerLink<C, SystemClock> {
    pub fn new(channel: C) -> Self {
        Self::with_clock(channel, SystemClock::new(), LinkOptions::default())
    }
}

impl<C: Channel, K: Clock> LowerLink<C, K> {
    pub fn with_clock(channel: C, clock: K, opts: LinkOptions) -> Self {
        Self {
            channel,
            clock,
            scanner: FrameScanner::new(),
            push: PushHandler::default(),
            opts,
        }
    }

    pub fn options(&self) -> &LinkOptions {
        &self.opts
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn state(&self) -> LinkState {
        self.scanner.state()
    }

    /// Shared handle to values pushed by the lower MCU.
    pub fn telemetry(&self) -> TelemetryCache {
        self.push.cache().clone()
    }

    /// Register a callback for button change pushes.
    pub fn on_button<F>(&mut self, f: F)
    where
        F: FnMut(ButtonEvent) + Send + 'static,
    {
        self.push.on_button(f);
    }

    /// Route button change pushes into `sink`.
    pub fn set_button_sink<S: ButtonSink + 'static>(&mut self, sink: S) {
        self.push.set_sink(sink);
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Bring the link up: settle, then echo until the lower MCU answers.
    pub fn init(&mut self) -> Result<()> {
        info!("lower link: settling {:?} before echo test", self.opts.settle);
        self.clock.sleep(self.opts.settle);
        let attempts = self.opts.init_attempts;
        for attempt in 1..=attempts {
            let result = self.echo_test();
            self.clock.sleep(self.opts.init_retry_gap);
            match result {
                Ok(()) => {
                    info!("lower link up after {} echo attempt(s)", attempt);
                    return Ok(());
                }
                Err(e) => debug!("echo attempt {}/{} failed: {}", attempt, attempts, e),
            }
        }
        error!("lower link did not answer {} echo attempts", attempts);
        Err(LinkError::InitFailed { attempts })
    }

    /// Consume push frames already buffered, without sending anything.
    ///
    /// A header split across two calls is completed on the next one.
    pub fn service(&mut self) -> Result<()> {
        let mut budget = self.channel.available()?;
        while budget > 0 {
            let Some(byte) = self.channel.read_byte()? else {
                break;
            };
            budget -= 1;
            self.feed(byte, None)?;
        }
        Ok(())
    }

    /// Keep consuming push frames for `window`.
    pub fn service_for(&mut self, window: Duration) -> Result<()> {
        self.wait_for(None, window).map(|_| ())
    }

    pub(crate) fn sleep(&self, d: Duration) {
        self.clock.sleep(d);
    }

    fn send(&mut self, req: &Request) -> Result<()> {
        let frame = req.encode();
        debug!(
            "tx {:?} payload={}",
            req.command(),
            hex_snippet(req.payload(), 32)
        );
        self.channel.write(&frame)?;
        self.channel.flush()?;
        metrics::inc_frames_sent();
        Ok(())
    }

    /// Scan inbound bytes until the header for `expected` arrives or
    /// `timeout` elapses. Foreign headers are serviced as push frames.
    ///
    /// On timeout any partial header is abandoned.
    fn wait_for(&mut self, expected: Option<CommandId>, timeout: Duration) -> Result<bool> {
        let deadline = self.clock.now() + timeout;
        while self.clock.now() <= deadline {
            if self.channel.available()? == 0 {
                std::hint::spin_loop();
                continue;
            }
            let Some(byte) = self.channel.read_byte()? else {
                continue;
            };
            if self.feed(byte, expected)? {
                return Ok(true);
            }
        }
        self.scanner.reset();
        Ok(false)
    }

    /// Step the scanner by one byte; `true` once `expected` matched.
    fn feed(&mut self, byte: u8, expected: Option<CommandId>) -> Result<bool> {
        match self.scanner.step(byte, expected) {
            ScanEvent::Pending => Ok(false),
            ScanEvent::Matched(cmd) => {
                trace!("matched reply header {:?}", cmd);
                Ok(true)
            }
            ScanEvent::Foreign(id) => {
                self.dispatch_push(id)?;
                Ok(false)
            }
        }
    }

    fn dispatch_push(&mut self, id: u8) -> Result<()> {
        match PushHandler::payload_len(id) {
            Some(len) => {
                if let Some(payload) = self.read_payload(len, self.opts.reply_read_timeout)? {
                    trace!("push {:#04x} payload={}", id, hex_snippet(&payload, 16));
                    self.push.apply(id, &payload);
                }
            }
            None => self.push.apply(id, &[]),
        }
        Ok(())
    }

    /// Read exactly `len` bytes once they are all buffered. On timeout the
    /// receive buffer is drained and `None` returned.
    fn read_payload(&mut self, len: usize, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = self.clock.now() + timeout;
        while self.clock.now() <= deadline {
            if self.channel.available()? >= len {
                let mut buf = Vec::with_capacity(len);
                while buf.len() < len {
                    match self.channel.read_byte()? {
                        Some(b) => buf.push(b),
                        None => break,
                    }
                }
                if buf.len() == len {
                    return Ok(Some(buf));
                }
            }
        }
        let dropped = self.channel.drain()?;
        metrics::inc_reply_read_timeouts();
        warn!(
            "{}-byte payload read timed out, dropped {} buffered byte(s)",
            len, dropped
        );
        Ok(None)
    }

    /// One request/reply exchange with the id's default deadlines.
    pub(crate) fn exchange(&mut self, req: Request, reply_len: usize) -> Result<Vec<u8>> {
        let wait = req.command().default_wait();
        let read = self.opts.reply_read_timeout;
        self.exchange_with(req, reply_len, wait, read)
    }

    pub(crate) fn exchange_with(
        &mut self,
        req: Request,
        reply_len: usize,
        wait: Duration,
        read_timeout: Duration,
    ) -> Result<Vec<u8>> {
        let command = req.command();
        self.send(&req)?;
        if !self.wait_for(Some(command), wait)? {
            metrics::inc_request_timeouts();
            warn!("no reply to {:?} within {:?}", command, wait);
            return Err(LinkError::RequestTimeout(command));
        }
        metrics::inc_replies_matched();
        match self.read_payload(reply_len, read_timeout)? {
            Some(reply) => {
                debug!("rx {:?} reply={}", command, hex_snippet(&reply, 32));
                Ok(reply)
            }
            None => Err(LinkError::ReplyReadTimeout {
                command,
                expected: reply_len,
            }),
        }
    }

    /// Exchange expecting a single status byte.
    pub(crate) fn status(&mut self, req: Request, map: StatusMap) -> Result<()> {
        let command = req.command();
        let reply = self.exchange(req, 1)?;
        decode_status(command, reply[0], map)
    }
}

impl<C: Channel + std::fmt::Debug, K: Clock> std::fmt::Debug for LowerLink<C, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LowerLink")
            .field("channel", &self.channel)
            .field("state", &self.scanner.state())
            .field("opts", &self.opts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> (MockChannel, LowerLink<MockChannel, StepClock>) {
        let ch = MockChannel::new();
        let link = LowerLink::with_clock(ch.clone(), StepClock::default(), LinkOptions::default());
        (ch, link)
    }

    #[test]
    fn exchange_writes_frame_and_reads_reply() {
        let (ch, mut link) = link();
        ch.inject(&[0x7B, 0x84, 0xFE, 0x0C]);
        let reply = link
            .exchange(Request::new(CommandId::FirmwareVersion), 1)
            .unwrap();
        assert_eq!(reply, vec![0x0C]);
        assert_eq!(ch.written(), vec![0x7B, 0x84, 0xFE]);
    }

    #[test]
    fn missing_payload_drains_buffer() {
        let (ch, mut link) = link();
        // Header plus 2 of the 4 payload bytes.
        ch.inject(&[0x7B, 0x84, 0x23, 0x01, 0x02]);
        let err = link
            .exchange(Request::new(CommandId::GetEncoderCounter).u8(0), 4)
            .unwrap_err();
        assert!(matches!(err, LinkError::ReplyReadTimeout { expected: 4, .. }));
        assert_eq!(ch.pending_inbound(), 0);
    }

    #[test]
    fn timeout_resets_partial_header() {
        let (ch, mut link) = link();
        ch.inject(&[0x7B, 0x84]);
        let err = link
            .exchange(Request::new(CommandId::EchoTest).u8(0x55), 1)
            .unwrap_err();
        assert!(matches!(err, LinkError::RequestTimeout(CommandId::EchoTest)));
        assert_eq!(link.state(), LinkState::AwaitLead);
    }

    #[test]
    fn service_consumes_push() {
        let (ch, mut link) = link();
        ch.inject(&[0x7B, 0x84, 0x32, 1, 0, 2, 0, 3, 0, 4, 0]);
        link.service().unwrap();
        assert_eq!(link.telemetry().encoders(), [1, 2, 3, 4]);
        assert_eq!(ch.pending_inbound(), 0);
    }

    #[test]
    fn service_resumes_split_header() {
        let (ch, mut link) = link();
        ch.inject(&[0x7B, 0x84]);
        link.service().unwrap();
        assert_eq!(link.state(), LinkState::AwaitCommandId);
        ch.inject(&[0x34, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00]);
        link.service().unwrap();
        assert_eq!(link.telemetry().gyro().x, 1.0);
    }
}
