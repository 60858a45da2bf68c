//! Test utilities & fixtures.
//! A mock lower MCU: scripted replies over [`MockChannel`] with a step clock.
#![allow(dead_code)] // each test file uses a different subset

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use minir4_link::lower::{LinkOptions, LowerLink, MockChannel, StepClock};

pub const LEAD: [u8; 2] = [0x7B, 0x84];

pub type MockLink = LowerLink<MockChannel, StepClock>;

/// Header plus payload, as the lower MCU would send it.
pub fn frame(id: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![LEAD[0], LEAD[1], id];
    out.extend_from_slice(payload);
    out
}

/// Fresh link on a 1 ms step clock, plus a handle on its channel.
pub fn mock_link() -> (MockChannel, MockLink) {
    let ch = MockChannel::new();
    let link = LowerLink::with_clock(ch.clone(), StepClock::default(), LinkOptions::default());
    (ch, link)
}

/// Scripted lower MCU: per-id canned replies, an optional push burst sent
/// ahead of every reply, and a log of the request frames it saw.
#[derive(Clone, Default)]
pub struct Device {
    replies: Arc<Mutex<HashMap<u8, Vec<u8>>>>,
    preamble: Arc<Mutex<Vec<u8>>>,
    seen: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply payload for `id`. Ids without a reply are acked with `0x00`.
    pub fn reply(&self, id: u8, payload: &[u8]) -> &Self {
        self.replies.lock().unwrap().insert(id, payload.to_vec());
        self
    }

    /// Bytes sent before every reply (push frames, garbage).
    pub fn preamble(&self, bytes: &[u8]) -> &Self {
        *self.preamble.lock().unwrap() = bytes.to_vec();
        self
    }

    /// Request frames received so far.
    pub fn seen(&self) -> Vec<Vec<u8>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Vec<u8> {
        self.seen().last().cloned().unwrap_or_default()
    }

    /// Attach to `ch`; echo requests are answered with their own byte.
    pub fn attach(&self, ch: &MockChannel) {
        let dev = self.clone();
        ch.respond_with(move |req| {
            dev.seen.lock().unwrap().push(req.to_vec());
            let id = req[2];
            let payload = match dev.replies.lock().unwrap().get(&id) {
                Some(p) => p.clone(),
                None if id == 0xFF => vec![req[3]],
                None => vec![0x00],
            };
            let mut out = dev.preamble.lock().unwrap().clone();
            out.extend(frame(id, &payload));
            Some(out)
        });
    }
}

/// Link wired to a fresh scripted device.
pub fn device_link() -> (Device, MockChannel, MockLink) {
    let (ch, link) = mock_link();
    let dev = Device::new();
    dev.attach(&ch);
    (dev, ch, link)
}
