//! Process-wide link counters.
//! Cheap relaxed atomics; read them all at once through [`snapshot`].
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static FRAMES_SENT: AtomicU64 = AtomicU64::new(0);
static REPLIES_MATCHED: AtomicU64 = AtomicU64::new(0);
static PUSH_FRAMES: AtomicU64 = AtomicU64::new(0);
static UNKNOWN_PUSH: AtomicU64 = AtomicU64::new(0);
static REQUEST_TIMEOUTS: AtomicU64 = AtomicU64::new(0);
static REPLY_READ_TIMEOUTS: AtomicU64 = AtomicU64::new(0);
static RESYNC_DISCARDS: AtomicU64 = AtomicU64::new(0);
static WRAPPER_RETRIES: AtomicU64 = AtomicU64::new(0);

pub fn inc_frames_sent() {
    FRAMES_SENT.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_replies_matched() {
    REPLIES_MATCHED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_push_frames() {
    PUSH_FRAMES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_unknown_push() {
    UNKNOWN_PUSH.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_request_timeouts() {
    REQUEST_TIMEOUTS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_reply_read_timeouts() {
    REPLY_READ_TIMEOUTS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_resync_discards() {
    RESYNC_DISCARDS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_wrapper_retries() {
    WRAPPER_RETRIES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub frames_sent: u64,
    pub replies_matched: u64,
    pub push_frames: u64,
    pub unknown_push: u64,
    pub request_timeouts: u64,
    pub reply_read_timeouts: u64,
    pub resync_discards: u64,
    pub wrapper_retries: u64,
}

impl Snapshot {
    /// Share of sent frames that got their reply, `None` before any traffic.
    pub fn reply_ratio(&self) -> Option<f64> {
        if self.frames_sent == 0 {
            None
        } else {
            Some(self.replies_matched as f64 / self.frames_sent as f64)
        }
    }
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        frames_sent: FRAMES_SENT.load(Ordering::Relaxed),
        replies_matched: REPLIES_MATCHED.load(Ordering::Relaxed),
        push_frames: PUSH_FRAMES.load(Ordering::Relaxed),
        unknown_push: UNKNOWN_PUSH.load(Ordering::Relaxed),
        request_timeouts: REQUEST_TIMEOUTS.load(Ordering::Relaxed),
        reply_read_timeouts: REPLY_READ_TIMEOUTS.load(Ordering::Relaxed),
        resync_discards: RESYNC_DISCARDS.load(Ordering::Relaxed),
        wrapper_retries: WRAPPER_RETRIES.load(Ordering::Relaxed),
    }
}
