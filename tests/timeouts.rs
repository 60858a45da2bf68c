//! Deadline behaviour on a real clock and link bring-up.
mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::frame;
use minir4_link::lower::{LinkError, LinkOptions, LowerLink, MockChannel, StepClock};

#[test]
fn silent_device_times_out_near_the_default_wait() {
    let ch = MockChannel::new();
    let mut link = LowerLink::new(ch.clone());
    let started = Instant::now();
    let err = link.firmware_version().unwrap_err();
    let took = started.elapsed();
    assert!(matches!(err, LinkError::RequestTimeout(_)));
    assert!(took >= Duration::from_millis(100), "{:?}", took);
    assert!(took < Duration::from_millis(1000), "{:?}", took);
    // Request went out regardless.
    assert_eq!(ch.written(), vec![0x7B, 0x84, 0xFE]);
}

fn quick_opts(attempts: u32) -> LinkOptions {
    LinkOptions {
        init_attempts: attempts,
        ..LinkOptions::default()
    }
}

#[test]
fn init_gives_up_after_configured_attempts() {
    let ch = MockChannel::new();
    let mut link = LowerLink::with_clock(ch.clone(), StepClock::default(), quick_opts(3));
    let err = link.init().unwrap_err();
    assert!(matches!(err, LinkError::InitFailed { attempts: 3 }));
    let echoes = ch
        .written()
        .windows(3)
        .filter(|w| w == &[0x7B, 0x84, 0xFF])
        .count();
    assert_eq!(echoes, 3);
}

#[test]
fn init_succeeds_once_device_answers() {
    let ch = MockChannel::new();
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    ch.respond_with(move |req| {
        if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            None
        } else {
            Some(frame(0xFF, &[req[3]]))
        }
    });
    let mut link = LowerLink::with_clock(ch, StepClock::default(), quick_opts(5));
    let start = link.clock().peek();
    link.init().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // Settle period, then a retry gap after each of the three attempts.
    assert!(link.clock().peek() - start >= Duration::from_millis(1000 + 3 * 250));
}

#[test]
fn wrong_echo_counts_as_failure() {
    let ch = MockChannel::new();
    ch.respond_with(|_| Some(frame(0xFF, &[0x00])));
    let mut link = LowerLink::with_clock(ch, StepClock::default(), quick_opts(2));
    assert!(matches!(
        link.init(),
        Err(LinkError::InitFailed { attempts: 2 })
    ));
}
