//! Push frames serviced outside of any request.
mod common;

use std::time::Duration;

use common::{frame, mock_link};
use minir4_link::lower::{ButtonEvent, ButtonState, Telemetry, Vector3};

#[test]
fn every_push_kind_updates_the_cache() {
    let (ch, mut link) = mock_link();
    let mut burst = frame(0x32, &[10, 0, 20, 0, 30, 0, 40, 0]);
    burst.extend(frame(0x33, &[0x10, 0x27, 0x00, 0x00, 0xF0, 0xD8]));
    burst.extend(frame(0x34, &[0x64, 0x00, 0x00, 0x00, 0x00, 0x00]));
    burst.extend(frame(0x35, &[0x00, 0x00, 0x00, 0x00, 0xE8, 0x03]));
    ch.inject(&burst);

    link.service().unwrap();
    let t = link.telemetry().snapshot();
    assert_eq!(t.encoders, [10, 20, 30, 40]);
    assert_eq!((t.euler.roll, t.euler.pitch, t.euler.yaw), (100.0, 0.0, -100.0));
    assert_eq!(t.gyro, Vector3 { x: 1.0, y: 0.0, z: 0.0 });
    assert_eq!(t.acc, Vector3 { x: 0.0, y: 0.0, z: 1.0 });
}

#[test]
fn repeated_push_is_idempotent() {
    let (ch, mut link) = mock_link();
    let push = frame(0x34, &[0x01, 0x00, 0x02, 0x00, 0x03, 0x00]);
    ch.inject(&push);
    link.service().unwrap();
    let first: Telemetry = link.telemetry().snapshot();
    ch.inject(&push);
    link.service().unwrap();
    assert_eq!(link.telemetry().snapshot(), first);
}

#[test]
fn cache_handle_reads_from_another_thread() {
    let (ch, mut link) = mock_link();
    let cache = link.telemetry();
    ch.inject(&frame(0x32, &[5, 0, 0, 0, 0, 0, 0, 0]));
    link.service().unwrap();
    let seen = std::thread::spawn(move || cache.encoders()[0]).join().unwrap();
    assert_eq!(seen, 5);
}

#[test]
fn button_events_go_to_a_std_channel() {
    let (ch, mut link) = mock_link();
    let (tx, rx) = std::sync::mpsc::channel();
    link.set_button_sink(tx);
    ch.inject(&frame(0x31, &[1, 1]));
    ch.inject(&frame(0x31, &[7, 1])); // no such button
    ch.inject(&frame(0x31, &[0, 3]));
    link.service().unwrap();

    let got: Vec<ButtonEvent> = rx.try_iter().collect();
    assert_eq!(
        got,
        vec![
            ButtonEvent { button: 2, state: ButtonState::FallingEdge },
            ButtonEvent { button: 1, state: ButtonState::Pressed },
        ]
    );
}

#[test]
fn push_without_sink_is_still_consumed() {
    let (ch, mut link) = mock_link();
    ch.inject(&frame(0x31, &[0, 4]));
    ch.inject(&frame(0x32, &[9, 0, 0, 0, 0, 0, 0, 0]));
    link.service().unwrap();
    assert_eq!(ch.pending_inbound(), 0);
    assert_eq!(link.telemetry().encoders()[0], 9);
}

#[test]
fn service_for_window_consumes_pushes() {
    let (ch, mut link) = mock_link();
    ch.inject(&frame(0x35, &[0xE8, 0x03, 0xE8, 0x03, 0xE8, 0x03]));
    link.service_for(Duration::from_millis(20)).unwrap();
    assert_eq!(link.telemetry().acc(), Vector3 { x: 1.0, y: 1.0, z: 1.0 });
}

#[tokio::test]
async fn button_events_go_to_a_tokio_channel() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let events = tokio::task::spawn_blocking(move || {
        let (ch, mut link) = mock_link();
        link.set_button_sink(tx);
        ch.inject(&frame(0x31, &[0, 4]));
        link.service().unwrap();
    });
    events.await.unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(event.button, 1);
    assert_eq!(event.state, ButtonState::RisingEdge);
    // Link dropped with its sink, so the channel closes.
    assert!(rx.recv().await.is_none());
}
