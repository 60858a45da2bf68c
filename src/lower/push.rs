//! Unsolicited frames: button changes and periodic encoder/IMU snapshots.
//!
//! The link hands every header it was not waiting for to [`PushHandler`]
//! together with that id's payload. Known push ids update the shared
//! [`TelemetryCache`]; anything else is ignored so newer firmware can add
//! frames without breaking older hosts.
use std::sync::{Arc, RwLock};

use log::{debug, trace};
use serde::Serialize;

use super::commands::CommandId;
use super::framer::le;
use super::types::{ButtonState, Euler, Vector3};
use crate::metrics;

/// Number of buttons the lower MCU reports on.
pub const BUTTON_COUNT: u8 = 2;
/// Encoder channels in the counter push.
pub const ENCODER_COUNT: usize = 4;

/// Last values pushed by the lower MCU.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Telemetry {
    pub encoders: [i32; ENCODER_COUNT],
    pub euler: Euler,
    pub gyro: Vector3,
    pub acc: Vector3,
}

/// Shared handle to [`Telemetry`].
///
/// Only the push handler writes; any thread may read a copy.
#[derive(Debug, Clone, Default)]
pub struct TelemetryCache {
    inner: Arc<RwLock<Telemetry>>,
}

impl TelemetryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Telemetry {
        *self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    pub fn encoders(&self) -> [i32; ENCODER_COUNT] {
        self.snapshot().encoders
    }

    pub fn gyro(&self) -> Vector3 {
        self.snapshot().gyro
    }

    pub fn acc(&self) -> Vector3 {
        self.snapshot().acc
    }

    pub fn euler(&self) -> Euler {
        self.snapshot().euler
    }

    fn update(&self, f: impl FnOnce(&mut Telemetry)) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        f(&mut guard);
    }
}

/// Button change delivered to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonEvent {
    /// 1-based button number.
    pub button: u8,
    pub state: ButtonState,
}

/// Receiver of button change events.
pub trait ButtonSink: Send {
    fn button_changed(&mut self, event: ButtonEvent);
}

struct CallbackSink<F>(F);

impl<F> ButtonSink for CallbackSink<F>
where
    F: FnMut(ButtonEvent) + Send,
{
    fn button_changed(&mut self, event: ButtonEvent) {
        (self.0)(event)
    }
}

impl ButtonSink for std::sync::mpsc::Sender<ButtonEvent> {
    fn button_changed(&mut self, event: ButtonEvent) {
        // Receiver gone means nobody is listening; nothing to do.
        let _ = self.send(event);
    }
}

impl ButtonSink for tokio::sync::mpsc::UnboundedSender<ButtonEvent> {
    fn button_changed(&mut self, event: ButtonEvent) {
        let _ = self.send(event);
    }
}

/// Decoder for push frames.
#[derive(Default)]
pub struct PushHandler {
    cache: TelemetryCache,
    sink: Option<Box<dyn ButtonSink>>,
}

impl PushHandler {
    pub fn new(cache: TelemetryCache) -> Self {
        Self { cache, sink: None }
    }

    pub fn cache(&self) -> &TelemetryCache {
        &self.cache
    }

    /// Call `f` for every button change.
    pub fn on_button<F>(&mut self, f: F)
    where
        F: FnMut(ButtonEvent) + Send + 'static,
    {
        self.sink = Some(Box::new(CallbackSink(f)));
    }

    /// Deliver button changes into `sink` (a channel sender or custom type).
    pub fn set_sink<S: ButtonSink + 'static>(&mut self, sink: S) {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Payload length to read after a header carrying `id`, if it is a push.
    pub fn payload_len(id: u8) -> Option<usize> {
        CommandId::try_from(id)
            .ok()
            .filter(|c| c.is_push())
            .and_then(|c| c.reply_len())
    }

    /// Apply one push frame. `payload` is exactly [`Self::payload_len`] bytes.
    pub fn apply(&mut self, id: u8, payload: &[u8]) {
        let Ok(cmd) = CommandId::try_from(id) else {
            metrics::inc_unknown_push();
            debug!("ignoring unknown frame id {:#04x}", id);
            return;
        };
        metrics::inc_push_frames();
        match cmd {
            CommandId::PushButtonState => self.button(payload),
            CommandId::PushEncoderCounter => self.cache.update(|t| {
                for (i, slot) in t.encoders.iter_mut().enumerate() {
                    *slot = le::i16_at(payload, i * 2) as i32;
                }
            }),
            CommandId::PushImuEuler => self
                .cache
                .update(|t| t.euler = Vector3::from_i16_le(payload, 100.0).into()),
            CommandId::PushImuGyro => self
                .cache
                .update(|t| t.gyro = Vector3::from_i16_le(payload, 100.0)),
            CommandId::PushImuAcc => self
                .cache
                .update(|t| t.acc = Vector3::from_i16_le(payload, 1000.0)),
            other => {
                // A reply id showing up here is a late answer to an earlier
                // request that already timed out.
                debug!("stray {:?} frame outside its request", other);
            }
        }
    }

    fn button(&mut self, payload: &[u8]) {
        let (index, raw_state) = (payload[0], payload[1]);
        if index >= BUTTON_COUNT {
            trace!("button push for index {} ignored", index);
            return;
        }
        let Ok(state) = ButtonState::try_from(raw_state) else {
            debug!("button {} reported unknown state {}", index + 1, raw_state);
            return;
        };
        if let Some(sink) = self.sink.as_mut() {
            sink.button_changed(ButtonEvent {
                button: index + 1,
                state,
            });
        }
    }
}

impl std::fmt::Debug for PushHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushHandler")
            .field("cache", &self.cache)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn encoder_push_is_idempotent() {
        let mut h = PushHandler::default();
        let payload = [0x10, 0x00, 0xFF, 0xFF, 0x00, 0x80, 0xFF, 0x7F];
        h.apply(0x32, &payload);
        let first = h.cache().encoders();
        h.apply(0x32, &payload);
        assert_eq!(h.cache().encoders(), first);
        assert_eq!(first, [16, -1, -32768, 32767]);
    }

    #[test]
    fn gyro_and_acc_scaling() {
        let mut h = PushHandler::default();
        h.apply(0x34, &[0x64, 0x00, 0x9C, 0xFF, 0x00, 0x00]);
        h.apply(0x35, &[0xE8, 0x03, 0x00, 0x00, 0x18, 0xFC]);
        assert_eq!(h.cache().gyro(), Vector3 { x: 1.0, y: -1.0, z: 0.0 });
        assert_eq!(h.cache().acc(), Vector3 { x: 1.0, y: 0.0, z: -1.0 });
    }

    #[test]
    fn button_event_is_one_based() {
        let (tx, rx) = mpsc::channel();
        let mut h = PushHandler::default();
        h.set_sink(tx);
        h.apply(0x31, &[0x01, 0x03]);
        h.apply(0x31, &[0x02, 0x03]); // out of range index
        h.apply(0x31, &[0x00, 0x09]); // unknown state
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![ButtonEvent {
                button: 2,
                state: ButtonState::Pressed
            }]
        );
    }

    #[test]
    fn unknown_id_is_ignored() {
        let mut h = PushHandler::default();
        h.apply(0x36, &[]);
        assert_eq!(h.cache().snapshot(), Telemetry::default());
        assert_eq!(PushHandler::payload_len(0x36), None);
        assert_eq!(PushHandler::payload_len(0x11), None);
        assert_eq!(PushHandler::payload_len(0x33), Some(6));
    }
}
