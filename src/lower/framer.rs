//! Outbound frame construction.
//!
//! A frame on the lower MCU link is:
//!
//!   `0x7B 0x84 <command id> <payload>`
//!
//! The payload has no length prefix and no checksum; its size is implied by
//! the command id. Multi-byte integers are little-endian and floats are sent
//! as their IEEE-754 bytes in the same order.
use bytes::{BufMut, Bytes, BytesMut};

use super::commands::CommandId;

/// Frame lead sentinel.
pub const LEAD: u8 = 0x7B;
/// Bitwise complement of [`LEAD`], second header byte.
pub const LEAD_COMPLEMENT: u8 = !LEAD;
/// Header bytes before the payload.
pub const HEADER_LEN: usize = 3;

/// A request under construction: command id plus typed payload fields.
#[derive(Debug, Clone)]
pub struct Request {
    command: CommandId,
    payload: BytesMut,
}

impl Request {
    pub fn new(command: CommandId) -> Self {
        Self {
            command,
            payload: BytesMut::with_capacity(32),
        }
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.payload.put_u8(v);
        self
    }

    pub fn flag(self, v: bool) -> Self {
        self.u8(v as u8)
    }

    pub fn i16(mut self, v: i16) -> Self {
        self.payload.put_i16_le(v);
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.payload.put_u16_le(v);
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.payload.put_u32_le(v);
        self
    }

    pub fn f32(mut self, v: f32) -> Self {
        self.payload.put_f32_le(v);
        self
    }

    pub fn bytes(mut self, v: &[u8]) -> Self {
        self.payload.put_slice(v);
        self
    }

    pub fn command(&self) -> CommandId {
        self.command
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serialize header and payload into one wire buffer.
    pub fn encode(&self) -> Bytes {
        encode_frame(self.command, &self.payload)
    }
}

/// Build the wire bytes for `command` carrying `payload`.
pub fn encode_frame(command: CommandId, payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len());
    out.put_u8(LEAD);
    out.put_u8(LEAD_COMPLEMENT);
    out.put_u8(command.as_u8());
    out.put_slice(payload);
    out.freeze()
}

/// Little-endian readers over a fixed reply buffer, the decoding side of
/// the `BufMut` writers above.
///
/// Callers always read a reply of known length first, so every offset used
/// by the dispatcher is in bounds by construction.
pub(crate) mod le {
    use bytes::Buf;

    pub fn i16_at(b: &[u8], at: usize) -> i16 {
        (&b[at..]).get_i16_le()
    }

    pub fn u16_at(b: &[u8], at: usize) -> u16 {
        (&b[at..]).get_u16_le()
    }

    pub fn i32_at(b: &[u8], at: usize) -> i32 {
        (&b[at..]).get_i32_le()
    }

    pub fn f32_at(b: &[u8], at: usize) -> f32 {
        (&b[at..]).get_f32_le()
    }
}
