//! Byte channel abstraction under the link.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::Result;

/// Half-duplex byte channel to the lower MCU.
pub trait Channel: Send {
    /// Queue `data` for transmission.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Block until queued bytes have left the host.
    fn flush(&mut self) -> Result<()>;

    /// Bytes received and not yet read.
    fn available(&mut self) -> Result<usize>;

    /// Pop one received byte, `None` if nothing is buffered.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Discard everything currently buffered, returning how many bytes went.
    fn drain(&mut self) -> Result<usize> {
        let mut n = 0;
        while self.read_byte()?.is_some() {
            n += 1;
        }
        Ok(n)
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn drain(&mut self) -> Result<usize> {
        (**self).drain()
    }
}

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

/// In-memory channel for tests and dry runs.
///
/// Clones share one buffer pair, so a test keeps a handle while the link owns
/// another.
#[derive(Clone, Default)]
pub struct MockChannel {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Default)]
struct MockInner {
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    responder: Option<Responder>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue bytes as if the lower MCU had sent them.
    pub fn inject(&self, data: &[u8]) {
        self.lock().inbound.extend(data);
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Return and clear everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().written)
    }

    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Answer each written frame with the bytes `f` returns.
    pub fn respond_with<F>(&self, f: F)
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(f));
    }
}

impl std::fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MockChannel")
            .field("inbound", &inner.inbound.len())
            .field("written", &inner.written.len())
            .field("responder", &inner.responder.is_some())
            .finish()
    }
}

impl Channel for MockChannel {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        inner.written.extend_from_slice(data);
        if let Some(reply) = inner.responder.as_mut().and_then(|r| r(data)) {
            inner.inbound.extend(reply);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.lock().inbound.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.lock().inbound.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_buffers() {
        let handle = MockChannel::new();
        let mut ch = handle.clone();
        handle.inject(&[1, 2, 3]);
        assert_eq!(ch.available().unwrap(), 3);
        assert_eq!(ch.read_byte().unwrap(), Some(1));
        ch.write(&[9]).unwrap();
        assert_eq!(handle.written(), vec![9]);
        assert_eq!(ch.drain().unwrap(), 2);
        assert_eq!(ch.read_byte().unwrap(), None);
    }

    #[test]
    fn responder_feeds_inbound() {
        let handle = MockChannel::new();
        handle.respond_with(|frame| Some(vec![frame.len() as u8]));
        let mut ch = handle.clone();
        ch.write(&[0xAA, 0xBB]).unwrap();
        assert_eq!(ch.read_byte().unwrap(), Some(2));
    }
}
