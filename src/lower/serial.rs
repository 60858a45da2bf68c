//! Serial-port [`Channel`] for real hardware.
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use log::info;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::channel::Channel;
use super::errors::Result;

/// Read timeout of the port. The link polls `available` first, so reads
/// only block when the driver lied about buffered bytes.
const READ_TIMEOUT: Duration = Duration::from_micros(200);

/// UART to the lower MCU, 8N1 with no flow control.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;
        info!("opened {} at {} baud", path, baud);
        Ok(Self { port })
    }
}

impl Channel for SerialChannel {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(1) => Ok(Some(buf[0])),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn drain(&mut self) -> Result<usize> {
        let n = self.available()?;
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(n)
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("name", &self.port.name())
            .field("baud", &self.port.baud_rate().ok())
            .finish()
    }
}
