//! Diagnostics and firmware identification (0xF9..0xFF).
use log::debug;

use super::channel::Channel;
use super::clock::Clock;
use super::commands::CommandId;
use super::errors::{LinkError, Result};
use super::framer::{le, Request};
use super::types::AllInfo;
use super::LowerLink;
use crate::logutil::escape_log;

/// Byte the echo test expects back.
pub const ECHO_PATTERN: u8 = 0x55;

impl<C: Channel, K: Clock> LowerLink<C, K> {
    /// Link health check: the lower MCU returns the byte it was sent.
    pub fn echo_test(&mut self) -> Result<()> {
        let command = CommandId::EchoTest;
        let reply = self.exchange(Request::new(command).u8(ECHO_PATTERN), 1)?;
        if reply[0] == ECHO_PATTERN {
            Ok(())
        } else {
            Err(LinkError::Device {
                command,
                status: reply[0],
            })
        }
    }

    /// Firmware version, e.g. `"1.20"` for a raw 12.
    pub fn firmware_version(&mut self) -> Result<String> {
        let reply = self.exchange(Request::new(CommandId::FirmwareVersion), 1)?;
        Ok(format!("{:.2}", reply[0] as f32 / 10.0))
    }

    /// Firmware build date as `YYYY-MM-DD`.
    pub fn firmware_build_day(&mut self) -> Result<String> {
        let b = self.exchange(Request::new(CommandId::FirmwareBuildDay), 4)?;
        Ok(format!("{:04}-{:02}-{:02}", le::u16_at(&b, 0), b[2], b[3]))
    }

    /// Free-form firmware description, length-prefixed on the wire.
    pub fn firmware_descriptor(&mut self) -> Result<String> {
        let command = CommandId::FirmwareDescriptor;
        let len = self.exchange(Request::new(command), 1)?[0] as usize;
        let read = self.options().reply_read_timeout;
        let text = match self.read_payload(len, read)? {
            Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            None => {
                return Err(LinkError::ReplyReadTimeout {
                    command,
                    expected: len,
                })
            }
        };
        debug!("firmware descriptor: {}", escape_log(&text));
        Ok(text)
    }

    pub fn model_index(&mut self) -> Result<u8> {
        Ok(self.exchange(Request::new(CommandId::ReadModelIndex), 1)?[0])
    }

    /// Version, build day and model index in three exchanges.
    pub fn all_info(&mut self) -> Result<AllInfo> {
        Ok(AllInfo {
            fw_version: self.firmware_version()?,
            fw_build_day: self.firmware_build_day()?,
            model_index: self.model_index()?,
        })
    }

    /// Run the lower MCU's self test. Bit 0 of the result is the IMU check.
    pub fn run_auto_qc(&mut self) -> Result<()> {
        let reply = self.exchange(Request::new(CommandId::RunAutoQc), 1)?;
        if reply[0] & 0x01 == 0 {
            return Err(LinkError::QcImuFailed);
        }
        Ok(())
    }
}
