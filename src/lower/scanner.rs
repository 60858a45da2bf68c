//! Inbound header scanner.
//!
//! Bytes are consumed one at a time. Anything that is not the start of a
//! `LEAD, LEAD_COMPLEMENT` pair is dropped, which is how the link recovers
//! from noise or a torn frame. The scanner state outlives a single request so
//! that a push frame split across two waits is still recognised.
use log::{trace, warn};

use super::commands::CommandId;
use super::framer::{LEAD, LEAD_COMPLEMENT};
use crate::metrics;

/// Receiver state between inbound bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    AwaitLead,
    AwaitComplement,
    AwaitCommandId,
    /// Never entered by the transitions below; leaves on the next byte.
    Error,
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    /// Header incomplete, keep feeding.
    Pending,
    /// The awaited command id arrived; its payload follows on the channel.
    Matched(CommandId),
    /// A complete header for some other id; the caller hands it to the push handler.
    Foreign(u8),
}

#[derive(Debug, Default)]
pub struct FrameScanner {
    state: LinkState,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Abandon any partial header.
    pub fn reset(&mut self) {
        self.state = LinkState::AwaitLead;
    }

    /// Advance by one inbound byte while waiting for `expected` (or nothing,
    /// when only servicing pushes).
    pub fn step(&mut self, byte: u8, expected: Option<CommandId>) -> ScanEvent {
        match self.state {
            LinkState::AwaitLead => {
                if byte == LEAD {
                    self.state = LinkState::AwaitComplement;
                } else {
                    metrics::inc_resync_discards();
                    trace!("discarding {:02x} while awaiting lead", byte);
                }
                ScanEvent::Pending
            }
            LinkState::AwaitComplement => {
                if byte == LEAD_COMPLEMENT {
                    self.state = LinkState::AwaitCommandId;
                } else {
                    // Not re-tested as a lead: one byte consumed either way.
                    metrics::inc_resync_discards();
                    trace!("bad complement {:02x}, back to lead", byte);
                    self.state = LinkState::AwaitLead;
                }
                ScanEvent::Pending
            }
            LinkState::AwaitCommandId => {
                self.state = LinkState::AwaitLead;
                match expected {
                    Some(cmd) if cmd.as_u8() == byte => ScanEvent::Matched(cmd),
                    _ => ScanEvent::Foreign(byte),
                }
            }
            LinkState::Error => {
                warn!("scanner in error state, resetting");
                self.state = LinkState::AwaitLead;
                ScanEvent::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(s: &mut FrameScanner, bytes: &[u8], expected: Option<CommandId>) -> Vec<ScanEvent> {
        bytes
            .iter()
            .map(|b| s.step(*b, expected))
            .filter(|e| *e != ScanEvent::Pending)
            .collect()
    }

    #[test]
    fn clean_header_matches() {
        let mut s = FrameScanner::new();
        let ev = feed(&mut s, &[0x7B, 0x84, 0x25], Some(CommandId::GetImuEuler));
        assert_eq!(ev, vec![ScanEvent::Matched(CommandId::GetImuEuler)]);
        assert_eq!(s.state(), LinkState::AwaitLead);
    }

    #[test]
    fn garbage_then_header() {
        let mut s = FrameScanner::new();
        let ev = feed(
            &mut s,
            &[0x00, 0x84, 0xFF, 0x7B, 0x84, 0x11],
            Some(CommandId::SetMotorPower),
        );
        assert_eq!(ev, vec![ScanEvent::Matched(CommandId::SetMotorPower)]);
    }

    #[test]
    fn lead_inside_garbage_does_not_false_match() {
        let mut s = FrameScanner::new();
        // 7B 7B: second lead is consumed as a bad complement, not re-tested.
        let ev = feed(&mut s, &[0x7B, 0x7B, 0x84, 0x11], Some(CommandId::SetMotorPower));
        assert!(ev.is_empty());
        assert_eq!(s.state(), LinkState::AwaitLead);
    }

    #[test]
    fn complement_in_command_position_is_foreign() {
        let mut s = FrameScanner::new();
        let ev = feed(&mut s, &[0x7B, 0x84, 0x84], Some(CommandId::EchoTest));
        assert_eq!(ev, vec![ScanEvent::Foreign(0x84)]);
    }

    #[test]
    fn state_persists_between_calls() {
        let mut s = FrameScanner::new();
        assert!(feed(&mut s, &[0x7B, 0x84], None).is_empty());
        assert_eq!(s.state(), LinkState::AwaitCommandId);
        let ev = feed(&mut s, &[0x32], Some(CommandId::GetPowerInfo));
        assert_eq!(ev, vec![ScanEvent::Foreign(0x32)]);
    }

    #[test]
    fn nothing_expected_routes_everything_to_push() {
        let mut s = FrameScanner::new();
        let ev = feed(&mut s, &[0x7B, 0x84, 0x31], None);
        assert_eq!(ev, vec![ScanEvent::Foreign(0x31)]);
    }
}
