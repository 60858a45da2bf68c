//! # minir4-link - host side of the MiniR4 lower MCU link
//!
//! The MiniR4 board splits its work between an application processor and a
//! lower MCU that owns the motors, servos, encoders, buttons, IMU and battery
//! monitor. The two talk over a half-duplex UART using short frames:
//!
//! ```text
//! 0x7B 0x84 <command id> <payload...>
//! ```
//!
//! There is no length field and no checksum. Payload length is implied by the
//! command id, and the lower MCU also sends unsolicited "push" frames
//! (button changes, encoder and IMU snapshots) whenever it likes.
//!
//! ## Features
//!
//! - **Framed link**: request encoding, a four-state header scanner that
//!   resynchronises on garbage, and fixed-length reply reads with deadlines.
//! - **Full command catalog**: every setup, setter, getter, drive-base and
//!   diagnostic command as a typed method on [`lower::LowerLink`].
//! - **Push handling**: a shared [`lower::TelemetryCache`] and button events
//!   delivered to a callback or channel.
//! - **Board facades**: per-port motor, servo, button, battery and IMU helpers
//!   plus the drive-base retry/poll wrappers in [`ports`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> minir4_link::lower::Result<()> {
//! use minir4_link::lower::{LowerLink, SerialChannel, DEFAULT_BAUD};
//! use minir4_link::ports::{self, DcMotor};
//!
//! let channel = SerialChannel::open("/dev/ttyACM0", DEFAULT_BAUD)?;
//! let mut link = LowerLink::new(channel);
//! ports::bring_up(&mut link)?;
//!
//! let m1 = DcMotor::new(1)?;
//! m1.set_speed(&mut link, 40)?;
//! println!("encoder: {}", m1.counter(&mut link)?);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```
//!
//! ## Module Organization
//!
//! - [`lower`] - framer, scanner, dispatcher, push handler and channels
//! - [`ports`] - per-port facades, drive base and board bring-up
//! - [`config`] - TOML configuration
//! - [`validation`] - port number checks and wire remapping
//! - [`metrics`] - process-wide link counters
//! - [`logutil`] - log formatting helpers

pub mod config;
pub mod logutil;
pub mod lower;
pub mod metrics;
pub mod ports;
pub mod validation;
