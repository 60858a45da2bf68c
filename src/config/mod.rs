//! # Configuration Management Module
//!
//! Runtime settings for `minir4ctl` and for embedders who want the same file
//! format: which serial port the lower MCU sits on, link timing, drive-base
//! retry cadence and logging.
//!
//! ## Configuration Structure
//!
//! - [`LinkConfig`] - serial port and link timing, converts into
//!   [`LinkOptions`](crate::lower::LinkOptions)
//! - [`DriveConfig`] - drive-base wrapper cadence, converts into
//!   [`DriveTuning`](crate::ports::DriveTuning)
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use minir4_link::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("minir4.toml").await?;
//!     let config = Config::load("minir4.toml").await?;
//!     println!("port: {}", config.link.port);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [link]
//! port = "/dev/ttyACM0"
//! baud_rate = 57600
//! settle_ms = 1000
//!
//! [drive]
//! retry_limit = 10
//! brake_delay = true
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every key has a default, so a file only needs the values it changes.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::lower::{LinkOptions, DEFAULT_BAUD};
use crate::ports::drive::{DriveTuning, DEFAULT_BRAKE_SETTLE};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Quiet period after opening the port before the first echo test (ms).
    pub settle_ms: u64,
    pub init_attempts: u32,
    pub init_retry_gap_ms: u64,
    /// Deadline for a reply payload after its header (ms).
    pub reply_read_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: DEFAULT_BAUD,
            settle_ms: 1000,
            init_attempts: 50,
            init_retry_gap_ms: 250,
            reply_read_timeout_ms: 10,
        }
    }
}

impl LinkConfig {
    pub fn options(&self) -> LinkOptions {
        LinkOptions {
            settle: Duration::from_millis(self.settle_ms),
            init_attempts: self.init_attempts,
            init_retry_gap: Duration::from_millis(self.init_retry_gap_ms),
            reply_read_timeout: Duration::from_millis(self.reply_read_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub retry_limit: u32,
    pub retry_gap_ms: u64,
    pub begin_attempts: u32,
    pub begin_retry_gap_ms: u64,
    /// Pause after blocking motions so the motors stop before returning.
    pub brake_delay: bool,
    /// Length of that pause; 110 ms when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brake_settle_ms: Option<u64>,
    pub poll_timeout_ms: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        let t = DriveTuning::default();
        Self {
            retry_limit: t.retry_limit,
            retry_gap_ms: t.retry_gap.as_millis() as u64,
            begin_attempts: t.begin_attempts,
            begin_retry_gap_ms: t.begin_retry_gap.as_millis() as u64,
            brake_delay: false,
            brake_settle_ms: None,
            poll_timeout_ms: t.poll_timeout.as_millis() as u64,
        }
    }
}

impl DriveConfig {
    pub fn tuning(&self) -> DriveTuning {
        let brake_settle = self.brake_delay.then(|| {
            self.brake_settle_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_BRAKE_SETTLE)
        });
        DriveTuning {
            retry_limit: self.retry_limit,
            retry_gap: Duration::from_millis(self.retry_gap_ms),
            begin_attempts: self.begin_attempts,
            begin_retry_gap: Duration::from_millis(self.begin_retry_gap_ms),
            brake_settle,
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
            ..DriveTuning::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values the link cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.link.port.trim().is_empty() {
            return Err(anyhow!("link.port must not be empty"));
        }
        if self.link.baud_rate == 0 {
            return Err(anyhow!("link.baud_rate must be non-zero"));
        }
        if self.link.init_attempts == 0 {
            return Err(anyhow!("link.init_attempts must be at least 1"));
        }
        if self.drive.begin_attempts == 0 {
            return Err(anyhow!("drive.begin_attempts must be at least 1"));
        }
        if self.drive.poll_timeout_ms == 0 {
            return Err(anyhow!("drive.poll_timeout_ms must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.link.baud_rate, 57_600);
        assert_eq!(config.link.options(), LinkOptions::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[link]\nport = \"/dev/ttyUSB1\"\n").unwrap();
        assert_eq!(config.link.port, "/dev/ttyUSB1");
        assert_eq!(config.link.settle_ms, 1000);
        assert_eq!(config.drive.retry_limit, 10);
    }

    #[test]
    fn brake_delay_defaults_to_110ms() {
        let mut drive = DriveConfig::default();
        assert_eq!(drive.tuning().brake_settle, None);
        drive.brake_delay = true;
        assert_eq!(drive.tuning().brake_settle, Some(Duration::from_millis(110)));
        drive.brake_settle_ms = Some(200);
        assert_eq!(drive.tuning().brake_settle, Some(Duration::from_millis(200)));
    }

    #[test]
    fn default_tuning_round_trips() {
        assert_eq!(DriveConfig::default().tuning(), DriveTuning::default());
    }

    #[test]
    fn validation_rejects_zero_attempts() {
        let mut config = Config::default();
        config.link.init_attempts = 0;
        assert!(config.validate().is_err());
    }
}
