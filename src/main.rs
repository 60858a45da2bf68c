//! Binary entrypoint for the minir4ctl CLI.
//!
//! Commands:
//! - `init` - write a starter `minir4.toml`
//! - `probe` - bring the board up and print a JSON summary
//! - `info` - print firmware version, build day, descriptor and model index
//! - `monitor [--seconds <n>]` - print button events, then a telemetry summary
//! - `motor <num> --power <p> | --speed <s>` - drive one DC motor
//! - `servo <num> <angle>` - position one servo
//!
//! See the library crate docs for module-level details: `minir4_link::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use minir4_link::config::Config;

#[derive(Parser)]
#[command(name = "minir4ctl")]
#[command(about = "Talk to the MiniR4 lower MCU over its serial link")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "minir4.toml", global = true)]
    config: String,

    /// Serial port, overriding `link.port` from the config
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Bring the board up and report what answered
    Probe,
    /// Print firmware identification
    Info,
    /// Print button events and collect push telemetry for a while
    Monitor {
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,
    },
    /// Run one DC motor at a power or speed
    Motor {
        /// Motor port, 1..=4
        num: u8,
        #[arg(long, allow_hyphen_values = true, conflicts_with = "speed")]
        power: Option<i16>,
        #[arg(long, allow_hyphen_values = true)]
        speed: Option<i16>,
    },
    /// Move one servo to an angle
    Servo {
        /// Servo port, 1..=4
        num: u8,
        angle: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init writes the config, so there is nothing to load yet.
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        command => {
            let mut config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            if let Some(port) = cli.port {
                config.link.port = port;
            }
            hardware::run(command, config).await?;
        }
    }

    Ok(())
}

#[cfg(not(feature = "serial"))]
mod hardware {
    use super::*;

    pub async fn run(_command: Commands, _config: Config) -> Result<()> {
        log::error!("this command needs the 'serial' feature");
        std::process::exit(2);
    }
}

#[cfg(feature = "serial")]
mod hardware {
    use super::*;
    use anyhow::Context;
    use log::{error, warn};
    use std::time::{Duration, Instant};

    use minir4_link::lower::{ButtonEvent, LowerLink, SerialChannel, SystemClock};
    use minir4_link::metrics;
    use minir4_link::ports::{self, DcMotor, Servo};

    type Link = LowerLink<SerialChannel, SystemClock>;

    fn open(config: &Config) -> Result<Link> {
        let channel = SerialChannel::open(&config.link.port, config.link.baud_rate)
            .with_context(|| format!("Failed to open {}", config.link.port))?;
        Ok(LowerLink::with_clock(
            channel,
            SystemClock::new(),
            config.link.options(),
        ))
    }

    /// The link busy-polls, so every session runs on the blocking pool.
    async fn blocking<T, F>(config: Config, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Link) -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(move || {
            let mut link = open(&config)?;
            f(&mut link)
        })
        .await?
    }

    pub async fn run(command: Commands, config: Config) -> Result<()> {
        info!(
            "Using {} at {} baud",
            config.link.port, config.link.baud_rate
        );
        match command {
            // Written before any link is opened.
            Commands::Init => Ok(()),
            Commands::Probe => probe(config).await,
            Commands::Info => {
                let (all, descriptor) = blocking(config, |link| {
                    link.init()?;
                    let all = link.all_info()?;
                    let descriptor = link.firmware_descriptor()?;
                    Ok((all, descriptor))
                })
                .await?;
                println!("firmware version : {}", all.fw_version);
                println!("build day        : {}", all.fw_build_day);
                println!("model index      : {}", all.model_index);
                println!("descriptor       : {}", descriptor);
                Ok(())
            }
            Commands::Monitor { seconds } => monitor(config, seconds).await,
            Commands::Motor { num, power, speed } => {
                blocking(config, move |link| {
                    link.init()?;
                    let motor = DcMotor::new(num)?;
                    motor.begin(link)?;
                    match (power, speed) {
                        (Some(p), _) => motor.set_power(link, p)?,
                        (None, Some(s)) => motor.set_speed(link, s)?,
                        (None, None) => warn!("neither --power nor --speed given; motor left off"),
                    }
                    Ok(())
                })
                .await
            }
            Commands::Servo { num, angle } => {
                blocking(config, move |link| {
                    link.init()?;
                    let servo = Servo::new(num)?;
                    servo.begin(link)?;
                    servo.set_angle(link, angle)?;
                    Ok(())
                })
                .await
            }
        }
    }

    async fn probe(config: Config) -> Result<()> {
        let port = config.link.port.clone();
        let outcome = blocking(config, |link| {
            if let Err(e) = ports::bring_up(link) {
                return Ok(Err(e));
            }
            let all = link.all_info()?;
            let power = link.power_info()?;
            Ok(Ok((all, power)))
        })
        .await?;

        match outcome {
            Ok((all, power)) => {
                let payload = serde_json::json!({
                    "status": "ok",
                    "port": port,
                    "firmware": all,
                    "power": power,
                    "metrics": metrics::snapshot(),
                });
                println!("{}", payload);
                Ok(())
            }
            Err(e) => {
                error!("Bring-up failed: {}", e);
                let payload = serde_json::json!({
                    "status": "failed",
                    "port": port,
                    "error": e.to_string(),
                    "metrics": metrics::snapshot(),
                });
                println!("{}", payload);
                std::process::exit(1);
            }
        }
    }

    async fn monitor(config: Config, seconds: u64) -> Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ButtonEvent>();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                println!("button {} {:?}", event.button, event.state);
            }
        });

        let window = Duration::from_secs(seconds);
        let telemetry = blocking(config, move |link| {
            link.init()?;
            link.set_button_sink(tx);
            let cache = link.telemetry();
            let started = Instant::now();
            while started.elapsed() < window {
                link.service_for(Duration::from_millis(100))?;
            }
            Ok(cache.snapshot())
        })
        .await?;

        // The sink was dropped with the link, which ends the printer.
        let _ = printer.await;
        let payload = serde_json::json!({
            "telemetry": telemetry,
            "metrics": metrics::snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        Ok(())
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when someone is watching it.
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
