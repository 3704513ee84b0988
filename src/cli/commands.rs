use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::cli::daemon::{drop_privileges, notify_ready, open_wake_keyboard};
use crate::core::{
    config::Config,
    monitor::ReaderMonitor,
    reader::PcscContext,
    relay::{connect_udp, Relay},
};

#[derive(Parser, Debug)]
#[command(name = "nfc-bridge")]
#[command(about = "Relay NFC card identifiers from PC/SC readers to a local UDP listener")]
#[command(version)]
pub struct Cli {
    /// Read settings from a JSON file (flags given here take precedence)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Leave the reader's card detection beep switched on
    #[arg(long)]
    pub beep: bool,

    /// Host to send card identifiers to [default: 127.0.0.1]
    #[arg(long)]
    pub host: Option<String>,

    /// UDP port to send card identifiers to [default: 8455]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Press a key on a virtual keyboard before each card, to wake the display
    #[arg(short, long)]
    pub keypress: bool,

    /// Switch to this user once the readers are initialised
    #[arg(short, long)]
    pub user: Option<String>,

    /// Notify systemd once the readers are initialised
    #[arg(long)]
    pub systemd: bool,

    /// Longest single wait for reader events, in seconds [default: 3600]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Settings from the config file (if any) with command line flags on top
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if self.beep {
            config.beep = true;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.keypress {
            config.keypress = true;
        }
        if let Some(user) = &self.user {
            config.user = Some(user.clone());
        }
        if self.systemd {
            config.systemd = true;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else if self.verbose {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        }
    }
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level())
        .init();

    let config = cli.config()?;
    run(&config)
}

/// Open everything, then monitor readers until PC/SC fails
pub fn run(config: &Config) -> Result<()> {
    let ctx = PcscContext::establish().context("Failed to initialize PCSC")?;

    let socket = connect_udp(&config.host, config.port).with_context(|| {
        format!(
            "Failed to open UDP socket to {}:{}",
            config.host, config.port
        )
    })?;
    let mut relay = Relay::new(Box::new(socket));
    if config.keypress {
        relay = relay.with_wake(open_wake_keyboard()?);
    }

    let mut monitor =
        ReaderMonitor::new(ctx, relay, config).context("Failed to initialise readers")?;
    log::info!("Monitoring {} reader(s)", monitor.registry().len());

    if let Some(user) = &config.user {
        drop_privileges(user)?;
    }
    if config.systemd {
        notify_ready()?;
    }

    monitor.run().context("Reader monitor stopped")?;
    Ok(())
}
