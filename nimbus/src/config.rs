//! Command line and config file
//!
//! Values come from, in order of precedence: CLI flags (and
//! `NIMBUS_API_KEY`), then `config.toml`, then built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nimbus_core::{ActionLoggerConfig, Coordinate};
use serde::Deserialize;

use crate::api::DEFAULT_BASE_URL;
use crate::notifier::DEFAULT_PERIOD;

/// Current weather for saved places or GPS
#[derive(Parser, Debug)]
#[command(name = "nimbus")]
#[command(about = "Current weather for saved places or GPS, with background notifications")]
pub struct Args {
    /// Config file (default: <config dir>/nimbus/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// weatherapi.com key
    #[arg(long, env = "NIMBUS_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Weather API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Where the location database and settings live
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Device latitude; enables GPS lookups together with --lon
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Device longitude
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Log every dispatched action
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive driver reading commands from stdin (default)
    Watch,
    /// Post weather notifications periodically
    Notify {
        /// Post a single notification and exit
        #[arg(long)]
        once: bool,
        /// Minutes between notifications
        #[arg(long)]
        minutes: Option<u64>,
    },
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notify_minutes: Option<u64>,
    pub log: LogConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Comma-separated action name globs to log
    pub include: Option<String>,
    /// Comma-separated action name globs to skip
    pub exclude: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Everything the binary needs, resolved
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub coordinate: Option<Coordinate>,
    pub notify_period: Duration,
    pub log: ActionLoggerConfig,
    pub debug: bool,
}

impl Config {
    /// Read the config file named by `args` (or the default one, if present)
    /// and merge it with the flags
    pub fn load(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => FileConfig::load(&path)?,
                _ => FileConfig::default(),
            },
        };
        Self::merge(args, file)
    }

    pub fn merge(args: &Args, file: FileConfig) -> Result<Self> {
        let api_key = args
            .api_key
            .clone()
            .or(file.api_key)
            .filter(|k| !k.trim().is_empty())
            .context("No API key: pass --api-key, set NIMBUS_API_KEY or add api_key to config.toml")?;

        let base_url = args
            .base_url
            .clone()
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let data_dir = match args.data_dir.clone().or(file.data_dir) {
            Some(dir) => dir,
            None => dirs::data_dir()
                .context("Failed to get data directory")?
                .join("nimbus"),
        };

        let coordinate = match (args.lat.or(file.latitude), args.lon.or(file.longitude)) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    bail!("Coordinate out of range: {lat},{lon}");
                }
                Some(Coordinate { lat, lon })
            }
            (None, None) => None,
            _ => bail!("Latitude and longitude must be given together"),
        };

        let notify_period = file
            .notify_minutes
            .map(notify_period)
            .unwrap_or(DEFAULT_PERIOD);

        let log = ActionLoggerConfig::new(file.log.include.as_deref(), file.log.exclude.as_deref());

        Ok(Self {
            api_key,
            base_url,
            data_dir,
            coordinate,
            notify_period,
            log,
            debug: args.debug,
        })
    }

    pub fn locations_db(&self) -> PathBuf {
        self.data_dir.join("locations.db")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.toml")
    }
}

/// Longest notification period: one week
pub const MAX_NOTIFY_MINUTES: u64 = 7 * 24 * 60;

/// Notification period for a number of minutes, clamped to 1..=one week
pub fn notify_period(minutes: u64) -> Duration {
    Duration::from_secs(minutes.clamp(1, MAX_NOTIFY_MINUTES) * 60)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nimbus").join("config.toml"))
}
