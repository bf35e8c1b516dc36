//! Command line arguments and the optional TOML configuration file.
//!
//! Values are resolved in this order: command line (when it differs from its
//! default), then the config file, then built-in defaults.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::device::DeviceConfig;
use crate::epg::DEFAULT_GUIDE_URL;
use crate::scheduler::RefreshSchedulerConfig;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "hdhr-gateway.toml";

const DEFAULT_LISTEN: &str = "0.0.0.0:5000";
const DEFAULT_OUTPUT_DIR: &str = "static";
const DEFAULT_REFRESH_HOURS: u64 = 4;
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_RETENTION_DAYS: u64 = 7;
const DEFAULT_GUIDE_TIMEOUT_SECS: u64 = 30;

/// hdhr-gateway - Serves an HDHomeRun lineup as M3U and XMLTV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address for the HTTP server to listen on
    #[arg(short, long, default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,

    /// Directory where the playlist and guide are written
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Configuration file path
    #[arg(short = 'f', long)]
    pub config: Option<PathBuf>,

    /// Hours between scheduled refreshes
    #[arg(long, default_value_t = DEFAULT_REFRESH_HOURS)]
    pub refresh_interval_hours: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory where log files are stored
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Number of days to keep log files
    #[arg(long, default_value_t = DEFAULT_LOG_RETENTION_DAYS)]
    pub log_retention_days: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {value}")]
    Invalid { field: &'static str, value: String },
}

/// Configuration file format.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub refresh: RefreshSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct ServerSection {
    pub listen: Option<String>,
    pub output_dir: Option<String>,
    /// Externally reachable base URL, advertised as the playlist's guide.
    pub public_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DeviceSection {
    pub broadcast_addr: Option<String>,
    pub discover_port: Option<u16>,
    pub http_port: Option<u16>,
    pub cloud_discover_url: Option<String>,
    pub guide_url: Option<String>,
    pub udp_timeout_secs: Option<u64>,
    pub http_timeout_secs: Option<u64>,
    pub guide_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RefreshSection {
    pub interval_hours: Option<u64>,
    pub rediscover_after_failures: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingSection {
    pub log_dir: Option<String>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Explicit `--config`, else `hdhr-gateway.toml` if present.
pub fn config_path(args: &Args) -> Option<PathBuf> {
    args.config.clone().or_else(|| {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        default_path.exists().then_some(default_path)
    })
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    pub output_dir: PathBuf,
    pub public_url: Option<String>,
    pub device: DeviceConfig,
    pub guide_url: String,
    pub guide_timeout: Duration,
    pub refresh: RefreshSchedulerConfig,
    pub log_dir: PathBuf,
    pub log_retention_days: u64,
    pub log_level: Option<String>,
    pub verbose: bool,
}

impl Settings {
    /// Merge command line arguments over the config file.
    pub fn resolve(args: &Args, file: ConfigFile) -> Result<Self, ConfigError> {
        let listen = if args.listen.to_string() != DEFAULT_LISTEN {
            args.listen
        } else {
            match file.server.listen.as_deref() {
                Some(value) => parse_field("server.listen", value)?,
                None => args.listen,
            }
        };

        let output_dir = if args.output_dir != Path::new(DEFAULT_OUTPUT_DIR) {
            args.output_dir.clone()
        } else {
            PathBuf::from(file.server.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR))
        };

        let interval_hours = if args.refresh_interval_hours != DEFAULT_REFRESH_HOURS {
            args.refresh_interval_hours
        } else {
            file.refresh.interval_hours.unwrap_or(DEFAULT_REFRESH_HOURS)
        };
        if interval_hours == 0 {
            return Err(ConfigError::Invalid {
                field: "refresh interval",
                value: "0 hours".to_string(),
            });
        }

        let log_dir = if args.log_dir != Path::new(DEFAULT_LOG_DIR) {
            args.log_dir.clone()
        } else {
            PathBuf::from(file.logging.log_dir.as_deref().unwrap_or(DEFAULT_LOG_DIR))
        };

        let log_retention_days = if args.log_retention_days != DEFAULT_LOG_RETENTION_DAYS {
            args.log_retention_days
        } else {
            file.logging
                .retention_days
                .unwrap_or(DEFAULT_LOG_RETENTION_DAYS)
        };

        let defaults = DeviceConfig::default();
        let device_section = file.device;
        let broadcast_addr = match device_section.broadcast_addr.as_deref() {
            Some(value) => parse_field::<Ipv4Addr>("device.broadcast_addr", value)?,
            None => defaults.broadcast_addr,
        };
        let device = DeviceConfig {
            broadcast_addr,
            discover_port: device_section.discover_port.unwrap_or(defaults.discover_port),
            udp_timeout: device_section
                .udp_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.udp_timeout),
            cloud_discover_url: device_section
                .cloud_discover_url
                .unwrap_or(defaults.cloud_discover_url),
            http_port: device_section.http_port.unwrap_or(defaults.http_port),
            http_timeout: device_section
                .http_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        };

        Ok(Self {
            listen,
            output_dir,
            public_url: file
                .server
                .public_url
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            device,
            guide_url: device_section
                .guide_url
                .unwrap_or_else(|| DEFAULT_GUIDE_URL.to_string()),
            guide_timeout: Duration::from_secs(
                device_section
                    .guide_timeout_secs
                    .unwrap_or(DEFAULT_GUIDE_TIMEOUT_SECS),
            ),
            refresh: RefreshSchedulerConfig {
                interval: Duration::from_secs(interval_hours * 60 * 60),
                rediscover_after_failures: file.refresh.rediscover_after_failures.unwrap_or(0),
            },
            log_dir,
            log_retention_days,
            log_level: file.logging.level,
            verbose: args.verbose,
        })
    }

    /// Guide URL advertised in the playlist header, when a public URL is set.
    pub fn advertised_guide_url(&self) -> Option<String> {
        self.public_url.as_ref().map(|base| format!("{}/epg.xml", base))
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["hdhr-gateway"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&args(&[]), ConfigFile::default()).unwrap();

        assert_eq!(settings.listen, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(settings.output_dir, PathBuf::from("static"));
        assert_eq!(settings.refresh.interval, Duration::from_secs(4 * 3600));
        assert_eq!(settings.refresh.rediscover_after_failures, 0);
        assert_eq!(settings.device.broadcast_addr, Ipv4Addr::BROADCAST);
        assert_eq!(settings.device.discover_port, 65001);
        assert_eq!(settings.device.udp_timeout, Duration::from_secs(3));
        assert_eq!(settings.guide_url, DEFAULT_GUIDE_URL);
        assert_eq!(settings.guide_timeout, Duration::from_secs(30));
        assert_eq!(settings.advertised_guide_url(), None);
    }

    #[test]
    fn test_file_values_applied() {
        let file: ConfigFile = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:8080"
            output_dir = "/var/lib/hdhr"
            public_url = "http://gateway.lan:8080/"

            [device]
            broadcast_addr = "192.168.1.255"
            http_port = 8000
            udp_timeout_secs = 1

            [refresh]
            interval_hours = 12
            rediscover_after_failures = 3

            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        let settings = Settings::resolve(&args(&[]), file).unwrap();
        assert_eq!(settings.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(settings.output_dir, PathBuf::from("/var/lib/hdhr"));
        assert_eq!(settings.device.broadcast_addr, Ipv4Addr::new(192, 168, 1, 255));
        assert_eq!(settings.device.http_port, 8000);
        assert_eq!(settings.device.udp_timeout, Duration::from_secs(1));
        assert_eq!(settings.refresh.interval, Duration::from_secs(12 * 3600));
        assert_eq!(settings.refresh.rediscover_after_failures, 3);
        assert_eq!(settings.log_level.as_deref(), Some("warn"));
        assert_eq!(
            settings.advertised_guide_url().as_deref(),
            Some("http://gateway.lan:8080/epg.xml")
        );
    }

    #[test]
    fn test_command_line_wins_over_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            [server]
            output_dir = "from-file"
            [refresh]
            interval_hours = 12
            "#,
        )
        .unwrap();

        let settings = Settings::resolve(
            &args(&["--output-dir", "from-cli", "--refresh-interval-hours", "1"]),
            file,
        )
        .unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("from-cli"));
        assert_eq!(settings.refresh.interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = Settings::resolve(
            &args(&["--refresh-interval-hours", "0"]),
            ConfigFile::default(),
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_invalid_broadcast_addr_rejected() {
        let file: ConfigFile = toml::from_str("[device]\nbroadcast_addr = \"not-an-ip\"").unwrap();
        let result = Settings::resolve(&args(&[]), file);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "device.broadcast_addr", .. })
        ));
    }

    #[test]
    fn test_load_config_errors() {
        let tmp = tempfile::tempdir().unwrap();

        let missing = load_config(&tmp.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let bad = tmp.path().join("bad.toml");
        std::fs::write(&bad, "[server\nlisten = 1").unwrap();
        assert!(matches!(load_config(&bad), Err(ConfigError::Parse(_))));
    }
}
