//! Configuration module for echo-load.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the load driver
#[derive(Parser, Debug)]
#[command(name = "echo-load")]
#[command(author = "echo-load authors")]
#[command(version = "0.1.0")]
#[command(about = "Sequential correctness load for TCP echo servers", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host or IP of the echo server
    #[arg(long)]
    pub host: Option<String>,

    /// Port of the echo server
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Receive buffer size in bytes (one read per reply)
    #[arg(short = 'b', long)]
    pub buffer_size: Option<usize>,

    /// Number of sequential requests to send
    #[arg(short = 'n', long)]
    pub requests: Option<usize>,

    /// Per-operation timeout in milliseconds (unbounded when unset)
    #[arg(short = 't', long)]
    pub timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Echo server endpoint
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Driver-related configuration
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    /// Receive buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Number of requests
    #[serde(default = "default_requests")]
    pub requests: usize,
    /// Per-operation timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            requests: default_requests(),
            timeout_ms: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Largest receive buffer accepted (64 MiB)
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3333
}

fn default_buffer_size() -> usize {
    8192
}

fn default_requests() -> usize {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub buffer_size: usize,
    pub requests: usize,
    pub timeout: Option<Duration>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_parts(CliArgs::default_args(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve already-parsed CLI args, reading the TOML file they name.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let config = Self::from_parts(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    fn from_parts(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            host: cli.host.unwrap_or(toml_config.target.host),
            port: cli.port.unwrap_or(toml_config.target.port),
            buffer_size: cli.buffer_size.unwrap_or(toml_config.client.buffer_size),
            requests: cli.requests.unwrap_or(toml_config.client.requests),
            timeout: cli
                .timeout_ms
                .or(toml_config.client.timeout_ms)
                .map(Duration::from_millis),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }

    /// Check values the driver cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "buffer_size must be at most {MAX_BUFFER_SIZE} bytes"
            )));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid(
                "timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` string handed to the connector.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl CliArgs {
    fn default_args() -> Self {
        CliArgs {
            config: None,
            host: None,
            port: None,
            buffer_size: None,
            requests: None,
            timeout_ms: None,
            log_level: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
