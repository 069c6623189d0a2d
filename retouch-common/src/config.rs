//! Configuration loading and resolution
//!
//! Every value follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (where one exists)
//!
//! All values are resolved once at process start and held as immutable
//! configuration for the lifetime of the process.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Environment variable holding the generation-service credential
pub const ENV_API_KEY: &str = "RETOUCH_API_KEY";
/// Environment variable overriding the listen port
pub const ENV_PORT: &str = "RETOUCH_PORT";
/// Environment variable overriding the artifact working directory
pub const ENV_WORKING_DIR: &str = "RETOUCH_WORKING_DIR";

/// Default listen port when no tier provides one
pub const DEFAULT_PORT: u16 = 5000;

/// Resolved process-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the remote generation service
    pub api_key: String,
    /// HTTP listen port
    pub port: u16,
    /// Directory for per-job temporary artifacts
    pub working_dir: PathBuf,
}

/// Values provided on the command line (all optional)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub port: Option<u16>,
    pub working_dir: Option<PathBuf>,
}

/// Shape of the optional TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    api_key: Option<String>,
    port: Option<u16>,
    working_dir: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration from all tiers.
    ///
    /// The API key is the only value with no default; resolution fails
    /// with a configuration error describing every way to provide it.
    pub fn resolve(cli: CliOverrides) -> Result<Self> {
        let file = load_config_file();

        let api_key = resolve_api_key(&cli, &file)?;
        let port = cli
            .port
            .or_else(|| env_port())
            .or(file.port)
            .unwrap_or(DEFAULT_PORT);
        let working_dir = cli
            .working_dir
            .or_else(|| std::env::var(ENV_WORKING_DIR).ok().map(PathBuf::from))
            .or(file.working_dir)
            .unwrap_or_else(default_working_dir);

        Ok(Self {
            api_key,
            port,
            working_dir,
        })
    }

    /// Create the working directory if it does not exist
    pub fn ensure_working_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.working_dir).map_err(|e| {
            Error::Config(format!(
                "failed to create working directory {}: {}",
                self.working_dir.display(),
                e
            ))
        })
    }
}

fn resolve_api_key(cli: &CliOverrides, file: &FileConfig) -> Result<String> {
    // Warn if multiple tiers carry a key (potential misconfiguration)
    let mut sources = Vec::new();
    if cli.api_key.is_some() {
        sources.push("command line");
    }
    let env_key = std::env::var(ENV_API_KEY).ok().filter(|k| is_valid_key(k));
    if env_key.is_some() {
        sources.push("environment");
    }
    if file.api_key.as_deref().is_some_and(is_valid_key) {
        sources.push("TOML");
    }
    if sources.len() > 1 {
        warn!(
            "API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = cli.api_key.as_deref().filter(|k| is_valid_key(k)) {
        info!("API key loaded from command line");
        return Ok(key.to_string());
    }
    if let Some(key) = env_key {
        info!("API key loaded from environment variable");
        return Ok(key);
    }
    if let Some(key) = file.api_key.as_deref().filter(|k| is_valid_key(k)) {
        info!("API key loaded from TOML config");
        return Ok(key.to_string());
    }

    Err(Error::Config(format!(
        "Generation service API key not configured. Provide it using one of:\n\
         1. Command line: --api-key your-key-here\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: ~/.config/retouch/config.toml (api_key = \"your-key\")",
        ENV_API_KEY
    )))
}

/// Validate API key (non-empty, non-whitespace)
fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn env_port() -> Option<u16> {
    let raw = std::env::var(ENV_PORT).ok()?;
    match raw.parse::<u16>() {
        Ok(port) => Some(port),
        Err(_) => {
            warn!("Ignoring non-numeric {}={}", ENV_PORT, raw);
            None
        }
    }
}

/// Parse the TOML config file if one exists at a platform path.
///
/// A missing file is normal; a malformed one is logged and ignored so a
/// broken config cannot keep the service from starting with explicit
/// CLI/env values.
fn load_config_file() -> FileConfig {
    let Some(path) = find_config_file() else {
        return FileConfig::default();
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring malformed config file {}: {}", path.display(), e);
                FileConfig::default()
            }
        },
        Err(e) => {
            warn!("Ignoring unreadable config file {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}

/// Locate the config file for the platform.
///
/// Linux checks `~/.config/retouch/config.toml` then
/// `/etc/retouch/config.toml`; macOS and Windows use the user config
/// directory only.
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("retouch").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/retouch/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default working directory for temporary artifacts
fn default_working_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("retouch"))
        .unwrap_or_else(|| PathBuf::from("./retouch_data"))
}
