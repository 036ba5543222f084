//! Server settings.
//!
//! The `[server]` table of `~/.config/tasklist-server/config.toml` is read
//! straight into [`ServerConfig`]; flags and their environment variables are
//! then laid over it. The log level is a flag only.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Default cap on request bodies, in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Errors from loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists (or was named explicitly) but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        /// File that was tried.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Command-line flags.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "In-memory tasklist REST server")]
pub struct ServerCliArgs {
    /// Listen address, e.g. `0.0.0.0:9090`.
    #[arg(short, long, env = "TASKLIST_SERVER_ADDR")]
    pub bind: Option<String>,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "TASKLIST_SERVER_MAX_BODY")]
    pub max_body_bytes: Option<usize>,

    /// Config file to read instead of the default one.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `tasklist_server=debug`.
    #[arg(long, default_value = "info", env = "TASKLIST_SERVER_LOG")]
    pub log_level: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerConfig,
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind_addr: String,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
    /// Tracing filter.
    #[serde(skip)]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads the config file, then applies `cli` on top.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a file named with `--config` is missing,
    /// or if any file found cannot be read or parsed.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let text = match cli.config.as_deref() {
            Some(path) => Some(read(path)?),
            None => default_path().map(|path| read_if_present(&path)).transpose()?.flatten(),
        };
        let base = match text {
            Some(text) => toml::from_str::<ConfigFile>(&text)?.server,
            None => Self::default(),
        };
        Ok(base.with_cli(cli))
    }

    fn with_cli(mut self, cli: &ServerCliArgs) -> Self {
        if let Some(bind) = &cli.bind {
            self.bind_addr.clone_from(bind);
        }
        if let Some(max) = cli.max_body_bytes {
            self.max_body_bytes = max;
        }
        self.log_level.clone_from(&cli.log_level);
        self
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tasklist-server").join("config.toml"))
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

fn read_if_present(path: &Path) -> Result<Option<String>, ConfigError> {
    match read(path) {
        Ok(text) => Ok(Some(text)),
        Err(ConfigError::ReadFile { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
