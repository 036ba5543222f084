//! Client settings and command-line surface.
//!
//! A value is taken from the first place that has it: a flag, the flag's
//! environment variable, `~/.config/tasklist/config.toml`, then the built-in
//! default. The default file may be absent; a file passed with `--config`
//! may not.
//!
//! ```toml
//! [api]
//! base_url = "http://127.0.0.1:8080"
//! token = "..."
//! timeout_secs = 10
//!
//! [tasks]
//! default_title = "Untitled"
//! title_preview_len = 20
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::store::tasks::TaskFilter;
use crate::store::title::TitlePolicy;

/// Server used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://railway.todo.techtrain.dev";

/// Per-request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

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

// Every key is optional so that a file may set any subset.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiSection,
    tasks: TasksSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiSection {
    base_url: Option<String>,
    token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TasksSection {
    default_title: Option<String>,
    title_preview_len: Option<usize>,
}

/// Resolved settings for one run.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    pub base_url: String,
    /// Session token to start with.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How new tasks without a title get one.
    pub titles: TitlePolicy,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("titles", &self.titles)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            titles: TitlePolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Reads the config file and lays `cli` over it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a file named with `--config` is missing,
    /// or if any file found cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let text = match cli.config.as_deref() {
            Some(path) => Some(read(path)?),
            None => default_path().map(|path| read_if_present(&path)).transpose()?.flatten(),
        };
        let file = match text {
            Some(text) => toml::from_str(&text)?,
            None => ConfigFile::default(),
        };
        Ok(Self::resolve(cli, &file))
    }

    /// An empty token, from anywhere, means signed out.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();
        let api = &file.api;
        let tasks = &file.tasks;
        Self {
            base_url: cli
                .base_url
                .as_ref()
                .or(api.base_url.as_ref())
                .cloned()
                .unwrap_or(defaults.base_url),
            token: cli
                .token
                .as_ref()
                .or(api.token.as_ref())
                .filter(|t| !t.is_empty())
                .cloned(),
            timeout: api.timeout_secs.map_or(defaults.timeout, Duration::from_secs),
            titles: TitlePolicy {
                default_title: tasks
                    .default_title
                    .clone()
                    .unwrap_or(defaults.titles.default_title),
                preview_len: tasks
                    .title_preview_len
                    .unwrap_or(defaults.titles.preview_len),
            },
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Todo lists from the command line")]
pub struct CliArgs {
    /// Base URL of the REST API.
    #[arg(long, env = "TASKLIST_URL")]
    pub base_url: Option<String>,

    /// Session token (as printed by `signin`).
    #[arg(long, env = "TASKLIST_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to config file (default: `~/.config/tasklist/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "TASKLIST_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/tasklist.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands of the `tasklist` binary.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in and print the session token.
    Signin {
        /// Account e-mail.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long)]
        password: String,
    },
    /// Create an account and print the session token.
    Signup {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Account e-mail.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long)]
        password: String,
    },
    /// Show the signed-in user.
    Whoami,
    /// Show all lists.
    Lists,
    /// Create a list.
    ListAdd {
        /// List title.
        title: String,
        /// List description.
        #[arg(long)]
        detail: Option<String>,
    },
    /// Rename a list.
    ListEdit {
        /// List id.
        id: String,
        /// New title.
        title: String,
        /// New description; left unchanged when omitted.
        #[arg(long)]
        detail: Option<String>,
    },
    /// Delete a list.
    ListRm {
        /// List id.
        id: String,
    },
    /// Show the tasks of a list.
    Tasks {
        /// List id (default: the first list).
        #[arg(long)]
        list: Option<String>,
        /// Which tasks to show: all, incomplete or completed.
        #[arg(long, default_value = "all")]
        filter: TaskFilter,
    },
    /// Create a task.
    TaskAdd {
        /// List id (default: the first list).
        #[arg(long)]
        list: Option<String>,
        /// Task title (default: derived from the detail).
        #[arg(long)]
        title: Option<String>,
        /// Task description.
        #[arg(default_value = "")]
        detail: String,
        /// Due date, local time `YYYY-MM-DDTHH:MM`.
        #[arg(long)]
        due: Option<String>,
        /// Create the task already done.
        #[arg(long)]
        done: bool,
    },
    /// Mark a task done (or not done with `--undo`).
    TaskDone {
        /// List id (default: the first list).
        #[arg(long)]
        list: Option<String>,
        /// Task id.
        id: String,
        /// Mark the task not done instead.
        #[arg(long)]
        undo: bool,
    },
    /// Change a task.
    TaskEdit {
        /// List id (default: the first list).
        #[arg(long)]
        list: Option<String>,
        /// Task id.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        detail: Option<String>,
        /// New due date, local time `YYYY-MM-DDTHH:MM`.
        #[arg(long, conflicts_with = "no_due")]
        due: Option<String>,
        /// Remove the due date.
        #[arg(long)]
        no_due: bool,
    },
    /// Delete a task.
    TaskRm {
        /// List id (default: the first list).
        #[arg(long)]
        list: Option<String>,
        /// Task id.
        id: String,
    },
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tasklist").join("config.toml"))
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
