//! Replica configuration (`wesync.toml`).
//!
//! Every field has a default and a missing file means all defaults, so an
//! embedding application can ship without any configuration at all.
//!
//! ```toml
//! [repo]
//! branch = "main"
//!
//! [cache]
//! state_capacity = 4096
//!
//! [log]
//! format = "compact"
//! filter = "wesync=debug"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use wesync_core::{DEFAULT_STATE_CACHE_CAPACITY, MAIN_BRANCH, WorkspaceSettings};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level replica configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WesyncConfig {
    /// Branch selection.
    #[serde(default)]
    pub repo: RepoConfig,

    /// State cache sizing.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log output.
    #[serde(default)]
    pub log: LogConfig,
}

impl WesyncConfig {
    /// Workspace settings derived from `[cache]`.
    #[must_use]
    pub const fn workspace_settings(&self) -> WorkspaceSettings {
        WorkspaceSettings {
            state_cache_capacity: self.cache.state_capacity,
        }
    }
}

// ---------------------------------------------------------------------------
// RepoConfig
// ---------------------------------------------------------------------------

/// Branch selection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    /// Branch that manipulators and synchronization act on (default: `"main"`).
    #[serde(default = "default_branch")]
    pub branch: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
        }
    }
}

fn default_branch() -> String {
    MAIN_BRANCH.to_owned()
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// State cache sizing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of replayed states kept per workspace lineage.
    #[serde(default = "default_state_capacity")]
    pub state_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            state_capacity: default_state_capacity(),
        }
    }
}

const fn default_state_capacity() -> usize {
    DEFAULT_STATE_CACHE_CAPACITY
}

// ---------------------------------------------------------------------------
// LogConfig
// ---------------------------------------------------------------------------

/// Log output settings, consumed by [`crate::telemetry::init`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_owned()
}

/// How log events are written to stderr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Install no subscriber; the host application owns logging.
    #[default]
    Off,
    /// Single-line human-readable events.
    Compact,
    /// One JSON object per event, with span close timings.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A configuration file could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The file being loaded, if any.
    pub path: Option<PathBuf>,
    /// What went wrong, prefixed with `line N:` when known.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}: {}", p.display(), self.message),
            None => write!(f, "config error: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl WesyncConfig {
    /// Load configuration from a TOML file; a missing file yields defaults.
    ///
    /// # Errors
    /// I/O failures other than not-found, invalid TOML, or unknown keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|e| ConfigError {
            path: Some(path.to_owned()),
            ..e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Invalid TOML or unknown keys.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let message = match e.span() {
                Some(span) => {
                    let line = toml_str[..span.start].matches('\n').count() + 1;
                    format!("line {line}: {}", e.message())
                }
                None => e.message().to_owned(),
            };
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = WesyncConfig::default();
        assert_eq!(cfg.repo.branch, "main");
        assert_eq!(cfg.cache.state_capacity, 4096);
        assert_eq!(cfg.log.format, LogFormat::Off);
        assert_eq!(cfg.log.filter, "info");
        assert_eq!(
            cfg.workspace_settings(),
            WorkspaceSettings {
                state_cache_capacity: 4096
            }
        );
    }

    #[test]
    fn empty_string_is_defaults() {
        assert_eq!(WesyncConfig::parse("").unwrap(), WesyncConfig::default());
    }

    #[test]
    fn full_file() {
        let cfg = WesyncConfig::parse(
            r#"
[repo]
branch = "drafts"

[cache]
state_capacity = 16

[log]
format = "json"
filter = "wesync=trace"
"#,
        )
        .unwrap();
        assert_eq!(cfg.repo.branch, "drafts");
        assert_eq!(cfg.cache.state_capacity, 16);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.log.filter, "wesync=trace");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = WesyncConfig::parse("[log]\nformat = \"compact\"\n").unwrap();
        assert_eq!(cfg.log.format, LogFormat::Compact);
        assert_eq!(cfg.log.filter, "info");
        assert_eq!(cfg.repo.branch, "main");
    }

    #[test]
    fn unknown_key_reports_line() {
        let err = WesyncConfig::parse("[repo]\nbranch = \"main\"\ncolour = 3\n").unwrap_err();
        assert!(err.message.starts_with("line 3:"), "got: {}", err.message);
        assert!(err.path.is_none());
    }

    #[test]
    fn bad_format_value_is_rejected() {
        let err = WesyncConfig::parse("[log]\nformat = \"pretty\"\n").unwrap_err();
        assert!(err.message.contains("line 2"), "got: {}", err.message);
    }

    #[test]
    fn missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = WesyncConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, WesyncConfig::default());
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nstate_capacity = 8").unwrap();
        let cfg = WesyncConfig::load(file.path()).unwrap();
        assert_eq!(cfg.cache.state_capacity, 8);
    }

    #[test]
    fn load_error_carries_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nstate_capacity = \"many\"").unwrap();
        let err = WesyncConfig::load(file.path()).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(file.path()));
        assert!(err.to_string().starts_with(&file.path().display().to_string()));
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError {
            path: None,
            message: "line 1: boom".into(),
        };
        assert_eq!(err.to_string(), "config error: line 1: boom");
    }
}
