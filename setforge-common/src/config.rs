//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Every field has a built-in
//! default, so a missing file or an empty file is a valid configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "SETFORGE_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change while the service is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder for uploaded tracks and exported archives (optional)
    ///
    /// If not specified: CLI → environment → OS default
    pub root_folder: Option<PathBuf>,

    /// Address the HTTP server binds to
    pub bind_address: String,

    /// HTTP server port
    pub port: u16,

    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
    pub sessions: SessionConfig,
    pub upload: UploadConfig,
    pub export: ExportConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: "127.0.0.1".to_string(),
            port: 5740,
            logging: LoggingConfig::default(),
            analysis: AnalysisConfig::default(),
            sessions: SessionConfig::default(),
            upload: UploadConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    ///
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Per-track analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum number of tracks analyzed concurrently within one session
    pub workers: usize,

    /// Upper bound for a single engine call, in seconds
    pub timeout_seconds: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout_seconds: 120,
        }
    }
}

impl AnalysisConfig {
    /// Worker count, never below one
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}

/// Session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions without activity for this long are reclaimed
    pub idle_timeout_seconds: u64,

    /// How often the reaper looks for idle sessions
    pub reap_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: 3600,
            reap_interval_seconds: 60,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_seconds.max(1))
    }
}

/// Upload acceptance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum request body size for one upload call
    pub max_body_bytes: usize,

    /// Accepted file extensions (without the dot, case-insensitive)
    pub extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024 * 1024,
            extensions: vec![
                "mp3".to_string(),
                "wav".to_string(),
                "flac".to_string(),
                "aiff".to_string(),
            ],
        }
    }
}

/// Playlist export settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub order: ExportOrder,
}

/// Ordering applied to eligible tracks at export time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportOrder {
    /// Original upload order
    #[default]
    Upload,
    /// Greedy chain of the most compatible next track (BPM, key, energy)
    Compatibility,
}

/// Load a TOML configuration file
///
/// A missing file yields the built-in defaults.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Default configuration file path for the platform
///
/// `~/.config/setforge/config.toml` on Linux, the platform config dir elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("setforge").join("config.toml"))
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("setforge"))
        .unwrap_or_else(|| PathBuf::from("./setforge_data"))
}

/// Creates and describes the directory layout below the root folder
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create root, sessions and exports directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.root_folder.clone(), self.sessions_dir(), self.exports_dir()] {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                tracing::error!(path = %dir.display(), error = %e, "Failed to create directory");
                return Err(Error::Io(e));
            }
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Per-session uploaded track storage
    pub fn sessions_dir(&self) -> PathBuf {
        self.root_folder.join("sessions")
    }

    /// Exported playlist archives
    pub fn exports_dir(&self) -> PathBuf {
        self.root_folder.join("exports")
    }
}
