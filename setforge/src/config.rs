//! Service configuration
//!
//! Resolution order for every setting: command line → environment → TOML
//! file → built-in default.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use setforge_common::config::{
    default_config_path, load_toml_config, resolve_root_folder, ExportOrder, RootFolderInitializer,
    TomlConfig, ROOT_FOLDER_ENV,
};

/// Command-line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "setforge")]
#[command(about = "DJ set preparation service: upload, analyze and export ordered playlists")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SETFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root folder for uploaded tracks and exported archives
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "SETFORGE_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "SETFORGE_BIND")]
    pub bind: Option<String>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    pub analysis_workers: usize,
    pub analysis_timeout: Duration,
    pub idle_timeout: Duration,
    pub reap_interval: Duration,
    pub max_upload_bytes: usize,
    pub extensions: Vec<String>,
    pub export_order: ExportOrder,
}

impl ServiceConfig {
    /// Resolve configuration from CLI arguments and the TOML file they point to
    pub fn resolve(cli: &Cli) -> setforge_common::Result<Self> {
        let toml_config = match cli.config.clone().or_else(default_config_path) {
            Some(path) => load_toml_config(&path)?,
            None => TomlConfig::default(),
        };

        let root_folder = resolve_root_folder(cli.root_folder.as_deref(), ROOT_FOLDER_ENV, &toml_config);
        let mut config = Self::from_toml(root_folder, &toml_config);

        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(bind) = &cli.bind {
            config.bind_address = bind.clone();
        }

        Ok(config)
    }

    pub fn from_toml(root_folder: PathBuf, toml_config: &TomlConfig) -> Self {
        Self {
            root_folder,
            bind_address: toml_config.bind_address.clone(),
            port: toml_config.port,
            log_level: toml_config.logging.level.clone(),
            analysis_workers: toml_config.analysis.worker_count(),
            analysis_timeout: toml_config.analysis.timeout(),
            idle_timeout: toml_config.sessions.idle_timeout(),
            reap_interval: toml_config.sessions.reap_interval(),
            max_upload_bytes: toml_config.upload.max_body_bytes,
            extensions: toml_config.upload.extensions.clone(),
            export_order: toml_config.export.order,
        }
    }

    /// Built-in defaults rooted at `root_folder`
    pub fn with_root(root_folder: impl Into<PathBuf>) -> Self {
        Self::from_toml(root_folder.into(), &TomlConfig::default())
    }

    pub fn layout(&self) -> RootFolderInitializer {
        RootFolderInitializer::new(self.root_folder.clone())
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
