//! Layered settings.
//!
//! Tuning knobs that rarely change per run live in [`Config`] and are merged
//! from, lowest to highest priority:
//!
//! 1. built-in defaults
//! 2. a TOML file: `--config FILE`, or `config.toml` in the platform config
//!    directory when present
//! 3. `FILESIFT_*` environment variables (`FILESIFT_IO_THREADS=8`)
//!
//! Command-line flags are applied last, by the caller.
//!
//! ```toml
//! io_threads = 8
//! hash_buffer_size = 131072
//! copy_dir_name = "copied_files"
//! report_basename = "file_search_results"
//! collision_policy = "rename"
//! delete_method = "trash"
//! follow_symlinks = false
//! default_format = "html"
//! listing_order = "created"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::{CollisionPolicy, DeleteMethod, DEFAULT_COPY_DIR};
use crate::duplicates::DEFAULT_IO_THREADS;
use crate::orchestrator::ScanConfig;
use crate::output::{ListingOrder, ReportFormat, DEFAULT_REPORT_BASENAME};
use crate::scanner::DEFAULT_BUFFER_SIZE;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "FILESIFT_";

/// Errors from loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has wrong types.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// The platform config directory is unknown.
    #[error("could not determine the configuration directory")]
    NoConfigDir,

    /// Serializing the settings failed.
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Writing the config file failed.
    #[error("cannot write config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persistent tuning settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hashing workers
    pub io_threads: usize,
    /// Hasher read buffer in bytes
    pub hash_buffer_size: usize,
    /// Copy folder name under the scan root
    pub copy_dir_name: String,
    /// Report file stem
    pub report_basename: String,
    /// Same-name handling for copy-all
    pub collision_policy: CollisionPolicy,
    /// Permanent removal or system trash
    pub delete_method: DeleteMethod,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Report format when `--format` is not given
    pub default_format: ReportFormat,
    /// Row order of the plain listing when `--sort` is not given
    pub listing_order: ListingOrder,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            hash_buffer_size: DEFAULT_BUFFER_SIZE,
            copy_dir_name: DEFAULT_COPY_DIR.to_string(),
            report_basename: DEFAULT_REPORT_BASENAME.to_string(),
            collision_policy: CollisionPolicy::default(),
            delete_method: DeleteMethod::default(),
            follow_symlinks: false,
            default_format: ReportFormat::default(),
            listing_order: ListingOrder::default(),
        }
    }
}

impl Config {
    /// `config.toml` in the platform config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "filesift", "filesift")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The merged provider chain: defaults, TOML file, environment.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let file = config_file.map(Path::to_path_buf).or_else(Self::default_path);
        if let Some(path) = file {
            log::debug!("Config file: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load settings.
    ///
    /// A missing default config file is fine; a missing explicit one is not.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit file is missing or a layer is
    /// malformed.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }
        let config: Self = Self::figment(config_file).extract().map_err(Box::new)?;
        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Fill the tuning fields of a scan request.
    #[must_use]
    pub fn apply_to(&self, scan: ScanConfig) -> ScanConfig {
        scan.with_io_threads(self.io_threads)
            .with_hash_buffer_size(self.hash_buffer_size)
            .with_copy_dir_name(self.copy_dir_name.clone())
            .with_report_basename(self.report_basename.clone())
            .with_collision_policy(self.collision_policy)
            .with_delete_method(self.delete_method)
            .with_follow_symlinks(self.follow_symlinks)
            .with_format(self.default_format)
            .with_listing_order(self.listing_order)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write these settings to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_toml()?).map_err(io_err)?;
        log::info!("Wrote configuration to {}", path.display());
        Ok(())
    }
}
