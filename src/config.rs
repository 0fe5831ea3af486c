//! Server configuration module.
//!
//! Handles loading, validating, and merging `album-server.toml`. Stock
//! defaults are overridden by the file (if any), which in turn is
//! overridden by CLI flags and environment variables in `main`.
//!
//! ## Config File Location
//!
//! `--config <path>` names the file explicitly. Without it, an
//! `album-server.toml` in the working directory is used when present;
//! otherwise the stock defaults apply unchanged.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//!
//! [paths]
//! photos = "./static"        # Photo root (env STATIC_PATH)
//! # thumbnails = "..."       # Generated thumbnails (env THUMBS_PATH)
//!
//! [thumbnails]
//! backend = "rust"           # "rust" or "imagemagick"
//! quality = 90               # JPEG quality (1-100)
//! timeout_secs = 30          # Per-thumbnail generation limit
//! convert_binary = "convert" # ImageMagick executable
//!
//! [processing]
//! max_processes = 4          # Startup scan workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [thumbnails]
//! backend = "imagemagick"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "album-server.toml";

/// Directory name used under the system temp dir when no thumbnail
/// directory is configured.
const DEFAULT_THUMBS_DIR: &str = "album-server-thumbs";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration loaded from `album-server.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listener address.
    pub server: ServerSection,
    /// Photo root and thumbnail output directory.
    pub paths: PathsConfig,
    /// Thumbnail backend and encoding settings.
    pub thumbnails: ThumbnailsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        if self.thumbnails.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.timeout_secs must be non-zero".into(),
            ));
        }
        if self.thumbnails.convert_binary.trim().is_empty() {
            return Err(ConfigError::Validation(
                "thumbnails.convert_binary must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Directory generated thumbnails are written to.
    ///
    /// An unset or empty `paths.thumbnails` falls back to
    /// `<system temp>/album-server-thumbs`.
    pub fn thumbnail_dir(&self) -> PathBuf {
        match &self.paths.thumbnails {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => std::env::temp_dir().join(DEFAULT_THUMBS_DIR),
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Root directory scanned for photos at startup.
    pub photos: PathBuf,
    /// Output directory for generated thumbnails. See [`ServerConfig::thumbnail_dir`].
    pub thumbnails: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            photos: PathBuf::from("./static"),
            thumbnails: None,
        }
    }
}

/// Which [`ImageBackend`](crate::imaging::ImageBackend) produces thumbnails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process decode and resize with the `image` crate.
    #[default]
    Rust,
    /// ImageMagick `convert` subprocess.
    #[value(name = "imagemagick")]
    ImageMagick,
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub backend: BackendKind,
    /// JPEG quality for generated thumbnails (1-100).
    pub quality: u32,
    /// Upper bound on a single thumbnail generation, in seconds.
    pub timeout_secs: u64,
    /// ImageMagick executable, used when `backend = "imagemagick"`.
    pub convert_binary: String,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Rust,
            quality: 90,
            timeout_secs: 30,
            convert_binary: "convert".to_string(),
        }
    }
}

impl ThumbnailsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel probe workers during the startup scan.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =========================================================================
// Loading
// =========================================================================

/// Stock defaults as a TOML value, the base every user file is merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ServerConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Deep-merge two TOML values. Tables merge key by key; anything else in
/// `overlay` replaces `base`.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ServerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// The config file to use: `explicit` if given, else `album-server.toml`
/// in `dir` when it exists.
pub fn locate_config(explicit: Option<&Path>, dir: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = dir.join(CONFIG_FILE_NAME);
            candidate.is_file().then_some(candidate)
        }
    }
}

/// Load config from `path`, or the stock defaults when `path` is `None`.
///
/// A named file that does not exist is an error. Merges user values on
/// top of stock defaults, rejects unknown keys, and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `album-server.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# album-server Configuration
# =========================
#
# All options are optional. Values shown are the defaults.
# Unknown keys are rejected. CLI flags and environment variables
# (STATIC_PATH, THUMBS_PATH) override values from this file.

# ---------------------------------------------------------------------------
# HTTP listener
# ---------------------------------------------------------------------------
[server]
host = "127.0.0.1"
port = 3000

# ---------------------------------------------------------------------------
# Directories
# ---------------------------------------------------------------------------
[paths]
# Root directory scanned recursively for .jpg/.jpeg/.png/.gif files.
photos = "./static"

# Where generated thumbnails are written. Must be writable.
# Defaults to <system temp dir>/album-server-thumbs.
# thumbnails = "/var/cache/album-server"

# ---------------------------------------------------------------------------
# Thumbnail generation
# ---------------------------------------------------------------------------
[thumbnails]
# "rust" decodes and resizes in-process.
# "imagemagick" shells out to `convert -thumbnail`.
backend = "rust"

# JPEG quality of generated thumbnails (1-100).
quality = 90

# A generation that takes longer than this fails with a 500.
timeout_secs = 30

# ImageMagick executable (only used with backend = "imagemagick").
convert_binary = "convert"

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Workers probing image headers during the startup scan.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ServerConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.paths.photos, PathBuf::from("./static"));
        assert!(config.paths.thumbnails.is_none());
        assert_eq!(config.thumbnails.backend, BackendKind::Rust);
        assert_eq!(config.thumbnails.quality, 90);
        assert_eq!(config.thumbnails.timeout(), Duration::from_secs(30));
        assert_eq!(config.thumbnails.convert_binary, "convert");
        assert!(config.processing.max_processes.is_none());
    }

    #[test]
    fn parse_partial_config() {
        let config: ServerConfig = toml::from_str(
            r#"
[server]
port = 8080
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.thumbnails.quality, 90);
    }

    #[test]
    fn parse_backend_kind() {
        let config: ServerConfig = toml::from_str(
            r#"
[thumbnails]
backend = "imagemagick"
"#,
        )
        .unwrap();
        assert_eq!(config.thumbnails.backend, BackendKind::ImageMagick);
    }

    #[test]
    fn unknown_backend_rejected() {
        let result: Result<ServerConfig, _> = toml::from_str(
            r#"
[thumbnails]
backend = "vips"
"#,
        );
        assert!(result.is_err());
    }

    // =========================================================================
    // thumbnail_dir
    // =========================================================================

    #[test]
    fn thumbnail_dir_defaults_to_temp() {
        let config = ServerConfig::default();
        assert_eq!(
            config.thumbnail_dir(),
            std::env::temp_dir().join("album-server-thumbs")
        );
    }

    #[test]
    fn thumbnail_dir_empty_string_means_default() {
        let mut config = ServerConfig::default();
        config.paths.thumbnails = Some(PathBuf::new());
        assert_eq!(
            config.thumbnail_dir(),
            std::env::temp_dir().join("album-server-thumbs")
        );
    }

    #[test]
    fn thumbnail_dir_uses_configured_path() {
        let mut config = ServerConfig::default();
        config.paths.thumbnails = Some(PathBuf::from("/srv/thumbs"));
        assert_eq!(config.thumbnail_dir(), PathBuf::from("/srv/thumbs"));
    }

    // =========================================================================
    // effective_threads
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(100_000),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("a").unwrap().as_integer(), Some(1));
        assert_eq!(merged.get("b").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 3000
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[server]
port = 9000
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let server = merged.get("server").unwrap();
        assert_eq!(server.get("host").unwrap().as_str(), Some("127.0.0.1"));
        assert_eq!(server.get("port").unwrap().as_integer(), Some(9000));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        ServerConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = ServerConfig::default();
        config.thumbnails.quality = 100;
        assert!(config.validate().is_ok());
        config.thumbnails.quality = 1;
        assert!(config.validate().is_ok());
        config.thumbnails.quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.thumbnails.quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_zero_timeout() {
        let mut config = ServerConfig::default();
        config.thumbnails.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_zero_port() {
        let mut config = ServerConfig::default();
        config.server.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_empty_convert_binary() {
        let mut config = ServerConfig::default();
        config.thumbnails.convert_binary = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // load_config / locate_config
    // =========================================================================

    #[test]
    fn load_config_without_file_is_stock() {
        let config = load_config(None).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("album-server.toml");
        fs::write(
            &path,
            r#"
[paths]
photos = "/srv/photos"

[thumbnails]
quality = 75
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.paths.photos, PathBuf::from("/srv/photos"));
        assert_eq!(config.thumbnails.quality, 75);
        // Unspecified values should be defaults
        assert_eq!(config.thumbnails.timeout_secs, 30);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn load_config_missing_named_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("album-server.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("album-server.toml");
        fs::write(&path, "[server]\nhots = \"0.0.0.0\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("album-server.toml");
        fs::write(&path, "[thumbnails]\nquality = 0\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn locate_config_prefers_explicit_path() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "").unwrap();
        let explicit = PathBuf::from("/etc/album.toml");
        assert_eq!(
            locate_config(Some(&explicit), tmp.path()),
            Some(explicit.clone())
        );
    }

    #[test]
    fn locate_config_finds_file_in_dir() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(locate_config(None, tmp.path()), None);
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(
            locate_config(None, tmp.path()),
            Some(tmp.path().join(CONFIG_FILE_NAME))
        );
    }

    // =========================================================================
    // stock_config_toml
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let _: toml::Value =
            toml::from_str(stock_config_toml()).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: ServerConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = ServerConfig::default();
        assert_eq!(config.server.host, defaults.server.host);
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.paths.photos, defaults.paths.photos);
        assert_eq!(config.paths.thumbnails, defaults.paths.thumbnails);
        assert_eq!(config.thumbnails.backend, defaults.thumbnails.backend);
        assert_eq!(config.thumbnails.quality, defaults.thumbnails.quality);
        assert_eq!(config.thumbnails.timeout_secs, defaults.thumbnails.timeout_secs);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[server]"));
        assert!(content.contains("[paths]"));
        assert!(content.contains("[thumbnails]"));
        assert!(content.contains("[processing]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        assert!(val.get("server").is_some());
        assert!(val.get("paths").is_some());
        assert!(val.get("thumbnails").is_some());
        assert!(val.get("processing").is_some());
    }
}
