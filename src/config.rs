//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/kmlmerge/kmlmerge.toml`
//! 3. Local config: `<work_dir>/.kmlmerge.toml`
//! 4. Environment variables: `KMLMERGE_*` prefix, `__` for nested keys
//!    (`KMLMERGE_REPORT__ENABLED=false`)

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, DEFAULT_LARGE_FILE_THRESHOLD, DEFAULT_OUTPUT_SUFFIX};

/// Summary report configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Write the CSV summary after a successful merge
    pub enabled: bool,
    /// File name prefix, followed by the timestamp and `.csv`
    pub prefix: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "Analysis_".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawReportConfig {
    pub enabled: Option<bool>,
    pub prefix: Option<String>,
}

impl ReportConfig {
    fn overlay(&self, raw: &RawReportConfig) -> Self {
        Self {
            enabled: raw.enabled.unwrap_or(self.enabled),
            prefix: raw.prefix.clone().unwrap_or_else(|| self.prefix.clone()),
        }
    }
}

/// Raw settings for intermediate parsing (arrays are Option to detect "not specified").
///
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub large_file_threshold: Option<u64>,
    pub extensions: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub output_suffix: Option<String>,
    pub log_file: Option<PathBuf>,
    pub workers: Option<usize>,
    #[serde(default)]
    pub report: RawReportConfig,
}

/// Unified configuration for kmlmerge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Sources above this size (bytes) are parsed by streaming
    pub large_file_threshold: u64,
    /// Source file extensions, without dot
    pub extensions: Vec<String>,
    /// Directory receiving merged files and reports (relative: working dir)
    pub output_dir: PathBuf,
    /// Appended to the timestamp of merged files
    pub output_suffix: String,
    /// Append-only operational log (relative: working dir)
    pub log_file: PathBuf,
    /// Merge worker threads, 0 = available parallelism
    pub workers: usize,
    pub report: ReportConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            extensions: vec!["kml".into()],
            output_dir: PathBuf::from("."),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.into(),
            log_file: PathBuf::from("kmlmerge.log"),
            workers: 0,
            report: ReportConfig::default(),
        }
    }
}

/// Get the XDG config directory for kmlmerge.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "kmlmerge").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("kmlmerge.toml"))
}

/// Get the path to the local config file in a working directory.
pub fn local_config_path(work_dir: &Path) -> PathBuf {
    work_dir.join(".kmlmerge.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Merge arrays with union semantics and negation support.
///
/// - Items from overlay are added to base
/// - Items prefixed with `!` remove the corresponding item from the result
/// - Duplicates are de-duplicated
///
/// # Examples
/// ```ignore
/// merge_array(&["kml"], &["xml"])          // → ["kml", "xml"]
/// merge_array(&["kml", "xml"], &["!xml"])  // → ["kml"]
/// ```
pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
    let mut result: HashSet<String> = base.iter().cloned().collect();

    for pattern in overlay {
        if let Some(negated) = pattern.strip_prefix('!') {
            result.remove(negated);
        } else {
            result.insert(pattern.clone());
        }
    }

    // Convert to sorted Vec for deterministic output
    let mut vec: Vec<String> = result.into_iter().collect();
    vec.sort();
    vec
}

impl Settings {
    /// Resolve a configured path against the working directory.
    pub fn resolve(&self, work_dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            work_dir.join(path)
        }
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.output_dir = PathBuf::from(expand_env_vars(&self.output_dir.to_string_lossy()));
        self.log_file = PathBuf::from(expand_env_vars(&self.log_file.to_string_lossy()));
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut merged = self.scalars_from(overlay);
        merged.extensions = overlay
            .extensions
            .as_ref()
            .map(|o| merge_array(&self.extensions, o))
            .unwrap_or_else(|| self.extensions.clone());
        merged
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        let mut applied = self.scalars_from(global);
        applied.extensions = global
            .extensions
            .clone()
            .unwrap_or_else(|| self.extensions.clone());
        applied
    }

    fn scalars_from(&self, raw: &RawSettings) -> Self {
        Self {
            large_file_threshold: raw
                .large_file_threshold
                .unwrap_or(self.large_file_threshold),
            extensions: self.extensions.clone(),
            output_dir: raw
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            output_suffix: raw
                .output_suffix
                .clone()
                .unwrap_or_else(|| self.output_suffix.clone()),
            log_file: raw.log_file.clone().unwrap_or_else(|| self.log_file.clone()),
            workers: raw.workers.unwrap_or(self.workers),
            report: self.report.overlay(&raw.report),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/kmlmerge/kmlmerge.toml` (arrays REPLACE defaults)
    /// 3. Local config: `<work_dir>/.kmlmerge.toml` (arrays UNION with global)
    /// 4. Environment variables: `KMLMERGE_*` prefix (REPLACES)
    pub fn load(work_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        Self::load_from(global.as_deref(), work_dir)
    }

    /// Same as [`Settings::load`] with an explicit global config file.
    pub fn load_from(global: Option<&Path>, work_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            let raw = load_raw_settings(global_path)?;
            current = current.apply_global(&raw);
        }

        if let Some(dir) = work_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply KMLMERGE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("KMLMERGE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("extensions")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get::<u64>("large_file_threshold") {
            settings.large_file_threshold = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("extensions") {
            settings.extensions = val;
        }
        if let Ok(val) = config.get_string("output_dir") {
            settings.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("output_suffix") {
            settings.output_suffix = val;
        }
        if let Ok(val) = config.get_string("log_file") {
            settings.log_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get::<usize>("workers") {
            settings.workers = val;
        }
        if let Ok(val) = config.get_bool("report.enabled") {
            settings.report.enabled = val;
        }
        if let Ok(val) = config.get_string("report.prefix") {
            settings.report.prefix = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# kmlmerge configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/kmlmerge/kmlmerge.toml  (defines your baseline)
#   Local:  <work_dir>/.kmlmerge.toml         (directory-specific additions)
#   Env:    KMLMERGE_* environment variables   (explicit overrides)
#           nested keys use "__": KMLMERGE_REPORT__PREFIX=Summary_
#
# Local config UNIONS arrays with global; "!item" removes an inherited item:
#   extensions = ["xml", "!kml"]

# Files above this size (bytes) are parsed by streaming
# large_file_threshold = 10485760

# Source file extensions
# extensions = ["kml"]

# Where merged files and reports are written
# output_dir = "."
# output_suffix = "_Merged.kml"

# Append-only operational log
# log_file = "kmlmerge.log"

# Merge worker threads (0 = one per CPU)
# workers = 0

[report]
# enabled = true
# prefix = "Analysis_"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
