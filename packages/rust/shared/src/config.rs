//! Application configuration for cvmaker.
//!
//! User config lives at `~/.cvmaker/cvmaker.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CvMakerError, Result};
use crate::types::LanguageTag;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "cvmaker.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".cvmaker";

/// Subdirectory of the config dir holding user-customized templates.
const USER_TEMPLATES_DIR_NAME: &str = "templates";

/// Environment variable overriding the packaged resources directory.
pub const RESOURCES_ENV: &str = "CVMAKER_RESOURCES";

/// Resources shipped alongside the sources of this workspace.
const BUNDLED_RESOURCES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../../resources");

// ---------------------------------------------------------------------------
// Config structs (matching cvmaker.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where parameter files and their PDFs live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// External typesetter settings.
    #[serde(default)]
    pub typesetter: TypesetterConfig,

    /// Packaged templates and style assets.
    #[serde(default)]
    pub resources: ResourcesConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Default document storage directory.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,

    /// Name of the attachments subdirectory inside `documents_dir`.
    #[serde(default = "default_attachments_dir")]
    pub attachments_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            attachments_dir: default_attachments_dir(),
        }
    }
}

fn default_documents_dir() -> String {
    "~/cvmaker".into()
}
fn default_attachments_dir() -> String {
    "attachments".into()
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Document language, and fallback language for new templates.
    #[serde(default)]
    pub language: LanguageTag,

    /// Editor command; `$VISUAL`/`$EDITOR` are used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

/// `[typesetter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypesetterConfig {
    /// Executable name (looked up on `PATH`) or path.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the interaction flags and the source file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Upper bound for a single typesetter run, in seconds. Must be at least 1.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TypesetterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TypesetterConfig {
    /// The timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_program() -> String {
    "xelatex".into()
}
fn default_timeout_secs() -> u64 {
    300
}

/// `[resources]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// Override for the packaged resources directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Derived paths
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Reject values that parse but cannot work.
    fn validate(&self) -> Result<()> {
        if self.typesetter.timeout_secs == 0 {
            return Err(CvMakerError::config("typesetter.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Absolute default document storage directory.
    pub fn documents_dir(&self) -> Result<PathBuf> {
        expand_home(&self.storage.documents_dir)
    }

    /// Absolute directory holding attachment PDFs.
    pub fn attachments_dir(&self) -> Result<PathBuf> {
        Ok(self.documents_dir()?.join(&self.storage.attachments_dir))
    }

    /// Absolute packaged resources directory.
    ///
    /// `[resources] dir` wins over `$CVMAKER_RESOURCES`, which wins over the
    /// resources bundled with this build.
    pub fn resource_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.resources.dir {
            return expand_home(dir);
        }
        if let Some(dir) = std::env::var_os(RESOURCES_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let bundled = PathBuf::from(BUNDLED_RESOURCES);
        Ok(bundled.canonicalize().unwrap_or(bundled))
    }

    /// Directory of packaged default templates.
    pub fn packaged_templates_dir(&self) -> Result<PathBuf> {
        Ok(self.resource_dir()?.join("templates"))
    }

    /// Directory of style assets copied into every working area.
    pub fn style_dir(&self) -> Result<PathBuf> {
        Ok(self.resource_dir()?.join("style"))
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(path)),
    };
    let home = dirs::home_dir()
        .ok_or_else(|| CvMakerError::config("could not determine home directory"))?;
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.cvmaker/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CvMakerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.cvmaker/cvmaker.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Directory of user-customized templates (`~/.cvmaker/templates/`).
pub fn user_templates_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join(USER_TEMPLATES_DIR_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CvMakerError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| CvMakerError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CvMakerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    write_config(&path, &AppConfig::default())?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Serialize `config` as TOML to `path`.
pub fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    let content =
        toml::to_string_pretty(config).map_err(|e| CvMakerError::config(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| CvMakerError::io(path, e))
}
