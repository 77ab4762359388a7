//! Shared types, error model, and configuration for cvmaker.
//!
//! This crate is the foundation depended on by all other cvmaker crates.
//! It provides:
//! - [`CvMakerError`], the unified error type
//! - Domain types ([`TemplateRole`], [`DocumentVariant`], [`LanguageTag`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ResourcesConfig, StorageConfig, TypesetterConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from,
    user_templates_dir, write_config,
};
pub use error::{CvMakerError, Result};
pub use types::{DocumentVariant, LanguageTag, TEMPLATE_SUFFIX, TemplateRole};
