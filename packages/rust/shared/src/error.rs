//! Error types for cvmaker.
//!
//! Library crates use [`CvMakerError`] via `thiserror`.
//! The `cv` binary wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::TemplateRole;

/// Top-level error type for all cvmaker operations.
#[derive(Debug, thiserror::Error)]
pub enum CvMakerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A referenced input file (parameter file, resource, ...) does not exist.
    #[error("input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// The parameter file does not follow the assignment grammar.
    #[error("syntax error in parameter file (line {line}): {message}")]
    TemplateSyntax { line: usize, message: String },

    /// No user or packaged template exists for a role/language combination.
    #[error("no {role} template found for language '{language}'")]
    TemplateNotFound { role: TemplateRole, language: String },

    /// The typesetter failed or did not produce the expected PDF.
    #[error("could not compile {}: {reason}\nSee {} for details.", source_file.display(), log.display())]
    Compilation {
        source_file: PathBuf,
        log: PathBuf,
        reason: String,
    },

    /// The typesetting executable is not on the search path.
    #[error("no '{program}' command found")]
    ToolchainMissing { program: String },

    /// Data validation error (bad language tag, existing target file, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Anything unclassified, caught at the pipeline boundary.
    #[error("unexpected failure: {message} (working area: {})", working_area.display())]
    Unexpected {
        message: String,
        working_area: PathBuf,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CvMakerError>;

impl CvMakerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a parameter-file syntax error at a 1-based line.
    pub fn syntax(line: usize, msg: impl Into<String>) -> Self {
        Self::TemplateSyntax {
            line,
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error belongs to one of the named failure kinds.
    ///
    /// Everything else is wrapped into [`CvMakerError::Unexpected`] at the
    /// pipeline boundary.
    pub fn is_classified(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::Unexpected { .. })
    }

    /// Follow-up advice shown below the error message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::TemplateSyntax { .. } => {
                Some("Check the parameter file for typos such as a missing quote, '=' or comma.")
            }
            Self::TemplateNotFound { .. } => {
                Some("Run `cv edit <role> --lang <lang>` to create a template for this language.")
            }
            Self::ToolchainMissing { .. } => Some("Please install TeX Live and try again."),
            Self::Unexpected { .. } => {
                Some("Re-run with --keep-workdir to inspect the working area afterwards.")
            }
            _ => None,
        }
    }
}
