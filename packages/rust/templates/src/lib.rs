//! Template resolution for cvmaker.
//!
//! Every [`TemplateRole`] resolves to one concrete file per invocation:
//!
//! 1. the user-customized copy (`~/.cvmaker/templates/<file>`, or the config
//!    file itself for [`TemplateRole::Config`]);
//! 2. the packaged default for the requested language.
//!
//! When a user asks to customize a template in a language without a
//! packaged default, [`TemplateResolver::provision_default`] first copies the
//! fallback-language default into the requested-language slot.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use cvmaker_shared::{AppConfig, CvMakerError, LanguageTag, Result, TemplateRole};

/// Where a resolved template came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateOrigin {
    /// The user's customized copy.
    User,
    /// The packaged default.
    Packaged,
}

/// A template file chosen for a role and language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub role: TemplateRole,
    pub path: PathBuf,
    pub origin: TemplateOrigin,
}

/// Resolves template roles against the user and packaged template directories.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    /// User-customized templates.
    user_dir: PathBuf,
    /// The user's configuration file.
    user_config: PathBuf,
    /// Packaged default templates.
    packaged_dir: PathBuf,
    /// Language whose defaults seed new languages.
    fallback_language: LanguageTag,
}

impl TemplateResolver {
    pub fn new(
        user_dir: impl Into<PathBuf>,
        user_config: impl Into<PathBuf>,
        packaged_dir: impl Into<PathBuf>,
        fallback_language: LanguageTag,
    ) -> Self {
        Self {
            user_dir: user_dir.into(),
            user_config: user_config.into(),
            packaged_dir: packaged_dir.into(),
            fallback_language,
        }
    }

    /// Build a resolver from the loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            cvmaker_shared::user_templates_dir()?,
            cvmaker_shared::config_file_path()?,
            config.packaged_templates_dir()?,
            config.defaults.language.clone(),
        ))
    }

    /// Location of the user-customized copy of `role` in `language`.
    pub fn user_path(&self, role: TemplateRole, language: &LanguageTag) -> PathBuf {
        match role {
            TemplateRole::Config => self.user_config.clone(),
            _ => self.user_dir.join(role.file_name(language)),
        }
    }

    /// Location of the packaged default of `role` in `language`.
    pub fn packaged_path(&self, role: TemplateRole, language: &LanguageTag) -> PathBuf {
        self.packaged_dir.join(role.file_name(language))
    }

    /// Pick the file to use for `role` in `language`.
    ///
    /// The user's copy wins over the packaged default. No fallback language
    /// is consulted here; see [`Self::provision_default`].
    pub fn resolve(&self, role: TemplateRole, language: &LanguageTag) -> Result<ResolvedTemplate> {
        let user = self.user_path(role, language);
        if user.is_file() {
            debug!(%role, path = %user.display(), "using customized template");
            return Ok(ResolvedTemplate {
                role,
                path: user,
                origin: TemplateOrigin::User,
            });
        }

        let packaged = self.packaged_path(role, language);
        if packaged.is_file() {
            debug!(%role, path = %packaged.display(), "using packaged template");
            return Ok(ResolvedTemplate {
                role,
                path: packaged,
                origin: TemplateOrigin::Packaged,
            });
        }

        Err(CvMakerError::TemplateNotFound {
            role,
            language: language.to_string(),
        })
    }

    /// Make sure a packaged default exists for `role` in `language`.
    ///
    /// If only the fallback language has one, it is copied into the
    /// requested-language slot. Calling this again once the file exists does
    /// nothing.
    #[instrument(skip_all, fields(%role, %language))]
    pub fn provision_default(&self, role: TemplateRole, language: &LanguageTag) -> Result<PathBuf> {
        let target = self.packaged_path(role, language);
        if target.is_file() {
            return Ok(target);
        }

        let fallback = self.packaged_path(role, &self.fallback_language);
        if !fallback.is_file() {
            return Err(CvMakerError::TemplateNotFound {
                role,
                language: language.to_string(),
            });
        }

        copy_file(&fallback, &target)?;
        info!(
            from = %fallback.display(),
            to = %target.display(),
            "created {language} template from {} default",
            self.fallback_language
        );
        Ok(target)
    }

    /// Return the user's editable copy of `role`, creating it from the
    /// (provisioned) default when it does not exist yet.
    #[instrument(skip_all, fields(%role, %language))]
    pub fn customize(&self, role: TemplateRole, language: &LanguageTag) -> Result<PathBuf> {
        let user = self.user_path(role, language);
        if user.is_file() {
            return Ok(user);
        }

        let default = self.provision_default(role, language)?;
        copy_file(&default, &user)?;
        info!(path = %user.display(), "created customizable template");
        Ok(user)
    }
}

/// Copy `from` to `to`, creating parent directories of `to`.
fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CvMakerError::io(parent, e))?;
    }
    std::fs::copy(from, to).map_err(|e| CvMakerError::io(from, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
