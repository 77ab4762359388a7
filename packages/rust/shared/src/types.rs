//! Core domain types for cvmaker documents and templates.

use serde::{Deserialize, Serialize};

use crate::error::CvMakerError;

/// Suffix shared by all language-specific LaTeX template files.
pub const TEMPLATE_SUFFIX: &str = "tex.tpl";

// ---------------------------------------------------------------------------
// LanguageTag
// ---------------------------------------------------------------------------

/// A lower-case language tag such as `en`, `de` or `jbo`.
///
/// Only the shape is checked (2–8 ASCII letters); whether the code is a
/// registered ISO 639 code is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageTag {
    fn default() -> Self {
        Self("en".into())
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for LanguageTag {
    type Err = CvMakerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        let valid = (2..=8).contains(&tag.len()) && tag.bytes().all(|b| b.is_ascii_lowercase());
        if !valid {
            return Err(CvMakerError::validation(format!(
                "invalid language tag '{s}': expected an ISO 639 code such as 'en', 'hi' or 'jbo'"
            )));
        }
        Ok(Self(tag))
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = CvMakerError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}

// ---------------------------------------------------------------------------
// TemplateRole
// ---------------------------------------------------------------------------

/// A named template slot, resolved to one concrete file per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateRole {
    /// LaTeX preamble shared by every document variant.
    Preamble,
    /// Cover-letter body.
    CoverLetter,
    /// Résumé body.
    Resume,
    /// Boilerplate parameter file used by `cv newdoc`.
    NewDocument,
    /// Default configuration file.
    Config,
}

impl TemplateRole {
    /// All roles, in the order they are listed to users.
    pub const ALL: [TemplateRole; 5] = [
        Self::NewDocument,
        Self::Resume,
        Self::CoverLetter,
        Self::Preamble,
        Self::Config,
    ];

    /// Roles whose templates are concatenated into the LaTeX documents.
    pub const DOCUMENT: [TemplateRole; 3] = [Self::Preamble, Self::CoverLetter, Self::Resume];

    /// Short name used on the command line and as the file-name stem.
    pub fn base_name(self) -> &'static str {
        match self {
            Self::Preamble => "preamble",
            Self::CoverLetter => "cl",
            Self::Resume => "cv",
            Self::NewDocument => "newdoc",
            Self::Config => "config",
        }
    }

    /// Whether the file name carries a language tag.
    pub fn is_language_specific(self) -> bool {
        !matches!(self, Self::NewDocument | Self::Config)
    }

    /// File name of this role's template for `language`.
    ///
    /// `preamble-en.tex.tpl`, `cl-de.tex.tpl`, ...; the boilerplate and
    /// configuration roles ignore the language.
    pub fn file_name(self, language: &LanguageTag) -> String {
        match self {
            Self::NewDocument => "newdoc.txt".into(),
            Self::Config => crate::config::CONFIG_FILE_NAME.into(),
            _ => format!("{}-{language}.{TEMPLATE_SUFFIX}", self.base_name()),
        }
    }

    /// Language-neutral name a template gets once staged in a working area.
    pub fn staged_name(self) -> String {
        match self {
            Self::NewDocument | Self::Config => self.file_name(&LanguageTag::default()),
            _ => format!("{}.{TEMPLATE_SUFFIX}", self.base_name()),
        }
    }
}

impl std::fmt::Display for TemplateRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Preamble => "preamble",
            Self::CoverLetter => "cover-letter",
            Self::Resume => "résumé",
            Self::NewDocument => "new-document",
            Self::Config => "configuration",
        })
    }
}

impl std::str::FromStr for TemplateRole {
    type Err = CvMakerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "preamble" => Ok(Self::Preamble),
            "cl" | "cl_template" | "cover-letter" => Ok(Self::CoverLetter),
            "cv" | "resume" => Ok(Self::Resume),
            "newdoc" => Ok(Self::NewDocument),
            "config" => Ok(Self::Config),
            other => Err(CvMakerError::validation(format!(
                "unknown template '{other}': expected newdoc, cv, cl, preamble or config"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentVariant
// ---------------------------------------------------------------------------

/// One of the three fixed document skeletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentVariant {
    /// Preamble + cover letter.
    CoverLetterOnly,
    /// Preamble + résumé.
    ResumeOnly,
    /// Preamble + cover letter + résumé + embedded attachments.
    Combined,
}

impl DocumentVariant {
    /// All variants, in compilation order.
    pub const ALL: [DocumentVariant; 3] = [Self::CoverLetterOnly, Self::ResumeOnly, Self::Combined];

    /// File stem of the generated `.tex`, `.log` and `.pdf` files.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::CoverLetterOnly => "CL_only",
            Self::ResumeOnly => "CV_only",
            Self::Combined => "CL_CV_attachments",
        }
    }
}

impl std::fmt::Display for DocumentVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_stem())
    }
}
