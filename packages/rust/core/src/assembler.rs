//! LaTeX document assembler.
//!
//! Concatenates the resolved preamble, cover-letter and résumé templates
//! into the three fixed document skeletons, then substitutes the extracted
//! parameter-file variables into the result.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, instrument};

use cvmaker_params::Variables;
use cvmaker_shared::{CvMakerError, DocumentVariant, Result, TemplateRole};

const BEGIN_DOCUMENT: &str = "\\begin{document}";
const END_DOCUMENT: &str = "\\end{document}";
const CLEAR_PAGE: &str = "\\clearpage";
const NEW_PAGE: &str = "\\newpage";

/// Separator between skeleton parts.
const PART_SEPARATOR: &str = "\n\n";

/// Template bodies feeding the document skeletons.
#[derive(Debug, Clone, Default)]
pub struct DocumentTemplates {
    pub preamble: String,
    pub cover_letter: String,
    pub resume: String,
}

impl DocumentTemplates {
    /// Read the staged templates (`preamble.tex.tpl`, `cl.tex.tpl`,
    /// `cv.tex.tpl`) from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let read = |role: TemplateRole| {
            let path = dir.join(role.staged_name());
            std::fs::read_to_string(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CvMakerError::InputNotFound { path },
                _ => CvMakerError::io(&path, e),
            })
        };
        Ok(Self {
            preamble: read(TemplateRole::Preamble)?,
            cover_letter: read(TemplateRole::CoverLetter)?,
            resume: read(TemplateRole::Resume)?,
        })
    }
}

/// Build the three document skeletons without substitution.
///
/// `attachments` are embedding directives appended after the résumé in the
/// combined variant.
pub fn skeletons(
    templates: &DocumentTemplates,
    attachments: &[String],
) -> BTreeMap<DocumentVariant, String> {
    let attachment_block = attachments.join("\n");
    DocumentVariant::ALL
        .into_iter()
        .map(|variant| {
            let parts: Vec<&str> = match variant {
                DocumentVariant::CoverLetterOnly => vec![
                    templates.preamble.as_str(),
                    BEGIN_DOCUMENT,
                    CLEAR_PAGE,
                    templates.cover_letter.as_str(),
                    END_DOCUMENT,
                ],
                DocumentVariant::ResumeOnly => vec![
                    templates.preamble.as_str(),
                    BEGIN_DOCUMENT,
                    CLEAR_PAGE,
                    templates.resume.as_str(),
                    END_DOCUMENT,
                ],
                DocumentVariant::Combined => vec![
                    templates.preamble.as_str(),
                    BEGIN_DOCUMENT,
                    CLEAR_PAGE,
                    templates.cover_letter.as_str(),
                    NEW_PAGE,
                    templates.resume.as_str(),
                    attachment_block.as_str(),
                    END_DOCUMENT,
                ],
            };
            (variant, parts.join(PART_SEPARATOR))
        })
        .collect()
}

/// Replace every occurrence of each string variable's name with its value.
///
/// Variables are applied one after another in reverse name order, so
/// `VAR_OWN_NAME_SHORT` is replaced before `VAR_OWN_NAME` can match its
/// prefix. Each replacement is a single left-to-right pass, so substituted
/// text is not scanned again for the same name. Unknown placeholders are
/// left untouched.
pub fn substitute(text: &str, variables: &Variables) -> String {
    variables
        .substitutions()
        .rev()
        .fold(text.to_string(), |acc, (name, value)| {
            if acc.contains(name) {
                acc.replace(name, value)
            } else {
                acc
            }
        })
}

/// Assemble and substitute all document variants.
#[instrument(skip_all, fields(attachments = attachments.len(), variables = variables.len()))]
pub fn assemble(
    templates: &DocumentTemplates,
    attachments: &[String],
    variables: &Variables,
) -> BTreeMap<DocumentVariant, String> {
    skeletons(templates, attachments)
        .into_iter()
        .map(|(variant, text)| {
            let source = substitute(&text, variables);
            debug!(%variant, bytes = source.len(), "assembled document");
            (variant, source)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
