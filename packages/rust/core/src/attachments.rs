//! Attachment list resolution.
//!
//! `CL_ATTACHMENTS = "2, 'letter of recommendation', 'diploma.scan'"` names
//! the PDFs appended to the combined document. The first item is a count
//! and is dropped; the others become `LetterOfRecommendation.pdf` and
//! `DiplomaScan.pdf`.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use cvmaker_params::{ATTACHMENTS_VARIABLE, Value, Variables};

/// Extension appended to every normalized attachment name.
pub const ATTACHMENT_EXTENSION: &str = "pdf";

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word regex"));

static GAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s.]+").expect("gap regex"));

/// An attachment referenced by the parameter file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Normalized file name, e.g. `DiplomaScan.pdf`.
    pub file_name: String,
    /// Whether the file was present in the working area.
    pub present: bool,
}

impl Attachment {
    /// LaTeX directive embedding every page of the attachment.
    pub fn directive(&self) -> String {
        format!("\\includepdf[pages=-]{{{}}}", self.file_name)
    }
}

/// Turn one attachment label into a file name.
///
/// Quotes are removed, each word is capitalized, whitespace and periods are
/// dropped. Returns `None` when nothing is left.
pub fn normalize_label(label: &str) -> Option<String> {
    let unquoted = label.replace(['\'', '"'], "");
    let capitalized = WORD_RE.replace_all(&unquoted, |caps: &Captures<'_>| capitalize(&caps[0]));
    let stem = GAP_RE.replace_all(&capitalized, "");
    (!stem.is_empty()).then(|| format!("{stem}.{ATTACHMENT_EXTENSION}"))
}

/// File names declared by an attachments value, in declaration order.
///
/// A string is split on commas; a list contributes its items. Either way the
/// first item is a count and is skipped.
pub fn attachment_names(value: &Value) -> Vec<String> {
    let labels: Vec<String> = match value {
        Value::Str(s) => s.split(',').map(str::to_string).collect(),
        Value::List(items) => items.iter().map(Value::to_string).collect(),
        Value::Int(_) => Vec::new(),
    };
    labels
        .iter()
        .skip(1)
        .filter_map(|label| normalize_label(label))
        .collect()
}

/// Resolve the attachments declared in `variables` against `dir`.
///
/// Missing files are only reported; the typesetter fails on them later.
pub fn resolve_attachments(variables: &Variables, dir: &Path) -> Vec<Attachment> {
    let Some(value) = variables.get(ATTACHMENTS_VARIABLE) else {
        debug!("no attachments declared");
        return Vec::new();
    };

    attachment_names(value)
        .into_iter()
        .map(|file_name| {
            let present = dir.join(&file_name).is_file();
            if present {
                debug!(file = %file_name, "attachment found");
            } else {
                warn!(file = %file_name, "referenced attachment file not found");
            }
            Attachment { file_name, present }
        })
        .collect()
}

/// Directives for `attachments`, order preserved.
pub fn directives(attachments: &[Attachment]) -> Vec<String> {
    attachments.iter().map(Attachment::directive).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
