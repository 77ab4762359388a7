//! Parameter-file parsing and variable extraction for cvmaker.
//!
//! A parameter file is a sequence of assignments such as
//!
//! ```text
//! OWN_NAME = 'Jane Doe'
//! ADDRESSEE_COMPANY = "Rekall"
//! OWN_SKILLS = ['Rust', 'LaTeX'] + ['Go']
//! CL_ATTACHMENTS = "1, 'letter of recommendation'"
//! ```
//!
//! The file is evaluated in order by a small restricted evaluator (string,
//! integer and list literals, `+`, and references to earlier names); the
//! resulting bindings are then narrowed to the recognized variable groups.

mod eval;
mod lexer;

use std::borrow::Cow;
use std::collections::BTreeMap;

use cvmaker_shared::Result;

/// Marker prepended to every extracted variable name.
///
/// Templates reference variables as `VAR_OWN_NAME`, `VAR_CL_BODY`, ...
pub const VARIABLE_MARKER: &str = "VAR_";

/// Name fragments that select a binding as a substitution variable.
pub const VARIABLE_GROUPS: [&str; 3] = ["OWN", "ADDRESSEE", "CL"];

/// Binding that selects the document language.
pub const LANGUAGE_BINDING: &str = "LANG";

/// Extracted variable holding the attachment list.
pub const ATTACHMENTS_VARIABLE: &str = "VAR_CL_ATTACHMENTS";

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A value bound in a parameter file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    List(Vec<Value>),
}

impl Value {
    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// `+` on two values: string and list concatenation, integer addition.
    pub(crate) fn concat(self, rhs: Value) -> std::result::Result<Value, String> {
        match (self, rhs) {
            (Self::Str(mut a), Self::Str(b)) => {
                a.push_str(&b);
                Ok(Self::Str(a))
            }
            (Self::List(mut a), Self::List(b)) => {
                a.extend(b);
                Ok(Self::List(a))
            }
            (Self::Int(a), Self::Int(b)) => a
                .checked_add(b)
                .map(Self::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            (a, b) => Err(format!("cannot add {} to {}", b.kind(), a.kind())),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "a string",
            Self::Int(_) => "a number",
            Self::List(_) => "a list",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// Substitution variables, keyed by marker-prefixed name and sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    entries: BTreeMap<String, Value>,
}

impl Variables {
    /// Look up a variable by its marker-prefixed name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// All variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// String-valued variables in name order; these drive substitution.
    pub fn substitutions(&self) -> impl DoubleEndedIterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }

    /// Marker-prefixed names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ParameterFile
// ---------------------------------------------------------------------------

/// An evaluated parameter file.
#[derive(Debug, Clone, Default)]
pub struct ParameterFile {
    bindings: BTreeMap<String, Value>,
}

impl ParameterFile {
    /// Evaluate parameter-file content.
    ///
    /// A final string literal missing its closing quote is closed before
    /// parsing. Any other malformed input is a
    /// [`CvMakerError::TemplateSyntax`](cvmaker_shared::CvMakerError::TemplateSyntax).
    pub fn parse(content: &str) -> Result<Self> {
        let content = close_trailing_quote(content);
        let tokens = lexer::tokenize(&content)?;
        let bindings = eval::evaluate(&tokens)?;
        tracing::debug!(bindings = bindings.len(), "parameter file evaluated");
        Ok(Self { bindings })
    }

    /// Every binding, including those outside the variable groups.
    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }

    /// The `LANG` binding, when it is a string.
    pub fn language(&self) -> Option<&str> {
        self.bindings
            .get(LANGUAGE_BINDING)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Bindings whose name contains a group fragment, marker-prefixed.
    pub fn variables(&self) -> Variables {
        self.bindings
            .iter()
            .filter(|(name, _)| VARIABLE_GROUPS.iter().any(|g| name.contains(g)))
            .map(|(name, value)| (format!("{VARIABLE_MARKER}{name}"), value.clone()))
            .collect()
    }
}

/// Parse `content` and return its substitution variables.
pub fn extract_variables(content: &str) -> Result<Variables> {
    Ok(ParameterFile::parse(content)?.variables())
}

/// Append the missing closing quote when `content` ends inside a string.
///
/// Content that already parses is returned unchanged.
pub fn close_trailing_quote(content: &str) -> Cow<'_, str> {
    match lexer::open_quote(content) {
        Some(quote) => {
            tracing::debug!(%quote, "closing unterminated final string");
            let mut fixed = content.to_string();
            fixed.push(quote);
            Cow::Owned(fixed)
        }
        None => Cow::Borrowed(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JANE: &str = r#"
# Jane's application to Rekall
LANG = 'en'
OWN_NAME = 'Jane Doe'
OWN_EMAIL = "jane@example.com"
ADDRESSEE_COMPANY = "Rekall Inc."
ADDRESSEE_STREET = '1 Memory Lane'
CL_SUBJECT = "Application as \textit{Memory Engineer}"
CL_ATTACHMENTS = "2, 'letter of recommendation', 'diploma.scan'"
OWN_SKILLS = ['Rust', 'LaTeX']
OWN_SKILLS_ALL = OWN_SKILLS + [
  'Go',
]
SIGNATURE_WIDTH = 40
UNRELATED = 'ignored'
"#;

    #[test]
    fn extracts_only_grouped_variables_sorted() {
        let vars = extract_variables(JANE).unwrap();
        let names: Vec<_> = vars.names().collect();
        assert_eq!(
            names,
            vec![
                "VAR_ADDRESSEE_COMPANY",
                "VAR_ADDRESSEE_STREET",
                "VAR_CL_ATTACHMENTS",
                "VAR_CL_SUBJECT",
                "VAR_OWN_EMAIL",
                "VAR_OWN_NAME",
                "VAR_OWN_SKILLS",
                "VAR_OWN_SKILLS_ALL",
            ]
        );
        assert!(vars.get("VAR_UNRELATED").is_none());
        assert!(vars.get("VAR_LANG").is_none());
    }

    #[test]
    fn evaluates_references_and_concatenation() {
        let vars = extract_variables(JANE).unwrap();
        assert_eq!(
            vars.get("VAR_OWN_SKILLS_ALL"),
            Some(&Value::List(vec![
                Value::Str("Rust".into()),
                Value::Str("LaTeX".into()),
                Value::Str("Go".into()),
            ]))
        );
        assert_eq!(
            vars.get("VAR_CL_SUBJECT").and_then(Value::as_str),
            Some("Application as \\textit{Memory Engineer}")
        );

        let vars = extract_variables("OWN_FIRST = 'Jane'\nOWN_FULL = OWN_FIRST + ' Doe'").unwrap();
        assert_eq!(vars.get("VAR_OWN_FULL").and_then(Value::as_str), Some("Jane Doe"));
    }

    #[test]
    fn substitutions_skip_lists() {
        let vars = extract_variables(JANE).unwrap();
        let subst: Vec<_> = vars.substitutions().map(|(k, _)| k).collect();
        assert!(subst.contains(&"VAR_OWN_NAME"));
        assert!(!subst.contains(&"VAR_OWN_SKILLS"));
    }

    #[test]
    fn language_binding() {
        let file = ParameterFile::parse(JANE).unwrap();
        assert_eq!(file.language(), Some("en"));
        assert_eq!(file.bindings().get("SIGNATURE_WIDTH"), Some(&Value::Int(40)));

        let file = ParameterFile::parse("LANG = ['en']").unwrap();
        assert_eq!(file.language(), None);
    }

    #[test]
    fn missing_final_quote_is_tolerated() {
        let broken = "OWN_NAME = 'Jane'\nCL_BODY = \"Dear Sir or Madam,\n\nregards\n";
        let vars = extract_variables(broken).unwrap();
        assert_eq!(
            vars.get("VAR_CL_BODY").and_then(Value::as_str),
            Some("Dear Sir or Madam,\n\nregards\n")
        );

        let vars = extract_variables("CL_BODY = \"regards\n\n").unwrap();
        assert_eq!(
            vars.get("VAR_CL_BODY").and_then(Value::as_str),
            Some("regards\n\n")
        );
    }

    #[test]
    fn closing_quote_is_idempotent() {
        let valid = "OWN_NAME = \"Jane\"\n";
        assert!(matches!(close_trailing_quote(valid), Cow::Borrowed(_)));

        let fixed = close_trailing_quote("OWN_NAME = \"Jane");
        assert_eq!(fixed, "OWN_NAME = \"Jane\"");
        assert!(matches!(close_trailing_quote(&fixed), Cow::Borrowed(_)));
    }

    #[test]
    fn syntax_errors_carry_line_numbers() {
        let err = extract_variables("OWN_NAME = 'Jane'\nOWN_CITY 'Mars'").unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error in parameter file (line 2): expected '=' after 'OWN_CITY', found string"
        );

        let err = extract_variables("OWN_A = OWN_B").unwrap_err();
        assert!(err.to_string().contains("'OWN_B' is used before it is assigned"));

        let err = extract_variables("OWN_A = 'x' + ['y']").unwrap_err();
        assert!(err.to_string().contains("cannot add a list to a string"));

        let err = extract_variables("OWN_A = ['x'\nOWN_B = 1").unwrap_err();
        assert!(err.to_string().contains("expected ',' or ']'"));

        let err = extract_variables("OWN_A = 'x' 'y'").unwrap_err();
        assert!(err.to_string().contains("after the value of 'OWN_A'"));
    }

    #[test]
    fn later_assignment_wins() {
        let vars = extract_variables("OWN_CITY = 'Berlin'; OWN_CITY = 'Mars'").unwrap();
        assert_eq!(vars.get("VAR_OWN_CITY").and_then(Value::as_str), Some("Mars"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn empty_file_has_no_variables() {
        assert!(extract_variables("\n# nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn list_display_joins_items() {
        let v = Value::List(vec![Value::Int(2), Value::Str("a".into())]);
        assert_eq!(v.to_string(), "2, a");
    }
}
