//! Tokenizer for parameter files.

use cvmaker_shared::{CvMakerError, Result};

/// A lexical token with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    Assign,
    Plus,
    Comma,
    LBracket,
    RBracket,
    /// Statement separator: newline or `;`.
    Separator,
}

impl TokenKind {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("name '{name}'"),
            Self::Str(_) => "string".into(),
            Self::Int(n) => format!("number {n}"),
            Self::Assign => "'='".into(),
            Self::Plus => "'+'".into(),
            Self::Comma => "','".into(),
            Self::LBracket => "'['".into(),
            Self::RBracket => "']'".into(),
            Self::Separator => "end of line".into(),
        }
    }
}

/// Returns the quote character of a string literal left open at the end of
/// `content`, if any.
pub(crate) fn open_quote(content: &str) -> Option<char> {
    let mut chars = content.chars();
    let mut open: Option<char> = None;
    while let Some(c) = chars.next() {
        match open {
            Some(q) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    open = None;
                }
            }
            None => match c {
                '"' | '\'' => open = Some(c),
                '#' => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => {}
            },
        }
    }
    open
}

/// Split parameter-file content into tokens.
pub(crate) fn tokenize(content: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = content.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        let kind = match c {
            '\n' => {
                line += 1;
                TokenKind::Separator
            }
            ';' => TokenKind::Separator,
            c if c.is_whitespace() => continue,
            '#' => {
                while chars.next_if(|&c| c != '\n').is_some() {}
                continue;
            }
            '=' => TokenKind::Assign,
            '+' => TokenKind::Plus,
            ',' => TokenKind::Comma,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '"' | '\'' => {
                let start = line;
                let text = read_string(&mut chars, c, &mut line)
                    .ok_or_else(|| CvMakerError::syntax(start, "unterminated string literal"))?;
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    line: start,
                });
                continue;
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::from(c);
                while let Some(d) = chars.next_if(|c| c.is_ascii_digit() || *c == '_') {
                    if d != '_' {
                        digits.push(d);
                    }
                }
                let value = digits
                    .parse()
                    .map_err(|_| CvMakerError::syntax(line, format!("number {digits} is too large")))?;
                TokenKind::Int(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::from(c);
                while let Some(d) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    name.push(d);
                }
                TokenKind::Ident(name)
            }
            other => {
                return Err(CvMakerError::syntax(
                    line,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        tokens.push(Token { kind, line });
    }

    Ok(tokens)
}

/// Read a string literal body after its opening `quote`.
///
/// A backslash only escapes the enclosing quote character. `\\` is kept as
/// a pair and every other backslash sequence is kept verbatim, so TeX
/// macros and line breaks survive unchanged.
fn read_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
    line: &mut usize,
) -> Option<String> {
    let mut text = String::new();
    loop {
        let c = chars.next()?;
        if c == '\n' {
            *line += 1;
        }
        if c == quote {
            return Some(text);
        }
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('\\') => text.push_str("\\\\"),
            Some(n) if n == quote => text.push(quote),
            _ => {
                text.push('\\');
                continue;
            }
        }
        chars.next();
    }
}
