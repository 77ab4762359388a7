//! Restricted evaluator for parameter-file assignments.
//!
//! Grammar:
//! ```text
//! file   := { stmt ( NEWLINE | ';' ) }
//! stmt   := IDENT '=' expr
//! expr   := term { '+' term }
//! term   := STRING | INTEGER | IDENT | '[' [ expr { ',' expr } [','] ] ']'
//! ```
//! Identifiers on the right-hand side must have been assigned earlier in
//! the same file. Nothing else is evaluated.

use std::collections::BTreeMap;

use cvmaker_shared::{CvMakerError, Result};

use crate::lexer::{Token, TokenKind};
use crate::Value;

/// Evaluate `tokens` in file order into a fresh namespace.
pub(crate) fn evaluate(tokens: &[Token]) -> Result<BTreeMap<String, Value>> {
    let mut eval = Evaluator {
        tokens,
        pos: 0,
        bindings: BTreeMap::new(),
    };
    eval.run()?;
    Ok(eval.bindings)
}

struct Evaluator<'a> {
    tokens: &'a [Token],
    pos: usize,
    bindings: BTreeMap<String, Value>,
}

impl<'a> Evaluator<'a> {
    fn run(&mut self) -> Result<()> {
        loop {
            self.skip_separators();
            let Some(token) = self.next() else {
                return Ok(());
            };
            let TokenKind::Ident(name) = &token.kind else {
                return Err(CvMakerError::syntax(
                    token.line,
                    format!("expected a variable name, found {}", token.kind.describe()),
                ));
            };
            let name = name.clone();
            self.expect(TokenKind::Assign, &format!("after '{name}'"))?;
            let value = self.expr()?;
            match self.next() {
                None => {}
                Some(Token {
                    kind: TokenKind::Separator,
                    ..
                }) => {}
                Some(other) => {
                    return Err(CvMakerError::syntax(
                        other.line,
                        format!(
                            "unexpected {} after the value of '{name}'",
                            other.kind.describe()
                        ),
                    ));
                }
            }
            tracing::trace!(%name, "bound parameter");
            self.bindings.insert(name, value);
        }
    }

    fn expr(&mut self) -> Result<Value> {
        let mut value = self.term()?;
        while self.peek_kind() == Some(&TokenKind::Plus) {
            let line = self.next().map_or(0, |t| t.line);
            self.skip_separators();
            let rhs = self.term()?;
            value = value
                .concat(rhs)
                .map_err(|msg| CvMakerError::syntax(line, msg))?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Value> {
        self.skip_separators();
        let Some(token) = self.next() else {
            return Err(CvMakerError::syntax(self.last_line(), "missing value at end of file"));
        };
        match &token.kind {
            TokenKind::Str(s) => Ok(Value::Str(s.clone())),
            TokenKind::Int(n) => Ok(Value::Int(*n)),
            TokenKind::Ident(name) => self.bindings.get(name).cloned().ok_or_else(|| {
                CvMakerError::syntax(token.line, format!("'{name}' is used before it is assigned"))
            }),
            TokenKind::LBracket => self.list(token.line),
            other => Err(CvMakerError::syntax(
                token.line,
                format!("expected a value, found {}", other.describe()),
            )),
        }
    }

    /// Parse list items after an opening `[`.
    fn list(&mut self, open_line: usize) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_kind() {
                Some(TokenKind::RBracket) => {
                    self.next();
                    return Ok(Value::List(items));
                }
                None => return Err(CvMakerError::syntax(open_line, "unclosed '['")),
                _ => {}
            }
            items.push(self.expr()?);
            self.skip_separators();
            match self.next() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => {}
                Some(Token {
                    kind: TokenKind::RBracket,
                    ..
                }) => return Ok(Value::List(items)),
                Some(other) => {
                    return Err(CvMakerError::syntax(
                        other.line,
                        format!("expected ',' or ']', found {}", other.kind.describe()),
                    ));
                }
                None => return Err(CvMakerError::syntax(open_line, "unclosed '['")),
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<()> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(CvMakerError::syntax(
                token.line,
                format!(
                    "expected {} {context}, found {}",
                    kind.describe(),
                    token.kind.describe()
                ),
            )),
            None => Err(CvMakerError::syntax(
                self.last_line(),
                format!("expected {} {context}", kind.describe()),
            )),
        }
    }

    fn skip_separators(&mut self) {
        while self.peek_kind() == Some(&TokenKind::Separator) {
            self.pos += 1;
        }
    }

    fn peek_kind(&self) -> Option<&'a TokenKind> {
        let tokens = self.tokens;
        tokens.get(self.pos).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tokens = self.tokens;
        let token = tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }
}
