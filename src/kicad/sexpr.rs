//! S-expression reader for KiCad text formats.
//!
//! KiCad footprints, boards and library tables share one syntax:
//!
//! ```text
//! (footprint "R_0603_1608Metric"
//!   (layer "F.Cu")
//!   (pad "1" smd roundrect (at -0.825 0) (size 0.8 0.95)))
//! ```
//!
//! Bare tokens (symbols and numbers) are kept as [`Sexpr::Atom`]; quoted
//! strings as [`Sexpr::Str`]. Numbers are parsed on access.

use thiserror::Error;

/// Malformed s-expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// Description of what's wrong.
    pub message: String,
}

/// One node of an s-expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    /// Unquoted token, e.g. `smd` or `-0.825`.
    Atom(String),
    /// Quoted string with escapes resolved.
    Str(String),
    /// Parenthesised list.
    List(Vec<Sexpr>),
}

impl Sexpr {
    /// Returns the list items, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the text of an atom or string.
    #[must_use]
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Self::Atom(s) | Self::Str(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Parses an atom or string as a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_atom().and_then(|s| s.parse().ok())
    }

    /// Returns the leading symbol of a list: `pad` for `(pad "1" smd ...)`.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self.as_list()?.first()? {
            Self::Atom(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if this is a list whose leading symbol is `tag`.
    #[must_use]
    pub fn is(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    /// Items after the leading symbol. Empty for atoms.
    #[must_use]
    pub fn args(&self) -> &[Self] {
        match self.as_list() {
            Some([_, rest @ ..]) => rest,
            _ => &[],
        }
    }

    /// First child list tagged `tag`.
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&Self> {
        self.args().iter().find(|item| item.is(tag))
    }

    /// All child lists tagged `tag`.
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.args().iter().filter(move |item| item.is(tag))
    }

    /// Text of the `index`-th argument.
    #[must_use]
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.args().get(index).and_then(Self::as_atom)
    }

    /// Numeric value of the `index`-th argument.
    #[must_use]
    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.args().get(index).and_then(Self::as_f64)
    }

    /// Text of the first argument of child `tag`: `(descr "x")` → `x`.
    #[must_use]
    pub fn value_of(&self, tag: &str) -> Option<&str> {
        self.find(tag).and_then(|child| child.atom_at(0))
    }

    /// Returns `true` if any bare argument equals `word`: `(attr smd dnp)`.
    #[must_use]
    pub fn has_atom(&self, word: &str) -> bool {
        self.args()
            .iter()
            .any(|item| matches!(item, Self::Atom(s) if s == word))
    }

    /// Reads a KiCad boolean child: `(dnp)`, `(dnp yes)` or `(dnp no)`.
    #[must_use]
    pub fn flag(&self, tag: &str) -> bool {
        self.find(tag)
            .is_some_and(|child| !matches!(child.atom_at(0), Some("no" | "false")))
    }
}

/// Parses a complete document consisting of one top-level expression.
///
/// # Errors
///
/// Returns a [`SyntaxError`] for unbalanced parentheses, unterminated
/// strings, or trailing content.
pub fn parse(text: &str) -> Result<Sexpr, SyntaxError> {
    let mut parser = Parser::new(text);
    parser.skip_whitespace();
    let root = parser.parse_expr()?;
    parser.skip_whitespace();
    if parser.peek().is_some() {
        return Err(parser.error("unexpected content after top-level expression"));
    }
    Ok(root)
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn parse_expr(&mut self) -> Result<Sexpr, SyntaxError> {
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('(') => self.parse_list(),
            Some(')') => Err(self.error("unexpected ')'")),
            Some('"') => self.parse_string(),
            Some(_) => Ok(self.parse_atom()),
        }
    }

    fn parse_list(&mut self) -> Result<Sexpr, SyntaxError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error("unclosed '('")),
                Some(')') => {
                    self.bump();
                    return Ok(Sexpr::List(items));
                }
                Some(_) => items.push(self.parse_expr()?),
            }
        }
    }

    fn parse_string(&mut self) -> Result<Sexpr, SyntaxError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(Sexpr::Str(value)),
                Some('\\') => match self.bump() {
                    None => return Err(self.error("unterminated string")),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(c) => value.push(c),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn parse_atom(&mut self) -> Sexpr {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                break;
            }
            value.push(c);
            self.bump();
        }
        Sexpr::Atom(value)
    }
}
