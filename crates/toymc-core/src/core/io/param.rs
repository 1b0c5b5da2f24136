//! Recursive-descent parser for the parameter language.
//!
//! A parameter file is a flat list of `name value` pairs with `#` comments:
//!
//! ```text
//! OBJECT   := (COMMENT | NAME_LIT VALUE)* EOS
//! COMMENT  := '#' (not NEWLINE)*
//! NAME_LIT := (ALPHA | DIGIT | '_' | '-')+
//! VALUE    := LIST | STRING | NUMBER | BOOLEAN
//! LIST     := '[' (VALUE separated by whitespace, newlines or commas)* ']'
//! STRING   := '"' (any-char | '\' '"')* '"'
//! NUMBER   := ('+' | '-')? DIGIT* ('.' DIGIT*)? (('e'|'E') ('+'|'-')? DIGIT+)?
//! BOOLEAN  := "true" | "yes" | "on" | "false" | "no" | "off"
//! ```
//!
//! Re-declaring a name overwrites the earlier value in place. Any error aborts the
//! whole parse and drops the partially built tree.

use crate::core::io::lexer::{LexError, Lexer, Location, TokenKind};
use crate::core::models::value::{Object, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const TRUE_LITERALS: [&str; 3] = ["true", "yes", "on"];
const FALSE_LITERALS: [&str; 3] = ["false", "no", "off"];

/// A lexical or grammatical violation in a parameter file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{what} (line {line}, column {column})")]
pub struct ParseError {
    pub what: String,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    fn at(location: Location, what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            position: location.position,
            line: location.line,
            column: location.column,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        match err {
            LexError::UnexpectedToken {
                expected,
                found,
                location,
            } => ParseError::at(location, format!("expected {}, found {}", expected, found)),
            LexError::InvalidShift(_) => ParseError {
                what: err.to_string(),
                position: 0,
                line: 0,
                column: 0,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ParamFileError {
    #[error("Failed to read parameter file '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid parameter file '{path}': {source}", path = path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Parses a whole parameter document into an [`Value::Object`].
pub fn loads(input: &str) -> Result<Value, ParseError> {
    let object = Parser::new(input).parse_object()?;
    debug!("Parsed parameter document with {} entries.", object.len());
    Ok(Value::Object(object))
}

/// Parses a lone value, such as the right-hand side of a command-line override.
///
/// Comments and blanks around the value are allowed; anything else is an error.
pub fn loads_value(input: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(input);
    parser.skip_trivia();
    let value = parser.parse_value()?;
    parser.expect_separator(false)?;
    parser.skip_trivia();
    if !parser.lexer.at_end() {
        return Err(parser.error(format!(
            "unexpected {} after the value",
            parser.lexer.kind()
        )));
    }
    Ok(value)
}

/// Reads `path` fully into memory and parses it.
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Value, ParamFileError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ParamFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    loads(&content).map_err(|source| ParamFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
        }
    }

    fn error(&self, what: impl Into<String>) -> ParseError {
        ParseError::at(self.lexer.location(), what)
    }

    fn is_name_char(&self) -> bool {
        match self.lexer.kind() {
            TokenKind::Alpha | TokenKind::Digit | TokenKind::Dash => true,
            TokenKind::Char => self.lexer.byte() == Some(b'_'),
            _ => false,
        }
    }

    fn skip_comment(&mut self) {
        self.lexer
            .skip_while(|tk| !matches!(tk.kind, TokenKind::Newline | TokenKind::Eos));
    }

    fn skip_trivia(&mut self) {
        loop {
            self.lexer.skip_blank();
            if self.lexer.kind() != TokenKind::Comment {
                break;
            }
            self.skip_comment();
        }
    }

    fn parse_object(&mut self) -> Result<Object, ParseError> {
        let mut object = Object::new();

        loop {
            self.skip_trivia();
            if self.lexer.at_end() {
                break;
            }

            let key = self.parse_name()?;
            let value = self.parse_value()?;
            self.expect_separator(false)?;

            if object.set(key, value).is_some() {
                debug!("Parameter '{}' declared more than once; last value wins.", key);
            }
        }

        Ok(object)
    }

    fn parse_name(&mut self) -> Result<&'a str, ParseError> {
        if !self.is_name_char() {
            return Err(self.error(format!(
                "expected a parameter name, found {}",
                self.lexer.kind()
            )));
        }

        let start = self.lexer.position();
        while self.is_name_char() {
            self.lexer.bump();
        }
        let name = self.lexer.slice_from(start);

        match self.lexer.kind() {
            TokenKind::Whitespace => {
                self.lexer.skip(TokenKind::Whitespace);
                match self.lexer.kind() {
                    TokenKind::Newline | TokenKind::Eos | TokenKind::Comment => {
                        Err(self.error(format!("missing value for '{}'", name)))
                    }
                    _ => Ok(name),
                }
            }
            TokenKind::Newline | TokenKind::Eos | TokenKind::Comment => {
                Err(self.error(format!("missing value for '{}'", name)))
            }
            other => Err(self.error(format!("unexpected {} in parameter name", other))),
        }
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.lexer.kind() {
            TokenKind::LeftBracket => self.parse_list(),
            TokenKind::Quote => self.parse_string(),
            TokenKind::Dot | TokenKind::Dash | TokenKind::Plus | TokenKind::Digit => {
                self.parse_number()
            }
            TokenKind::Alpha => self.parse_boolean(),
            other => Err(self.error(format!("unexpected {} at start of a value", other))),
        }
    }

    /// A value must be followed by a separator so that `2b` or `"x"y` are rejected
    /// rather than split silently.
    fn expect_separator(&self, in_list: bool) -> Result<(), ParseError> {
        match self.lexer.kind() {
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment | TokenKind::Eos => {
                Ok(())
            }
            TokenKind::RightBracket | TokenKind::Comma if in_list => Ok(()),
            other => Err(self.error(format!("unexpected {} after value", other))),
        }
    }

    fn parse_string(&mut self) -> Result<Value, ParseError> {
        self.lexer.eat(TokenKind::Quote)?;

        let start = self.lexer.position();
        let mut escaped = false;
        loop {
            match self.lexer.kind() {
                TokenKind::Eos => return Err(self.error("unterminated string")),
                TokenKind::Quote if !escaped => break,
                TokenKind::Escape if !escaped => escaped = true,
                _ => escaped = false,
            }
            self.lexer.bump();
        }
        let content = self.lexer.slice_from(start).to_string();
        self.lexer.eat(TokenKind::Quote)?;

        Ok(Value::String(content))
    }

    /// Consumes the longest span shaped like a number, then checks that the standard
    /// library parser accepts exactly that span. Reals that overflow to infinity are
    /// malformed, like integers that overflow `i64`.
    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start_location = self.lexer.location();
        let start = self.lexer.position();
        let mut is_real = false;

        if matches!(self.lexer.kind(), TokenKind::Plus | TokenKind::Dash) {
            self.lexer.bump();
        }
        self.lexer.skip(TokenKind::Digit);

        if self.lexer.kind() == TokenKind::Dot {
            is_real = true;
            self.lexer.bump();
            self.lexer.skip(TokenKind::Digit);
        }

        if matches!(self.lexer.byte(), Some(b'e' | b'E')) {
            is_real = true;
            self.lexer.bump();
            if matches!(self.lexer.kind(), TokenKind::Plus | TokenKind::Dash) {
                self.lexer.bump();
            }
            self.lexer.skip(TokenKind::Digit);
        }

        let span = self.lexer.slice_from(start);
        let value = if is_real {
            span.parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Value::Real)
        } else {
            span.parse::<i64>().ok().map(Value::Integer)
        };

        value.ok_or_else(|| ParseError::at(start_location, format!("malformed number '{}'", span)))
    }

    fn parse_boolean(&mut self) -> Result<Value, ParseError> {
        let start_location = self.lexer.location();
        let start = self.lexer.position();
        self.lexer.skip(TokenKind::Alpha);
        let word = self.lexer.slice_from(start);

        if TRUE_LITERALS.contains(&word) {
            Ok(Value::Boolean(true))
        } else if FALSE_LITERALS.contains(&word) {
            Ok(Value::Boolean(false))
        } else {
            Err(ParseError::at(
                start_location,
                format!("'{}' is not a boolean (expected true/yes/on or false/no/off)", word),
            ))
        }
    }

    fn parse_list(&mut self) -> Result<Value, ParseError> {
        let start_location = self.lexer.location();
        self.lexer.eat(TokenKind::LeftBracket)?;

        let mut items = Vec::new();
        loop {
            loop {
                self.skip_trivia();
                if self.lexer.kind() != TokenKind::Comma {
                    break;
                }
                self.lexer.bump();
            }

            match self.lexer.kind() {
                TokenKind::RightBracket => break,
                TokenKind::Eos => {
                    return Err(ParseError::at(
                        start_location,
                        "unterminated list (missing ']')",
                    ));
                }
                _ => {}
            }

            items.push(self.parse_value()?);
            self.expect_separator(true)?;
        }
        self.lexer.eat(TokenKind::RightBracket)?;

        Ok(Value::List(items))
    }
}
