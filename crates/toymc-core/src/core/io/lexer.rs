use std::fmt;
use thiserror::Error;

/// Classification of a single input character.
///
/// Both text grammars (the parameter language and XYZ) are written against this
/// alphabet, each using the subset it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Space or horizontal tab.
    Whitespace,
    /// Line feed or carriage return.
    Newline,
    /// `[0-9]`
    Digit,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `\`
    Escape,
    /// `"`
    Quote,
    /// `-`
    Dash,
    /// `+`
    Plus,
    /// `#`
    Comment,
    /// `[a-zA-Z]`
    Alpha,
    /// Anything not covered by another kind, including every non-ASCII byte.
    Char,
    /// End of the input.
    Eos,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::Newline => "newline",
            TokenKind::Digit => "digit",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::LeftBracket => "'['",
            TokenKind::RightBracket => "']'",
            TokenKind::Escape => "'\\'",
            TokenKind::Quote => "'\"'",
            TokenKind::Dash => "'-'",
            TokenKind::Plus => "'+'",
            TokenKind::Comment => "'#'",
            TokenKind::Alpha => "letter",
            TokenKind::Char => "character",
            TokenKind::Eos => "end of input",
        };
        f.write_str(name)
    }
}

const CLASS_TABLE: [TokenKind; 128] = build_class_table();

const fn build_class_table() -> [TokenKind; 128] {
    let mut table = [TokenKind::Char; 128];

    table[b' ' as usize] = TokenKind::Whitespace;
    table[b'\t' as usize] = TokenKind::Whitespace;
    table[b'\n' as usize] = TokenKind::Newline;
    table[b'\r' as usize] = TokenKind::Newline;
    table[b',' as usize] = TokenKind::Comma;
    table[b'.' as usize] = TokenKind::Dot;
    table[b'[' as usize] = TokenKind::LeftBracket;
    table[b']' as usize] = TokenKind::RightBracket;
    table[b'\\' as usize] = TokenKind::Escape;
    table[b'"' as usize] = TokenKind::Quote;
    table[b'-' as usize] = TokenKind::Dash;
    table[b'+' as usize] = TokenKind::Plus;
    table[b'#' as usize] = TokenKind::Comment;

    let mut c = b'0';
    while c <= b'9' {
        table[c as usize] = TokenKind::Digit;
        c += 1;
    }

    let mut c = b'a';
    while c <= b'z' {
        table[c as usize] = TokenKind::Alpha;
        table[(c - b'a' + b'A') as usize] = TokenKind::Alpha;
        c += 1;
    }

    table
}

/// Returns the token kind of a single byte.
#[inline]
pub fn classify_byte(c: u8) -> TokenKind {
    CLASS_TABLE
        .get(c as usize)
        .copied()
        .unwrap_or(TokenKind::Char)
}

/// Where a token sits in the input.
///
/// `line` is one-based, `column` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A classified, positioned view into the input.
///
/// `value` borrows the input from `position` onward (empty at end of input), so a
/// token never owns or copies text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub value: &'a [u8],
    pub kind: TokenKind,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl<'a> Token<'a> {
    /// The character under the token, `None` at end of input.
    #[inline]
    pub fn byte(&self) -> Option<u8> {
        self.value.first().copied()
    }

    #[inline]
    pub fn location(&self) -> Location {
        Location {
            position: self.position,
            line: self.line,
            column: self.column,
        }
    }
}

/// Classifies the character of `input` at `position`.
///
/// Pure function of its arguments. Positions at or past the end produce an
/// [`TokenKind::Eos`] token. Line and column are left at their starting values;
/// keeping them up to date is the job of [`Lexer`].
pub fn classify(input: &[u8], position: usize) -> Token<'_> {
    let (kind, value) = match input.get(position) {
        Some(&c) => (classify_byte(c), &input[position..]),
        None => (TokenKind::Eos, &input[input.len()..]),
    };

    Token {
        value,
        kind,
        position: position.min(input.len()),
        line: 1,
        column: 0,
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected token at {location}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        location: Location,
    },
    #[error("Invalid lexer shift {0} (must be 0 or 1)")]
    InvalidShift(usize),
}

/// One-character-at-a-time cursor over an in-memory input.
///
/// The lexer holds a single current [`Token`] and moves it forward with
/// [`advance`](Lexer::advance), [`eat`](Lexer::eat) and [`skip`](Lexer::skip).
/// Moving past the end of the input is a no-op: the end-of-input token is simply
/// produced again.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    token: Token<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut token = classify(source.as_bytes(), 0);
        if token.byte() == Some(b'\n') {
            token.line += 1;
        }
        Self { source, token }
    }

    #[inline]
    pub fn token(&self) -> &Token<'a> {
        &self.token
    }

    #[inline]
    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }

    #[inline]
    pub fn byte(&self) -> Option<u8> {
        self.token.byte()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.token.position
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.token.location()
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.token.kind == TokenKind::Eos
    }

    /// Re-classifies the token at `position + shift`.
    ///
    /// A shift of `0` only refreshes the current token. A shift of `1` moves one
    /// character forward: landing on a line feed starts a new line (column reset to
    /// 0), anything else moves the column by one. Only line feeds start a new
    /// line, so `\r\n` counts once.
    pub fn advance(&mut self, shift: usize) -> Result<(), LexError> {
        match shift {
            0 => {
                let Token { line, column, .. } = self.token;
                self.token = Token {
                    line,
                    column,
                    ..classify(self.source.as_bytes(), self.token.position)
                };
                Ok(())
            }
            1 => {
                self.bump();
                Ok(())
            }
            other => Err(LexError::InvalidShift(other)),
        }
    }

    /// Moves one character forward. No-op at end of input.
    pub fn bump(&mut self) {
        if self.at_end() {
            return;
        }

        let Token { line, column, .. } = self.token;
        let next = classify(self.source.as_bytes(), self.token.position + 1);
        let (line, column) = if next.byte() == Some(b'\n') {
            (line + 1, 0)
        } else {
            (line, column + 1)
        };

        self.token = Token {
            line,
            column,
            ..next
        };
    }

    /// Advances only if the current token is of `kind`.
    ///
    /// On mismatch the token is left untouched.
    pub fn eat(&mut self, kind: TokenKind) -> Result<(), LexError> {
        if self.token.kind != kind {
            return Err(LexError::UnexpectedToken {
                expected: kind,
                found: self.token.kind,
                location: self.location(),
            });
        }
        self.bump();
        Ok(())
    }

    /// Advances while the current token is of `kind`.
    pub fn skip(&mut self, kind: TokenKind) {
        while self.token.kind == kind && !self.at_end() {
            self.bump();
        }
    }

    /// Advances over any run of whitespace and newlines.
    pub fn skip_blank(&mut self) {
        while matches!(self.token.kind, TokenKind::Whitespace | TokenKind::Newline) {
            self.bump();
        }
    }

    /// Advances while `predicate` holds for the current token.
    pub fn skip_while(&mut self, mut predicate: impl FnMut(&Token<'a>) -> bool) {
        while !self.at_end() && predicate(&self.token) {
            self.bump();
        }
    }

    /// Text between `start` and the current position.
    pub fn slice_from(&self, start: usize) -> &'a str {
        self.source.get(start..self.token.position).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_of(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut kinds = vec![lexer.kind()];
        while !lexer.at_end() {
            lexer.bump();
            kinds.push(lexer.kind());
        }
        kinds
    }

    #[test]
    fn classifies_each_character_of_a_mixed_input() {
        assert_eq!(
            kinds_of("ab[-9]"),
            vec![
                TokenKind::Alpha,
                TokenKind::Alpha,
                TokenKind::LeftBracket,
                TokenKind::Dash,
                TokenKind::Digit,
                TokenKind::RightBracket,
                TokenKind::Eos,
            ]
        );
    }

    #[test]
    fn classifies_punctuation_and_fallback_characters() {
        assert_eq!(
            kinds_of("#,.\\\"+_\t\r"),
            vec![
                TokenKind::Comment,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Escape,
                TokenKind::Quote,
                TokenKind::Plus,
                TokenKind::Char,
                TokenKind::Whitespace,
                TokenKind::Newline,
                TokenKind::Eos,
            ]
        );
    }

    #[test]
    fn non_ascii_bytes_are_plain_characters() {
        assert_eq!(classify_byte(0xC3), TokenKind::Char);
        assert_eq!(classify("é".as_bytes(), 0).kind, TokenKind::Char);
    }

    #[test]
    fn classify_past_the_end_yields_end_of_input() {
        let token = classify(b"ab", 5);
        assert_eq!(token.kind, TokenKind::Eos);
        assert_eq!(token.position, 2);
        assert!(token.value.is_empty());
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let input = "a\nb1\ncde\nf2";
        let mut lexer = Lexer::new(input);
        let (mut line, mut column) = (1, 0);

        for _ in 0..input.len() {
            assert_eq!(lexer.token().line, line);
            assert_eq!(lexer.token().column, column);

            lexer.bump();
            if lexer.byte() == Some(b'\n') {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        assert_eq!(lexer.token().line, 4);
    }

    #[test]
    fn carriage_return_line_feed_counts_as_one_line_break() {
        let mut lexer = Lexer::new("a\r\nb");
        lexer.bump();
        lexer.bump();
        lexer.bump();
        assert_eq!(lexer.byte(), Some(b'b'));
        assert_eq!(lexer.token().line, 2);
        assert_eq!(lexer.token().column, 1);
    }

    #[test]
    fn advancing_past_the_end_is_idempotent() {
        let mut lexer = Lexer::new("x");
        lexer.bump();
        let at_end = *lexer.token();
        assert_eq!(at_end.kind, TokenKind::Eos);

        lexer.bump();
        lexer.advance(1).unwrap();
        assert_eq!(*lexer.token(), at_end);
    }

    #[test]
    fn advance_rejects_shifts_other_than_zero_or_one() {
        let mut lexer = Lexer::new("abc");
        assert_eq!(lexer.advance(2), Err(LexError::InvalidShift(2)));
        assert_eq!(lexer.position(), 0);

        lexer.advance(0).unwrap();
        assert_eq!(lexer.position(), 0);
        lexer.advance(1).unwrap();
        assert_eq!(lexer.position(), 1);
    }

    #[test]
    fn eat_moves_only_on_matching_kind() {
        let mut lexer = Lexer::new("1a");
        let err = lexer.eat(TokenKind::Alpha).unwrap_err();
        assert!(matches!(
            err,
            LexError::UnexpectedToken {
                expected: TokenKind::Alpha,
                found: TokenKind::Digit,
                ..
            }
        ));
        assert_eq!(lexer.position(), 0);

        lexer.eat(TokenKind::Digit).unwrap();
        assert_eq!(lexer.kind(), TokenKind::Alpha);
    }

    #[test]
    fn skip_and_skip_blank_consume_runs() {
        let mut lexer = Lexer::new("   \t12 \n\n x");
        lexer.skip(TokenKind::Whitespace);
        assert_eq!(lexer.kind(), TokenKind::Digit);

        let start = lexer.position();
        lexer.skip(TokenKind::Digit);
        assert_eq!(lexer.slice_from(start), "12");

        lexer.skip_blank();
        assert_eq!(lexer.byte(), Some(b'x'));
        assert_eq!(lexer.token().line, 3);
    }

    #[test]
    fn leading_newline_starts_on_the_second_line() {
        let lexer = Lexer::new("\nx");
        assert_eq!(lexer.token().line, 2);
    }
}
