use crate::core::io::lexer::{Lexer, Location, TokenKind};
use crate::core::io::traits::GeometryFile;
use crate::core::models::geometry::{Geometry, GeometryError};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XyzMetadata {
    pub title: String,
}

impl XyzMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}, column {column}: {what}")]
    Parse {
        what: String,
        position: usize,
        line: usize,
        column: usize,
    },
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

impl XyzError {
    fn at(location: Location, what: impl Into<String>) -> Self {
        XyzError::Parse {
            what: what.into(),
            position: location.position,
            line: location.line,
            column: location.column,
        }
    }
}

/// Plain XYZ coordinate files.
///
/// ```text
/// <atom count>
/// <title>
/// <label> <x> <y> <z>
/// ...
/// ```
///
/// Fields on an atom line are separated by exactly one run of spaces or tabs.
/// Coordinates are plain decimals; exponent notation is not part of this format.
pub struct XyzFile;

impl XyzFile {
    /// Parses a complete XYZ document held in memory.
    pub fn loads(input: &str) -> Result<(Geometry, XyzMetadata), XyzError> {
        XyzParser::new(input).parse()
    }
}

impl GeometryFile for XyzFile {
    type Metadata = XyzMetadata;
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Geometry, Self::Metadata), Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::loads(&content)
    }

    fn write_to(
        geometry: &Geometry,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", geometry.atom_count())?;
        writeln!(writer, "{}", metadata.title.lines().next().unwrap_or_default())?;
        for (i, position) in geometry.positions().enumerate() {
            writeln!(
                writer,
                "{} {:9.5} {:9.5} {:9.5}",
                geometry.label(i)?,
                position.x,
                position.y,
                position.z
            )?;
        }
        Ok(())
    }
}

/// Shortest possible atom record: a line break, a one-letter label and three
/// one-digit coordinates, each after one blank.
const MIN_ATOM_BYTES: usize = 8;

struct XyzParser<'a> {
    lexer: Lexer<'a>,
    len: usize,
}

impl<'a> XyzParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
            len: input.len(),
        }
    }

    fn error(&self, what: impl Into<String>) -> XyzError {
        XyzError::at(self.lexer.location(), what)
    }

    fn parse(&mut self) -> Result<(Geometry, XyzMetadata), XyzError> {
        self.lexer.skip(TokenKind::Whitespace);
        let count_location = self.lexer.location();
        let count = self.parse_count()?;
        self.lexer.skip(TokenKind::Whitespace);

        let remaining = self.len - self.lexer.position();
        if count > remaining / MIN_ATOM_BYTES {
            return Err(XyzError::at(
                count_location,
                format!(
                    "file is shorter than declared: {} atoms cannot fit in the remaining {} bytes",
                    count, remaining
                ),
            ));
        }
        let mut geometry = Geometry::try_new(count)?;

        if !self.eat_newline() {
            return Err(self.error("expected a newline after the atom count"));
        }
        let title = self.parse_title();

        for index in 0..count {
            if !self.eat_newline() {
                return Err(if self.lexer.at_end() {
                    self.error(format!(
                        "file is shorter than declared: expected {} atoms, found {}",
                        count, index
                    ))
                } else {
                    self.error(format!("unexpected {} at end of line", self.lexer.kind()))
                });
            }
            if self.lexer.at_end() {
                return Err(self.error(format!(
                    "file is shorter than declared: expected {} atoms, found {}",
                    count, index
                )));
            }
            self.parse_atom(&mut geometry, index, index + 1 == count)?;
        }

        self.lexer.skip_blank();
        if !self.lexer.at_end() {
            return Err(self.error(format!(
                "file is longer than declared: expected {} atoms",
                count
            )));
        }

        debug!(
            "Parsed XYZ geometry with {} atoms and {} atom types.",
            count,
            geometry.type_labels().len()
        );
        Ok((geometry, XyzMetadata { title }))
    }

    /// Consumes one line break, treating `\r\n` as a single break.
    fn eat_newline(&mut self) -> bool {
        match self.lexer.byte() {
            Some(b'\r') => {
                self.lexer.bump();
                if self.lexer.byte() == Some(b'\n') {
                    self.lexer.bump();
                }
                true
            }
            Some(b'\n') => {
                self.lexer.bump();
                true
            }
            _ => false,
        }
    }

    fn parse_count(&mut self) -> Result<usize, XyzError> {
        let location = self.lexer.location();
        let start = self.lexer.position();
        self.lexer.skip(TokenKind::Digit);
        let span = self.lexer.slice_from(start);

        if span.is_empty() {
            return Err(XyzError::at(
                location,
                format!("expected a positive atom count, found {}", self.lexer.kind()),
            ));
        }
        span.parse::<usize>()
            .map_err(|_| XyzError::at(location, format!("atom count '{}' is out of range", span)))
    }

    fn parse_title(&mut self) -> String {
        let start = self.lexer.position();
        self.lexer
            .skip_while(|tk| tk.kind != TokenKind::Newline);
        self.lexer.slice_from(start).to_string()
    }

    /// Reads one `label x y z` record. Only the last record may be followed by
    /// trailing blanks; the caller skips them before checking for end of input.
    fn parse_atom(
        &mut self,
        geometry: &mut Geometry,
        index: usize,
        last: bool,
    ) -> Result<(), XyzError> {
        let label = self.parse_atom_type()?;
        let mut coordinates = [0.0; 3];
        for coordinate in &mut coordinates {
            if self.lexer.kind() != TokenKind::Whitespace {
                return Err(self.error(format!(
                    "expected whitespace before coordinate, found {}",
                    self.lexer.kind()
                )));
            }
            self.lexer.skip(TokenKind::Whitespace);
            *coordinate = self.parse_real()?;
        }

        let trailing_blank = last && self.lexer.kind() == TokenKind::Whitespace;
        if !trailing_blank && !matches!(self.lexer.kind(), TokenKind::Newline | TokenKind::Eos) {
            return Err(self.error(format!(
                "unexpected {} after the z coordinate",
                self.lexer.kind()
            )));
        }

        geometry.set_atom(index, label, Point3::from(coordinates))?;
        Ok(())
    }

    fn parse_atom_type(&mut self) -> Result<&'a str, XyzError> {
        if self.lexer.kind() != TokenKind::Alpha {
            return Err(self.error(format!(
                "atom type must start with a letter, found {}",
                self.lexer.kind()
            )));
        }
        let start = self.lexer.position();
        self.lexer
            .skip_while(|tk| matches!(tk.kind, TokenKind::Alpha | TokenKind::Digit));
        Ok(self.lexer.slice_from(start))
    }

    fn parse_real(&mut self) -> Result<f64, XyzError> {
        let location = self.lexer.location();
        let start = self.lexer.position();

        if matches!(self.lexer.kind(), TokenKind::Plus | TokenKind::Dash) {
            self.lexer.bump();
        }
        self.lexer.skip(TokenKind::Digit);
        if self.lexer.kind() == TokenKind::Dot {
            self.lexer.bump();
            self.lexer.skip(TokenKind::Digit);
        }

        let span = self.lexer.slice_from(start);
        span.parse::<f64>()
            .map_err(|_| XyzError::at(location, format!("malformed coordinate '{}'", span)))
    }
}
