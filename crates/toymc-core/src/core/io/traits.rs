use crate::core::models::geometry::Geometry;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing geometry file formats.
///
/// Implementors handle the format-specific parsing and serialization; opening and
/// buffering files is provided here.
pub trait GeometryFile {
    /// Format data that accompanies the geometry but is not part of it, such as a title line.
    type Metadata;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a geometry from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<(Geometry, Self::Metadata), Self::Error>;

    /// Writes a geometry and its metadata to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the geometry cannot be represented.
    fn write_to(
        geometry: &Geometry,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(Geometry, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    fn write_to_path<P: AsRef<Path>>(
        geometry: &Geometry,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(geometry, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
