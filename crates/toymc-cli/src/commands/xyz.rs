use crate::cli::XyzArgs;
use crate::error::{CliError, Result};
use std::fmt::Write as _;
use toymc::core::io::{
    traits::GeometryFile,
    xyz::{XyzFile, XyzMetadata},
};
use toymc::core::models::geometry::Geometry;
use tracing::info;

pub fn run(args: XyzArgs) -> Result<()> {
    info!("Reading XYZ file {:?}", &args.path);
    let (geometry, metadata) =
        XyzFile::read_from_path(&args.path).map_err(|e| CliError::FileParsing {
            path: args.path.clone(),
            source: e.into(),
        })?;

    print!("{}", summarize(&geometry, &metadata));
    Ok(())
}

/// Human-readable digest of an XYZ file: title, atom count per label and the
/// axis-aligned bounding box.
pub fn summarize(geometry: &Geometry, metadata: &XyzMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Title: {}", metadata.title);
    let _ = writeln!(out, "Atoms: {}", geometry.atom_count());

    let mut counts = vec![0usize; geometry.type_labels().len()];
    for t in (0..geometry.atom_count()).filter_map(|i| geometry.type_index(i)) {
        counts[t] += 1;
    }
    for (label, count) in geometry.type_labels().iter().zip(&counts) {
        let _ = writeln!(out, "  {:<6} {}", label, count);
    }

    if !geometry.is_empty() {
        let _ = write!(out, "Bounding box:");
        for (axis, name) in ["x", "y", "z"].into_iter().enumerate() {
            let values = geometry.axis(axis);
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let _ = write!(out, " {}=[{:.5}, {:.5}]", name, min, max);
        }
        let _ = writeln!(out);
    }

    out
}
