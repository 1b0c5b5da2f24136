//! In-memory data models.
//!
//! - [`value`] - the tagged document tree produced by the parameter parser
//! - [`geometry`] - atom positions and interned atom types produced by the XYZ parser

pub mod geometry;
pub mod value;
