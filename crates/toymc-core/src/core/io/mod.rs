//! Text formats read and written by ToyMC.
//!
//! Both formats share the character-classifying [`lexer`]: [`param`] builds a
//! [`Value`](crate::core::models::value::Value) tree from simulation-parameter
//! files, and [`xyz`] fills a [`Geometry`](crate::core::models::geometry::Geometry)
//! from coordinate files.

pub mod lexer;
pub mod param;
pub mod traits;
pub mod xyz;
