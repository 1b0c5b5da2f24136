//! # Core Module
//!
//! Stateless building blocks shared by the engine and the command-line front end.
//!
//! - **File formats** ([`io`]) - the character-classifying lexer, the parameter-language
//!   parser and the XYZ reader/writer
//! - **Data models** ([`models`]) - the parameter value tree and the atom geometry
//! - **Pair potentials** ([`forcefield`]) - Lennard-Jones energy, virial and tail corrections

pub mod forcefield;
pub mod io;
pub mod models;
