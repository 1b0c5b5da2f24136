//! # ToyMC Core Library
//!
//! A small Monte-Carlo toolkit for Lennard-Jones fluids, built around two text formats: a
//! key/value simulation-parameter language and XYZ coordinate files.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers from parsing up to complete runs:
//!
//! - **[`core`]: The Foundation.** The character-classifying lexer, the parameter-language
//!   parser and its value tree, the XYZ reader/writer, the atom geometry and the pair
//!   potentials. Nothing here holds simulation state.
//!
//! - **[`engine`]: The Logic Core.** Typed simulation parameters, the PCG32 generator and the
//!   Metropolis sampler with its periodic box, displacement moves and isobaric volume moves.
//!
//! - **[`workflows`]: The Public API.** Complete runs that drive the sampler step by step,
//!   report progress and write trajectory frames.

pub mod core;
pub mod engine;
pub mod workflows;
