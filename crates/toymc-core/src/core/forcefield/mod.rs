//! Pair potentials used by the Monte-Carlo engine.
//!
//! - [`potentials`] - truncated Lennard-Jones and its long-range tail corrections
//! - [`term`] - energy/virial accumulator

pub mod potentials;
pub mod term;
