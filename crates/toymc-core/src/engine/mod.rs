//! # Engine Module
//!
//! Stateful Monte-Carlo sampling on top of the [`core`](crate::core) building blocks.
//!
//! - **Configuration** ([`config`]) - typed simulation parameters bound from a parameter document
//! - **Sampling** ([`monte_carlo`]) - periodic box, Metropolis displacement and volume moves
//! - **Randomness** ([`rng`]) - the seeded PCG32 generator every run draws from
//! - **Progress Monitoring** ([`progress`]) - progress events for front ends
//! - **Error Handling** ([`error`]) - engine-level failures

pub mod config;
pub mod error;
pub mod monte_carlo;
pub mod progress;
pub mod rng;
