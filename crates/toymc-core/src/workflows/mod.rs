//! # Workflows Module
//!
//! End-to-end procedures that tie the [`engine`](crate::engine) and
//! [`core`](crate::core) layers together.
//!
//! - **Simulation Workflow** ([`simulate`]) - runs a Metropolis Monte-Carlo simulation from a
//!   starting geometry and a set of parameters, streaming trajectory frames and progress events.

pub mod simulate;
