use super::term::PairTerm;
use std::f64::consts::PI;

/// Truncated 12-6 Lennard-Jones interaction in reduced units (`σ = 1`).
///
/// Takes the squared distance `r2` and squared cutoff `rc2`; pairs at or beyond
/// the cutoff contribute nothing.
#[inline]
pub fn lennard_jones(r2: f64, rc2: f64, epsilon: f64) -> PairTerm {
    if r2 >= rc2 {
        return PairTerm::default();
    }
    let r6i = 1.0 / (r2 * r2 * r2);
    PairTerm {
        energy: 4.0 * epsilon * r6i * (r6i - 1.0),
        virial: 16.0 * epsilon * r6i * (r6i - 0.5),
    }
}

/// Energy missing from `n` particles at number density `density` because the
/// potential is cut at `cutoff`.
#[inline]
pub fn tail_energy(n: usize, density: f64, cutoff: f64) -> f64 {
    let irc3 = cutoff.powi(-3);
    n as f64 * 8.0 * PI * density * (irc3 * (irc3 * irc3 / 9.0 - 1.0 / 3.0))
}

/// Pressure missing because the potential is cut at `cutoff`.
#[inline]
pub fn tail_pressure(density: f64, cutoff: f64) -> f64 {
    let irc3 = cutoff.powi(-3);
    16.0 / 3.0 * PI * density * density * irc3 * (2.0 / 3.0 * irc3 * irc3 - 1.0)
}
