use super::config::SimulationParameters;
use super::error::EngineError;
use super::rng::Pcg32;
use crate::core::forcefield::potentials::{lennard_jones, tail_energy, tail_pressure};
use crate::core::forcefield::term::PairTerm;
use crate::core::models::geometry::Geometry;
use nalgebra::{Point3, Vector3};
use rand::Rng;
use tracing::{debug, trace};

/// Rectangular periodic simulation cell with one corner at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationBox {
    lengths: Vector3<f64>,
}

impl SimulationBox {
    pub fn new(lengths: [f64; 3]) -> Self {
        Self {
            lengths: Vector3::from(lengths),
        }
    }

    #[inline]
    pub fn lengths(&self) -> [f64; 3] {
        self.lengths.into()
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.lengths.product()
    }

    #[inline]
    pub fn half_min_length(&self) -> f64 {
        self.lengths.min() / 2.0
    }

    /// Shortest periodic image of the separation `d`.
    #[inline]
    pub fn minimum_image(&self, d: Vector3<f64>) -> Vector3<f64> {
        d.zip_map(&self.lengths, |x, l| x - l * (x / l).round())
    }

    /// Maps `p` back into `[0, L)` on every axis.
    #[inline]
    pub fn wrap(&self, p: Point3<f64>) -> Point3<f64> {
        Point3::from(p.coords.zip_map(&self.lengths, |x, l| x.rem_euclid(l)))
    }

    #[inline]
    pub fn squared_distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.minimum_image(b - a).norm_squared()
    }

    pub fn scale(&mut self, factor: f64) {
        self.lengths *= factor;
    }
}

/// Acceptance bookkeeping for the two kinds of trial moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveStats {
    pub displacement_attempts: u64,
    pub displacement_accepted: u64,
    pub volume_attempts: u64,
    pub volume_accepted: u64,
}

impl MoveStats {
    pub fn displacement_ratio(&self) -> f64 {
        ratio(self.displacement_accepted, self.displacement_attempts)
    }

    pub fn volume_ratio(&self) -> f64 {
        ratio(self.volume_accepted, self.volume_attempts)
    }
}

fn ratio(accepted: u64, attempts: u64) -> f64 {
    if attempts == 0 {
        0.0
    } else {
        accepted as f64 / attempts as f64
    }
}

/// Settings of the optional isothermal-isobaric volume move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeMove {
    pub target_pressure: f64,
    /// Width of the random walk in `ln V`.
    pub delta: f64,
}

/// Metropolis Monte-Carlo sampler for a single-component Lennard-Jones fluid.
///
/// Energies and pressures are reduced (`ε = σ = k_B = 1`). The sampler keeps the
/// running pair energy and virial in sync with the geometry, so observables are
/// available after every move without a full recomputation.
#[derive(Debug, Clone)]
pub struct MonteCarlo {
    geometry: Geometry,
    cell: SimulationBox,
    rng: Pcg32,
    cutoff: f64,
    temperature: f64,
    max_displacement: f64,
    volume_move: Option<VolumeMove>,
    pair: PairTerm,
    stats: MoveStats,
}

impl MonteCarlo {
    /// Prepares a sampler from a starting geometry.
    ///
    /// Atoms outside the box are wrapped back in. Fails if the cutoff does not fit
    /// the minimum-image convention or the starting energy is not finite.
    pub fn new(mut geometry: Geometry, params: &SimulationParameters) -> Result<Self, EngineError> {
        geometry.validate()?;

        let cell = SimulationBox::new(params.box_length);
        check_cutoff(params.vdw_cutoff, &cell)?;

        for i in 0..geometry.atom_count() {
            let wrapped = cell.wrap(geometry.position(i));
            geometry.set_position(i, wrapped);
        }

        let volume_move = params.use_npt.then_some(VolumeMove {
            target_pressure: params.target_pressure,
            delta: params.delta_volume,
        });

        let mut sampler = Self {
            geometry,
            cell,
            rng: Pcg32::new(params.seed as u64),
            cutoff: params.vdw_cutoff,
            temperature: params.temperature,
            max_displacement: params.delta_displacement / 3f64.sqrt(),
            volume_move,
            pair: PairTerm::default(),
            stats: MoveStats::default(),
        };
        sampler.pair = sampler.total_interaction();

        if !sampler.pair.energy.is_finite() {
            return Err(EngineError::Diverged {
                step: 0,
                energy: sampler.pair.energy,
            });
        }

        debug!(
            "Initialised sampler: {} atoms, box {:?}, U = {:.3}.",
            sampler.geometry.atom_count(),
            sampler.cell.lengths(),
            sampler.energy()
        );
        Ok(sampler)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn into_geometry(self) -> Geometry {
        self.geometry
    }

    pub fn cell(&self) -> &SimulationBox {
        &self.cell
    }

    pub fn stats(&self) -> MoveStats {
        self.stats
    }

    #[inline]
    pub fn density(&self) -> f64 {
        self.geometry.atom_count() as f64 / self.cell.volume()
    }

    /// Total potential energy including the long-range tail correction.
    pub fn energy(&self) -> f64 {
        self.pair.energy + tail_energy(self.geometry.atom_count(), self.density(), self.cutoff)
    }

    /// Virial pressure including the long-range tail correction.
    pub fn pressure(&self) -> f64 {
        let density = self.density();
        density * self.temperature
            + self.pair.virial / self.cell.volume()
            + tail_pressure(density, self.cutoff)
    }

    /// Pair energy and virial over all unique pairs, recomputed from scratch.
    pub fn total_interaction(&self) -> PairTerm {
        let rc2 = self.cutoff * self.cutoff;
        let positions: Vec<_> = self.geometry.positions().collect();

        positions
            .iter()
            .enumerate()
            .flat_map(|(i, a)| positions[i + 1..].iter().map(move |b| (a, b)))
            .map(|(a, b)| lennard_jones(self.cell.squared_distance(a, b), rc2, 1.0))
            .sum()
    }

    /// Interaction of atom `index`, placed at `position`, with every other atom.
    pub fn particle_interaction(&self, index: usize, position: &Point3<f64>) -> PairTerm {
        let rc2 = self.cutoff * self.cutoff;
        self.geometry
            .positions()
            .enumerate()
            .filter(|&(j, _)| j != index)
            .map(|(_, other)| lennard_jones(self.cell.squared_distance(position, &other), rc2, 1.0))
            .sum()
    }

    /// Attempts one displacement per atom, in order, and returns how many were
    /// accepted.
    pub fn displacement_sweep(&mut self) -> usize {
        let mut accepted = 0;
        for index in 0..self.geometry.atom_count() {
            if self.try_displacement(index) {
                accepted += 1;
            }
        }
        accepted
    }

    fn try_displacement(&mut self, index: usize) -> bool {
        self.stats.displacement_attempts += 1;

        let old_position = self.geometry.position(index);
        let shift = Vector3::from_fn(|_, _| {
            self.rng
                .gen_range(-self.max_displacement..=self.max_displacement)
        });
        let new_position = self.cell.wrap(old_position + shift);

        let before = self.particle_interaction(index, &old_position);
        let after = self.particle_interaction(index, &new_position);
        let delta = after - before;

        if self.metropolis(delta.energy / self.temperature) {
            self.geometry.set_position(index, new_position);
            self.pair += delta;
            self.stats.displacement_accepted += 1;
            true
        } else {
            false
        }
    }

    /// Attempts an isotropic volume change when the isobaric move is enabled.
    ///
    /// Returns `None` when no volume move is configured.
    pub fn try_volume_change(&mut self) -> Option<bool> {
        let settings = self.volume_move?;
        self.stats.volume_attempts += 1;

        let n = self.geometry.atom_count() as f64;
        let old_volume = self.cell.volume();
        let old_energy = self.energy();
        let log_ratio = self.rng.gen_range(-settings.delta..=settings.delta);
        let new_volume = old_volume * log_ratio.exp();
        let factor = log_ratio.exp().cbrt();

        let mut trial_cell = self.cell;
        trial_cell.scale(factor);
        if self.cutoff > trial_cell.half_min_length() {
            trace!("Rejected volume move: box would be smaller than twice the cutoff.");
            return Some(false);
        }

        let saved_geometry = self.geometry.clone();
        let saved_cell = self.cell;
        let saved_pair = self.pair;

        self.geometry.scale(Vector3::repeat(factor));
        self.cell = trial_cell;
        self.pair = self.total_interaction();

        let delta_energy = self.energy() - old_energy;
        let exponent = -(delta_energy + settings.target_pressure * (new_volume - old_volume)
            - (n + 1.0) * self.temperature * log_ratio)
            / self.temperature;

        if self.metropolis(-exponent) {
            self.stats.volume_accepted += 1;
            Some(true)
        } else {
            self.geometry = saved_geometry;
            self.cell = saved_cell;
            self.pair = saved_pair;
            Some(false)
        }
    }

    /// One Monte-Carlo step: a displacement sweep followed by a volume move when
    /// the isobaric ensemble is enabled.
    pub fn step(&mut self) {
        self.displacement_sweep();
        self.try_volume_change();
    }

    /// Metropolis criterion for a reduced energy change `beta_delta = ΔU / T`.
    #[inline]
    fn metropolis(&mut self, beta_delta: f64) -> bool {
        self.rng.next_f64() < (-beta_delta).exp()
    }
}

fn check_cutoff(cutoff: f64, cell: &SimulationBox) -> Result<(), EngineError> {
    let half_box = cell.half_min_length();
    if cutoff > half_box {
        return Err(EngineError::CutoffTooLarge { cutoff, half_box });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn params(box_length: f64, cutoff: f64) -> SimulationParameters {
        SimulationParameters {
            seed: 12345,
            box_length: [box_length; 3],
            vdw_cutoff: cutoff,
            temperature: 1.0,
            delta_displacement: 0.3,
            ..SimulationParameters::default()
        }
    }

    fn dimer(separation: f64) -> Geometry {
        let mut geometry = Geometry::new(2);
        geometry.set_atom(0, "Ar", Point3::new(1.0, 1.0, 1.0)).unwrap();
        geometry
            .set_atom(1, "Ar", Point3::new(1.0 + separation, 1.0, 1.0))
            .unwrap();
        geometry
    }

    mod cell {
        use super::*;

        #[test]
        fn minimum_image_picks_the_nearest_copy() {
            let cell = SimulationBox::new([10.0, 10.0, 4.0]);
            let d = cell.minimum_image(Vector3::new(9.0, -6.0, 1.5));
            assert!(f64_approx_equal(d.x, -1.0));
            assert!(f64_approx_equal(d.y, 4.0));
            assert!(f64_approx_equal(d.z, 1.5));
        }

        #[test]
        fn wrap_maps_points_into_the_box() {
            let cell = SimulationBox::new([2.0, 3.0, 4.0]);
            let p = cell.wrap(Point3::new(-0.5, 3.5, 8.25));
            assert!(f64_approx_equal(p.x, 1.5));
            assert!(f64_approx_equal(p.y, 0.5));
            assert!(f64_approx_equal(p.z, 0.25));
        }

        #[test]
        fn distance_across_the_boundary_is_short() {
            let cell = SimulationBox::new([5.0; 3]);
            let a = Point3::new(0.1, 2.0, 2.0);
            let b = Point3::new(4.9, 2.0, 2.0);
            assert!(f64_approx_equal(cell.squared_distance(&a, &b), 0.04));
        }

        #[test]
        fn volume_and_scaling() {
            let mut cell = SimulationBox::new([2.0, 3.0, 4.0]);
            assert_eq!(cell.volume(), 24.0);
            cell.scale(0.5);
            assert_eq!(cell.lengths(), [1.0, 1.5, 2.0]);
            assert_eq!(cell.half_min_length(), 0.5);
        }
    }

    mod energy {
        use super::*;

        #[test]
        fn dimer_at_lj_minimum_has_unit_well_depth() {
            let r_min = 2f64.powf(1.0 / 6.0);
            let sampler = MonteCarlo::new(dimer(r_min), &params(10.0, 3.0)).unwrap();
            assert!(f64_approx_equal(sampler.total_interaction().energy, -1.0));
            assert!(f64_approx_equal(sampler.total_interaction().virial, 0.0));
        }

        #[test]
        fn dimer_interacts_through_periodic_boundary() {
            let mut geometry = Geometry::new(2);
            geometry.set_atom(0, "Ar", Point3::new(0.2, 5.0, 5.0)).unwrap();
            geometry.set_atom(1, "Ar", Point3::new(9.8, 5.0, 5.0)).unwrap();
            let sampler = MonteCarlo::new(geometry, &params(10.0, 3.0)).unwrap();
            let expected = lennard_jones(0.16, 9.0, 1.0).energy;
            assert!(f64_approx_equal(sampler.total_interaction().energy, expected));
        }

        #[test]
        fn particle_interactions_sum_to_twice_the_total() {
            let geometry = Geometry::cubic_lattice(27, [4.5; 3], "Ar").unwrap();
            let sampler = MonteCarlo::new(geometry, &params(4.5, 2.2)).unwrap();
            let per_particle: PairTerm = (0..27)
                .map(|i| sampler.particle_interaction(i, &sampler.geometry().position(i)))
                .sum();
            let total = sampler.total_interaction();
            assert!((per_particle.energy - 2.0 * total.energy).abs() < 1e-9);
            assert!((per_particle.virial - 2.0 * total.virial).abs() < 1e-9);
        }

        #[test]
        fn energy_and_pressure_include_tail_corrections() {
            let sampler = MonteCarlo::new(dimer(1.5), &params(10.0, 3.0)).unwrap();
            let rho = 2.0 / 1000.0;
            let pair = sampler.total_interaction();
            assert!(f64_approx_equal(
                sampler.energy(),
                pair.energy + tail_energy(2, rho, 3.0)
            ));
            assert!(f64_approx_equal(
                sampler.pressure(),
                rho + pair.virial / 1000.0 + tail_pressure(rho, 3.0)
            ));
        }
    }

    mod construction {
        use super::*;

        #[test]
        fn rejects_cutoff_longer_than_half_box() {
            let err = MonteCarlo::new(dimer(1.2), &params(4.0, 2.5)).unwrap_err();
            assert!(matches!(err, EngineError::CutoffTooLarge { .. }));
        }

        #[test]
        fn rejects_overlapping_atoms() {
            let err = MonteCarlo::new(dimer(0.0), &params(4.0, 1.5)).unwrap_err();
            assert!(matches!(err, EngineError::Diverged { step: 0, .. }));
        }

        #[test]
        fn rejects_untyped_atoms() {
            let err = MonteCarlo::new(Geometry::new(2), &params(4.0, 1.5)).unwrap_err();
            assert!(matches!(err, EngineError::Geometry(_)));
        }

        #[test]
        fn wraps_atoms_into_the_box() {
            let mut geometry = Geometry::new(1);
            geometry.set_atom(0, "Ar", Point3::new(-1.0, 6.0, 2.5)).unwrap();
            let sampler = MonteCarlo::new(geometry, &params(5.0, 2.0)).unwrap();
            assert_eq!(sampler.geometry().position(0), Point3::new(4.0, 1.0, 2.5));
        }
    }

    mod sampling {
        use super::*;

        fn lattice_sampler(use_npt: bool) -> MonteCarlo {
            let params = SimulationParameters {
                use_npt,
                target_pressure: 1.0,
                delta_volume: 0.05,
                ..params(6.0, 2.5)
            };
            MonteCarlo::new(Geometry::cubic_lattice(64, params.box_length, "Ar").unwrap(), &params)
                .unwrap()
        }

        #[test]
        fn running_energy_matches_full_recomputation() {
            let mut sampler = lattice_sampler(false);
            for _ in 0..10 {
                sampler.step();
            }
            let recomputed = sampler.total_interaction();
            assert!((sampler.pair.energy - recomputed.energy).abs() < 1e-6);
            assert!((sampler.pair.virial - recomputed.virial).abs() < 1e-6);
        }

        #[test]
        fn sweeps_count_attempts_and_keep_atoms_inside() {
            let mut sampler = lattice_sampler(false);
            let accepted = sampler.displacement_sweep();
            let stats = sampler.stats();
            assert_eq!(stats.displacement_attempts, 64);
            assert_eq!(stats.displacement_accepted as usize, accepted);
            assert!(accepted > 0);
            assert!(sampler.try_volume_change().is_none());

            let [lx, ly, lz] = sampler.cell().lengths();
            for p in sampler.geometry().positions() {
                assert!((0.0..=lx).contains(&p.x));
                assert!((0.0..=ly).contains(&p.y));
                assert!((0.0..=lz).contains(&p.z));
            }
        }

        #[test]
        fn same_seed_reproduces_the_trajectory() {
            let mut a = lattice_sampler(true);
            let mut b = lattice_sampler(true);
            for _ in 0..5 {
                a.step();
                b.step();
            }
            assert_eq!(a.geometry(), b.geometry());
            assert_eq!(a.cell(), b.cell());
            assert_eq!(a.stats(), b.stats());
        }

        #[test]
        fn volume_moves_keep_state_consistent() {
            let mut sampler = lattice_sampler(true);
            for _ in 0..20 {
                sampler.try_volume_change().unwrap();
                let recomputed = sampler.total_interaction();
                assert!((sampler.pair.energy - recomputed.energy).abs() < 1e-6);
                assert!(sampler.cell().half_min_length() >= 2.5);
            }
            assert_eq!(sampler.stats().volume_attempts, 20);
            assert!(sampler.stats().volume_ratio() <= 1.0);
        }

        #[test]
        fn acceptance_ratio_is_zero_before_any_move() {
            assert_eq!(MoveStats::default().displacement_ratio(), 0.0);
            let stats = MoveStats {
                displacement_attempts: 4,
                displacement_accepted: 1,
                ..MoveStats::default()
            };
            assert_eq!(stats.displacement_ratio(), 0.25);
        }
    }
}
