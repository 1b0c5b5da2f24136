use rand::{Error, RngCore, SeedableRng};

const MULTIPLIER: u64 = 6364136223846793005;
const INCREMENT: u64 = 1442695040888963407;

/// PCG-XSH-RR generator with 64-bit state and 32-bit output.
///
/// Small, fast and fully reproducible from a single `u64` seed, which is all a
/// Monte-Carlo run needs to be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcg32 {
    state: u64,
}

impl Pcg32 {
    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: seed.wrapping_add(INCREMENT),
        };
        rng.step();
        rng
    }

    #[inline]
    fn step(&mut self) -> u32 {
        let x = self.state;
        let count = (x >> 59) as u32;
        self.state = x.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        let x = x ^ (x >> 18);
        ((x >> 27) as u32).rotate_right(count)
    }

    /// Uniform real in the closed interval `[0, 1]`.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        self.step() as f64 / u32::MAX as f64
    }
}

impl RngCore for Pcg32 {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.step()
    }

    fn next_u64(&mut self) -> u64 {
        let low = self.step() as u64;
        let high = self.step() as u64;
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Pcg32 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_gives_same_sequence() {
        let mut a = Pcg32::new(42);
        let mut b = Pcg32::seed_from_u64(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Pcg32::new(1);
        let mut b = Pcg32::new(2);
        let same = (0..100).filter(|_| a.next_u32() == b.next_u32()).count();
        assert!(same < 5);
    }

    #[test]
    fn first_output_after_seeding_is_the_second_draw() {
        let mut manual = Pcg32 {
            state: 7u64.wrapping_add(INCREMENT),
        };
        manual.step();
        let expected = manual.step();
        assert_eq!(Pcg32::new(7).next_u32(), expected);
    }

    #[test]
    fn reals_stay_in_unit_interval_and_cover_it() {
        let mut rng = Pcg32::new(2024);
        let draws: Vec<f64> = (0..10_000).map(|_| rng.next_f64()).collect();
        assert!(draws.iter().all(|x| (0.0..=1.0).contains(x)));
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - 0.5).abs() < 0.02);
        assert!(draws.iter().any(|&x| x < 0.01));
        assert!(draws.iter().any(|&x| x > 0.99));
    }

    #[test]
    fn works_as_a_rand_rng() {
        let mut rng = Pcg32::new(3);
        for _ in 0..1000 {
            let x: f64 = rng.gen_range(-1.0..1.0);
            assert!((-1.0..1.0).contains(&x));
        }
        let mut bytes = [0u8; 7];
        rng.fill_bytes(&mut bytes);
        assert!(bytes.iter().any(|&b| b != 0));
    }
}
