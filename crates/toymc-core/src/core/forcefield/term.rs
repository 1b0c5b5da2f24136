use std::ops::{Add, AddAssign, Neg, Sub};

/// Potential energy and pair virial accumulated over a set of interactions.
///
/// The virial is stored as `Σ r·F / 3`, so pressure follows directly as
/// `ρT + virial / V`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PairTerm {
    pub energy: f64,
    pub virial: f64,
}

impl PairTerm {
    pub fn new(energy: f64, virial: f64) -> Self {
        Self { energy, virial }
    }
}

impl Add for PairTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            energy: self.energy + rhs.energy,
            virial: self.virial + rhs.virial,
        }
    }
}

impl AddAssign for PairTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.energy += rhs.energy;
        self.virial += rhs.virial;
    }
}

impl Sub for PairTerm {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            energy: self.energy - rhs.energy,
            virial: self.virial - rhs.virial,
        }
    }
}

impl Neg for PairTerm {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            energy: -self.energy,
            virial: -self.virial,
        }
    }
}

impl std::iter::Sum for PairTerm {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_add_assign_sum_each_field() {
        let a = PairTerm::new(1.0, 2.0);
        let b = PairTerm::new(-4.0, 0.5);
        assert_eq!(a + b, PairTerm::new(-3.0, 2.5));

        let mut c = a;
        c += b;
        assert_eq!(c, a + b);
    }

    #[test]
    fn sub_gives_the_change_between_two_states() {
        let before = PairTerm::new(-10.0, 3.0);
        let after = PairTerm::new(-12.0, 4.0);
        assert_eq!(after - before, PairTerm::new(-2.0, 1.0));
        assert_eq!(-(after - before), before - after);
    }

    #[test]
    fn sum_of_empty_iterator_is_zero() {
        let total: PairTerm = std::iter::empty().sum();
        assert_eq!(total, PairTerm::default());

        let total: PairTerm = [PairTerm::new(1.0, 1.0), PairTerm::new(2.0, -1.0)]
            .into_iter()
            .sum();
        assert_eq!(total, PairTerm::new(3.0, 0.0));
    }
}
