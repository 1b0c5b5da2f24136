use nalgebra::{Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Atom index {index} is out of range for a geometry of {atom_count} atoms")]
    AtomOutOfRange { index: usize, atom_count: usize },
    #[error("Atom {0} has not been assigned a type")]
    UnsetAtom(usize),
    #[error("Cannot allocate storage for {0} atoms")]
    TooLarge(usize),
}

/// Atom positions and interned atom-type labels.
///
/// Positions are stored as three contiguous blocks (all x, then all y, then all z)
/// so that per-axis passes such as box wrapping and volume scaling stay linear in
/// memory. Every atom points into `type_labels` through `type_index`; labels are
/// interned in order of first appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    atom_count: usize,
    positions: Vec<f64>,
    type_index: Vec<Option<usize>>,
    type_labels: Vec<String>,
}

impl Geometry {
    /// Creates a geometry for `atom_count` atoms at the origin with no type assigned.
    ///
    /// # Panics
    ///
    /// Panics if storage for `atom_count` atoms cannot be allocated. Use
    /// [`Geometry::try_new`] for counts that come from user input.
    pub fn new(atom_count: usize) -> Self {
        Self {
            atom_count,
            positions: vec![0.0; 3 * atom_count],
            type_index: vec![None; atom_count],
            type_labels: Vec::new(),
        }
    }

    /// Like [`Geometry::new`], but reports an oversized `atom_count` as an error.
    pub fn try_new(atom_count: usize) -> Result<Self, GeometryError> {
        let too_large = || GeometryError::TooLarge(atom_count);
        let len = atom_count.checked_mul(3).ok_or_else(too_large)?;

        let mut positions = Vec::new();
        positions.try_reserve_exact(len).map_err(|_| too_large())?;
        positions.resize(len, 0.0);

        let mut type_index = Vec::new();
        type_index.try_reserve_exact(atom_count).map_err(|_| too_large())?;
        type_index.resize(atom_count, None);

        Ok(Self {
            atom_count,
            positions,
            type_index,
            type_labels: Vec::new(),
        })
    }

    /// Places `atom_count` atoms of a single type on a simple cubic lattice filling
    /// a box of size `box_length`.
    ///
    /// The lattice has `ceil(cbrt(atom_count))` sites per side; sites are filled in
    /// x-fastest order and surplus sites stay empty.
    pub fn cubic_lattice(
        atom_count: usize,
        box_length: [f64; 3],
        label: &str,
    ) -> Result<Self, GeometryError> {
        let mut geometry = Self::try_new(atom_count)?;
        if atom_count == 0 {
            return Ok(geometry);
        }

        let per_side = sites_per_side(atom_count).ok_or(GeometryError::TooLarge(atom_count))?;
        let spacing = box_length.map(|l| l / per_side as f64);
        let type_index = geometry.intern(label);

        for i in 0..atom_count {
            let (ix, iy, iz) = (i % per_side, (i / per_side) % per_side, i / (per_side * per_side));
            geometry.type_index[i] = Some(type_index);
            geometry.set_position(
                i,
                Point3::new(
                    ix as f64 * spacing[0],
                    iy as f64 * spacing[1],
                    iz as f64 * spacing[2],
                ),
            );
        }

        Ok(geometry)
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atom_count == 0
    }

    /// Returns the index of `label`, adding it to the label table on first use.
    pub fn intern(&mut self, label: &str) -> usize {
        match self.type_labels.iter().position(|known| known == label) {
            Some(index) => index,
            None => {
                self.type_labels.push(label.to_string());
                self.type_labels.len() - 1
            }
        }
    }

    pub fn set_atom(
        &mut self,
        index: usize,
        label: &str,
        position: Point3<f64>,
    ) -> Result<(), GeometryError> {
        self.check_index(index)?;
        let type_index = self.intern(label);
        self.type_index[index] = Some(type_index);
        self.set_position(index, position);
        Ok(())
    }

    pub fn type_labels(&self) -> &[String] {
        &self.type_labels
    }

    pub fn type_index(&self, index: usize) -> Option<usize> {
        self.type_index.get(index).copied().flatten()
    }

    pub fn label(&self, index: usize) -> Result<&str, GeometryError> {
        self.check_index(index)?;
        self.type_index(index)
            .and_then(|t| self.type_labels.get(t))
            .map(String::as_str)
            .ok_or(GeometryError::UnsetAtom(index))
    }

    /// Position of atom `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= atom_count()`.
    #[inline]
    pub fn position(&self, index: usize) -> Point3<f64> {
        let n = self.atom_count;
        Point3::new(
            self.positions[index],
            self.positions[n + index],
            self.positions[2 * n + index],
        )
    }

    /// Overwrites the position of atom `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= atom_count()`.
    #[inline]
    pub fn set_position(&mut self, index: usize, position: Point3<f64>) {
        let n = self.atom_count;
        self.positions[index] = position.x;
        self.positions[n + index] = position.y;
        self.positions[2 * n + index] = position.z;
    }

    pub fn positions(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        (0..self.atom_count).map(|i| self.position(i))
    }

    /// All coordinates along one axis (`0` = x, `1` = y, `2` = z).
    pub fn axis(&self, axis: usize) -> &[f64] {
        let n = self.atom_count;
        &self.positions[axis * n..(axis + 1) * n]
    }

    pub fn axis_mut(&mut self, axis: usize) -> &mut [f64] {
        let n = self.atom_count;
        &mut self.positions[axis * n..(axis + 1) * n]
    }

    /// Multiplies every coordinate component-wise by `factors`.
    pub fn scale(&mut self, factors: Vector3<f64>) {
        for axis in 0..3 {
            let factor = factors[axis];
            self.axis_mut(axis).iter_mut().for_each(|c| *c *= factor);
        }
    }

    /// Checks that every atom has been given a type.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self.type_index.iter().position(Option::is_none) {
            Some(index) => Err(GeometryError::UnsetAtom(index)),
            None => Ok(()),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), GeometryError> {
        if index < self.atom_count {
            Ok(())
        } else {
            Err(GeometryError::AtomOutOfRange {
                index,
                atom_count: self.atom_count,
            })
        }
    }
}

/// Smallest `k` with `k³ >= n`, or `None` if `k³` does not fit a `usize`.
fn sites_per_side(n: usize) -> Option<usize> {
    let cube = |k: usize| k.checked_pow(3);
    let mut k = (n as f64).cbrt().round() as usize;
    while k > 1 && cube(k - 1)? >= n {
        k -= 1;
    }
    while cube(k)? < n {
        k += 1;
    }
    Some(k)
}
