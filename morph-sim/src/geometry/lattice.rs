use rand::Rng;

use crate::phases::Label;

/// Lattice axis. `Z` is the depth axis (film thickness).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Unit displacement along this axis, scaled by `step`.
    #[inline]
    pub fn offset(self, step: i32) -> (i32, i32, i32) {
        match self {
            Axis::X => (step, 0, 0),
            Axis::Y => (0, step, 0),
            Axis::Z => (0, 0, step),
        }
    }
}

impl TryFrom<&str> for Axis {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            _ => Err(format!("unknown axis '{s}', expected 'x', 'y', or 'z'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coords {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coords {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Cubic 3-D lattice of phase labels with per-axis periodic boundaries.
///
/// Sites are indexed in scan order `x`, then `y`, then `z` fastest:
/// `index = x * width * height + y * height + z`. This is also the order
/// used by the compressed morphology format.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    /// Extent along `[x, y, z]`.
    pub shape: [usize; 3],
    /// Scan-order strides: `strides[d] = product of shape[d+1..]`.
    pub strides: [usize; 3],
    /// Periodicity along `[x, y, z]`.
    pub periodic: [bool; 3],
    /// Total number of sites.
    pub n_sites: usize,
    sites: Vec<Label>,
}

impl Lattice {
    /// Create a lattice with every site holding [`Label::UNASSIGNED`].
    pub fn new(length: usize, width: usize, height: usize, periodic: [bool; 3]) -> Self {
        let shape = [length, width, height];
        let n_sites = length * width * height;
        Self {
            shape,
            strides: strides_for(shape),
            periodic,
            n_sites,
            sites: vec![Label::UNASSIGNED; n_sites],
        }
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.shape[0]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.shape[1]
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.shape[2]
    }

    /// Number of sites in one `z` plane.
    #[inline]
    pub fn footprint(&self) -> usize {
        self.shape[0] * self.shape[1]
    }

    #[inline]
    pub fn index(&self, c: Coords) -> usize {
        c.x as usize * self.strides[0] + c.y as usize * self.strides[1] + c.z as usize
    }

    #[inline]
    pub fn index_xyz(&self, x: usize, y: usize, z: usize) -> usize {
        x * self.strides[0] + y * self.strides[1] + z
    }

    #[inline]
    pub fn coords(&self, index: usize) -> Coords {
        Coords {
            x: (index / self.strides[0]) as i32,
            y: ((index / self.strides[1]) % self.shape[1]) as i32,
            z: (index % self.shape[2]) as i32,
        }
    }

    #[inline]
    pub fn label(&self, index: usize) -> Label {
        self.sites[index]
    }

    #[inline]
    pub fn label_at(&self, c: Coords) -> Label {
        self.sites[self.index(c)]
    }

    #[inline]
    pub fn set_label(&mut self, index: usize, label: Label) {
        self.sites[index] = label;
    }

    pub fn labels(&self) -> &[Label] {
        &self.sites
    }

    /// Exchange the labels of two sites.
    #[inline]
    pub fn swap_labels(&mut self, a: usize, b: usize) {
        self.sites.swap(a, b);
    }

    /// Whether displacing `c` by `(dx, dy, dz)` stays on the lattice. Always
    /// true along periodic axes.
    #[inline]
    pub fn is_valid_move(&self, c: Coords, dx: i32, dy: i32, dz: i32) -> bool {
        let target = [c.x + dx, c.y + dy, c.z + dz];
        (0..3).all(|d| self.periodic[d] || (0..self.shape[d] as i32).contains(&target[d]))
    }

    /// Destination of displacing `c` by `(dx, dy, dz)`, wrapped along
    /// periodic axes. Callers check [`Lattice::is_valid_move`] first when an
    /// axis is not periodic.
    #[inline]
    pub fn destination(&self, c: Coords, dx: i32, dy: i32, dz: i32) -> Coords {
        Coords {
            x: (c.x + dx).rem_euclid(self.shape[0] as i32),
            y: (c.y + dy).rem_euclid(self.shape[1] as i32),
            z: (c.z + dz).rem_euclid(self.shape[2] as i32),
        }
    }

    /// Site index reached from `c` by `(dx, dy, dz)`, or `None` across a
    /// hard boundary.
    #[inline]
    pub fn neighbor_index(&self, c: Coords, dx: i32, dy: i32, dz: i32) -> Option<usize> {
        if self.is_valid_move(c, dx, dy, dz) {
            Some(self.index(self.destination(c, dx, dy, dz)))
        } else {
            None
        }
    }

    pub fn random_coords<R: Rng>(&self, rng: &mut R) -> Coords {
        Coords {
            x: rng.gen_range(0..self.shape[0]) as i32,
            y: rng.gen_range(0..self.shape[1]) as i32,
            z: rng.gen_range(0..self.shape[2]) as i32,
        }
    }

    /// Copy a `length x width x height` block starting at `origin`. The block
    /// wraps along periodic axes and is itself non-periodic along every axis
    /// it does not fully span.
    pub fn extract_sublattice(
        &self,
        origin: Coords,
        length: usize,
        width: usize,
        height: usize,
    ) -> Lattice {
        let span = [length, width, height];
        let periodic = [0, 1, 2].map(|d| self.periodic[d] && span[d] == self.shape[d]);
        let mut sub = Lattice::new(length, width, height, periodic);
        for x in 0..length {
            for y in 0..width {
                for z in 0..height {
                    let src = self.destination(origin, x as i32, y as i32, z as i32);
                    let idx = sub.index_xyz(x, y, z);
                    sub.sites[idx] = self.label_at(src);
                }
            }
        }
        sub
    }

    /// Change the dimensions. All labels are reset to [`Label::UNASSIGNED`].
    pub fn resize(&mut self, length: usize, width: usize, height: usize) {
        self.shape = [length, width, height];
        self.strides = strides_for(self.shape);
        self.n_sites = length * width * height;
        self.sites = vec![Label::UNASSIGNED; self.n_sites];
    }
}

fn strides_for(shape: [usize; 3]) -> [usize; 3] {
    [shape[1] * shape[2], shape[2], 1]
}
