pub mod lattice;
pub mod offsets;

pub use lattice::{Axis, Coords, Lattice};
pub use offsets::{ball, moore, Shell, FACES};
