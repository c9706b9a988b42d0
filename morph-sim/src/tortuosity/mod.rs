//! Shortest through-phase paths between the `z` faces and the tortuosity
//! and island volume derived from them.

pub mod indexed;
pub mod node;
pub mod reduced;

use log::info;

use crate::config::PathAlgorithm;
use crate::error::{MorphologyError, Result};
use crate::geometry::Lattice;
use crate::morphology::Morphology;
use crate::phases::Label;

pub use node::{Edge, PathNode};

/// Path length from the start face of `label` to every site of `label`.
///
/// Start-face sites get length 1, so a straight column of height `H`
/// measures `H` at the opposite face.
pub fn shortest_paths(lattice: &Lattice, label: Label, algorithm: PathAlgorithm) -> Result<Vec<Option<f32>>> {
    let (start, _) = node::faces(lattice.height(), label).ok_or(MorphologyError::UnsupportedLabel(label))?;
    let mut seeds = Vec::with_capacity(lattice.footprint());
    for x in 0..lattice.length() {
        for y in 0..lattice.width() {
            seeds.push(lattice.index_xyz(x, y, start));
        }
    }
    Ok(match algorithm {
        PathAlgorithm::Indexed => indexed::shortest_paths(lattice, label, &seeds),
        PathAlgorithm::ReducedMemory => reduced::shortest_paths(lattice, label, &seeds),
    })
}

impl Morphology {
    /// [`Morphology::calculate_tortuosity`] with the path algorithm set in
    /// the morphology's parameters.
    pub fn calculate_configured_tortuosity(&mut self, label: Label) -> Result<()> {
        let algorithm = self.params.path_algorithm;
        self.calculate_tortuosity(label, algorithm)
    }

    /// Per-column tortuosity and island volume of `label`.
    ///
    /// `PRIMARY` is measured from `z = 0` to `z = H - 1`, `SECONDARY` the
    /// other way round. A column's tortuosity is the path length reaching
    /// its measuring-face site divided by `H`; sites of `label` that no path
    /// reaches make up the island volume.
    pub fn calculate_tortuosity(&mut self, label: Label, algorithm: PathAlgorithm) -> Result<()> {
        let (_, end) = node::faces(self.lattice.height(), label).ok_or(MorphologyError::UnsupportedLabel(label))?;
        let idx = self.phases.index_of(label)?;
        info!("{}: calculating the tortuosity of phase {label} ({algorithm:?})", self.id);

        let lattice = &self.lattice;
        let path = shortest_paths(lattice, label, algorithm)?;
        let height = lattice.height() as f64;
        let mut map = Vec::with_capacity(lattice.footprint());
        for x in 0..lattice.length() {
            for y in 0..lattice.width() {
                let d = path[lattice.index_xyz(x, y, end)];
                map.push(d.map(|d| f64::from(d) / height));
            }
        }
        let islands = (0..lattice.n_sites)
            .filter(|&i| lattice.label(i) == label && path[i].is_none())
            .count();

        let phase = self.phases.phase_mut(idx);
        phase.tortuosity = map;
        phase.island_volume = Some(islands);
        info!("{}: phase {label} has {islands} island sites", self.id);
        Ok(())
    }
}
