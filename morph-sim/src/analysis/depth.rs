use log::{debug, info};

use super::correlation::{calculate_correlation_distance, sample_plane_sites};
use super::interface::is_near_interface;
use crate::error::Result;
use crate::geometry::{Coords, Lattice};
use crate::morphology::Morphology;
use crate::phases::Label;

/// Starting cutoff for in-plane domain sizes.
const DEPTH_INITIAL_CUTOFF: usize = 5;

/// A phase needs more than this many sites in a plane for its in-plane
/// domain size to be attempted.
const MIN_PLANE_SITES: usize = 10;

/// Fraction of `label` in the slab of planes `z - half_width ..= z + half_width`.
/// Planes outside a non-periodic lattice are left out; a periodic `z` wraps.
fn slab_mix_fraction(lattice: &Lattice, label: Label, z: usize, half_width: usize) -> f64 {
    let mut same = 0usize;
    let mut total = 0usize;
    let origin = Coords::new(0, 0, z as i32);
    let hw = half_width as i32;
    for dz in -hw..=hw {
        let Some(first) = lattice.neighbor_index(origin, 0, 0, dz) else {
            continue;
        };
        let plane = lattice.coords(first).z as usize;
        for x in 0..lattice.length() {
            for y in 0..lattice.width() {
                if lattice.label(lattice.index_xyz(x, y, plane)) == label {
                    same += 1;
                }
                total += 1;
            }
        }
    }
    same as f64 / total.max(1) as f64
}

impl Morphology {
    /// Plane-by-plane composition, interfacial volume fraction (radius 1)
    /// and in-plane domain size along `z`.
    ///
    /// Domain sizes are sampled from seeds in the plane, normalized by the
    /// mix fraction of the slab `z ± cutoff`. The cutoff starts at 5 and
    /// grows until a size is found, twice the cutoff exceeds a lattice
    /// dimension or the slab holds nothing but the phase.
    pub fn calculate_depth_dependent_data(&mut self) -> Result<()> {
        info!("{}: calculating depth dependent data", self.id);
        let lattice = &self.lattice;
        let [length, width, height] = lattice.shape;
        let footprint = lattice.footprint() as f64;
        let method = self.params.correlation_method;
        let n_labels = self.phases.len();

        let mut compositions = vec![vec![0.0; height]; n_labels];
        let mut domain_sizes = vec![vec![None; height]; n_labels];
        let mut iv_fraction = vec![0.0; height];

        for z in 0..height {
            let mut counts = vec![0usize; n_labels];
            let mut near = 0usize;
            for x in 0..length {
                for y in 0..width {
                    let i = lattice.index_xyz(x, y, z);
                    if let Some(idx) = self.phases.position(lattice.label(i)) {
                        counts[idx] += 1;
                    }
                    if is_near_interface(lattice, lattice.coords(i), 1.0) {
                        near += 1;
                    }
                }
            }
            iv_fraction[z] = near as f64 / footprint;

            for idx in 0..n_labels {
                compositions[idx][z] = counts[idx] as f64 / footprint;
                if counts[idx] <= MIN_PLANE_SITES {
                    continue;
                }
                let label = self.phases.phase(idx).label;
                let seeds = sample_plane_sites(lattice, label, self.params.n_sampling_max, z, &mut self.rng);
                let mut cutoff = DEPTH_INITIAL_CUTOFF;
                while 2 * cutoff <= length && 2 * cutoff <= width && 2 * cutoff <= height {
                    let mix = slab_mix_fraction(lattice, label, z, cutoff);
                    if mix >= 1.0 {
                        break;
                    }
                    // the slab mix changes with the cutoff, so the curve is resampled
                    let mut data = Vec::new();
                    let size = calculate_correlation_distance(lattice, &seeds, label, &mut data, mix, cutoff, method)?;
                    if size.is_some() {
                        domain_sizes[idx][z] = size;
                        break;
                    }
                    cutoff += 1;
                }
                debug!("{}: plane {z} phase {label} domain size {:?}", self.id, domain_sizes[idx][z]);
            }
        }

        for (idx, (composition, sizes)) in compositions.into_iter().zip(domain_sizes).enumerate() {
            let phase = self.phases.phase_mut(idx);
            phase.depth_composition = composition;
            phase.depth_domain_size = sizes;
        }
        self.depth_iv_fraction = iv_fraction;
        Ok(())
    }
}
