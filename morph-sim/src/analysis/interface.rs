use log::info;

use crate::geometry::{ball, moore, Coords, Lattice, FACES};
use crate::morphology::Morphology;
use crate::phases::Label;

/// Front threshold of the first interfacial-distance pass. Sites whose
/// distance rounds to an integer `n` are finalized in the pass whose front is
/// `n + 0.99`.
const INITIAL_FRONT: f32 = 1.99;

/// Whether any site within Euclidean `distance` of `c` (and within taxicab
/// distance `ceil(distance)`) carries a different label.
pub fn is_near_interface(lattice: &Lattice, c: Coords, distance: f64) -> bool {
    let range = distance.ceil() as i32;
    let distance_sq = distance * distance;
    let label = lattice.label_at(c);
    for i in -range..=range {
        for j in -range..=range {
            for k in -range..=range {
                if i.abs() + j.abs() + k.abs() > range {
                    continue;
                }
                if f64::from(i * i + j * j + k * k) > distance_sq {
                    continue;
                }
                if let Some(dest) = lattice.neighbor_index(c, i, j, k) {
                    if lattice.label(dest) != label {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Neighborhood used by smoothing for a lattice stretched by `rescale_factor`:
/// radius 1 with cutoff² 2 up to a factor of 2, otherwise radius
/// `ceil((k + 1) / 2)` with cutoff² `floor(((k + 1) / 2)²)`.
pub fn smoothing_neighborhood(rescale_factor: usize) -> Vec<(i32, i32, i32)> {
    if rescale_factor <= 2 {
        return ball(1, 2);
    }
    let half = (rescale_factor as f64 + 1.0) / 2.0;
    ball(half.ceil() as i32, (half * half).floor() as i32)
}

/// Fraction of the valid sites in `neighborhood` around `c` (centre
/// included) whose label differs from the label at `c`.
pub fn dissimilar_fraction(lattice: &Lattice, c: Coords, neighborhood: &[(i32, i32, i32)]) -> f64 {
    let label = lattice.label_at(c);
    let mut total = 0u32;
    let mut dissimilar = 0u32;
    for &(i, j, k) in neighborhood {
        if let Some(dest) = lattice.neighbor_index(c, i, j, k) {
            if lattice.label(dest) != label {
                dissimilar += 1;
            }
            total += 1;
        }
    }
    f64::from(dissimilar) / f64::from(total.max(1))
}

/// Face contacts between differently labeled sites, counted once per
/// unordered label pair and divided by the site count.
pub fn interfacial_area_volume_ratio(lattice: &Lattice, labels: &[Label]) -> f64 {
    let mut contacts = 0u64;
    for (m, &lm) in labels.iter().enumerate() {
        for &ln in &labels[m + 1..] {
            for site in 0..lattice.n_sites {
                if lattice.label(site) != lm {
                    continue;
                }
                let c = lattice.coords(site);
                for &(i, j, k) in &FACES {
                    if lattice.neighbor_index(c, i, j, k).is_some_and(|d| lattice.label(d) == ln) {
                        contacts += 1;
                    }
                }
            }
        }
    }
    contacts as f64 / lattice.n_sites as f64
}

/// Fraction of all sites within `radius` of a differently labeled site.
pub fn interfacial_volume_fraction(lattice: &Lattice, radius: f64) -> f64 {
    let near = (0..lattice.n_sites)
        .filter(|&i| is_near_interface(lattice, lattice.coords(i), radius))
        .count();
    near as f64 / lattice.n_sites as f64
}

/// Shortest through-phase distance from every site to the interface.
///
/// Sites touching a different label (26-connected) get the Euclidean length
/// of the shortest such step. Later passes relax every unknown site through
/// its finalized like neighbors and accept the estimate once it is below the
/// current front, which advances one lattice unit per pass. Estimates are
/// updated in place, so a site finalized earlier in a pass already serves
/// its successors. Sites of a phase with no interface stay `None`.
pub fn interfacial_distances(lattice: &Lattice) -> Vec<Option<f32>> {
    let offsets: Vec<(i32, i32, i32, f32)> = moore()
        .into_iter()
        .map(|(i, j, k)| (i, j, k, ((i * i + j * j + k * k) as f32).sqrt()))
        .collect();
    let mut path: Vec<Option<f32>> = vec![None; lattice.n_sites];
    let mut front = INITIAL_FRONT;
    let first_pass = |front: f32| front < 2.0;
    loop {
        let mut finalized = 0usize;
        for site in 0..lattice.n_sites {
            if path[site].is_some() {
                continue;
            }
            let c = lattice.coords(site);
            let label = lattice.label(site);
            let mut best: Option<f32> = None;
            for &(i, j, k, step) in &offsets {
                let Some(dest) = lattice.neighbor_index(c, i, j, k) else {
                    continue;
                };
                let candidate = if first_pass(front) {
                    (lattice.label(dest) != label).then_some(step)
                } else if lattice.label(dest) == label {
                    path[dest].map(|d| d + step)
                } else {
                    None
                };
                if let Some(d) = candidate {
                    if best.map_or(true, |b| d < b) {
                        best = Some(d);
                    }
                }
            }
            if let Some(d) = best {
                if d < front {
                    path[site] = Some(d);
                    finalized += 1;
                }
            }
        }
        front += 1.0;
        if finalized == 0 {
            break;
        }
    }
    path
}

/// `(distance, count)` pairs covering every integer from the smallest to the
/// largest value, zero counts included.
pub fn integer_histogram(values: &[i64]) -> Vec<(f64, usize)> {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };
    let mut counts = vec![0usize; (max - min + 1) as usize];
    for &v in values {
        counts[(v - min) as usize] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(n, count)| ((min + n as i64) as f64, count))
        .collect()
}

impl Morphology {
    pub fn calculate_interfacial_area_volume_ratio(&self) -> f64 {
        interfacial_area_volume_ratio(&self.lattice, &self.phases.labels())
    }

    pub fn calculate_interfacial_volume_fraction(&self, radius: f64) -> f64 {
        interfacial_volume_fraction(&self.lattice, radius)
    }

    /// Histogram of each phase's distances to the interface, rounded to
    /// whole lattice units.
    pub fn calculate_interfacial_distance_histogram(&mut self) {
        info!("{}: calculating the interfacial distance histogram", self.id);
        let path = interfacial_distances(&self.lattice);
        let labels = self.phases.labels();
        let mut per_label: Vec<Vec<i64>> = vec![Vec::new(); labels.len()];
        for (site, d) in path.iter().enumerate() {
            let Some(d) = d else { continue };
            if let Some(idx) = self.phases.position(self.lattice.label(site)) {
                per_label[idx].push(d.round() as i64);
            }
        }
        for (idx, values) in per_label.iter().enumerate() {
            self.phases.phase_mut(idx).interfacial_histogram = integer_histogram(values);
        }
    }
}
