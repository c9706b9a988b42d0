use log::{debug, info, warn};

use super::correlation::{sample_sites, INITIAL_CUTOFF, MIN_SITES};
use crate::error::{MorphologyError, Result};
use crate::geometry::{Axis, Lattice};
use crate::morphology::Morphology;
use crate::phases::Label;

/// Normalized correlation along one axis at integer distances `0..=cutoff`.
fn axis_correlation(
    lattice: &Lattice,
    seeds: &[usize],
    label: Label,
    axis: Axis,
    mix_fraction: f64,
    cutoff: usize,
) -> Vec<f64> {
    let mut sums = vec![0.0f64; cutoff + 1];
    let mut n_seeds = 0usize;
    let mut same = vec![0u32; cutoff + 1];
    let mut total = vec![0u32; cutoff + 1];
    for &seed in seeds {
        if lattice.label(seed) != label {
            continue;
        }
        let c = lattice.coords(seed);
        same.fill(0);
        total.fill(0);
        for step in -(cutoff as i32)..=cutoff as i32 {
            let (dx, dy, dz) = axis.offset(step);
            let Some(dest) = lattice.neighbor_index(c, dx, dy, dz) else {
                continue;
            };
            let n = step.unsigned_abs() as usize;
            if lattice.label(dest) == label {
                same[n] += 1;
            }
            total[n] += 1;
        }
        for n in 1..=cutoff {
            if total[n] > 0 {
                sums[n] += f64::from(same[n]) / f64::from(total[n]);
            }
        }
        n_seeds += 1;
    }
    let n_seeds = n_seeds.max(1) as f64;
    let mut curve: Vec<f64> = sums
        .into_iter()
        .map(|s| (s / n_seeds - mix_fraction) / (1.0 - mix_fraction))
        .collect();
    curve[0] = 1.0;
    curve
}

/// Twice the distance at which `curve` (unit spacing) first drops below 1/e.
fn correlation_length(curve: &[f64]) -> Option<f64> {
    let inv_e = (-1.0f64).exp();
    let n = (1..curve.len()).find(|&n| curve[n] < inv_e)?;
    let d1 = (n - 1) as f64;
    let slope = curve[n] - curve[n - 1];
    let intercept = curve[n - 1] - slope * d1;
    Some(2.0 * (inv_e - intercept) / slope)
}

/// Correlation lengths along `x`, `y` and `z` for one cutoff, or `None` if
/// any axis has not dropped below 1/e within it.
pub fn axis_correlation_lengths(
    lattice: &Lattice,
    seeds: &[usize],
    label: Label,
    mix_fraction: f64,
    cutoff: usize,
) -> Result<Option<[f64; 3]>> {
    if seeds.is_empty() {
        return Err(MorphologyError::EmptySample(label));
    }
    let mut lengths = [0.0; 3];
    for axis in Axis::ALL {
        let curve = axis_correlation(lattice, seeds, label, axis, mix_fraction, cutoff);
        match correlation_length(&curve) {
            Some(l) => lengths[axis.index()] = l,
            None => return Ok(None),
        }
    }
    Ok(Some(lengths))
}

/// `2 * l_z / (l_x + l_y)`: 1 for isotropic domains, above 1 for domains
/// elongated along `z`.
pub fn anisotropy_ratio(lengths: [f64; 3]) -> f64 {
    2.0 * lengths[2] / (lengths[0] + lengths[1])
}

impl Morphology {
    /// Domain anisotropy of every phase with more than 100 sites.
    ///
    /// The cutoff starts at 3 and grows until all three axes cross 1/e or
    /// twice the cutoff exceeds a lattice dimension.
    pub fn calculate_anisotropies(&mut self) -> Result<()> {
        info!("{}: calculating domain anisotropies", self.id);
        let lattice = &self.lattice;
        let max_cutoff = lattice.shape.iter().copied().min().unwrap_or(0) / 2;
        for idx in 0..self.phases.len() {
            let phase = self.phases.phase_mut(idx);
            phase.anisotropy = None;
            let (label, count, mix) = (phase.label, phase.count, phase.mix_fraction);
            if count <= MIN_SITES || mix >= 1.0 {
                continue;
            }
            let seeds = sample_sites(lattice, label, self.params.n_sampling_max, &mut self.rng);
            let mut lengths = None;
            for cutoff in INITIAL_CUTOFF..=max_cutoff {
                debug!("{}: anisotropy of phase {label} with cutoff {cutoff}", self.id);
                lengths = axis_correlation_lengths(lattice, &seeds, label, mix, cutoff)?;
                if lengths.is_some() {
                    break;
                }
            }
            let Some(lengths) = lengths else {
                warn!("{}: could not calculate the anisotropy of phase {label}", self.id);
                continue;
            };
            if 4.0 * lengths[0] > lattice.length() as f64 || 4.0 * lengths[1] > lattice.width() as f64 {
                warn!(
                    "{}: in-plane correlation lengths {:.3}, {:.3} of phase {label} exceed a quarter of the lattice",
                    self.id, lengths[0], lengths[1]
                );
            }
            let ratio = anisotropy_ratio(lengths);
            self.phases.phase_mut(idx).anisotropy = Some(ratio);
            info!("{}: anisotropy of phase {label} is {ratio:.3}", self.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parameters;
    use approx::assert_relative_eq;

    /// Alternating boxes of `4 x 4 x depth` sites.
    fn boxes(depth: i32) -> Morphology {
        let mut lattice = Lattice::new(16, 16, 16, [true; 3]);
        for i in 0..lattice.n_sites {
            let c = lattice.coords(i);
            let parity = (c.x / 4 + c.y / 4 + c.z / depth) % 2;
            lattice.set_label(i, if parity == 0 { Label::PRIMARY } else { Label::SECONDARY });
        }
        Morphology::from_lattice(lattice, Parameters::new(16, 16, 16), 0, 3).unwrap()
    }

    #[test]
    fn test_correlation_length_interpolation() {
        let inv_e = (-1.0f64).exp();
        // drops from 0.5 at 1 to 0 at 2
        let l = correlation_length(&[1.0, 0.5, 0.0]).unwrap();
        assert_relative_eq!(l, 4.0 * (1.0 - inv_e), epsilon = 1e-12);
        assert_eq!(correlation_length(&[1.0, 0.9, 0.8]), None);
    }

    #[test]
    fn test_isotropic_boxes() {
        let mut morph = boxes(4);
        morph.calculate_anisotropies().unwrap();
        for label in [Label::PRIMARY, Label::SECONDARY] {
            assert_relative_eq!(morph.domain_anisotropy(label).unwrap().unwrap(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_boxes_elongated_along_z() {
        let mut morph = boxes(8);
        morph.calculate_anisotropies().unwrap();
        assert_relative_eq!(
            morph.domain_anisotropy(Label::PRIMARY).unwrap().unwrap(),
            2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_columns_have_no_anisotropy() {
        // columns never decorrelate along z
        let mut lattice = Lattice::new(8, 8, 8, [true; 3]);
        for i in 0..lattice.n_sites {
            let c = lattice.coords(i);
            let label = if (c.x / 2 + c.y / 2) % 2 == 0 { Label::PRIMARY } else { Label::SECONDARY };
            lattice.set_label(i, label);
        }
        let mut morph = Morphology::from_lattice(lattice, Parameters::new(8, 8, 8), 0, 3).unwrap();
        morph.calculate_anisotropies().unwrap();
        assert_eq!(morph.domain_anisotropy(Label::PRIMARY).unwrap(), None);
    }
}
