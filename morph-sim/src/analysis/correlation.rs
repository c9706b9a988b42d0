use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256StarStar;

use crate::config::CorrelationMethod;
use crate::error::{MorphologyError, Result};
use crate::geometry::Lattice;
use crate::morphology::Morphology;
use crate::phases::Label;

/// Starting cutoff radius for domain-size escalation.
pub const INITIAL_CUTOFF: usize = 3;
/// Labels with this many sites or fewer get no correlation analysis.
pub const MIN_SITES: usize = 100;

/// Up to `n_max` sites of `label`, uniformly sampled without replacement.
pub fn sample_sites(
    lattice: &Lattice,
    label: Label,
    n_max: usize,
    rng: &mut Xoshiro256StarStar,
) -> Vec<usize> {
    let mut sites: Vec<usize> = (0..lattice.n_sites).filter(|&i| lattice.label(i) == label).collect();
    sites.shuffle(rng);
    sites.truncate(n_max);
    sites
}

/// Like [`sample_sites`], restricted to the `z` plane.
pub fn sample_plane_sites(
    lattice: &Lattice,
    label: Label,
    n_max: usize,
    z: usize,
    rng: &mut Xoshiro256StarStar,
) -> Vec<usize> {
    let mut sites = Vec::new();
    for x in 0..lattice.length() {
        for y in 0..lattice.width() {
            let i = lattice.index_xyz(x, y, z);
            if lattice.label(i) == label {
                sites.push(i);
            }
        }
    }
    sites.shuffle(rng);
    sites.truncate(n_max);
    sites
}

/// Correlation bin of a displacement: its length rounded to the nearest half
/// lattice unit, times two.
#[inline]
fn bin_of(i: i32, j: i32, k: i32) -> usize {
    (2.0 * f64::from(i * i + j * j + k * k).sqrt()).round() as usize
}

/// Displacements within `cutoff` whose bin lies in `bins`.
fn offsets_in_bins(cutoff: usize, bins: std::ops::Range<usize>) -> Vec<(i32, i32, i32, usize)> {
    let c = cutoff as i32;
    let mut out = Vec::new();
    for i in -c..=c {
        for j in -c..=c {
            for k in -c..=c {
                let bin = bin_of(i, j, k);
                if bins.contains(&bin) {
                    out.push((i, j, k, bin));
                }
            }
        }
    }
    out
}

/// Extend the normalized pair-pair correlation curve `data` out to `cutoff`.
///
/// `data[n]` holds the curve at distance `n / 2`. Bins already present are
/// kept as they are; only the new bins are sampled, each as the fraction of
/// sites sharing the seed's label averaged over all seeds and rescaled as
/// `(f - mix) / (1 - mix)`. Bins with no lattice displacement count as fully
/// correlated.
///
/// Returns `Ok(false)` without touching `data` when `cutoff` exceeds the
/// lattice length or width or does not extend the curve.
pub fn extend_correlation(
    lattice: &Lattice,
    seeds: &[usize],
    label: Label,
    data: &mut Vec<f64>,
    mix_fraction: f64,
    cutoff: usize,
) -> Result<bool> {
    if seeds.is_empty() {
        return Err(MorphologyError::EmptySample(label));
    }
    if cutoff > lattice.length() || cutoff > lattice.width() {
        return Ok(false);
    }
    let size_old = data.len();
    let size_new = 2 * cutoff + 1;
    if size_old >= size_new {
        return Ok(false);
    }

    let offsets = offsets_in_bins(cutoff, size_old..size_new);
    let n_new = size_new - size_old;
    let mut sums = vec![0.0f64; n_new];
    let mut same = vec![0u32; n_new];
    let mut total = vec![0u32; n_new];
    for &seed in seeds {
        let c = lattice.coords(seed);
        let seed_label = lattice.label(seed);
        same.fill(0);
        total.fill(0);
        for &(i, j, k, bin) in &offsets {
            let Some(dest) = lattice.neighbor_index(c, i, j, k) else {
                continue;
            };
            let b = bin - size_old;
            if lattice.label(dest) == seed_label {
                same[b] += 1;
            }
            total[b] += 1;
        }
        for b in 0..n_new {
            sums[b] += if total[b] > 0 {
                f64::from(same[b]) / f64::from(total[b])
            } else {
                1.0
            };
        }
    }

    let n_seeds = seeds.len() as f64;
    data.extend(
        sums.into_iter()
            .map(|s| (s / n_seeds - mix_fraction) / (1.0 - mix_fraction)),
    );
    Ok(true)
}

/// Read a domain size off a normalized correlation curve.
///
/// Starts at distance 1 (bin 2). Crossings are located by linear
/// interpolation between the two bracketing bins.
pub fn domain_size_from_curve(data: &[f64], method: CorrelationMethod) -> Option<f64> {
    let inv_e = (-1.0f64).exp();
    let interpolate = |n: usize, level: f64| {
        let d1 = (n - 1) as f64 * 0.5;
        let (y1, y2) = (data[n - 1], data[n]);
        let slope = (y2 - y1) * 2.0;
        let intercept = y1 - slope * d1;
        (level - intercept) / slope
    };
    let size = match method {
        CorrelationMethod::MixFraction => (2..data.len()).find_map(|n| {
            if data[n] < 0.0 {
                Some(interpolate(n, 0.0))
            } else if data[n] > data[n - 1] {
                Some((n - 1) as f64 / 2.0)
            } else {
                None
            }
        }),
        CorrelationMethod::OneOverE => (2..data.len())
            .find(|&n| data[n] < inv_e)
            .map(|n| 2.0 * interpolate(n, inv_e)),
    };
    size.filter(|&d| d > 0.0)
}

/// Extend `data` to `cutoff` and try to extract a domain size from it.
///
/// `Ok(None)` means the crossing lies beyond `cutoff` (or `cutoff` is not
/// usable); the caller retries with a larger cutoff.
pub fn calculate_correlation_distance(
    lattice: &Lattice,
    seeds: &[usize],
    label: Label,
    data: &mut Vec<f64>,
    mix_fraction: f64,
    cutoff: usize,
    method: CorrelationMethod,
) -> Result<Option<f64>> {
    if !extend_correlation(lattice, seeds, label, data, mix_fraction, cutoff)? {
        return Ok(None);
    }
    Ok(domain_size_from_curve(data, method))
}

impl Morphology {
    /// Domain size of every phase from its pair-pair correlation curve.
    ///
    /// The cutoff starts at 3 (or the extended cutoff when configured) and
    /// grows by one until a crossing is found or twice the cutoff exceeds
    /// the lattice length, width or, along a periodic `z`, height. Phases
    /// that fail keep `domain_size == None`.
    pub fn calculate_correlation_distances(&mut self) -> Result<()> {
        let method = self.params.correlation_method;
        let lattice = &self.lattice;
        let shape = lattice.shape;
        let z_periodic = lattice.periodic[2];
        match self.params.extended_correlation_cutoff {
            Some(c) => info!("{}: calculating domain sizes with an extended cutoff of {c}", self.id),
            None => info!("{}: calculating domain sizes using the {method:?} method", self.id),
        }

        for idx in 0..self.phases.len() {
            let phase = self.phases.phase_mut(idx);
            phase.correlation.clear();
            phase.domain_size = None;
            let (label, count, mix) = (phase.label, phase.count, phase.mix_fraction);
            if count <= MIN_SITES || mix >= 1.0 {
                warn!("{}: phase {label} has {count} sites, skipping its domain size", self.id);
                continue;
            }
            let seeds = sample_sites(lattice, label, self.params.n_sampling_max, &mut self.rng);
            let mut data = Vec::new();
            let mut cutoff = self.params.extended_correlation_cutoff.unwrap_or(INITIAL_CUTOFF);
            let mut size = None;
            loop {
                if 2 * cutoff > shape[0] || 2 * cutoff > shape[1] || (z_periodic && 2 * cutoff > shape[2]) {
                    warn!(
                        "{}: cutoff radius {cutoff} too large to resolve the domain size of phase {label}",
                        self.id
                    );
                    break;
                }
                debug!(
                    "{}: sampling {} sites of phase {label} with cutoff {cutoff}",
                    self.id,
                    seeds.len()
                );
                size = calculate_correlation_distance(lattice, &seeds, label, &mut data, mix, cutoff, method)?;
                if size.is_some() {
                    break;
                }
                cutoff += 1;
            }
            let phase = self.phases.phase_mut(idx);
            phase.correlation = data;
            phase.domain_size = size;
            if let Some(d) = size {
                info!("{}: domain size of phase {label} is {d:.3}", self.id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parameters;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn random_lattice(size: usize, seed: u64, fraction: f64) -> (Lattice, Xoshiro256StarStar) {
        use rand::Rng;
        let mut lat = Lattice::new(size, size, size, [true; 3]);
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        for i in 0..lat.n_sites {
            let label = if rng.gen::<f64>() < fraction { Label::PRIMARY } else { Label::SECONDARY };
            lat.set_label(i, label);
        }
        (lat, rng)
    }

    #[test]
    fn test_bin_zero_is_exactly_one() {
        let (lat, mut rng) = random_lattice(12, 1, 0.37);
        for mix in [0.1, 0.37, 0.5, 0.93] {
            let seeds = sample_sites(&lat, Label::PRIMARY, 50, &mut rng);
            let mut data = Vec::new();
            assert!(extend_correlation(&lat, &seeds, Label::PRIMARY, &mut data, mix, 4).unwrap());
            assert_eq!(data.len(), 9);
            assert_eq!(data[0], 1.0);
            // no displacement has length 0.5
            assert_eq!(data[1], 1.0);
        }
    }

    #[test]
    fn test_extension_keeps_existing_bins() {
        let (lat, mut rng) = random_lattice(12, 2, 0.5);
        let seeds = sample_sites(&lat, Label::PRIMARY, 200, &mut rng);
        let mut data = Vec::new();
        extend_correlation(&lat, &seeds, Label::PRIMARY, &mut data, 0.5, 3).unwrap();
        let head = data.clone();
        extend_correlation(&lat, &seeds, Label::PRIMARY, &mut data, 0.5, 5).unwrap();
        assert_eq!(data.len(), 11);
        assert_eq!(&data[..7], &head[..]);

        let mut full = Vec::new();
        extend_correlation(&lat, &seeds, Label::PRIMARY, &mut full, 0.5, 5).unwrap();
        for n in 7..11 {
            assert_relative_eq!(data[n], full[n], epsilon = 1e-12);
        }
        // not an extension
        assert!(!extend_correlation(&lat, &seeds, Label::PRIMARY, &mut data, 0.5, 4).unwrap());
        assert!(!extend_correlation(&lat, &seeds, Label::PRIMARY, &mut data, 0.5, 13).unwrap());
        assert_eq!(data.len(), 11);
    }

    #[test]
    fn test_empty_sample() {
        let (lat, _) = random_lattice(6, 3, 0.5);
        let mut data = Vec::new();
        assert!(matches!(
            extend_correlation(&lat, &[], Label::PRIMARY, &mut data, 0.5, 2),
            Err(MorphologyError::EmptySample(_))
        ));
    }

    #[test]
    fn test_domain_size_interpolation() {
        // bins at 0, 0.5, 1.0, 1.5, 2.0
        let data = [1.0, 1.0, 0.5, 0.2, -0.2];
        // crossing between 1.5 (0.2) and 2.0 (-0.2)
        assert_relative_eq!(
            domain_size_from_curve(&data, CorrelationMethod::MixFraction).unwrap(),
            1.75,
            epsilon = 1e-12
        );
        // first minimum wins over a later crossing
        let data = [1.0, 1.0, 0.5, 0.1, 0.2, -0.3];
        assert_eq!(domain_size_from_curve(&data, CorrelationMethod::MixFraction), Some(1.5));

        let inv_e = (-1.0f64).exp();
        let data = [1.0, 1.0, 0.6, 0.2];
        let crossing = 1.0 + 0.5 * (0.6 - inv_e) / 0.4;
        assert_relative_eq!(
            domain_size_from_curve(&data, CorrelationMethod::OneOverE).unwrap(),
            2.0 * crossing,
            epsilon = 1e-12
        );
        assert_eq!(domain_size_from_curve(&[1.0, 1.0, 0.8, 0.7], CorrelationMethod::OneOverE), None);
    }

    #[test]
    fn test_lamellar_domain_size() {
        // lamellae of width 4 stacked along x
        let mut lattice = Lattice::new(16, 16, 16, [true; 3]);
        for i in 0..lattice.n_sites {
            let label = if lattice.coords(i).x % 8 < 4 { Label::PRIMARY } else { Label::SECONDARY };
            lattice.set_label(i, label);
        }
        let mut morph = Morphology::from_lattice(lattice, Parameters::new(16, 16, 16), 0, 5).unwrap();
        morph.calculate_correlation_distances().unwrap();
        for label in [Label::PRIMARY, Label::SECONDARY] {
            let size = morph.domain_size(label).unwrap().unwrap();
            assert!(size > 4.0 && size < 4.5, "domain size {size}");
            let curve = morph.correlation_data(label).unwrap();
            assert_eq!(curve[0], 1.0);
            assert_eq!(curve.len(), 11);
        }
    }

    #[test]
    fn test_height_limits_cutoff_only_when_z_periodic() {
        // the crossing needs a cutoff of 5, more than half the height
        let lamellae = |periodic_z: bool| {
            let mut lattice = Lattice::new(16, 16, 6, [true, true, periodic_z]);
            for i in 0..lattice.n_sites {
                let label = if lattice.coords(i).x % 8 < 4 { Label::PRIMARY } else { Label::SECONDARY };
                lattice.set_label(i, label);
            }
            let mut params = Parameters::new(16, 16, 6);
            params.periodic_z = periodic_z;
            let mut morph = Morphology::from_lattice(lattice, params, 0, 5).unwrap();
            morph.calculate_correlation_distances().unwrap();
            morph.domain_size(Label::PRIMARY).unwrap()
        };
        assert_eq!(lamellae(true), None);
        let size = lamellae(false).unwrap();
        assert!(size > 3.5 && size < 4.5, "domain size {size}");
    }

    #[test]
    fn test_small_phase_skipped() {
        let mut morph = Morphology::with_seed(Parameters::new(4, 4, 4), 0, 5).unwrap();
        morph.create_checkerboard_morphology();
        morph.calculate_correlation_distances().unwrap();
        assert_eq!(morph.domain_size(Label::PRIMARY).unwrap(), None);
        assert!(morph.correlation_data(Label::PRIMARY).unwrap().is_empty());
    }
}
