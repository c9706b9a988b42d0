use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use super::Morphology;
use crate::analysis::interface::{dissimilar_fraction, is_near_interface, smoothing_neighborhood};
use crate::error::{MorphologyError, Result};
use crate::geometry::{Coords, Lattice};
use crate::phases::Label;

/// Distance added to the minority search radius per retry in
/// [`Morphology::execute_mixing`].
const MIXING_RANGE_STEP: f64 = 0.1;

impl Morphology {
    /// Assign labels `1..=n` at random in the proportions `mix_fractions`.
    ///
    /// Every label but the last gets `round(fraction * n_sites)` sites; the
    /// last label takes the remainder.
    pub fn create_random_morphology(&mut self, mix_fractions: &[f64]) -> Result<()> {
        if mix_fractions.is_empty() || mix_fractions.len() > u8::MAX as usize {
            return Err(MorphologyError::Configuration(format!(
                "random morphology needs between 1 and 255 mix fractions, got {}",
                mix_fractions.len()
            )));
        }
        if mix_fractions.iter().any(|&f| !(f >= 0.0)) {
            return Err(MorphologyError::Configuration(
                "all mix fractions must be greater than or equal to zero".to_string(),
            ));
        }
        let sum: f64 = mix_fractions.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(MorphologyError::Configuration(format!(
                "mix fractions must sum to one, got {sum}"
            )));
        }

        let n_sites = self.lattice.n_sites;
        let labels: Vec<Label> = (1..=mix_fractions.len()).map(|n| Label::new(n as u8)).collect();
        let mut entries = Vec::with_capacity(n_sites);
        for (&label, &fraction) in labels.iter().zip(mix_fractions).take(labels.len() - 1) {
            let count = (fraction * n_sites as f64).round() as usize;
            entries.extend(std::iter::repeat(label).take(count));
        }
        let remainder = n_sites.checked_sub(entries.len()).ok_or_else(|| {
            MorphologyError::Configuration(
                "rounded site counts exceed the lattice size".to_string(),
            )
        })?;
        let last = labels[labels.len() - 1];
        entries.extend(std::iter::repeat(last).take(remainder));
        entries.shuffle(&mut self.rng);

        for (i, label) in entries.into_iter().enumerate() {
            self.lattice.set_label(i, label);
        }
        for label in labels {
            self.phases.register(label);
        }
        self.phases.recount(&self.lattice);
        info!("{}: created random morphology with mix fractions {:?}", self.id, mix_fractions);
        Ok(())
    }

    /// `PRIMARY` below `height / 2`, `SECONDARY` above.
    pub fn create_bilayer_morphology(&mut self) {
        let half = self.lattice.height() / 2;
        self.fill_two_phase(|c| (c.z as usize) < half);
    }

    /// `PRIMARY` where `x + y + z` is even, `SECONDARY` elsewhere.
    pub fn create_checkerboard_morphology(&mut self) {
        self.fill_two_phase(|c| (c.x + c.y + c.z) % 2 == 0);
    }

    fn fill_two_phase(&mut self, is_primary: impl Fn(Coords) -> bool) {
        self.phases.register(Label::PRIMARY);
        self.phases.register(Label::SECONDARY);
        for i in 0..self.lattice.n_sites {
            let label = if is_primary(self.lattice.coords(i)) {
                Label::PRIMARY
            } else {
                Label::SECONDARY
            };
            self.lattice.set_label(i, label);
        }
        self.phases.recount(&self.lattice);
    }

    /// Mix minority sites into the majority phase near the interface so the
    /// interfacial region reaches concentration `interfacial_conc` of
    /// `PRIMARY` over a band of `interfacial_width`.
    ///
    /// The majority reservoir holds majority sites within
    /// `(1 - minority_conc) * width` of the interface. The minority reservoir
    /// starts at distance 1 and widens until it holds enough sites; sites
    /// are then exchanged pairwise at random, each used at most once.
    pub fn execute_mixing(&mut self, interfacial_width: f64, interfacial_conc: f64) -> Result<()> {
        if !(interfacial_width > 0.0) || !(0.0..=1.0).contains(&interfacial_conc) {
            return Err(MorphologyError::Configuration(format!(
                "mixing needs a positive width and a concentration in [0, 1], got {interfacial_width} and {interfacial_conc}"
            )));
        }
        let (majority, minority, minority_conc) = if interfacial_conc <= 0.5 {
            (Label::SECONDARY, Label::PRIMARY, interfacial_conc)
        } else {
            (Label::PRIMARY, Label::SECONDARY, 1.0 - interfacial_conc)
        };

        let lattice = &self.lattice;
        let reservoir = |label: Label, range: f64| -> Vec<usize> {
            (0..lattice.n_sites)
                .filter(|&i| {
                    lattice.label(i) == label && is_near_interface(lattice, lattice.coords(i), range)
                })
                .collect()
        };

        let mut sites_maj = reservoir(majority, (1.0 - minority_conc) * interfacial_width);
        let site_count = sites_maj.len();
        let target = (site_count as f64 * minority_conc / (1.0 - minority_conc)) as usize;
        let n_minority = lattice.labels().iter().filter(|&&l| l == minority).count();
        // the reservoir cannot outgrow the phase
        let target = target.min(n_minority);

        let max_range = lattice.shape.iter().copied().max().unwrap_or(0) as f64;
        let mut range = 1.0;
        let mut sites_min = reservoir(minority, range);
        while sites_min.len() < target && range <= max_range {
            range += MIXING_RANGE_STEP;
            sites_min = reservoir(minority, range);
        }

        let n_swaps = (site_count as f64 * minority_conc).ceil() as usize;
        let mut swapped = 0;
        for _ in 0..n_swaps {
            if sites_maj.is_empty() || sites_min.is_empty() {
                warn!(
                    "{}: mixing ran out of reservoir sites after {swapped} of {n_swaps} swaps",
                    self.id
                );
                break;
            }
            let i_maj = self.rng.gen_range(0..sites_maj.len());
            let i_min = self.rng.gen_range(0..sites_min.len());
            let site_maj = sites_maj.swap_remove(i_maj);
            let site_min = sites_min.swap_remove(i_min);
            self.lattice.set_label(site_maj, minority);
            self.lattice.set_label(site_min, majority);
            swapped += 1;
        }
        self.phases.recount(&self.lattice);
        info!(
            "{}: mixed {swapped} site pairs into an interfacial band of width {interfacial_width}",
            self.id
        );
        Ok(())
    }

    /// Flip `PRIMARY`/`SECONDARY` sites whose neighborhood is more than
    /// `threshold` dissimilar, until a full pass flips nothing.
    ///
    /// The neighborhood grows with `rescale_factor` so that smoothing after a
    /// stretch acts on the stretched feature size.
    pub fn execute_smoothing(&mut self, threshold: f64, rescale_factor: usize) -> Result<()> {
        if rescale_factor == 0 {
            return Err(MorphologyError::Configuration(
                "smoothing rescale factor must be >= 1".to_string(),
            ));
        }
        // below one half a flipped site can flip straight back
        if !(0.5..=1.0).contains(&threshold) {
            return Err(MorphologyError::Configuration(format!(
                "smoothing threshold must be in [0.5, 1], got {threshold}"
            )));
        }
        let neighborhood = smoothing_neighborhood(rescale_factor);
        let mut consider = vec![true; self.lattice.n_sites];
        let mut passes = 0;
        loop {
            let mut flipped = 0;
            for i in 0..self.lattice.n_sites {
                if !consider[i] {
                    continue;
                }
                let c = self.lattice.coords(i);
                let partner = match self.lattice.label(i).partner() {
                    Some(p) if dissimilar_fraction(&self.lattice, c, &neighborhood) > threshold => p,
                    _ => {
                        consider[i] = false;
                        continue;
                    }
                };
                self.lattice.set_label(i, partner);
                flipped += 1;
                for &(dx, dy, dz) in &neighborhood {
                    if let Some(j) = self.lattice.neighbor_index(c, dx, dy, dz) {
                        consider[j] = true;
                    }
                }
            }
            passes += 1;
            if flipped == 0 {
                break;
            }
        }
        self.phases.recount(&self.lattice);
        info!("{}: smoothing converged after {passes} passes", self.id);
        Ok(())
    }

    /// Coarsen every `k x k x k` block into one site by majority vote of
    /// `PRIMARY`; exact ties alternate between `PRIMARY` and `SECONDARY`.
    pub fn shrink_lattice(&mut self, rescale_factor: usize) -> Result<()> {
        let k = rescale_factor;
        if k == 0 {
            return Err(MorphologyError::Configuration(
                "cannot shrink by a rescale factor of zero".to_string(),
            ));
        }
        if self.lattice.shape.iter().any(|&d| d % k != 0) {
            return Err(MorphologyError::Configuration(format!(
                "lattice dimensions {:?} are not divisible by {k}",
                self.lattice.shape
            )));
        }
        let [l, w, h] = self.lattice.shape.map(|d| d / k);
        let mut small = Lattice::new(l, w, h, self.lattice.periodic);
        let block = k * k * k;
        let mut alternate = true;
        for x in 0..l {
            for y in 0..w {
                for z in 0..h {
                    let mut primary = 0;
                    for i in k * x..k * x + k {
                        for j in k * y..k * y + k {
                            for m in k * z..k * z + k {
                                if self.lattice.label(self.lattice.index_xyz(i, j, m)) == Label::PRIMARY {
                                    primary += 1;
                                }
                            }
                        }
                    }
                    let label = if 2 * primary > block {
                        Label::PRIMARY
                    } else if 2 * primary < block {
                        Label::SECONDARY
                    } else {
                        let tie = if alternate { Label::PRIMARY } else { Label::SECONDARY };
                        alternate = !alternate;
                        tie
                    };
                    let idx = small.index_xyz(x, y, z);
                    small.set_label(idx, label);
                }
            }
        }
        self.replace_lattice(small);
        Ok(())
    }

    /// Replace every site by a `k x k x k` block of its label.
    pub fn stretch_lattice(&mut self, rescale_factor: usize) -> Result<()> {
        let k = rescale_factor;
        if k == 0 {
            return Err(MorphologyError::Configuration(
                "cannot stretch by a rescale factor of zero".to_string(),
            ));
        }
        let [l, w, h] = self.lattice.shape.map(|d| d * k);
        let mut big = Lattice::new(l, w, h, self.lattice.periodic);
        for i in 0..big.n_sites {
            let c = big.coords(i);
            let src = self.lattice.index_xyz(c.x as usize / k, c.y as usize / k, c.z as usize / k);
            big.set_label(i, self.lattice.label(src));
        }
        self.replace_lattice(big);
        Ok(())
    }

    fn replace_lattice(&mut self, lattice: Lattice) {
        self.params.length = lattice.shape[0];
        self.params.width = lattice.shape[1];
        self.params.height = lattice.shape[2];
        self.lattice = lattice;
        self.phases.recount(&self.lattice);
        info!(
            "{}: lattice rescaled to {}x{}x{}",
            self.id, self.params.length, self.params.width, self.params.height
        );
    }
}
