pub mod generators;

use std::time::{SystemTime, UNIX_EPOCH};

use log::info;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use validator::Validate;

use crate::config::{Parameters, SwapConfig};
use crate::error::{MorphologyError, Result};
use crate::geometry::Lattice;
use crate::mcmc::{self, SwapSummary};
use crate::phases::{Label, Phase, PhaseRegistry};

/// Combine a clock reading with a run id into an RNG seed.
///
/// Multiplication by an odd constant is a bijection on `u64`, so two ids
/// never collide for the same clock reading.
pub fn mix_seed(time_secs: u64, id: usize) -> u64 {
    time_secs ^ (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// [`mix_seed`] of the current wall-clock second.
pub(crate) fn clock_seed(id: usize) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    mix_seed(now, id)
}

/// One lattice morphology together with its phase records and RNG stream.
///
/// Owns everything it mutates, so independent morphologies can be processed
/// on separate threads with only [`Parameters`] shared.
#[derive(Debug, Clone)]
pub struct Morphology {
    pub(crate) id: usize,
    pub(crate) params: Parameters,
    pub(crate) lattice: Lattice,
    pub(crate) phases: PhaseRegistry,
    pub(crate) rng: Xoshiro256StarStar,
    /// Interfacial volume fraction of each `z` plane.
    pub(crate) depth_iv_fraction: Vec<f64>,
}

impl Morphology {
    /// Empty morphology (every site unassigned) seeded from the wall clock.
    pub fn new(params: Parameters, id: usize) -> Result<Self> {
        Self::with_seed(params, id, clock_seed(id))
    }

    pub fn with_seed(params: Parameters, id: usize, seed: u64) -> Result<Self> {
        params.validate()?;
        let lattice = Lattice::new(params.length, params.width, params.height, params.periodic());
        Ok(Self {
            id,
            params,
            lattice,
            phases: PhaseRegistry::new(),
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            depth_iv_fraction: Vec::new(),
        })
    }

    /// Wrap an existing lattice. Its dimensions and periodicity must agree
    /// with `params`.
    pub fn from_lattice(lattice: Lattice, params: Parameters, id: usize, seed: u64) -> Result<Self> {
        params.validate()?;
        if lattice.shape != [params.length, params.width, params.height]
            || lattice.periodic != params.periodic()
        {
            return Err(MorphologyError::Configuration(format!(
                "lattice {:?} (periodic {:?}) does not match parameters {}x{}x{} (periodic {:?})",
                lattice.shape,
                lattice.periodic,
                params.length,
                params.width,
                params.height,
                params.periodic()
            )));
        }
        let mut phases = PhaseRegistry::new();
        phases.recount(&lattice);
        Ok(Self {
            id,
            params,
            lattice,
            phases,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            depth_iv_fraction: Vec::new(),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn phases(&self) -> &PhaseRegistry {
        &self.phases
    }

    pub fn labels(&self) -> Vec<Label> {
        self.phases.labels()
    }

    pub fn length(&self) -> usize {
        self.lattice.length()
    }

    pub fn width(&self) -> usize {
        self.lattice.width()
    }

    pub fn height(&self) -> usize {
        self.lattice.height()
    }

    pub fn phase(&self, label: Label) -> Result<&Phase> {
        self.phases.get(label)
    }

    pub fn mix_fraction(&self, label: Label) -> Result<f64> {
        Ok(self.phases.get(label)?.mix_fraction)
    }

    pub fn domain_size(&self, label: Label) -> Result<Option<f64>> {
        Ok(self.phases.get(label)?.domain_size)
    }

    pub fn domain_anisotropy(&self, label: Label) -> Result<Option<f64>> {
        Ok(self.phases.get(label)?.anisotropy)
    }

    pub fn correlation_data(&self, label: Label) -> Result<&[f64]> {
        Ok(&self.phases.get(label)?.correlation)
    }

    pub fn interfacial_histogram(&self, label: Label) -> Result<&[(f64, usize)]> {
        Ok(&self.phases.get(label)?.interfacial_histogram)
    }

    pub fn depth_composition(&self, label: Label) -> Result<&[f64]> {
        Ok(&self.phases.get(label)?.depth_composition)
    }

    pub fn depth_domain_size(&self, label: Label) -> Result<&[Option<f64>]> {
        Ok(&self.phases.get(label)?.depth_domain_size)
    }

    pub fn depth_iv_fraction(&self) -> &[f64] {
        &self.depth_iv_fraction
    }

    /// Tortuosity of every column whose path reached the collection face.
    pub fn tortuosity_data(&self, label: Label) -> Result<Vec<f64>> {
        Ok(self.phases.get(label)?.tortuosity.iter().flatten().copied().collect())
    }

    /// Per-column tortuosity indexed `x * width + y`.
    pub fn tortuosity_map(&self, label: Label) -> Result<&[Option<f64>]> {
        Ok(&self.phases.get(label)?.tortuosity)
    }

    /// Unreachable sites of `label` as a fraction of all sites, once the
    /// tortuosity of `label` has been calculated.
    pub fn island_volume_fraction(&self, label: Label) -> Result<Option<f64>> {
        let n = self.lattice.n_sites as f64;
        Ok(self.phases.get(label)?.island_volume.map(|v| v as f64 / n))
    }

    /// Phase-separate a two-phase morphology by Ising label swapping.
    ///
    /// `on_step` is called once per completed MC step.
    pub fn execute_ising_swapping(
        &mut self,
        config: &SwapConfig,
        on_step: &(dyn Fn() + Sync),
    ) -> Result<SwapSummary> {
        config.validate()?;
        let populated: Vec<u8> = self.phases.iter().filter(|p| p.count > 0).map(|p| p.label.id()).collect();
        if populated.len() != 2 {
            return Err(MorphologyError::Configuration(format!(
                "Ising swapping needs exactly two populated phases, found labels {populated:?}"
            )));
        }
        info!("{}: executing {} MC steps of Ising swapping", self.id, config.n_steps);
        let summary = mcmc::run_swap_loop(
            &mut self.lattice,
            &mut self.rng,
            config,
            self.params.enable_third_neighbor_interaction,
            self.id,
            on_step,
        );
        self.phases.recount(&self.lattice);
        info!(
            "{}: Ising swapping finished, {} of {} swaps accepted",
            self.id, summary.accepted, summary.attempts
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(params: Parameters) -> Morphology {
        let mut morph = Morphology::with_seed(params, 0, 11).unwrap();
        morph.create_checkerboard_morphology();
        morph
    }

    #[test]
    fn test_mix_seed_distinct_ids() {
        let t = 1_700_000_000;
        let seeds: std::collections::HashSet<u64> = (0..1000).map(|id| mix_seed(t, id)).collect();
        assert_eq!(seeds.len(), 1000);
        assert_eq!(mix_seed(t, 0), t);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let params = Parameters::new(10, 0, 10);
        assert!(matches!(
            Morphology::with_seed(params, 0, 1),
            Err(MorphologyError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_lattice_mismatch() {
        let params = Parameters::new(4, 4, 4);
        let lattice = Lattice::new(4, 4, 5, [true; 3]);
        assert!(matches!(
            Morphology::from_lattice(lattice, params.clone(), 0, 1),
            Err(MorphologyError::Configuration(_))
        ));
        let lattice = Lattice::new(4, 4, 4, [true, true, false]);
        assert!(Morphology::from_lattice(lattice, params, 0, 1).is_err());
    }

    #[test]
    fn test_from_lattice_registers_labels() {
        let params = Parameters::new(2, 2, 2);
        let mut lattice = Lattice::new(2, 2, 2, [true; 3]);
        for i in 0..lattice.n_sites {
            lattice.set_label(i, Label::new(if i % 4 == 0 { 5 } else { 3 }));
        }
        let morph = Morphology::from_lattice(lattice, params, 0, 1).unwrap();
        assert_eq!(morph.labels(), vec![Label::new(5), Label::new(3)]);
        assert_eq!(morph.mix_fraction(Label::new(5)).unwrap(), 0.25);
        assert!(morph.mix_fraction(Label::PRIMARY).is_err());
    }

    #[test]
    fn test_ising_requires_two_phases() {
        let params = Parameters::new(4, 4, 4);
        let mut morph = Morphology::with_seed(params, 0, 1).unwrap();
        morph.create_random_morphology(&[0.2, 0.3, 0.5]).unwrap();
        let config = SwapConfig {
            n_steps: 1,
            interaction_energy1: 0.5,
            interaction_energy2: 0.5,
            growth: None,
        };
        assert!(matches!(
            morph.execute_ising_swapping(&config, &|| {}),
            Err(MorphologyError::Configuration(_))
        ));
    }

    #[test]
    fn test_ising_ignores_emptied_phases() {
        let mut params = Parameters::new(6, 6, 6);
        params.periodic_z = false;
        let mut morph = Morphology::with_seed(params, 0, 5).unwrap();
        morph.create_random_morphology(&[0.2, 0.3, 0.5]).unwrap();
        morph.create_bilayer_morphology();
        assert_eq!(morph.labels().len(), 3);
        assert_eq!(morph.phase(Label::new(3)).unwrap().count, 0);
        let config = SwapConfig {
            n_steps: 2,
            interaction_energy1: 0.5,
            interaction_energy2: 0.5,
            growth: None,
        };
        morph.execute_ising_swapping(&config, &|| {}).unwrap();
        assert_eq!(morph.phase(Label::PRIMARY).unwrap().count, 108);
        assert_eq!(morph.phase(Label::SECONDARY).unwrap().count, 108);
        assert_eq!(morph.phase(Label::new(3)).unwrap().count, 0);
    }

    #[test]
    fn test_ising_keeps_counts() {
        let mut morph = checkerboard(Parameters::new(10, 10, 10));
        let config = SwapConfig {
            n_steps: 3,
            interaction_energy1: 0.4,
            interaction_energy2: 0.6,
            growth: None,
        };
        let summary = morph.execute_ising_swapping(&config, &|| {}).unwrap();
        assert_eq!(summary.attempts, 3000);
        assert_eq!(morph.phase(Label::PRIMARY).unwrap().count, 500);
        assert_eq!(morph.phases().total_count(), 1000);
        assert_eq!(morph.mix_fraction(Label::SECONDARY).unwrap(), 0.5);
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let params = Parameters::new(8, 8, 8);
        let config = SwapConfig {
            n_steps: 2,
            interaction_energy1: 0.4,
            interaction_energy2: 0.4,
            growth: None,
        };
        let run = || {
            let mut morph = Morphology::with_seed(params.clone(), 3, 99).unwrap();
            morph.create_random_morphology(&[0.5, 0.5]).unwrap();
            morph.execute_ising_swapping(&config, &|| {}).unwrap();
            morph.lattice().labels().to_vec()
        };
        assert_eq!(run(), run());
    }
}
