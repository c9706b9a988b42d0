use log::info;
use rand::Rng;
use rand_xoshiro::Xoshiro256StarStar;

use super::energy::{acceptance_probability, growth_bias, swap_energy_delta, Interaction};
use super::neighbors::NeighborBookkeeping;
use crate::config::SwapConfig;
use crate::geometry::offsets::FIRST_SHELL;
use crate::geometry::{Lattice, Shell};

/// Outcome of one Ising swapping run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapSummary {
    /// Swap attempts between interfacial sites (redraws excluded).
    pub attempts: u64,
    pub accepted: u64,
}

impl SwapSummary {
    pub fn acceptance_ratio(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempts as f64
        }
    }
}

/// Kawasaki-style label exchange with Glauber acceptance over `n_steps` MC
/// steps of `n_sites` attempts each.
///
/// Only sites with at least one differently labeled face neighbor are
/// considered; other draws are repeated without counting. The lattice must
/// hold exactly two labels, both present.
///
/// `on_step` is called once per completed MC step.
#[cfg_attr(feature = "profile", inline(never))]
pub fn run_swap_loop(
    lattice: &mut Lattice,
    rng: &mut Xoshiro256StarStar,
    config: &SwapConfig,
    third_shell: bool,
    id: usize,
    on_step: &(dyn Fn() + Sync),
) -> SwapSummary {
    let interaction = Interaction {
        energy1: config.interaction_energy1,
        energy2: config.interaction_energy2,
        third_shell,
    };
    let mut book = NeighborBookkeeping::build(lattice);
    let n_sites = lattice.n_sites;
    let mut summary = SwapSummary::default();
    let mut candidates = [0usize; FIRST_SHELL];

    for step in 0..config.n_steps {
        let mut attempts = 0;
        while attempts < n_sites {
            let a = lattice.index(lattice.random_coords(rng));
            let la = lattice.label(a);
            let mut n_candidates = 0;
            for j in book.info(a).neighbors(Shell::First) {
                if lattice.label(j) != la {
                    candidates[n_candidates] = j;
                    n_candidates += 1;
                }
            }
            if n_candidates == 0 {
                continue;
            }
            let b = candidates[rng.gen_range(0..n_candidates)];

            let (post_a, post_b) = book.propose_swap(a, b);
            let mut energy_delta = swap_energy_delta(
                la,
                book.counts(a),
                book.counts(b),
                post_a,
                post_b,
                &interaction,
            );
            if let Some(ref growth) = config.growth {
                energy_delta += growth_bias(lattice, a, b, growth);
            }

            attempts += 1;
            if rng.gen::<f64>() <= acceptance_probability(energy_delta) {
                lattice.swap_labels(a, b);
                book.commit_swap(lattice, a, b, (post_a, post_b));
                summary.accepted += 1;
            }
        }
        summary.attempts += attempts as u64;
        on_step();
        if (step + 1) % 100 == 0 {
            info!("{id}: Ising swapping {} of {} MC steps complete", step + 1, config.n_steps);
        }
    }

    debug_assert!(book.verify(lattice), "neighbor counts drifted from the lattice");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GrowthPreference;
    use crate::geometry::Axis;
    use crate::phases::Label;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn half_and_half(shape: [usize; 3], periodic: [bool; 3], seed: u64) -> Lattice {
        let mut lat = Lattice::new(shape[0], shape[1], shape[2], periodic);
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        for i in 0..lat.n_sites {
            let label = if rng.gen::<bool>() { Label::PRIMARY } else { Label::SECONDARY };
            lat.set_label(i, label);
        }
        lat
    }

    fn count(lat: &Lattice, label: Label) -> usize {
        lat.labels().iter().filter(|&&l| l == label).count()
    }

    #[test]
    fn test_swaps_conserve_composition() {
        let mut lat = half_and_half([8, 8, 8], [true, true, false], 1);
        let primary = count(&lat, Label::PRIMARY);
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        let steps = AtomicUsize::new(0);
        let config = SwapConfig {
            n_steps: 5,
            interaction_energy1: 0.6,
            interaction_energy2: 0.6,
            growth: None,
        };
        let summary = run_swap_loop(&mut lat, &mut rng, &config, false, 0, &|| {
            steps.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(steps.load(Ordering::Relaxed), 5);
        assert_eq!(summary.attempts, 5 * 512);
        assert!(summary.accepted > 0);
        assert_eq!(count(&lat, Label::PRIMARY), primary);
        assert_eq!(count(&lat, Label::SECONDARY), 512 - primary);
    }

    #[test]
    fn test_zero_energy_accepts_half() {
        let mut lat = half_and_half([16, 16, 16], [true; 3], 3);
        let mut rng = Xoshiro256StarStar::seed_from_u64(4);
        let config = SwapConfig {
            n_steps: 4,
            interaction_energy1: 0.0,
            interaction_energy2: 0.0,
            growth: None,
        };
        let summary = run_swap_loop(&mut lat, &mut rng, &config, false, 0, &|| {});
        let ratio = summary.acceptance_ratio();
        assert!((ratio - 0.5).abs() < 0.02, "acceptance ratio {ratio}");
    }

    #[test]
    fn test_phase_separation_grows_like_contacts() {
        let mut lat = half_and_half([12, 12, 12], [true; 3], 5);
        let unlike_contacts = |lat: &Lattice| {
            (0..lat.n_sites)
                .filter(|&i| {
                    let c = lat.coords(i);
                    lat.label(i) != lat.label_at(lat.destination(c, 1, 0, 0))
                })
                .count()
        };
        let before = unlike_contacts(&lat);
        let mut rng = Xoshiro256StarStar::seed_from_u64(6);
        let config = SwapConfig {
            n_steps: 20,
            interaction_energy1: 1.0,
            interaction_energy2: 1.0,
            growth: None,
        };
        run_swap_loop(&mut lat, &mut rng, &config, true, 0, &|| {});
        assert!(unlike_contacts(&lat) < before * 2 / 3);
    }

    #[test]
    fn test_growth_bias_aligns_domains() {
        let mut lat = half_and_half([10, 10, 10], [true; 3], 7);
        let mut rng = Xoshiro256StarStar::seed_from_u64(8);
        let config = SwapConfig {
            n_steps: 10,
            interaction_energy1: 0.0,
            interaction_energy2: 0.0,
            growth: Some(GrowthPreference {
                axis: Axis::Z,
                strength: 2.0,
            }),
        };
        // debug builds also check the bookkeeping against a full recount here
        run_swap_loop(&mut lat, &mut rng, &config, false, 0, &|| {});
        let unlike_along = |axis: Axis| {
            let (dx, dy, dz) = axis.offset(1);
            (0..lat.n_sites)
                .filter(|&i| lat.label(i) != lat.label_at(lat.destination(lat.coords(i), dx, dy, dz)))
                .count()
        };
        assert!(unlike_along(Axis::Z) < unlike_along(Axis::X));
        assert!(unlike_along(Axis::Z) < unlike_along(Axis::Y));
    }
}
