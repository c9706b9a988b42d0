use rayon::prelude::*;

use crate::morphology::Morphology;

/// Run `body` on every morphology, optionally in parallel, and collect the
/// results in input order.
///
/// Morphologies own their lattice and RNG stream, so each task touches only
/// its own morphology. When `sequential` is true (or there is only one
/// morphology) everything runs on the current thread.
pub fn par_over_morphologies<R: Send>(
    morphologies: &mut [Morphology],
    sequential: bool,
    body: impl Fn(&mut Morphology) -> R + Send + Sync,
) -> Vec<R> {
    if sequential || morphologies.len() <= 1 {
        morphologies.iter_mut().map(body).collect()
    } else {
        morphologies.par_iter_mut().map(body).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Parameters, SwapConfig};

    fn batch(n: usize) -> Vec<Morphology> {
        (0..n)
            .map(|id| {
                let mut morph = Morphology::with_seed(Parameters::new(6, 6, 6), id, 100 + id as u64).unwrap();
                morph.create_random_morphology(&[0.5, 0.5]).unwrap();
                morph
            })
            .collect()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let config = SwapConfig {
            n_steps: 2,
            interaction_energy1: 0.5,
            interaction_energy2: 0.5,
            growth: None,
        };
        let run = |sequential: bool| {
            let mut morphs = batch(4);
            let ids = par_over_morphologies(&mut morphs, sequential, |m| {
                m.execute_ising_swapping(&config, &|| {}).unwrap();
                m.id()
            });
            assert_eq!(ids, vec![0, 1, 2, 3]);
            morphs.iter().map(|m| m.lattice().labels().to_vec()).collect::<Vec<_>>()
        };
        assert_eq!(run(true), run(false));
    }
}
