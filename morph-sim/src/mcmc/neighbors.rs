use crate::geometry::offsets::{FIRST_SHELL, SECOND_SHELL, THIRD_SHELL};
use crate::geometry::{moore, Lattice, Shell};

/// Number of neighbors sharing a site's label, per shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeighborCounts {
    pub sum1: u8,
    pub sum2: u8,
    pub sum3: u8,
}

impl NeighborCounts {
    #[inline]
    pub fn get(&self, shell: Shell) -> u8 {
        match shell {
            Shell::First => self.sum1,
            Shell::Second => self.sum2,
            Shell::Third => self.sum3,
        }
    }

    #[inline]
    fn get_mut(&mut self, shell: Shell) -> &mut u8 {
        match shell {
            Shell::First => &mut self.sum1,
            Shell::Second => &mut self.sum2,
            Shell::Third => &mut self.sum3,
        }
    }
}

/// Static neighborhood of one site: neighbor indices per shell, `None` where
/// the offset crosses a hard boundary, plus the number of slots present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborInfo {
    pub first: [Option<u32>; FIRST_SHELL],
    pub second: [Option<u32>; SECOND_SHELL],
    pub third: [Option<u32>; THIRD_SHELL],
    pub totals: NeighborCounts,
}

impl NeighborInfo {
    fn empty() -> Self {
        Self {
            first: [None; FIRST_SHELL],
            second: [None; SECOND_SHELL],
            third: [None; THIRD_SHELL],
            totals: NeighborCounts::default(),
        }
    }

    #[inline]
    pub fn slots(&self, shell: Shell) -> &[Option<u32>] {
        match shell {
            Shell::First => &self.first,
            Shell::Second => &self.second,
            Shell::Third => &self.third,
        }
    }

    /// Present neighbors in `shell`. A site reached through two slots (a
    /// periodic axis of extent 2) is yielded twice.
    #[inline]
    pub fn neighbors(&self, shell: Shell) -> impl Iterator<Item = usize> + '_ {
        self.slots(shell).iter().flatten().map(|&j| j as usize)
    }

    /// Number of slots in `shell` that point at `site`.
    #[inline]
    fn slots_to(&self, shell: Shell, site: usize) -> u8 {
        self.neighbors(shell).filter(|&j| j == site).count() as u8
    }
}

/// Incrementally maintained like-neighbor counts for every site.
///
/// Valid only for the labeling it was built from plus the swaps committed
/// through it; rebuilt at the start of every Monte Carlo run.
#[derive(Debug, Clone)]
pub struct NeighborBookkeeping {
    info: Vec<NeighborInfo>,
    counts: Vec<NeighborCounts>,
}

impl NeighborBookkeeping {
    /// Scan every site once and record its neighborhood and like counts.
    pub fn build(lattice: &Lattice) -> Self {
        let offsets: Vec<(i32, i32, i32, Shell)> = moore()
            .into_iter()
            .filter_map(|(i, j, k)| Shell::of(i, j, k).map(|s| (i, j, k, s)))
            .collect();

        let mut info = Vec::with_capacity(lattice.n_sites);
        let mut counts = Vec::with_capacity(lattice.n_sites);
        for site in 0..lattice.n_sites {
            let c = lattice.coords(site);
            let mut ni = NeighborInfo::empty();
            let mut cursor = [0usize; 3];
            for &(dx, dy, dz, shell) in &offsets {
                let slot = cursor[shell.index()];
                cursor[shell.index()] += 1;
                let Some(j) = lattice.neighbor_index(c, dx, dy, dz) else {
                    continue;
                };
                match shell {
                    Shell::First => ni.first[slot] = Some(j as u32),
                    Shell::Second => ni.second[slot] = Some(j as u32),
                    Shell::Third => ni.third[slot] = Some(j as u32),
                }
                *ni.totals.get_mut(shell) += 1;
            }
            counts.push(count_like(lattice, &ni, site));
            info.push(ni);
        }
        Self { info, counts }
    }

    #[inline]
    pub fn info(&self, site: usize) -> &NeighborInfo {
        &self.info[site]
    }

    #[inline]
    pub fn counts(&self, site: usize) -> NeighborCounts {
        self.counts[site]
    }

    /// Like counts `a` and `b` would have after exchanging their labels.
    ///
    /// Requires a two-label lattice and `a`, `b` of different labels: every
    /// present slot of `a` other than those pointing at `b` then holds either
    /// `a`'s current label or the label `a` is about to receive.
    pub fn propose_swap(&self, a: usize, b: usize) -> (NeighborCounts, NeighborCounts) {
        (self.complement(a, b), self.complement(b, a))
    }

    fn complement(&self, site: usize, partner: usize) -> NeighborCounts {
        let ni = &self.info[site];
        let pre = self.counts[site];
        let mut post = NeighborCounts::default();
        for shell in Shell::ALL {
            *post.get_mut(shell) =
                ni.totals.get(shell) - pre.get(shell) - ni.slots_to(shell, partner);
        }
        post
    }

    /// Apply a swap of `a` and `b` that has already been made on `lattice`.
    ///
    /// `post` is the pair returned by [`propose_swap`](Self::propose_swap)
    /// for the same sites. Every neighbor of either site gains one like
    /// neighbor per slot if it matches the new label and loses one if it
    /// matched the old label.
    pub fn commit_swap(
        &mut self,
        lattice: &Lattice,
        a: usize,
        b: usize,
        post: (NeighborCounts, NeighborCounts),
    ) {
        self.counts[a] = post.0;
        self.counts[b] = post.1;
        self.propagate(lattice, a, b);
        self.propagate(lattice, b, a);
    }

    fn propagate(&mut self, lattice: &Lattice, site: usize, partner: usize) {
        let new_label = lattice.label(site);
        let old_label = lattice.label(partner);
        let ni = self.info[site];
        for shell in Shell::ALL {
            for j in ni.neighbors(shell) {
                if j == partner {
                    continue;
                }
                let lj = lattice.label(j);
                let count = self.counts[j].get_mut(shell);
                if lj == new_label {
                    *count += 1;
                } else if lj == old_label {
                    *count -= 1;
                }
            }
        }
    }

    /// Full recount of like neighbors at `site`.
    pub fn recompute(&self, lattice: &Lattice, site: usize) -> NeighborCounts {
        count_like(lattice, &self.info[site], site)
    }

    /// Whether every cached count equals a from-scratch recount.
    pub fn verify(&self, lattice: &Lattice) -> bool {
        (0..lattice.n_sites).all(|i| self.counts[i] == self.recompute(lattice, i))
    }
}

fn count_like(lattice: &Lattice, ni: &NeighborInfo, site: usize) -> NeighborCounts {
    let label = lattice.label(site);
    let mut counts = NeighborCounts::default();
    for shell in Shell::ALL {
        *counts.get_mut(shell) = ni.neighbors(shell).filter(|&j| lattice.label(j) == label).count() as u8;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coords;
    use crate::phases::Label;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;

    fn random_lattice(shape: [usize; 3], periodic: [bool; 3], seed: u64) -> Lattice {
        let mut lat = Lattice::new(shape[0], shape[1], shape[2], periodic);
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        for i in 0..lat.n_sites {
            let label = if rng.gen::<bool>() { Label::PRIMARY } else { Label::SECONDARY };
            lat.set_label(i, label);
        }
        lat
    }

    #[test]
    fn test_boundary_totals() {
        let lat = random_lattice([4, 4, 4], [true, true, false], 1);
        let book = NeighborBookkeeping::build(&lat);

        let interior = book.info(lat.index(Coords::new(1, 1, 1))).totals;
        assert_eq!((interior.sum1, interior.sum2, interior.sum3), (6, 12, 8));

        let bottom = book.info(lat.index(Coords::new(1, 1, 0))).totals;
        assert_eq!((bottom.sum1, bottom.sum2, bottom.sum3), (5, 8, 4));
        assert_eq!(book.info(lat.index(Coords::new(1, 1, 0))).first.iter().filter(|s| s.is_none()).count(), 1);

        let corner = Lattice::new(3, 3, 3, [false; 3]);
        let book = NeighborBookkeeping::build(&corner);
        let t = book.info(0).totals;
        assert_eq!((t.sum1, t.sum2, t.sum3), (3, 3, 1));
    }

    #[test]
    fn test_build_matches_recount() {
        let lat = random_lattice([5, 4, 3], [true, false, false], 2);
        let book = NeighborBookkeeping::build(&lat);
        assert!(book.verify(&lat));
    }

    #[test]
    fn test_propose_matches_recount_after_swap() {
        let mut lat = random_lattice([6, 6, 6], [true, true, false], 3);
        let book = NeighborBookkeeping::build(&lat);
        let mut checked = 0;
        for a in 0..lat.n_sites {
            for b in book.info(a).neighbors(Shell::First) {
                if lat.label(a) == lat.label(b) {
                    continue;
                }
                let (pa, pb) = book.propose_swap(a, b);
                lat.swap_labels(a, b);
                assert_eq!(pa, book.recompute(&lat, a));
                assert_eq!(pb, book.recompute(&lat, b));
                lat.swap_labels(a, b);
                checked += 1;
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn test_commits_keep_counts_exact() {
        for (shape, periodic) in [
            ([7, 6, 5], [true, true, false]),
            ([2, 3, 4], [true, true, true]),
            ([4, 4, 4], [false, false, false]),
        ] {
            let mut lat = random_lattice(shape, periodic, 4);
            let mut book = NeighborBookkeeping::build(&lat);
            let mut rng = Xoshiro256StarStar::seed_from_u64(9);
            for _ in 0..2000 {
                let a = rng.gen_range(0..lat.n_sites);
                let candidates: Vec<usize> = book
                    .info(a)
                    .neighbors(Shell::First)
                    .filter(|&j| lat.label(j) != lat.label(a))
                    .collect();
                if candidates.is_empty() {
                    continue;
                }
                let b = candidates[rng.gen_range(0..candidates.len())];
                let post = book.propose_swap(a, b);
                lat.swap_labels(a, b);
                book.commit_swap(&lat, a, b, post);
            }
            assert!(book.verify(&lat), "drift on shape {shape:?}");
        }
    }
}
