use super::neighbors::NeighborCounts;
use crate::config::GrowthPreference;
use crate::geometry::offsets::SQRT_3;
use crate::geometry::{Axis, Lattice};
use crate::phases::Label;

/// Interaction settings the swap energy depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    /// Energy coefficient of `PRIMARY` sites.
    pub energy1: f64,
    /// Energy coefficient of the other phase.
    pub energy2: f64,
    pub third_shell: bool,
}

/// Weighted loss of like neighbors for one particle moving from `before`
/// to `after`.
#[inline]
fn like_loss(before: NeighborCounts, after: NeighborCounts, third_shell: bool) -> f64 {
    let d1 = after.sum1 as f64 - before.sum1 as f64;
    let d2 = after.sum2 as f64 - before.sum2 as f64;
    let mut loss = -d1 - d2 / std::f64::consts::SQRT_2;
    if third_shell {
        let d3 = after.sum3 as f64 - before.sum3 as f64;
        loss -= d3 / SQRT_3 as f64;
    }
    loss
}

/// Energy change of exchanging the labels of sites `a` and `b`.
///
/// `pre_*` are the current like counts and `post_*` the counts each site
/// would have after the exchange. The particle at `a` ends up with `b`'s
/// post-swap neighborhood and vice versa.
pub fn swap_energy_delta(
    label_a: Label,
    pre_a: NeighborCounts,
    pre_b: NeighborCounts,
    post_a: NeighborCounts,
    post_b: NeighborCounts,
    interaction: &Interaction,
) -> f64 {
    let loss_a = like_loss(pre_a, post_b, interaction.third_shell);
    let loss_b = like_loss(pre_b, post_a, interaction.third_shell);
    if label_a == Label::PRIMARY {
        interaction.energy1 * loss_a + interaction.energy2 * loss_b
    } else {
        interaction.energy2 * loss_a + interaction.energy1 * loss_b
    }
}

/// Neighbors of `site` along `axis` (both directions) that would carry
/// `label` once `a` and `b` have exchanged labels.
fn axis_like_count(
    lattice: &Lattice,
    site: usize,
    label: Label,
    axis: Axis,
    swap: Option<(usize, usize)>,
) -> i32 {
    let c = lattice.coords(site);
    let mut count = 0;
    for step in [-1, 1] {
        let (dx, dy, dz) = axis.offset(step);
        let Some(j) = lattice.neighbor_index(c, dx, dy, dz) else {
            continue;
        };
        let lj = match swap {
            Some((a, b)) if j == a => lattice.label(b),
            Some((a, b)) if j == b => lattice.label(a),
            _ => lattice.label(j),
        };
        if lj == label {
            count += 1;
        }
    }
    count
}

/// Directional growth correction for exchanging `a` and `b`: lowers the
/// energy by `strength` for every like neighbor gained along the axis.
pub fn growth_bias(lattice: &Lattice, a: usize, b: usize, growth: &GrowthPreference) -> f64 {
    let la = lattice.label(a);
    let lb = lattice.label(b);
    let c1i = axis_like_count(lattice, a, la, growth.axis, None);
    let c2i = axis_like_count(lattice, b, lb, growth.axis, None);
    let c1f = axis_like_count(lattice, b, la, growth.axis, Some((a, b)));
    let c2f = axis_like_count(lattice, a, lb, growth.axis, Some((a, b)));
    -growth.strength * f64::from((c1f - c1i) + (c2f - c2i))
}

/// Glauber acceptance probability `e^{-dE} / (1 + e^{-dE})`.
#[inline]
pub fn acceptance_probability(energy_delta: f64) -> f64 {
    1.0 / (1.0 + energy_delta.exp())
}
