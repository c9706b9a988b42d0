use super::node::PathNode;
use crate::geometry::Lattice;
use crate::phases::Label;

/// A queued site and its current path estimate.
#[derive(Debug, Clone, Copy)]
struct FrontierEntry {
    site: usize,
    distance: f32,
}

/// Dijkstra without a global node table.
///
/// Only the frontier is held: a plain vector scanned linearly for its
/// minimum, with queued neighbors found by linear search. Edges are built
/// when a site is settled and dropped right after. Same result as
/// [`super::indexed::shortest_paths`].
pub fn shortest_paths(lattice: &Lattice, label: Label, seeds: &[usize]) -> Vec<Option<f32>> {
    let mut path: Vec<Option<f32>> = vec![None; lattice.n_sites];
    let mut queued = vec![false; lattice.n_sites];
    let mut frontier: Vec<FrontierEntry> = Vec::new();
    for &seed in seeds {
        if lattice.label(seed) == label && !queued[seed] {
            queued[seed] = true;
            frontier.push(FrontierEntry {
                site: seed,
                distance: 1.0,
            });
        }
    }

    while let Some(pos) = frontier
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance))
        .map(|(pos, _)| pos)
    {
        let FrontierEntry { site, distance } = frontier.swap_remove(pos);
        path[site] = Some(distance);
        let node = PathNode::build(lattice, site);
        for edge in &node.edges {
            let nb = edge.site as usize;
            if path[nb].is_some() {
                continue;
            }
            let candidate = distance + edge.length;
            if queued[nb] {
                if let Some(entry) = frontier.iter_mut().find(|e| e.site == nb) {
                    if candidate < entry.distance {
                        entry.distance = candidate;
                    }
                }
            } else {
                queued[nb] = true;
                frontier.push(FrontierEntry {
                    site: nb,
                    distance: candidate,
                });
            }
        }
    }
    path
}
