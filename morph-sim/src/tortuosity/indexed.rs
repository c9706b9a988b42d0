use std::collections::BTreeSet;

use ordered_float::OrderedFloat;

use super::node::PathNode;
use crate::geometry::Lattice;
use crate::phases::Label;

/// Dijkstra over a path graph built up front for every `label` site.
///
/// The queue is an ordered set of `(distance, node)` pairs; lowering a
/// node's estimate removes its old entry and inserts the new one. Returns
/// the path length of every site, `None` for sites of other labels or not
/// reachable from `seeds`.
pub fn shortest_paths(lattice: &Lattice, label: Label, seeds: &[usize]) -> Vec<Option<f32>> {
    let mut node_of: Vec<Option<u32>> = vec![None; lattice.n_sites];
    let mut nodes: Vec<PathNode> = Vec::new();
    for site in 0..lattice.n_sites {
        if lattice.label(site) == label {
            node_of[site] = Some(nodes.len() as u32);
            nodes.push(PathNode::build(lattice, site));
        }
    }

    let mut estimate: Vec<Option<f32>> = vec![None; nodes.len()];
    let mut done = vec![false; nodes.len()];
    let mut queue: BTreeSet<(OrderedFloat<f32>, u32)> = BTreeSet::new();
    for &seed in seeds {
        if let Some(id) = node_of[seed] {
            estimate[id as usize] = Some(1.0);
            queue.insert((OrderedFloat(1.0), id));
        }
    }

    while let Some((OrderedFloat(d), id)) = queue.pop_first() {
        done[id as usize] = true;
        for edge in &nodes[id as usize].edges {
            let Some(nb) = node_of[edge.site as usize] else {
                continue;
            };
            if done[nb as usize] {
                continue;
            }
            let candidate = d + edge.length;
            match estimate[nb as usize] {
                Some(old) if old <= candidate => continue,
                Some(old) => {
                    queue.remove(&(OrderedFloat(old), nb));
                }
                None => {}
            }
            estimate[nb as usize] = Some(candidate);
            queue.insert((OrderedFloat(candidate), nb));
        }
    }

    let mut path = vec![None; lattice.n_sites];
    for (node, d) in nodes.iter().zip(estimate) {
        path[node.site as usize] = d;
    }
    path
}
