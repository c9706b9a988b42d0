use crate::geometry::{moore, Lattice, Shell};
use crate::phases::Label;

/// Like-labeled neighbor of a path node with the length of the step to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub site: u32,
    pub length: f32,
}

/// A site of the path graph and its outgoing edges.
///
/// Edges join the site to its like-labeled 26-neighbors. The `x` and `y`
/// axes wrap when periodic; `z` never does, so no path leaves through one
/// face and re-enters through the other.
#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    pub site: u32,
    pub edges: Vec<Edge>,
}

impl PathNode {
    pub fn build(lattice: &Lattice, site: usize) -> Self {
        let c = lattice.coords(site);
        let label = lattice.label(site);
        let height = lattice.height() as i32;
        let mut edges = Vec::new();
        for (dx, dy, dz) in moore() {
            if !(0..height).contains(&(c.z + dz)) {
                continue;
            }
            let Some(dest) = lattice.neighbor_index(c, dx, dy, dz) else {
                continue;
            };
            if lattice.label(dest) != label {
                continue;
            }
            if let Some(shell) = Shell::of(dx, dy, dz) {
                edges.push(Edge {
                    site: dest as u32,
                    length: shell.distance(),
                });
            }
        }
        Self {
            site: site as u32,
            edges,
        }
    }
}

/// Plane a label's paths start from, and the plane they are measured at.
pub(crate) fn faces(height: usize, label: Label) -> Option<(usize, usize)> {
    let top = height - 1;
    match label {
        Label::PRIMARY => Some((0, top)),
        Label::SECONDARY => Some((top, 0)),
        _ => None,
    }
}
