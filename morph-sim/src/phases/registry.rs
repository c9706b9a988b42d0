use super::Label;
use crate::error::{MorphologyError, Result};
use crate::geometry::Lattice;

/// Everything known about one phase of a morphology.
///
/// Descriptors stay `None` (or empty) until the corresponding analysis has
/// run; a descriptor that an analysis could not determine also stays `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub label: Label,
    /// Number of sites carrying `label`.
    pub count: usize,
    /// `count / n_sites`, recomputed by every generator.
    pub mix_fraction: f64,
    pub domain_size: Option<f64>,
    pub anisotropy: Option<f64>,
    /// Sites of this phase that cannot reach their collection face.
    pub island_volume: Option<usize>,
    /// Normalized pair-pair correlation at 0.5 lattice-unit resolution.
    pub correlation: Vec<f64>,
    /// Per-column tortuosity, indexed `x * width + y`.
    pub tortuosity: Vec<Option<f64>>,
    /// `(distance, site count)` pairs at unit bin width.
    pub interfacial_histogram: Vec<(f64, usize)>,
    /// Fraction of each `z` plane holding this phase.
    pub depth_composition: Vec<f64>,
    /// In-plane domain size of each `z` plane.
    pub depth_domain_size: Vec<Option<f64>>,
}

impl Phase {
    fn new(label: Label) -> Self {
        Self {
            label,
            count: 0,
            mix_fraction: 0.0,
            domain_size: None,
            anisotropy: None,
            island_volume: None,
            correlation: Vec::new(),
            tortuosity: Vec::new(),
            interfacial_histogram: Vec::new(),
            depth_composition: Vec::new(),
            depth_domain_size: Vec::new(),
        }
    }
}

/// Ordered set of the phases present in a morphology, in discovery order.
///
/// Grows monotonically; a phase is never removed even if a later generator
/// leaves it with zero sites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseRegistry {
    phases: Vec<Phase>,
}

impl PhaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `label` if unseen. Returns its position either way.
    pub fn register(&mut self, label: Label) -> usize {
        if let Some(pos) = self.position(label) {
            return pos;
        }
        self.phases.push(Phase::new(label));
        self.phases.len() - 1
    }

    #[inline]
    pub fn position(&self, label: Label) -> Option<usize> {
        self.phases.iter().position(|p| p.label == label)
    }

    pub fn index_of(&self, label: Label) -> Result<usize> {
        self.position(label).ok_or(MorphologyError::UnknownLabel(label))
    }

    pub fn get(&self, label: Label) -> Result<&Phase> {
        let idx = self.index_of(label)?;
        Ok(&self.phases[idx])
    }

    pub fn get_mut(&mut self, label: Label) -> Result<&mut Phase> {
        let idx = self.index_of(label)?;
        Ok(&mut self.phases[idx])
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.phases.iter().map(|p| p.label).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Phase> {
        self.phases.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Phase> {
        self.phases.iter_mut()
    }

    pub fn phase(&self, idx: usize) -> &Phase {
        &self.phases[idx]
    }

    pub fn phase_mut(&mut self, idx: usize) -> &mut Phase {
        &mut self.phases[idx]
    }

    /// Recount every phase from the lattice and refresh mix fractions.
    /// Labels met for the first time are registered.
    pub fn recount(&mut self, lattice: &Lattice) {
        for phase in self.phases.iter_mut() {
            phase.count = 0;
        }
        let mut last: Option<(Label, usize)> = None;
        for &label in lattice.labels() {
            let idx = match last {
                Some((l, idx)) if l == label => idx,
                _ => self.register(label),
            };
            self.phases[idx].count += 1;
            last = Some((label, idx));
        }
        let n = lattice.n_sites as f64;
        for phase in self.phases.iter_mut() {
            phase.mix_fraction = phase.count as f64 / n;
        }
    }

    pub fn total_count(&self) -> usize {
        self.phases.iter().map(|p| p.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_keeps_discovery_order() {
        let mut reg = PhaseRegistry::new();
        assert_eq!(reg.register(Label::new(7)), 0);
        assert_eq!(reg.register(Label::new(3)), 1);
        assert_eq!(reg.register(Label::new(7)), 0);
        assert_eq!(reg.labels(), vec![Label::new(7), Label::new(3)]);
    }

    #[test]
    fn test_unknown_label() {
        let reg = PhaseRegistry::new();
        assert!(matches!(
            reg.index_of(Label::PRIMARY),
            Err(MorphologyError::UnknownLabel(l)) if l == Label::PRIMARY
        ));
    }

    #[test]
    fn test_recount() {
        let mut lat = Lattice::new(2, 2, 2, [true; 3]);
        for i in 0..lat.n_sites {
            lat.set_label(i, if i < 3 { Label::SECONDARY } else { Label::PRIMARY });
        }
        let mut reg = PhaseRegistry::new();
        reg.register(Label::PRIMARY);
        reg.recount(&lat);
        assert_eq!(reg.labels(), vec![Label::PRIMARY, Label::SECONDARY]);
        assert_eq!(reg.get(Label::PRIMARY).unwrap().count, 5);
        assert_eq!(reg.get(Label::SECONDARY).unwrap().mix_fraction, 3.0 / 8.0);
        assert_eq!(reg.total_count(), lat.n_sites);
    }
}
