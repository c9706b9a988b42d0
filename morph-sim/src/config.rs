use validator::{Validate, ValidationError};

use crate::geometry::Axis;

/// How a domain size is read off the normalized correlation curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMethod {
    /// First crossing below the mix fraction (zero of the normalized curve),
    /// or the first local minimum if that comes earlier.
    MixFraction,
    /// Twice the distance at which the curve first drops below 1/e.
    OneOverE,
}

impl TryFrom<&str> for CorrelationMethod {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "mix_fraction" => Ok(Self::MixFraction),
            "e" | "one_over_e" => Ok(Self::OneOverE),
            _ => Err(format!(
                "unknown correlation_method '{s}', expected 'mix_fraction' or 'e'"
            )),
        }
    }
}

/// Shortest-path implementation used for tortuosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathAlgorithm {
    /// Dijkstra over a node table covering every site.
    Indexed,
    /// Dijkstra over a growing frontier only; slower, but memory scales with
    /// the frontier instead of the lattice volume.
    ReducedMemory,
}

impl TryFrom<&str> for PathAlgorithm {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "indexed" => Ok(Self::Indexed),
            "reduced_memory" => Ok(Self::ReducedMemory),
            _ => Err(format!(
                "unknown path_algorithm '{s}', expected 'indexed' or 'reduced_memory'"
            )),
        }
    }
}

fn validate_parameters(p: &Parameters) -> Result<(), ValidationError> {
    if p.length < 2 || p.width < 2 || p.height < 2 {
        return Err(ValidationError::new("lattice dimensions must all be >= 2"));
    }
    if p.n_sampling_max < 1 {
        return Err(ValidationError::new("n_sampling_max must be >= 1"));
    }
    if p.extended_correlation_cutoff == Some(0) {
        return Err(ValidationError::new(
            "extended_correlation_cutoff must be >= 1",
        ));
    }
    Ok(())
}

/// Lattice geometry and analysis settings shared by every morphology in a
/// batch. Read-only once a morphology is constructed.
#[derive(Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_parameters"))]
pub struct Parameters {
    pub length: usize,
    pub width: usize,
    pub height: usize,
    pub periodic_x: bool,
    pub periodic_y: bool,
    pub periodic_z: bool,
    /// Maximum number of seed sites per label for correlation sampling.
    pub n_sampling_max: usize,
    pub correlation_method: CorrelationMethod,
    /// Compute the correlation curve out to this radius in one pass instead
    /// of escalating from a small cutoff.
    pub extended_correlation_cutoff: Option<usize>,
    /// Include third-shell (corner) neighbors in the swap energy.
    pub enable_third_neighbor_interaction: bool,
    pub path_algorithm: PathAlgorithm,
}

impl Parameters {
    /// Fully periodic lattice with default analysis settings.
    pub fn new(length: usize, width: usize, height: usize) -> Self {
        Self {
            length,
            width,
            height,
            periodic_x: true,
            periodic_y: true,
            periodic_z: true,
            n_sampling_max: 100_000,
            correlation_method: CorrelationMethod::MixFraction,
            extended_correlation_cutoff: None,
            enable_third_neighbor_interaction: false,
            path_algorithm: PathAlgorithm::Indexed,
        }
    }

    pub fn periodic(&self) -> [bool; 3] {
        [self.periodic_x, self.periodic_y, self.periodic_z]
    }
}

/// Directional bias favoring like neighbors along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthPreference {
    pub axis: Axis,
    /// Energy per like neighbor gained along `axis`.
    pub strength: f64,
}

fn validate_swap_config(cfg: &SwapConfig) -> Result<(), ValidationError> {
    if cfg.n_steps < 1 {
        return Err(ValidationError::new("n_steps must be >= 1"));
    }
    if !cfg.interaction_energy1.is_finite() || !cfg.interaction_energy2.is_finite() {
        return Err(ValidationError::new("interaction energies must be finite"));
    }
    if let Some(ref g) = cfg.growth {
        if !g.strength.is_finite() {
            return Err(ValidationError::new("growth strength must be finite"));
        }
    }
    Ok(())
}

/// One Ising phase-separation run.
#[derive(Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_swap_config"))]
pub struct SwapConfig {
    /// Number of MC steps; one step is `n_sites` attempted swaps.
    pub n_steps: usize,
    /// Interaction energy (in kT) of `PRIMARY` sites.
    pub interaction_energy1: f64,
    /// Interaction energy (in kT) of the other phase.
    pub interaction_energy2: f64,
    pub growth: Option<GrowthPreference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_validation() {
        assert!(Parameters::new(10, 10, 10).validate().is_ok());

        let mut p = Parameters::new(10, 1, 10);
        assert!(p.validate().is_err());

        p = Parameters::new(10, 10, 10);
        p.n_sampling_max = 0;
        assert!(p.validate().is_err());

        p = Parameters::new(10, 10, 10);
        p.extended_correlation_cutoff = Some(0);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_swap_config_validation() {
        let mut cfg = SwapConfig {
            n_steps: 10,
            interaction_energy1: 0.4,
            interaction_energy2: 0.4,
            growth: None,
        };
        assert!(cfg.validate().is_ok());
        cfg.n_steps = 0;
        assert!(cfg.validate().is_err());
        cfg.n_steps = 1;
        cfg.growth = Some(GrowthPreference {
            axis: Axis::Z,
            strength: f64::NAN,
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!(
            CorrelationMethod::try_from("e").unwrap(),
            CorrelationMethod::OneOverE
        );
        assert_eq!(
            PathAlgorithm::try_from("reduced_memory").unwrap(),
            PathAlgorithm::ReducedMemory
        );
        assert!(PathAlgorithm::try_from("astar").is_err());
        assert_eq!(Axis::try_from("z").unwrap(), Axis::Z);
    }
}
