pub mod analysis;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod mcmc;
pub mod morphology;
pub mod parallel;
pub mod phases;
pub mod report;
pub mod tortuosity;

pub use config::{CorrelationMethod, GrowthPreference, Parameters, PathAlgorithm, SwapConfig};
pub use error::{MorphologyError, Result};
pub use geometry::{Axis, Coords, Lattice};
pub use io::{parse_morphology, MorphologyHeader};
pub use mcmc::SwapSummary;
pub use morphology::{mix_seed, Morphology};
pub use parallel::par_over_morphologies;
pub use phases::{Label, Phase, PhaseRegistry};
