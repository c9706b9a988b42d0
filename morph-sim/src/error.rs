use thiserror::Error;

use crate::phases::Label;

/// Errors raised by morphology construction, generation, analysis and
/// persistence.
///
/// Analyses that merely fail to converge (no correlation crossover within
/// the usable cutoff range) are not errors: they leave the descriptor unset
/// and log a warning.
#[derive(Debug, Error)]
pub enum MorphologyError {
    /// Invalid parameters, or a lattice that disagrees with them.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A correlation calculation was handed no sample sites.
    #[error("no sample sites of label {0} for the correlation calculation")]
    EmptySample(Label),

    #[error("label {0} is not present in this morphology")]
    UnknownLabel(Label),

    /// The operation is only defined for the `PRIMARY`/`SECONDARY` pair.
    #[error("operation is not defined for label {0}")]
    UnsupportedLabel(Label),

    /// Malformed or incompatible morphology file.
    #[error("morphology format: {0}")]
    Format(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<validator::ValidationErrors> for MorphologyError {
    fn from(e: validator::ValidationErrors) -> Self {
        MorphologyError::Configuration(format!("{e}"))
    }
}

pub type Result<T> = std::result::Result<T, MorphologyError>;
