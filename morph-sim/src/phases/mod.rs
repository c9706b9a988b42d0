pub mod label;
pub mod registry;

pub use label::Label;
pub use registry::{Phase, PhaseRegistry};
