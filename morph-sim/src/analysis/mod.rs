//! Structural descriptors of a morphology: correlation and domain size,
//! anisotropy, interfacial measures and depth profiles.

pub mod anisotropy;
pub mod correlation;
pub mod depth;
pub mod interface;

pub use anisotropy::{anisotropy_ratio, axis_correlation_lengths};
pub use correlation::{calculate_correlation_distance, domain_size_from_curve, extend_correlation};
pub use interface::{interfacial_distances, is_near_interface};
