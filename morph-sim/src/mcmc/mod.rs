pub mod energy;
pub mod neighbors;
pub mod swap;

pub use energy::acceptance_probability;
pub use neighbors::{NeighborBookkeeping, NeighborCounts, NeighborInfo};
pub use swap::{run_swap_loop, SwapSummary};
