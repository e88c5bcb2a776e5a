//! Filter implementations.

mod bandwidth;
mod capacity;
mod cycle;
mod path_match;
mod priority;
mod transfers;

pub use bandwidth::{BandwidthFilter, CeilingFilter};
pub use capacity::CapacityFilter;
pub use cycle::CycleFilter;
pub use path_match::{AssignAction, AssignTarget, Assignment, PathMatchFilter, PathRule};
pub use priority::PriorityFilter;
pub use transfers::MaxTransfersFilter;
