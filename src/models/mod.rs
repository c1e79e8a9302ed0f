//! Core data models for the ladder tracker.

mod day;
mod entry;
mod ids;
mod merged;
mod partition;
mod selection;
mod snapshot;

pub use day::*;
pub use entry::*;
pub use ids::*;
pub use merged::*;
pub use partition::*;
pub use selection::*;
pub use snapshot::*;
