//! Utility helpers shared by the pipeline stages.

mod parallel;

pub use parallel::{parallelism_enabled, preferred_chunk_size, set_parallelism, ParallelismGuard};
pub(crate) use parallel::{ordered_map, try_ordered_map};
