//! Memory-page facts.
//!
//! Public memory is registered on-chain as pages. Runs of sequential
//! addresses hash as a range ([`ContinuousMemoryPage`]); scattered cells hash
//! as explicit pairs ([`RegularMemoryPage`]). Pages are paired left to right
//! into [`FactNode`]s until one root remains, and the resulting
//! [`FactTopology`] records enough of the shape for a verifier to rebuild the
//! same root.

mod pages;
mod tree;

pub use pages::{ContinuousMemoryPage, MemoryCell, MemoryPage, PageKind, RegularMemoryPage};
pub use tree::{FactNode, FactTopology, FactTreeBuilder};

use alloy_primitives::U256;

use crate::config::AdapterConfig;
use crate::error::AdapterResult;
use crate::proof::AnnotatedProof;

/// Builds the fact topology of the proof's public memory.
pub fn build_fact_tree(proof: &AnnotatedProof, config: &AdapterConfig) -> AdapterResult<FactTopology> {
    FactTreeBuilder::new(config).build(&proof.public_input.public_memory)
}

/// Prefixes per-task metadata with the task count, as the main statement
/// expects it.
pub fn encode_task_metadata(tasks: &[Vec<U256>]) -> Vec<U256> {
    let mut words = vec![U256::from(tasks.len())];
    for task in tasks {
        words.extend_from_slice(task);
    }
    words
}
