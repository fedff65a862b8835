use std::collections::BTreeMap;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::params::ProofParameters;
use super::public_input::PublicInput;
use crate::annotation::ByteSpan;
use crate::reader::MemorySegment;

/// Merkle node reported in a decommitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleNode {
    /// Heap index of the node; the root is `1`.
    pub index: U256,
    pub digest: U256,
    /// Proof bytes of the node, absent for verifier-reconstructed nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<ByteSpan>,
}

/// Field element at `(row, column)` of a committed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRow {
    pub row: u64,
    pub column: u64,
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<ByteSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInverse {
    pub index: u64,
    pub value: U256,
}

/// Everything decommitted against one named commitment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decommitment {
    /// Nodes and data leaves sent by the prover, in annotation order.
    pub authentication: Vec<MerkleNode>,
    /// Set when the prover sent raw `element #n: Data` leaves.
    pub single_column: bool,
    /// Queue nodes reconstructed by the verifier.
    pub queue: Vec<MerkleNode>,
    /// FRI layer values sent by the prover.
    pub rows: Vec<FieldRow>,
    /// FRI layer values at the queried positions, computed by the verifier.
    pub queue_rows: Vec<FieldRow>,
    /// Trace values decommitted through a virtual oracle.
    pub oracle_rows: Vec<FieldRow>,
    pub inverses: Vec<QueryInverse>,
}

/// Immutable in-memory representation of one annotated proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedProof {
    pub proof_parameters: ProofParameters,
    pub public_input: PublicInput,
    /// Proof buffer catalogue in annotation order.
    pub segments: Vec<MemorySegment>,
    /// Bytes forwarded to the main statement.
    #[serde(with = "hex::serde")]
    pub main_proof: Vec<u8>,
    pub commitments: BTreeMap<String, U256>,
    pub interaction_z: U256,
    pub interaction_alpha: U256,
    /// Evaluation point of layer `i + 1` at index `i`.
    pub evaluation_points: Vec<U256>,
    pub decommitments: BTreeMap<String, Decommitment>,
    pub query_indices: Vec<Vec<u64>>,
}

impl AnnotatedProof {
    /// Number of FRI layers after the unfolded trace.
    pub fn fri_layer_count(&self) -> usize {
        self.proof_parameters.stark.fri.declared_layers()
    }

    /// Evaluation point of committed layer `layer` (1-based).
    pub fn evaluation_point(&self, layer: usize) -> Option<U256> {
        layer
            .checked_sub(1)
            .and_then(|index| self.evaluation_points.get(index))
            .copied()
    }

    /// Total proof length covered by the catalogue.
    pub fn proof_len(&self) -> usize {
        self.segments.iter().map(|segment| segment.length).sum()
    }
}
