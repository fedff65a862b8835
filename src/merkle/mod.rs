//! Merkle statements for the trace commitments.
//!
//! A trace decommitment becomes one `verifyMerkle` statement: the queue the
//! verifier reconstructed (heap index and leaf hash per query), the
//! authentication nodes the prover sent, and the committed root. All queue
//! nodes must sit at the same height, which is the tree height the contract
//! checks against.
//!
//! Single-column traces are committed with raw field elements as leaves. For
//! those the reported queue sits one level above the leaves, so the queue is
//! rebuilt from the column-0 oracle values at height `h + 1`, each value in
//! Montgomery form.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};
use crate::field::{montgomery_encode, node_height};
use crate::proof::{Decommitment, MerkleNode};

/// One Merkle commitment verification round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleStatement {
    pub expected_root: U256,
    pub n_unique_queries: usize,
    pub merkle_height: usize,
    pub merkle_queue_indices: Vec<U256>,
    pub merkle_queue_values: Vec<U256>,
    /// Authentication nodes in the order the prover sent them.
    pub proof: Vec<U256>,
}

impl MerkleStatement {
    /// Extracts the statement for commitment `name`.
    pub fn from_decommitment(
        name: &str,
        expected_root: U256,
        decommitment: &Decommitment,
    ) -> AdapterResult<Self> {
        let height = uniform_height(name, &decommitment.queue)?;
        let (height, indices, values) = if decommitment.single_column {
            single_column_queue(name, height, decommitment)?
        } else {
            (
                height,
                decommitment.queue.iter().map(|node| node.index).collect(),
                decommitment.queue.iter().map(|node| node.digest).collect(),
            )
        };

        Ok(MerkleStatement {
            expected_root,
            n_unique_queries: indices.len(),
            merkle_height: height,
            merkle_queue_indices: indices,
            merkle_queue_values: values,
            proof: decommitment
                .authentication
                .iter()
                .map(|node| node.digest)
                .collect(),
        })
    }

    /// Queue as `[index_0, value_0, index_1, value_1, ...]`.
    pub fn merkle_queue(&self) -> Vec<U256> {
        self.merkle_queue_indices
            .iter()
            .zip(&self.merkle_queue_values)
            .flat_map(|(index, value)| [*index, *value])
            .collect()
    }
}

/// Height shared by every node of `queue`.
pub(crate) fn uniform_height(name: &str, queue: &[MerkleNode]) -> AdapterResult<usize> {
    let mut heights = queue.iter().map(|node| {
        node_height(node.index)
            .ok_or_else(|| AdapterError::inconsistent(name, "queue node with index 0"))
    });
    let first = heights
        .next()
        .ok_or_else(|| AdapterError::inconsistent(name, "empty decommitment queue"))??;
    for height in heights {
        let height = height?;
        if height != first {
            return Err(AdapterError::inconsistent(
                name,
                format!("queue mixes heights {first} and {height}"),
            ));
        }
    }
    Ok(first)
}

fn single_column_queue(
    name: &str,
    height: usize,
    decommitment: &Decommitment,
) -> AdapterResult<(usize, Vec<U256>, Vec<U256>)> {
    let height = height + 1;
    if height >= 256 {
        return Err(AdapterError::inconsistent(name, "tree height exceeds 255"));
    }
    let offset = U256::ONE << height;
    let leaves: Vec<_> = decommitment
        .oracle_rows
        .iter()
        .filter(|cell| cell.column == 0)
        .collect();
    if leaves.is_empty() {
        return Err(AdapterError::inconsistent(
            name,
            "single-column commitment without column 0 values",
        ));
    }
    let indices = leaves
        .iter()
        .map(|cell| U256::from(cell.row) + offset)
        .collect();
    let values = leaves
        .iter()
        .map(|cell| montgomery_encode(cell.value))
        .collect();
    Ok((height, indices, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::montgomery_radix;
    use crate::proof::FieldRow;

    fn node(index: u64, digest: u64) -> MerkleNode {
        MerkleNode {
            index: U256::from(index),
            digest: U256::from(digest),
            span: None,
        }
    }

    #[test]
    fn queue_and_proof_are_carried_over() {
        let decommitment = Decommitment {
            authentication: vec![node(9, 0xa1), node(5, 0xa2)],
            queue: vec![node(8, 0xb1), node(11, 0xb2)],
            ..Decommitment::default()
        };
        let statement =
            MerkleStatement::from_decommitment("Trace 0", U256::from(7u64), &decommitment)
                .unwrap();
        assert_eq!(statement.merkle_height, 3);
        assert_eq!(statement.n_unique_queries, 2);
        assert_eq!(statement.proof, vec![U256::from(0xa1u64), U256::from(0xa2u64)]);
        assert_eq!(
            statement.merkle_queue(),
            vec![
                U256::from(8u64),
                U256::from(0xb1u64),
                U256::from(11u64),
                U256::from(0xb2u64)
            ]
        );
    }

    #[test]
    fn mixed_heights_are_rejected() {
        let decommitment = Decommitment {
            queue: vec![node(8, 1), node(16, 2)],
            ..Decommitment::default()
        };
        let err = MerkleStatement::from_decommitment("Trace 1", U256::ZERO, &decommitment)
            .unwrap_err();
        assert!(matches!(
            err,
            AdapterError::InconsistentStatement { ref statement, .. } if statement == "Trace 1"
        ));
    }

    #[test]
    fn single_column_queue_is_rebuilt_from_oracle_rows() {
        let decommitment = Decommitment {
            authentication: vec![node(6, 0xcc)],
            single_column: true,
            queue: vec![node(4, 0xdd)],
            oracle_rows: vec![
                FieldRow {
                    row: 1,
                    column: 0,
                    value: U256::ONE,
                    span: None,
                },
                FieldRow {
                    row: 1,
                    column: 1,
                    value: U256::from(9u64),
                    span: None,
                },
            ],
            ..Decommitment::default()
        };
        let statement =
            MerkleStatement::from_decommitment("Trace 2", U256::ZERO, &decommitment).unwrap();
        assert_eq!(statement.merkle_height, 3);
        assert_eq!(statement.merkle_queue_indices, vec![U256::from(9u64)]);
        assert_eq!(statement.merkle_queue_values, vec![montgomery_radix()]);
    }
}
