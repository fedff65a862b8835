//! FRI layer statements.
//!
//! Committed layer `k` folds `2^step` sibling values of the previous layer
//! into one value of the next. Its statement for `verifyFRI` carries:
//!
//! * the input queue: positions `index + 2^input_height`, values in
//!   Montgomery form and the query point inverses, interleaved as
//!   `(query, value, inverse)` triples,
//! * the output queue, built the same way from the Merkle queue of layer `k`
//!   and the values the verifier computed for the next layer,
//! * the proof: sibling values sent by the prover followed by the
//!   authentication nodes of the layer's Merkle tree.
//!
//! The input height is the output height plus the folding step; the step is
//! recovered from the row width and must agree with `fri.fri_step_list`.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::U256;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::annotation::ByteSpan;
use crate::error::{AdapterError, AdapterResult};
use crate::field::{exact_log2, montgomery_encode};
use crate::hash::keccak_words;
use crate::merkle::uniform_height;
use crate::proof::{Decommitment, FieldRow, QueryInverse};

/// Name of the decommitment holding the values of the final, uncommitted
/// layer.
pub const LAST_LAYER: &str = "Last Layer";

/// Name under which committed layer `layer` is annotated.
pub fn layer_name(layer: usize) -> String {
    format!("Layer {layer}")
}

static LAYER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Layer ([1-9][0-9]*)$").expect("static regex"));

/// Index of a committed layer name, `None` for anything else.
pub(crate) fn layer_index(name: &str) -> Option<usize> {
    LAYER
        .captures(name)
        .and_then(|captures| captures[1].parse().ok())
}

/// One FRI layer verification round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FRIMerkleStatement {
    pub expected_root: U256,
    pub evaluation_point: U256,
    pub fri_step_size: usize,
    pub input_layer_queries: Vec<U256>,
    pub output_layer_queries: Vec<U256>,
    pub input_layer_values: Vec<U256>,
    pub output_layer_values: Vec<U256>,
    pub input_layer_inverses: Vec<U256>,
    pub output_layer_inverses: Vec<U256>,
    pub input_interleaved: Vec<U256>,
    pub output_interleaved: Vec<U256>,
    pub proof: Vec<U256>,
}

/// Inputs for one layer statement, gathered by the splitter.
#[derive(Debug, Clone, Copy)]
pub struct FriLayerInput<'a> {
    /// 1-based committed layer index.
    pub layer: usize,
    pub expected_root: U256,
    pub evaluation_point: U256,
    /// Folding exponent declared for the layer.
    pub declared_step: u32,
    pub current: &'a Decommitment,
    /// Decommitment of `Layer k+1`, or of the last layer.
    pub next: &'a Decommitment,
    /// Prover bytes a lower layer already decommitted. They still count
    /// towards the row width but are left out of this layer's proof.
    pub aliased: &'a BTreeSet<ByteSpan>,
}

impl FRIMerkleStatement {
    pub fn from_layer(input: FriLayerInput<'_>) -> AdapterResult<Self> {
        let name = layer_name(input.layer);
        let output_height = uniform_height(&name, &input.current.queue)?;
        let step = row_width_log(&name, input.current)?;
        if step != input.declared_step {
            return Err(AdapterError::inconsistent(
                name,
                format!(
                    "rows fold 2^{step} values, fri_step_list declares 2^{}",
                    input.declared_step
                ),
            ));
        }
        let input_height = output_height + step as usize;
        if input_height >= 256 {
            return Err(AdapterError::inconsistent(name, "layer height exceeds 255"));
        }
        let offset = U256::ONE << input_height;

        let input_layer_queries: Vec<U256> = input
            .current
            .inverses
            .iter()
            .map(|inverse| U256::from(inverse.index) + offset)
            .collect();
        let input_layer_values = encoded_values(&input.current.queue_rows);
        let input_layer_inverses = inverse_values(&input.current.inverses);
        if input_layer_values.len() != input_layer_queries.len() {
            return Err(AdapterError::inconsistent(
                name,
                format!(
                    "{} queried values for {} query inverses",
                    input_layer_values.len(),
                    input_layer_queries.len()
                ),
            ));
        }

        let output_layer_queries: Vec<U256> =
            input.current.queue.iter().map(|node| node.index).collect();
        let output_layer_values = encoded_values(&input.next.queue_rows);
        let output_layer_inverses = inverse_values(&input.next.inverses);

        let input_interleaved = interleave(
            &input_layer_queries,
            &input_layer_values,
            &input_layer_inverses,
        );
        let output_interleaved = interleave(
            &output_layer_queries,
            &output_layer_values,
            &output_layer_inverses,
        );

        let owned = |span: &Option<ByteSpan>| {
            span.map_or(true, |span| !input.aliased.contains(&span))
        };
        let proof = input
            .current
            .rows
            .iter()
            .filter(|cell| owned(&cell.span))
            .map(|cell| montgomery_encode(cell.value))
            .chain(
                input
                    .current
                    .authentication
                    .iter()
                    .filter(|node| owned(&node.span))
                    .map(|node| node.digest),
            )
            .collect();

        Ok(FRIMerkleStatement {
            expected_root: input.expected_root,
            evaluation_point: input.evaluation_point,
            fri_step_size: step as usize,
            input_layer_queries,
            output_layer_queries,
            input_layer_values,
            output_layer_values,
            input_layer_inverses,
            output_layer_inverses,
            input_interleaved,
            output_interleaved,
            proof,
        })
    }

    /// `keccak256` of the packed output queue, which the main proof carries
    /// in place of the statement.
    pub fn output_hash(&self) -> U256 {
        keccak_words(&self.output_interleaved)
    }
}

/// `log2` of the number of distinct columns per row.
fn row_width_log(name: &str, decommitment: &Decommitment) -> AdapterResult<u32> {
    let mut columns: BTreeMap<u64, BTreeSet<u64>> = BTreeMap::new();
    for cell in decommitment.queue_rows.iter().chain(&decommitment.rows) {
        columns.entry(cell.row).or_default().insert(cell.column);
    }
    let widths: BTreeSet<usize> = columns.values().map(BTreeSet::len).collect();
    let mut widths = widths.into_iter();
    let width = match (widths.next(), widths.next()) {
        (Some(width), None) => width,
        (None, _) => return Err(AdapterError::inconsistent(name, "layer without rows")),
        (Some(_), Some(_)) => {
            return Err(AdapterError::inconsistent(name, "rows have ragged widths"));
        }
    };
    exact_log2(width as u64).ok_or_else(|| {
        AdapterError::inconsistent(name, format!("row width {width} is not a power of two"))
    })
}

fn encoded_values(cells: &[FieldRow]) -> Vec<U256> {
    cells.iter().map(|cell| montgomery_encode(cell.value)).collect()
}

fn inverse_values(inverses: &[QueryInverse]) -> Vec<U256> {
    inverses.iter().map(|inverse| inverse.value).collect()
}

/// `(a_0, b_0, c_0, a_1, ...)`, stopping at the shortest input.
fn interleave(a: &[U256], b: &[U256], c: &[U256]) -> Vec<U256> {
    a.iter()
        .zip(b)
        .zip(c)
        .flat_map(|((x, y), z)| [*x, *y, *z])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::montgomery_radix;
    use crate::proof::MerkleNode;

    fn row(row: u64, column: u64, value: u64) -> FieldRow {
        FieldRow {
            row,
            column,
            value: U256::from(value),
            span: None,
        }
    }

    fn layer_one() -> Decommitment {
        Decommitment {
            authentication: vec![MerkleNode {
                index: U256::from(5u64),
                digest: U256::from(0xaau64),
                span: None,
            }],
            queue: vec![MerkleNode {
                index: U256::from(4u64),
                digest: U256::from(0xbbu64),
                span: None,
            }],
            rows: vec![row(0, 1, 0)],
            queue_rows: vec![row(0, 0, 1)],
            inverses: vec![QueryInverse {
                index: 0,
                value: U256::from(3u64),
            }],
            ..Decommitment::default()
        }
    }

    fn last_layer() -> Decommitment {
        Decommitment {
            queue_rows: vec![row(0, 0, 0)],
            inverses: vec![QueryInverse {
                index: 0,
                value: U256::from(6u64),
            }],
            ..Decommitment::default()
        }
    }

    #[test]
    fn layer_names_round_trip() {
        assert_eq!(layer_index(&layer_name(3)), Some(3));
        assert_eq!(layer_index("Layer 0"), None);
        assert_eq!(layer_index(LAST_LAYER), None);
        assert_eq!(layer_index("Trace 1"), None);
    }

    #[test]
    fn builds_interleaved_queues() {
        let current = layer_one();
        let next = last_layer();
        let statement = FRIMerkleStatement::from_layer(FriLayerInput {
            layer: 1,
            expected_root: U256::from(77u64),
            evaluation_point: U256::from(2u64),
            declared_step: 1,
            current: &current,
            next: &next,
            aliased: &BTreeSet::new(),
        })
        .unwrap();

        assert_eq!(statement.fri_step_size, 1);
        // output height 2, step 1 -> input offset 2^3
        assert_eq!(statement.input_layer_queries, vec![U256::from(8u64)]);
        assert_eq!(
            statement.input_interleaved,
            vec![U256::from(8u64), montgomery_radix(), U256::from(3u64)]
        );
        assert_eq!(
            statement.output_interleaved,
            vec![U256::from(4u64), U256::ZERO, U256::from(6u64)]
        );
        assert_eq!(statement.proof, vec![U256::ZERO, U256::from(0xaau64)]);
        assert_eq!(statement.output_hash(), keccak_words(&statement.output_interleaved));
    }

    #[test]
    fn step_must_match_declaration() {
        let current = layer_one();
        let next = last_layer();
        let err = FRIMerkleStatement::from_layer(FriLayerInput {
            layer: 1,
            expected_root: U256::ZERO,
            evaluation_point: U256::ZERO,
            declared_step: 2,
            current: &current,
            next: &next,
            aliased: &BTreeSet::new(),
        })
        .unwrap_err();
        assert!(matches!(err, AdapterError::InconsistentStatement { .. }));
    }

    #[test]
    fn aliased_values_fold_but_stay_out_of_the_proof() {
        let mut current = layer_one();
        let shared = ByteSpan::new(64, 96);
        current.rows[0].span = Some(shared);
        let next = last_layer();
        let aliased = BTreeSet::from([shared]);
        let statement = FRIMerkleStatement::from_layer(FriLayerInput {
            layer: 2,
            expected_root: U256::ZERO,
            evaluation_point: U256::ZERO,
            declared_step: 1,
            current: &current,
            next: &next,
            aliased: &aliased,
        })
        .unwrap();
        assert_eq!(statement.fri_step_size, 1);
        assert_eq!(statement.proof, vec![U256::from(0xaau64)]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut current = layer_one();
        current.rows.push(row(1, 0, 4));
        let err = row_width_log("Layer 1", &current).unwrap_err();
        assert_eq!(
            err,
            AdapterError::inconsistent("Layer 1", "rows have ragged widths")
        );
    }
}
