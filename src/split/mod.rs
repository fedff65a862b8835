//! Partition of an [`AnnotatedProof`] into independently verifiable
//! statements.
//!
//! Trace decommitments become [`MerkleStatement`]s, committed FRI layers
//! become one [`FRIMerkleStatement`] each (ascending by layer), and the rest
//! of the proof becomes the [`MainProof`]. When the same proof bytes are
//! decommitted in more than one FRI layer, only the lowest layer keeps them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::annotation::ByteSpan;
use crate::error::{AdapterError, AdapterResult};
use crate::fri::{layer_index, layer_name, FRIMerkleStatement, FriLayerInput, LAST_LAYER};
use crate::hash::bytes_to_words;
use crate::merkle::MerkleStatement;
use crate::oods::MainProof;
use crate::proof::AnnotatedProof;
use crate::utils::try_ordered_map;

/// Statements derived from one proof, in dependency order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitProofs {
    pub merkle_statements: BTreeMap<String, MerkleStatement>,
    pub fri_merkle_statements: Vec<FRIMerkleStatement>,
    pub main_proof: MainProof,
}

#[derive(Debug, Clone, Copy)]
pub struct StatementSplitter<'p> {
    proof: &'p AnnotatedProof,
}

impl<'p> StatementSplitter<'p> {
    pub fn new(proof: &'p AnnotatedProof) -> Self {
        Self { proof }
    }

    pub fn split(&self) -> AdapterResult<SplitProofs> {
        let declared = self.proof.fri_layer_count();
        let layers = self.fri_layers();
        if layers != (1..=declared).collect::<Vec<_>>() {
            return Err(AdapterError::InconsistentLayerCount {
                declared,
                found: layers.len(),
            });
        }

        let attributed = self.attribute_layers(&layers);
        let fri_merkle_statements = try_ordered_map(&attributed, |(layer, aliased)| {
            self.fri_statement(*layer, aliased, declared)
        })?;
        if fri_merkle_statements.len() != declared {
            return Err(AdapterError::InconsistentLayerCount {
                declared,
                found: fri_merkle_statements.len(),
            });
        }

        let mut merkle_statements = BTreeMap::new();
        for (name, decommitment) in &self.proof.decommitments {
            if is_fri_name(name)
                || (decommitment.queue.is_empty() && decommitment.authentication.is_empty())
            {
                continue;
            }
            let root = self.root_of(name)?;
            let statement = MerkleStatement::from_decommitment(name, root, decommitment)?;
            merkle_statements.insert(name.clone(), statement);
        }

        let main_proof = self.main_proof(&merkle_statements, &fri_merkle_statements);
        tracing::debug!(
            merkle = merkle_statements.len(),
            fri = fri_merkle_statements.len(),
            main_words = main_proof.proof.len(),
            "proof split into statements"
        );
        Ok(SplitProofs {
            merkle_statements,
            fri_merkle_statements,
            main_proof,
        })
    }

    /// Committed FRI layer indices that carry decommitments, ascending.
    fn fri_layers(&self) -> Vec<usize> {
        let mut layers: Vec<usize> = self
            .proof
            .decommitments
            .keys()
            .filter_map(|name| layer_index(name))
            .collect();
        layers.sort_unstable();
        layers
    }

    /// Spans of each layer's prover values that a lower layer already
    /// decommitted, in layer order.
    fn attribute_layers(&self, layers: &[usize]) -> Vec<(usize, BTreeSet<ByteSpan>)> {
        let mut claimed: BTreeSet<ByteSpan> = BTreeSet::new();
        let mut attributed = Vec::with_capacity(layers.len());
        for &layer in layers {
            let spans: Vec<ByteSpan> = self
                .proof
                .decommitments
                .get(&layer_name(layer))
                .map(|decommitment| {
                    decommitment
                        .rows
                        .iter()
                        .filter_map(|cell| cell.span)
                        .chain(
                            decommitment
                                .authentication
                                .iter()
                                .filter_map(|node| node.span),
                        )
                        .collect()
                })
                .unwrap_or_default();
            let aliased: BTreeSet<ByteSpan> = spans
                .iter()
                .copied()
                .filter(|span| claimed.contains(span))
                .collect();
            if !aliased.is_empty() {
                tracing::debug!(
                    layer,
                    aliased = aliased.len(),
                    "aliased values kept by a lower layer"
                );
            }
            claimed.extend(spans);
            attributed.push((layer, aliased));
        }
        attributed
    }

    fn fri_statement(
        &self,
        layer: usize,
        aliased: &BTreeSet<ByteSpan>,
        declared: usize,
    ) -> AdapterResult<FRIMerkleStatement> {
        let name = layer_name(layer);
        let current = self.proof.decommitments.get(&name).ok_or_else(|| {
            AdapterError::inconsistent(name.as_str(), "no decommitment for the layer")
        })?;
        let next_name = if layer == declared {
            LAST_LAYER.to_string()
        } else {
            layer_name(layer + 1)
        };
        let next = self.proof.decommitments.get(&next_name).ok_or_else(|| {
            AdapterError::inconsistent(name.as_str(), format!("no `{next_name}` values to fold into"))
        })?;
        let evaluation_point = self
            .proof
            .evaluation_point(layer)
            .ok_or_else(|| AdapterError::inconsistent(name.as_str(), "missing evaluation point"))?;
        let declared_step = self
            .proof
            .proof_parameters
            .stark
            .fri
            .step_of(layer)
            .ok_or_else(|| AdapterError::inconsistent(name.as_str(), "no declared folding step"))?;

        FRIMerkleStatement::from_layer(FriLayerInput {
            layer,
            expected_root: self.root_of(&name)?,
            evaluation_point,
            declared_step,
            current,
            next,
            aliased,
        })
    }

    fn root_of(&self, name: &str) -> AdapterResult<alloy_primitives::U256> {
        self.proof
            .commitments
            .get(name)
            .copied()
            .ok_or_else(|| AdapterError::inconsistent(name, "no commitment for decommitment"))
    }

    fn main_proof(
        &self,
        merkle_statements: &BTreeMap<String, MerkleStatement>,
        fri_statements: &[FRIMerkleStatement],
    ) -> MainProof {
        let mut proof = bytes_to_words(&self.proof.main_proof);
        if let Some((_, chained)) = fri_statements.split_last() {
            proof.extend(chained.iter().map(FRIMerkleStatement::output_hash));
        }

        let mut statement_roots: BTreeMap<String, _> = merkle_statements
            .iter()
            .map(|(name, statement)| (name.clone(), statement.expected_root))
            .collect();
        for (index, statement) in fri_statements.iter().enumerate() {
            statement_roots.insert(layer_name(index + 1), statement.expected_root);
        }

        MainProof {
            proof,
            proof_parameters: self.proof.proof_parameters.clone(),
            public_input: self.proof.public_input.clone(),
            interaction_z: self.proof.interaction_z,
            interaction_alpha: self.proof.interaction_alpha,
            statement_roots,
        }
    }
}

/// Splits `proof` into Merkle, FRI and main statements.
pub fn split_statements(proof: &AnnotatedProof) -> AdapterResult<SplitProofs> {
    StatementSplitter::new(proof).split()
}

fn is_fri_name(name: &str) -> bool {
    name == LAST_LAYER || layer_index(name).is_some()
}
