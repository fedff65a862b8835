use std::collections::BTreeMap;

use alloy_primitives::U256;

use super::header::HeaderTable;
use super::params::ProofParameters;
use super::public_input::PublicInput;
use super::types::{AnnotatedProof, Decommitment, FieldRow, MerkleNode, QueryInverse};
use crate::annotation::{AnnotationRecord, DecommitmentEntry, DecommitmentRecord, RecordKind};
use crate::error::{AdapterError, AdapterResult};
use crate::reader::SegmentCatalogue;

/// Assembles an [`AnnotatedProof`] from lexed records and the proof catalogue.
///
/// Parameters are parsed first since every later check depends on them, then
/// the public input, then the record stream is walked once. The first
/// inconsistency aborts the build.
#[derive(Debug, Clone, Copy)]
pub struct AnnotatedProofBuilder<'r> {
    records: &'r [AnnotationRecord],
}

impl<'r> AnnotatedProofBuilder<'r> {
    pub fn new(records: &'r [AnnotationRecord]) -> Self {
        Self { records }
    }

    pub fn build(&self, catalogue: &SegmentCatalogue<'_>) -> AdapterResult<AnnotatedProof> {
        let header = HeaderTable::collect(self.records)?;
        let proof_parameters = ProofParameters::from_header(&header)?;
        let public_input = PublicInput::from_header(&header)?;
        let n_queries = proof_parameters.stark.fri.n_queries as usize;

        let mut commitments = BTreeMap::new();
        let mut decommitments: BTreeMap<String, Decommitment> = BTreeMap::new();
        let mut boundaries = Vec::new();
        let mut interaction = BTreeMap::new();
        let mut query_indices = Vec::new();

        for record in self.records {
            match &record.kind {
                RecordKind::Commitment(commitment) => {
                    if commitments
                        .insert(commitment.name.clone(), commitment.digest)
                        .is_some()
                    {
                        return Err(AdapterError::inconsistent(
                            commitment.name.as_str(),
                            format!("committed twice (line {})", record.line),
                        ));
                    }
                }
                RecordKind::Decommitment(decommitment) => {
                    let entry = decommitments.entry(decommitment.name.clone()).or_default();
                    route_decommitment(entry, decommitment);
                }
                RecordKind::LayerBoundary(boundary) => {
                    boundaries.push((record.line, boundary.clone()));
                }
                RecordKind::InteractionElement { index, value } => {
                    if interaction.insert(*index, *value).is_some() {
                        return Err(AdapterError::invalid_params(format!(
                            "interaction element #{index} repeated at line {}",
                            record.line
                        )));
                    }
                }
                RecordKind::QueryIndices(queries) => {
                    if queries.indices.len() > n_queries {
                        return Err(AdapterError::QueryCountExceeded {
                            context: format!("query indices at line {}", record.line),
                            found: queries.indices.len(),
                            declared: n_queries,
                        });
                    }
                    query_indices.push(queries.indices.clone());
                }
                RecordKind::Header(_) | RecordKind::ProofData { .. } | RecordKind::Challenge { .. } => {}
            }
        }

        let declared = proof_parameters.stark.fri.declared_layers();
        if boundaries.len() != declared {
            return Err(AdapterError::InconsistentLayerCount {
                declared,
                found: boundaries.len(),
            });
        }
        let mut evaluation_points = Vec::with_capacity(declared);
        for (position, (line, boundary)) in boundaries.into_iter().enumerate() {
            if boundary.layer != position + 1 {
                return Err(AdapterError::invalid_params(format!(
                    "evaluation point at line {line} names layer {}, expected layer {}",
                    boundary.layer,
                    position + 1
                )));
            }
            evaluation_points.push(boundary.evaluation_point);
        }

        for (name, decommitment) in &decommitments {
            if decommitment.queue.len() > n_queries {
                return Err(AdapterError::QueryCountExceeded {
                    context: format!("queue of `{name}`"),
                    found: decommitment.queue.len(),
                    declared: n_queries,
                });
            }
        }

        let interaction_z = required_interaction(&interaction, 0)?;
        let interaction_alpha = required_interaction(&interaction, 1)?;

        let proof = AnnotatedProof {
            proof_parameters,
            public_input,
            segments: catalogue.segments().to_vec(),
            main_proof: catalogue.main_proof_bytes(),
            commitments,
            interaction_z,
            interaction_alpha,
            evaluation_points,
            decommitments,
            query_indices,
        };
        tracing::debug!(
            commitments = proof.commitments.len(),
            decommitments = proof.decommitments.len(),
            fri_layers = declared,
            main_proof_bytes = proof.main_proof.len(),
            "annotated proof assembled"
        );
        Ok(proof)
    }
}

fn route_decommitment(target: &mut Decommitment, record: &DecommitmentRecord) {
    let span = record.source.span();
    match record.entry {
        DecommitmentEntry::Node { index, digest } => {
            let node = MerkleNode { index, digest, span };
            if span.is_some() {
                target.authentication.push(node);
            } else {
                target.queue.push(node);
            }
        }
        DecommitmentEntry::Data { index, value } => {
            let node = MerkleNode {
                index,
                digest: value,
                span,
            };
            if span.is_some() {
                target.single_column = true;
                target.authentication.push(node);
            } else {
                target.queue.push(node);
            }
        }
        DecommitmentEntry::Row {
            row,
            column,
            value,
            oracle,
        } => {
            let cell = FieldRow {
                row,
                column,
                value,
                span,
            };
            if oracle {
                target.oracle_rows.push(cell);
            } else if span.is_some() {
                target.rows.push(cell);
            } else {
                target.queue_rows.push(cell);
            }
        }
        DecommitmentEntry::Inverse { index, value } => {
            target.inverses.push(QueryInverse { index, value });
        }
    }
}

fn required_interaction(elements: &BTreeMap<usize, U256>, index: usize) -> AdapterResult<U256> {
    elements.get(&index).copied().ok_or_else(|| {
        AdapterError::invalid_params(format!("missing interaction element #{index}"))
    })
}
