//! Contract call parameters.
//!
//! Every struct here mirrors one verifier contract entry point; field names
//! and order are the argument names the contracts declare and must not
//! change. [`CallEncoder`] only maps statements onto these shapes. It
//! validates nothing, so a failure here means an earlier stage let an
//! invalid value through.

use std::collections::BTreeMap;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterResult};
use crate::facts::ContinuousMemoryPage;
use crate::field::STARK_PRIME;
use crate::fri::FRIMerkleStatement;
use crate::merkle::MerkleStatement;
use crate::oods::MainProof;
use crate::split::SplitProofs;

/// `verifyMerkle(merkle_view, initial_merkle_queue, height, expected_root)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyMerkleCall {
    pub merkle_view: Vec<U256>,
    pub initial_merkle_queue: Vec<U256>,
    pub height: U256,
    pub expected_root: U256,
}

/// `verifyFRI(proof, fri_queue, evaluation_point, fri_step_size, expected_root)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyFRICall {
    pub proof: Vec<U256>,
    /// Input queue followed by a zero delimiter.
    pub fri_queue: Vec<U256>,
    pub evaluation_point: U256,
    pub fri_step_size: U256,
    pub expected_root: U256,
}

/// `verifyProofAndRegister(proof_params, proof, task_metadata, cairo_aux_input, cairo_verifier_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyProofAndRegisterCall {
    pub proof_params: Vec<U256>,
    pub proof: Vec<U256>,
    pub task_metadata: Vec<U256>,
    pub cairo_aux_input: Vec<U256>,
    pub cairo_verifier_id: U256,
}

/// `registerContinuousMemoryPage(start_addr, values, z, alpha, prime)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterContinuousMemoryPageCall {
    pub start_addr: U256,
    pub values: Vec<U256>,
    pub z: U256,
    pub alpha: U256,
    pub prime: U256,
}

/// One call of the submission plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ContractCall {
    VerifyMerkle {
        statement: String,
        params: VerifyMerkleCall,
    },
    VerifyFri {
        layer: usize,
        params: VerifyFRICall,
    },
    RegisterContinuousMemoryPage {
        page: usize,
        params: RegisterContinuousMemoryPageCall,
    },
    VerifyProofAndRegister {
        params: VerifyProofAndRegisterCall,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEncoder {
    cairo_verifier_id: u64,
}

impl CallEncoder {
    pub fn new(config: &AdapterConfig) -> Self {
        CallEncoder {
            cairo_verifier_id: config.cairo_verifier_id(),
        }
    }

    pub fn merkle(&self, statement: &MerkleStatement) -> VerifyMerkleCall {
        VerifyMerkleCall {
            merkle_view: statement.proof.clone(),
            initial_merkle_queue: statement.merkle_queue(),
            height: U256::from(statement.merkle_height),
            expected_root: statement.expected_root,
        }
    }

    pub fn fri(&self, statement: &FRIMerkleStatement) -> VerifyFRICall {
        let mut fri_queue = statement.input_interleaved.clone();
        fri_queue.push(U256::ZERO);
        VerifyFRICall {
            proof: statement.proof.clone(),
            fri_queue,
            evaluation_point: statement.evaluation_point,
            fri_step_size: U256::from(statement.fri_step_size),
            expected_root: statement.expected_root,
        }
    }

    pub fn continuous_page(
        &self,
        main: &MainProof,
        page: &ContinuousMemoryPage,
    ) -> RegisterContinuousMemoryPageCall {
        RegisterContinuousMemoryPageCall {
            start_addr: U256::from(page.start_address),
            values: page.values.clone(),
            z: main.interaction_z,
            alpha: main.interaction_alpha,
            prime: STARK_PRIME,
        }
    }

    pub fn main(
        &self,
        main: &MainProof,
        task_metadata: Vec<U256>,
    ) -> AdapterResult<VerifyProofAndRegisterCall> {
        Ok(VerifyProofAndRegisterCall {
            proof_params: main.proof_params(),
            proof: main.proof.clone(),
            task_metadata,
            cairo_aux_input: main.cairo_aux_input()?,
            cairo_verifier_id: U256::from(self.cairo_verifier_id),
        })
    }
}

/// Every call for `split` in submission order: trace Merkle statements by trace
/// index, FRI statements by layer, continuous page registrations, then the
/// main statement.
pub fn encode_calls(
    split: &SplitProofs,
    task_metadata: Vec<U256>,
    config: &AdapterConfig,
) -> AdapterResult<Vec<ContractCall>> {
    let encoder = CallEncoder::new(config);
    let main = &split.main_proof;
    let mut calls = Vec::new();

    for (name, statement) in merkle_call_order(&split.merkle_statements) {
        calls.push(ContractCall::VerifyMerkle {
            statement: name.clone(),
            params: encoder.merkle(statement),
        });
    }
    for (index, statement) in split.fri_merkle_statements.iter().enumerate() {
        calls.push(ContractCall::VerifyFri {
            layer: index + 1,
            params: encoder.fri(statement),
        });
    }
    for (index, page) in main.continuous_pages().iter().enumerate() {
        if page.is_empty() {
            return Err(AdapterError::InternalInvariantViolation(format!(
                "continuous page {} is empty",
                index + 1
            )));
        }
        calls.push(ContractCall::RegisterContinuousMemoryPage {
            page: index + 1,
            params: encoder.continuous_page(main, page),
        });
    }
    calls.push(ContractCall::VerifyProofAndRegister {
        params: encoder.main(main, task_metadata)?,
    });

    tracing::debug!(calls = calls.len(), "calls encoded");
    Ok(calls)
}

/// Merkle statements by numeric trace index; other names follow in map
/// order.
fn merkle_call_order(
    statements: &BTreeMap<String, MerkleStatement>,
) -> Vec<(&String, &MerkleStatement)> {
    let mut ordered: Vec<_> = statements.iter().collect();
    ordered.sort_by_key(|(name, _)| trace_index(name).unwrap_or(usize::MAX));
    ordered
}

fn trace_index(name: &str) -> Option<usize> {
    name.strip_prefix("Trace ")?.parse().ok()
}
