//! Main (out-of-domain sampling) statement.
//!
//! The main statement keeps everything the prover sent that is not Merkle or
//! FRI decommitment data, plus one hash per chained FRI statement. Next to it
//! travel the parameters and public input the statement contract reads as
//! `proof_params` and `cairo_aux_input`.

use std::collections::BTreeMap;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};
use crate::facts::ContinuousMemoryPage;
use crate::field::{accumulate_page_product, ceil_log2, exact_log2};
use crate::hash::keccak_words;
use crate::proof::{ProofParameters, PublicInput, PublicMemory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainProof {
    /// Main proof bytes as words, followed by the FRI chaining hashes.
    pub proof: Vec<U256>,
    pub proof_parameters: ProofParameters,
    pub public_input: PublicInput,
    pub interaction_z: U256,
    pub interaction_alpha: U256,
    /// Root of every extracted Merkle and FRI statement, by name.
    pub statement_roots: BTreeMap<String, U256>,
}

impl MainProof {
    /// `[n_queries, log_n_cosets, proof_of_work_bits,
    /// ceil(log2(last_layer_degree_bound)), n_steps, steps...]`.
    pub fn proof_params(&self) -> Vec<U256> {
        let stark = &self.proof_parameters.stark;
        let mut params = vec![
            U256::from(stark.fri.n_queries),
            U256::from(stark.log_n_cosets),
            U256::from(stark.fri.proof_of_work_bits),
            U256::from(ceil_log2(stark.fri.last_layer_degree_bound)),
            U256::from(stark.fri.fri_step_list.len()),
        ];
        params.extend(stark.fri.fri_step_list.iter().map(|&step| U256::from(step)));
        params
    }

    /// Cairo public input in the order the statement contract decodes it.
    pub fn cairo_aux_input(&self) -> AdapterResult<Vec<U256>> {
        let input = &self.public_input;
        let log_n_steps = exact_log2(input.n_steps).ok_or_else(|| {
            AdapterError::InternalInvariantViolation(format!(
                "n_steps {} reached the encoder",
                input.n_steps
            ))
        })?;
        let layout = U256::try_from_be_slice(input.layout.as_bytes()).ok_or_else(|| {
            AdapterError::InternalInvariantViolation(format!(
                "layout `{}` does not fit a word",
                input.layout
            ))
        })?;

        let mut words = vec![
            U256::from(log_n_steps),
            U256::from(input.rc_min),
            U256::from(input.rc_max),
            layout,
        ];
        for (_, segment) in input.ordered_segments() {
            words.push(U256::from(segment.begin_addr));
            words.push(U256::from(segment.stop_ptr));
        }
        words.extend(self.memory_page_public_input()?);
        words.push(self.interaction_z);
        words.push(self.interaction_alpha);
        Ok(words)
    }

    /// Padding cell, page count, per-page size and hash, then per-page
    /// products.
    pub fn memory_page_public_input(&self) -> AdapterResult<Vec<U256>> {
        let memory = &self.public_input.public_memory;
        let padding = memory.first().ok_or_else(|| {
            AdapterError::InternalInvariantViolation("empty public memory reached the encoder".into())
        })?;
        let pages = self.public_input.pages();

        let mut words = vec![
            U256::from(padding.address),
            padding.value,
            U256::from(pages.len()),
        ];
        for (page, cells) in &pages {
            if *page == 0 {
                words.push(U256::from(cells.len()));
                words.push(keccak_words(&address_value_words(cells)));
            } else {
                let start = cells.first().map_or(0, |cell| cell.address);
                let values: Vec<U256> = cells.iter().map(|cell| cell.value).collect();
                words.push(U256::from(start));
                words.push(U256::from(cells.len()));
                words.push(keccak_words(&values));
            }
        }
        words.extend(pages.values().map(|cells| self.page_product(cells)));
        Ok(words)
    }

    /// Declared pages past page 0, each registered as a continuous page
    /// before the main statement.
    pub fn continuous_pages(&self) -> Vec<ContinuousMemoryPage> {
        self.public_input
            .pages()
            .into_iter()
            .filter(|(page, _)| *page > 0)
            .map(|(_, cells)| ContinuousMemoryPage {
                start_address: cells.first().map_or(0, |cell| cell.address),
                values: cells.iter().map(|cell| cell.value).collect(),
            })
            .collect()
    }

    fn page_product(&self, cells: &[PublicMemory]) -> U256 {
        cells.iter().fold(U256::ONE, |prod, cell| {
            accumulate_page_product(
                prod,
                self.interaction_z,
                self.interaction_alpha,
                U256::from(cell.address),
                cell.value,
            )
        })
    }
}

fn address_value_words(cells: &[PublicMemory]) -> Vec<U256> {
    cells
        .iter()
        .flat_map(|cell| [U256::from(cell.address), cell.value])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{FriParameters, HashKind, PublicSegment, StarkParameters};

    fn cell(page: u32, address: u64, value: u64) -> PublicMemory {
        PublicMemory {
            page,
            address,
            value: U256::from(value),
        }
    }

    fn main_proof(public_memory: Vec<PublicMemory>) -> MainProof {
        let mut memory_segments = BTreeMap::new();
        memory_segments.insert(
            "execution".to_string(),
            PublicSegment {
                begin_addr: 40,
                stop_ptr: 90,
            },
        );
        memory_segments.insert(
            "program".to_string(),
            PublicSegment {
                begin_addr: 1,
                stop_ptr: 6,
            },
        );
        MainProof {
            proof: Vec::new(),
            proof_parameters: ProofParameters {
                stark: StarkParameters {
                    fri: FriParameters {
                        fri_step_list: vec![0, 2, 1],
                        last_layer_degree_bound: 4,
                        n_queries: 18,
                        proof_of_work_bits: 24,
                    },
                    log_n_cosets: 4,
                    log_trace_length: 5,
                },
                commitment_hash: HashKind::Keccak256Masked160Lsb,
                channel_hash: HashKind::Keccak256,
                n_verifier_friendly_commitment_layers: 0,
            },
            public_input: PublicInput {
                layout: "ab".into(),
                n_steps: 32,
                rc_min: 3,
                rc_max: 9,
                memory_segments,
                public_memory,
            },
            interaction_z: U256::from(100u64),
            interaction_alpha: U256::from(2u64),
            statement_roots: BTreeMap::new(),
        }
    }

    #[test]
    fn proof_params_layout() {
        let words = main_proof(vec![cell(0, 1, 1)]).proof_params();
        let expected: Vec<U256> = [18u64, 4, 24, 2, 3, 0, 2, 1]
            .into_iter()
            .map(U256::from)
            .collect();
        assert_eq!(words, expected);
    }

    #[test]
    fn memory_pages_public_input() {
        let proof = main_proof(vec![cell(0, 1, 3), cell(1, 10, 4), cell(1, 11, 5)]);
        let words = proof.memory_page_public_input().unwrap();
        let page_one_product = accumulate_page_product(
            accumulate_page_product(U256::ONE, U256::from(100u64), U256::from(2u64), U256::from(10u64), U256::from(4u64)),
            U256::from(100u64),
            U256::from(2u64),
            U256::from(11u64),
            U256::from(5u64),
        );
        assert_eq!(
            words,
            vec![
                U256::from(1u64),
                U256::from(3u64),
                U256::from(2u64),
                U256::from(1u64),
                keccak_words(&[U256::from(1u64), U256::from(3u64)]),
                U256::from(10u64),
                U256::from(2u64),
                keccak_words(&[U256::from(4u64), U256::from(5u64)]),
                U256::from(93u64),
                page_one_product,
            ]
        );
    }

    #[test]
    fn aux_input_starts_with_run_shape() {
        let words = main_proof(vec![cell(0, 1, 3)]).cairo_aux_input().unwrap();
        assert_eq!(words[0], U256::from(5u64));
        assert_eq!(words[3], U256::from(0x6162u64));
        // program before execution
        assert_eq!(&words[4..8], &[1u64, 6, 40, 90].map(U256::from));
        assert_eq!(words[words.len() - 2], U256::from(100u64));
        assert_eq!(words[words.len() - 1], U256::from(2u64));
    }

    #[test]
    fn continuous_pages_skip_page_zero() {
        let proof = main_proof(vec![cell(0, 1, 3), cell(1, 10, 4), cell(1, 11, 5)]);
        let pages = proof.continuous_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].start_address, 10);
        assert_eq!(pages[0].values, vec![U256::from(4u64), U256::from(5u64)]);
    }
}
