use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::header::HeaderTable;
use crate::error::{AdapterError, AdapterResult};
use crate::field::exact_log2;

/// Hash functions the prover may use for commitments and the channel.
///
/// | Variant | Annotation value |
/// |---------|------------------|
/// | `Keccak256` | `keccak256` |
/// | `Keccak256Masked160Lsb` | `keccak256_masked160_lsb` |
/// | `Keccak256Masked160Msb` | `keccak256_masked160_msb` |
/// | `Blake2s256` | `blake2s256` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashKind {
    Keccak256,
    Keccak256Masked160Lsb,
    Keccak256Masked160Msb,
    Blake2s256,
}

impl HashKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            HashKind::Keccak256 => "keccak256",
            HashKind::Keccak256Masked160Lsb => "keccak256_masked160_lsb",
            HashKind::Keccak256Masked160Msb => "keccak256_masked160_msb",
            HashKind::Blake2s256 => "blake2s256",
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [
            HashKind::Keccak256,
            HashKind::Keccak256Masked160Lsb,
            HashKind::Keccak256Masked160Msb,
            HashKind::Blake2s256,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == value)
        .ok_or(())
    }
}

/// FRI knobs of the proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriParameters {
    /// Folding exponent per layer; entry 0 belongs to the unfolded trace.
    pub fri_step_list: Vec<u32>,
    pub last_layer_degree_bound: u64,
    pub n_queries: u32,
    pub proof_of_work_bits: u32,
}

impl FriParameters {
    /// Number of committed FRI layers after the unfolded trace.
    pub fn declared_layers(&self) -> usize {
        self.fri_step_list.len().saturating_sub(1)
    }

    /// Folding exponent of committed layer `layer` (1-based).
    pub fn step_of(&self, layer: usize) -> Option<u32> {
        if layer == 0 {
            return None;
        }
        self.fri_step_list.get(layer).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarkParameters {
    pub fri: FriParameters,
    pub log_n_cosets: u32,
    pub log_trace_length: u32,
}

/// Parameters parsed once from the annotation header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofParameters {
    pub stark: StarkParameters,
    pub commitment_hash: HashKind,
    pub channel_hash: HashKind,
    #[serde(default)]
    pub n_verifier_friendly_commitment_layers: u32,
}

impl ProofParameters {
    pub(crate) fn from_header(header: &HeaderTable) -> AdapterResult<Self> {
        let fri = FriParameters {
            fri_step_list: parse_step_list(header.raw("fri.fri_step_list")?)?,
            last_layer_degree_bound: header.parse("fri.last_layer_degree_bound")?,
            n_queries: header.parse("fri.n_queries")?,
            proof_of_work_bits: header.parse("fri.proof_of_work_bits")?,
        };
        let params = ProofParameters {
            stark: StarkParameters {
                fri,
                log_n_cosets: header.parse("log_n_cosets")?,
                log_trace_length: header.parse("log_trace_length")?,
            },
            commitment_hash: header.parse("commitment_hash")?,
            channel_hash: header.parse("channel_hash")?,
            n_verifier_friendly_commitment_layers: header
                .parse_or("n_verifier_friendly_commitment_layers", 0)?,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks the degree reduction and query invariants.
    pub fn validate(&self) -> AdapterResult<()> {
        let fri = &self.stark.fri;
        if fri.n_queries == 0 {
            return Err(AdapterError::invalid_params("fri.n_queries must be non-zero"));
        }
        let last_layer_log = exact_log2(fri.last_layer_degree_bound).ok_or_else(|| {
            AdapterError::invalid_params(format!(
                "fri.last_layer_degree_bound {} is not a power of two",
                fri.last_layer_degree_bound
            ))
        })?;
        let folded: u64 = fri.fri_step_list.iter().map(|&step| u64::from(step)).sum();
        let reduction = u64::from(last_layer_log) + folded;
        if reduction != u64::from(self.stark.log_trace_length) {
            return Err(AdapterError::invalid_params(format!(
                "degree reduction {reduction} does not match log_trace_length {}",
                self.stark.log_trace_length
            )));
        }
        Ok(())
    }
}

fn parse_step_list(value: &str) -> AdapterResult<Vec<u32>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| super::header::parse_value("fri.fri_step_list", item))
        .collect()
}
