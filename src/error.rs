//! Crate-wide failure classes.
//!
//! Every stage of the pipeline fails fast with an [`AdapterError`]; nothing
//! downstream runs on a partially validated input. Errors carry the 1-based
//! annotation line or the byte offsets involved so a failing run can be
//! correlated with the prover output that produced it.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::ByteSpan;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Annotation text tokenisation.
    Lexer,
    /// Proof buffer slicing.
    Reader,
    /// Parameter, public input and decommitment assembly.
    Builder,
    /// Merkle/FRI/main statement extraction.
    Splitter,
    /// Memory page grouping and fact aggregation.
    FactTree,
    /// Contract call parameter mapping.
    Encoder,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lexer => write!(f, "lexer"),
            Stage::Reader => write!(f, "reader"),
            Stage::Builder => write!(f, "builder"),
            Stage::Splitter => write!(f, "splitter"),
            Stage::FactTree => write!(f, "fact-tree"),
            Stage::Encoder => write!(f, "encoder"),
        }
    }
}

/// Terminal failure of an adapter run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// A line matched a known prefix but its payload could not be decoded, or
    /// an unknown line was met in strict mode.
    #[error("malformed annotation at line {line}: {reason}")]
    MalformedAnnotation {
        /// 1-based annotation line.
        line: usize,
        /// Human readable cause.
        reason: String,
    },
    /// A prover message claims bytes past the end of the proof buffer.
    #[error("segment {span} at line {line} exceeds proof buffer of {buffer_len} bytes")]
    SegmentOutOfRange {
        /// 1-based annotation line of the offending message.
        line: usize,
        /// Claimed byte range.
        span: ByteSpan,
        /// Length of the proof buffer.
        buffer_len: usize,
    },
    /// Two prover messages claim partially overlapping byte ranges.
    #[error("segment {second} at line {line} overlaps segment {first}")]
    OverlapDetected {
        /// 1-based annotation line of the later message.
        line: usize,
        /// Range claimed first.
        first: ByteSpan,
        /// Range claimed second.
        second: ByteSpan,
    },
    /// Part of the proof buffer is not claimed by any prover message.
    #[error("proof bytes {span} are not covered by any annotated segment")]
    CoverageGap {
        /// Uncovered byte range.
        span: ByteSpan,
    },
    /// The number of FRI layers found differs from the declared count.
    #[error("inconsistent FRI layer count: declared {declared}, found {found}")]
    InconsistentLayerCount {
        /// Layers declared by `fri.fri_step_list`.
        declared: usize,
        /// Layers found in the annotations or produced by the splitter.
        found: usize,
    },
    /// A short public-memory run does not fit a regular page.
    #[error("memory run at address {start_address} has {run_len} cells, regular pages hold at most {max}")]
    PageSizeExceeded {
        /// First address of the run.
        start_address: u64,
        /// Number of cells in the run.
        run_len: usize,
        /// Configured regular page width.
        max: usize,
    },
    /// Header values are missing, ill-typed or mutually inconsistent.
    #[error("invalid parameters: {reason}")]
    InvalidParameters {
        /// Human readable cause.
        reason: String,
    },
    /// Decommitment data for a statement does not line up.
    #[error("inconsistent statement `{statement}`: {reason}")]
    InconsistentStatement {
        /// Statement name (`Trace 0`, `Layer 2`, `main`).
        statement: String,
        /// Human readable cause.
        reason: String,
    },
    /// A query set is larger than the declared query count.
    #[error("{context} references {found} queries, only {declared} declared")]
    QueryCountExceeded {
        /// Where the query set was found.
        context: String,
        /// Number of queries referenced.
        found: usize,
        /// `fri.n_queries`.
        declared: usize,
    },
    /// An upstream stage let an invalid value through.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl AdapterError {
    /// Returns the pipeline stage that raised the error.
    pub fn stage(&self) -> Stage {
        match self {
            AdapterError::MalformedAnnotation { .. } => Stage::Lexer,
            AdapterError::SegmentOutOfRange { .. }
            | AdapterError::OverlapDetected { .. }
            | AdapterError::CoverageGap { .. } => Stage::Reader,
            AdapterError::InvalidParameters { .. } | AdapterError::QueryCountExceeded { .. } => {
                Stage::Builder
            }
            AdapterError::InconsistentLayerCount { .. }
            | AdapterError::InconsistentStatement { .. } => Stage::Splitter,
            AdapterError::PageSizeExceeded { .. } => Stage::FactTree,
            AdapterError::InternalInvariantViolation(_) => Stage::Encoder,
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        AdapterError::MalformedAnnotation {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_params(reason: impl Into<String>) -> Self {
        AdapterError::InvalidParameters {
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistent(statement: impl Into<String>, reason: impl Into<String>) -> Self {
        AdapterError::InconsistentStatement {
            statement: statement.into(),
            reason: reason.into(),
        }
    }
}

/// Convenient alias used by every stage.
pub type AdapterResult<T> = core::result::Result<T, AdapterError>;
