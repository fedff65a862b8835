use core::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` inside the proof buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ByteSpan {
    /// First byte covered by the span.
    pub start: usize,
    /// One past the last byte covered by the span.
    pub end: usize,
}

impl ByteSpan {
    /// Creates a span; callers guarantee `start <= end`.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered.
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` for a zero-length span.
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` when the spans share at least one byte.
    pub const fn overlaps(&self, other: &ByteSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for ByteSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{})", self.start, self.end)
    }
}

/// Where a decommitment value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "span", rename_all = "snake_case")]
pub enum RecordSource {
    /// Sent by the prover; occupies the given proof bytes.
    Proof(ByteSpan),
    /// Reconstructed by the verifier and reported in the extra annotations.
    Extra,
}

impl RecordSource {
    /// Proof bytes backing the value, if any.
    pub fn span(&self) -> Option<ByteSpan> {
        match self {
            RecordSource::Proof(span) => Some(*span),
            RecordSource::Extra => None,
        }
    }
}

/// `H: <key> = <value>` header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub key: String,
    pub value: String,
}

/// Merkle root committed by the prover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    /// `Trace <n>` for trace commitments, the layer name for FRI layers.
    pub name: String,
    pub digest: U256,
    pub span: ByteSpan,
}

/// Payload of a decommitment line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecommitmentEntry {
    /// `For node <n>: Hash(..)`, an authentication or queue node.
    Node { index: U256, digest: U256 },
    /// `element #<n>: Data(..)`, a raw leaf of a single-column tree.
    Data { index: U256, value: U256 },
    /// `Row <r>, Column <c>: Field Element(..)`.
    Row {
        row: u64,
        column: u64,
        value: U256,
        /// Value of a virtual oracle (trace) rather than a FRI layer.
        oracle: bool,
    },
    /// `xInv for index <i>: Field Element(..)`.
    Inverse { index: u64, value: U256 },
}

/// Decommitment value attached to a named commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecommitmentRecord {
    pub name: String,
    pub source: RecordSource,
    pub entry: DecommitmentEntry,
}

/// Start of an FRI layer: the verifier's evaluation point for `Layer <k>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerBoundary {
    pub layer: usize,
    pub evaluation_point: U256,
}

/// Query positions sampled by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryIndices {
    pub indices: Vec<u64>,
}

/// Closed set of annotation line kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum RecordKind {
    Header(HeaderRecord),
    Commitment(CommitmentRecord),
    Decommitment(DecommitmentRecord),
    LayerBoundary(LayerBoundary),
    InteractionElement { index: usize, value: U256 },
    QueryIndices(QueryIndices),
    /// Prover message the adapter forwards verbatim to the main statement.
    ProofData { path: String, label: String, span: ByteSpan },
    /// Verifier message the adapter does not consume.
    Challenge { path: String, label: String },
}

/// One classified annotation line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// 1-based line number in the annotation text.
    pub line: usize,
    pub kind: RecordKind,
}

impl AnnotationRecord {
    /// Proof bytes claimed by the record, if any.
    pub fn span(&self) -> Option<ByteSpan> {
        match &self.kind {
            RecordKind::Commitment(commitment) => Some(commitment.span),
            RecordKind::Decommitment(decommitment) => decommitment.source.span(),
            RecordKind::ProofData { span, .. } => Some(*span),
            RecordKind::Header(_)
            | RecordKind::LayerBoundary(_)
            | RecordKind::InteractionElement { .. }
            | RecordKind::QueryIndices(_)
            | RecordKind::Challenge { .. } => None,
        }
    }
}
