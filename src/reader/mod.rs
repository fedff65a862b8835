//! Slicing of the raw proof buffer into annotated segments.
//!
//! Every `P->V[start:end]` record claims a byte range of the proof. The
//! reader bounds-checks each claim, then walks the claims in offset order to
//! prove that together they tile the buffer exactly: no byte is claimed by
//! two different messages and no byte is left unclaimed. The one exception
//! is FRI aliasing: when adjacent layers decommit the same prover row or node,
//! both records name the exact same range and collapse into the segment of the
//! lower layer.

mod cursor;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationRecord, ByteSpan, DecommitmentEntry, RecordKind};
use crate::error::{AdapterError, AdapterResult};
use crate::fri::layer_index;
use cursor::ByteCursor;

/// What a proof segment carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRole {
    /// Merkle root of a trace or FRI layer.
    Commitment,
    /// Authentication node of a Merkle decommitment.
    AuthenticationNode,
    /// Raw leaf of a single-column Merkle tree.
    DataLeaf,
    /// Sibling value of a queried FRI layer row.
    LayerRow,
    /// Trace value decommitted through a virtual oracle.
    OracleRow,
    /// Inverse of a query point.
    Inverse,
    /// Any other prover message.
    ProofData,
}

impl SegmentRole {
    /// Whether the segment is forwarded to the main statement. Merkle nodes,
    /// data leaves and FRI layer rows live in their own statements instead.
    pub fn in_main_proof(&self) -> bool {
        !matches!(
            self,
            SegmentRole::AuthenticationNode | SegmentRole::DataLeaf | SegmentRole::LayerRow
        )
    }
}

impl fmt::Display for SegmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SegmentRole::Commitment => "commitment",
            SegmentRole::AuthenticationNode => "authentication node",
            SegmentRole::DataLeaf => "data leaf",
            SegmentRole::LayerRow => "layer row",
            SegmentRole::OracleRow => "oracle row",
            SegmentRole::Inverse => "inverse",
            SegmentRole::ProofData => "proof data",
        };
        f.write_str(label)
    }
}

/// Named contiguous range of the proof buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySegment {
    /// Record name (`Trace 0`, `Layer 2`) or, for opaque data, its path leaf.
    pub name: String,
    pub begin: usize,
    pub length: usize,
    pub role: SegmentRole,
    /// Annotation line that claimed the range first.
    pub line: usize,
}

impl MemorySegment {
    pub fn span(&self) -> ByteSpan {
        ByteSpan::new(self.begin, self.begin + self.length)
    }
}

/// Segment together with the bytes it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofSlice<'a> {
    pub segment: &'a MemorySegment,
    pub bytes: &'a [u8],
}

/// Segments of one proof buffer in annotation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCatalogue<'a> {
    buffer: &'a [u8],
    segments: Vec<MemorySegment>,
}

impl<'a> SegmentCatalogue<'a> {
    pub fn segments(&self) -> &[MemorySegment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<MemorySegment> {
        self.segments
    }

    /// Iterates the segments with their bytes.
    pub fn slices(&self) -> impl Iterator<Item = ProofSlice<'_>> + '_ {
        self.segments.iter().map(|segment| ProofSlice {
            segment,
            bytes: &self.buffer[segment.begin..segment.begin + segment.length],
        })
    }

    /// Concatenation, in annotation order, of every segment forwarded to the
    /// main statement.
    pub fn main_proof_bytes(&self) -> Vec<u8> {
        self.slices()
            .filter(|slice| slice.segment.role.in_main_proof())
            .flat_map(|slice| slice.bytes.iter().copied())
            .collect()
    }

    /// Sum of the segment lengths; equals the buffer length for every
    /// catalogue the reader returns.
    pub fn covered_len(&self) -> usize {
        self.segments.iter().map(|segment| segment.length).sum()
    }
}

struct Claim {
    line: usize,
    name: String,
    span: ByteSpan,
    role: SegmentRole,
}

impl Claim {
    /// Two FRI layers decommitting the same prover value of the same kind.
    /// Any other shared range is an annotation/binary mismatch.
    fn aliases(&self, other: &Claim) -> bool {
        self.role == other.role
            && matches!(
                self.role,
                SegmentRole::AuthenticationNode | SegmentRole::LayerRow
            )
            && layer_index(&self.name).is_some()
            && layer_index(&other.name).is_some()
    }
}

/// Bounds-checked view of a proof buffer.
#[derive(Debug, Clone, Copy)]
pub struct ProofBinaryReader<'a> {
    buffer: &'a [u8],
}

impl<'a> ProofBinaryReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Slices the buffer along the byte ranges claimed by `records`.
    pub fn read(&self, records: &[AnnotationRecord]) -> AdapterResult<SegmentCatalogue<'a>> {
        let mut claims = Vec::new();
        for record in records {
            let Some(claim) = claim_of(record) else {
                continue;
            };
            if claim.span.end > self.buffer.len() {
                return Err(AdapterError::SegmentOutOfRange {
                    line: claim.line,
                    span: claim.span,
                    buffer_len: self.buffer.len(),
                });
            }
            claims.push(claim);
        }

        let mut order: Vec<usize> = (0..claims.len()).collect();
        order.sort_by_key(|&index| (claims[index].span, claims[index].line));

        let mut cursor = ByteCursor::new(self.buffer);
        let mut kept = vec![false; claims.len()];
        let mut previous: Option<&Claim> = None;
        for index in order {
            let claim = &claims[index];
            if claim.span.is_empty() {
                continue;
            }
            if let Some(prev) = previous {
                if prev.span == claim.span && prev.aliases(claim) {
                    continue;
                }
                if claim.span.overlaps(&prev.span) {
                    let (first, second) = if prev.line <= claim.line {
                        (prev, claim)
                    } else {
                        (claim, prev)
                    };
                    return Err(AdapterError::OverlapDetected {
                        line: second.line,
                        first: first.span,
                        second: second.span,
                    });
                }
            }
            if claim.span.start > cursor.position() {
                return Err(AdapterError::CoverageGap {
                    span: ByteSpan::new(cursor.position(), claim.span.start),
                });
            }
            cursor.read_exact(claim.span.len()).ok_or_else(|| {
                AdapterError::InternalInvariantViolation(format!(
                    "bounds-checked span {} unreadable",
                    claim.span
                ))
            })?;
            kept[index] = true;
            previous = Some(claim);
        }
        if cursor.remaining() > 0 {
            return Err(AdapterError::CoverageGap {
                span: ByteSpan::new(cursor.position(), self.buffer.len()),
            });
        }

        let segments: Vec<MemorySegment> = claims
            .into_iter()
            .zip(kept)
            .filter(|(_, kept)| *kept)
            .map(|(claim, _)| MemorySegment {
                name: claim.name,
                begin: claim.span.start,
                length: claim.span.len(),
                role: claim.role,
                line: claim.line,
            })
            .collect();

        tracing::debug!(
            segments = segments.len(),
            bytes = self.buffer.len(),
            "proof buffer sliced"
        );
        Ok(SegmentCatalogue {
            buffer: self.buffer,
            segments,
        })
    }
}

/// Slices `proof` along the byte ranges claimed by `records`.
pub fn read_segments<'a>(
    proof: &'a [u8],
    records: &[AnnotationRecord],
) -> AdapterResult<SegmentCatalogue<'a>> {
    ProofBinaryReader::new(proof).read(records)
}

fn claim_of(record: &AnnotationRecord) -> Option<Claim> {
    let span = record.span()?;
    let (name, role) = match &record.kind {
        RecordKind::Commitment(commitment) => (commitment.name.clone(), SegmentRole::Commitment),
        RecordKind::Decommitment(decommitment) => {
            let role = match decommitment.entry {
                DecommitmentEntry::Node { .. } => SegmentRole::AuthenticationNode,
                DecommitmentEntry::Data { .. } => SegmentRole::DataLeaf,
                DecommitmentEntry::Row { oracle: true, .. } => SegmentRole::OracleRow,
                DecommitmentEntry::Row { oracle: false, .. } => SegmentRole::LayerRow,
                DecommitmentEntry::Inverse { .. } => SegmentRole::Inverse,
            };
            (decommitment.name.clone(), role)
        }
        RecordKind::ProofData { path, .. } => (
            path.rsplit('/').next().unwrap_or_default().to_string(),
            SegmentRole::ProofData,
        ),
        _ => return None,
    };
    Some(Claim {
        line: record.line,
        name,
        span,
        role,
    })
}
