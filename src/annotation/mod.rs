//! Annotation log tokenisation.
//!
//! The prover emits one line per transcript interaction. Lines are classified
//! into the closed [`RecordKind`] set by [`AnnotationLexer`]; everything past
//! this module matches on records and never looks at raw text again.

mod lexer;
mod records;

pub use lexer::{lex_annotations, AnnotationLexer, LexMode};
pub(crate) use lexer::parse_hex;
pub use records::{
    AnnotationRecord, ByteSpan, CommitmentRecord, DecommitmentEntry, DecommitmentRecord,
    HeaderRecord, LayerBoundary, QueryIndices, RecordKind, RecordSource,
};
