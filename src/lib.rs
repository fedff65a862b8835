//! Splits annotated STARK proofs into the statements on-chain verifiers
//! accept.
//!
//! A stone prover run produces one monolithic proof plus an annotation log
//! describing every transcript interaction. The EVM verifier contracts cannot
//! take that proof in one transaction, so this crate rebuilds its structure
//! and emits one statement per contract call:
//!
//! ```text
//! bytes + annotations
//!   └─ lex_annotations ──► records
//!        └─ read_segments ──► segment catalogue
//!             └─ AnnotatedProofBuilder ──► AnnotatedProof
//!                  ├─ split_statements ──► SplitProofs (Merkle, FRI, main)
//!                  └─ build_fact_tree  ──► FactTopology
//!                       └─ encode_calls ──► ContractCall plan
//! ```
//!
//! Every stage is a pure function of its inputs and fails fast with an
//! [`AdapterError`]. [`parse_and_split`] runs the whole pipeline; the stage
//! functions are public for callers that need intermediate values.

pub mod annotation;
pub mod calls;
pub mod config;
pub mod error;
pub mod facts;
pub mod field;
pub mod fri;
pub mod hash;
pub mod merkle;
pub mod oods;
pub mod proof;
pub mod reader;
pub mod split;
pub mod utils;

pub use annotation::{lex_annotations, AnnotationLexer, AnnotationRecord, LexMode};
pub use calls::{
    encode_calls, CallEncoder, ContractCall, RegisterContinuousMemoryPageCall, VerifyFRICall,
    VerifyMerkleCall, VerifyProofAndRegisterCall,
};
pub use config::{AdapterConfig, AdapterConfigBuilder, ConfigError};
pub use error::{AdapterError, AdapterResult, Stage};
pub use facts::{
    build_fact_tree, encode_task_metadata, ContinuousMemoryPage, FactNode, FactTopology,
    FactTreeBuilder, MemoryPage, RegularMemoryPage,
};
pub use fri::FRIMerkleStatement;
pub use merkle::MerkleStatement;
pub use oods::MainProof;
pub use proof::{AnnotatedProof, AnnotatedProofBuilder};
pub use reader::{read_segments, MemorySegment, ProofBinaryReader};
pub use split::{split_statements, SplitProofs, StatementSplitter};

/// Lexes, slices and assembles the annotated proof without splitting it.
pub fn annotate(
    proof_bytes: &[u8],
    annotation_text: &str,
    config: &AdapterConfig,
) -> AdapterResult<AnnotatedProof> {
    let records = lex_annotations(annotation_text, config.lex_mode())?;
    let catalogue = read_segments(proof_bytes, &records)?;
    AnnotatedProofBuilder::new(&records).build(&catalogue)
}

/// Runs the full pipeline over one prover output.
pub fn parse_and_split(
    proof_bytes: &[u8],
    annotation_text: &str,
    config: &AdapterConfig,
) -> AdapterResult<(SplitProofs, FactTopology)> {
    let run = || -> AdapterResult<(SplitProofs, FactTopology)> {
        let proof = annotate(proof_bytes, annotation_text, config)?;
        let split = split_statements(&proof)?;
        let topology = build_fact_tree(&proof, config)?;
        Ok((split, topology))
    };
    run().inspect_err(|err| {
        tracing::warn!(stage = %err.stage(), error = %err, "adapter run aborted");
    })
}
