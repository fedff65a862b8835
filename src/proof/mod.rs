//! # Annotated proof overview
//!
//! ```text
//! proof
//! ├── header        header key lookup over lexed records
//! ├── params        [`ProofParameters`] and its degree-reduction check
//! ├── public_input  [`PublicInput`], Cairo segments and public memory
//! ├── types         [`AnnotatedProof`] and per-commitment decommitments
//! └── builder       [`AnnotatedProofBuilder`], the single validating pass
//! ```

mod builder;
mod header;
pub mod params;
pub mod public_input;
pub mod types;

pub use builder::AnnotatedProofBuilder;
pub use params::{FriParameters, HashKind, ProofParameters, StarkParameters};
pub use public_input::{PublicInput, PublicMemory, PublicSegment, BUILTIN_SEGMENTS};
pub use types::{AnnotatedProof, Decommitment, FieldRow, MerkleNode, QueryInverse};
