//! Keccak helpers matching the packed encodings used on-chain.
//!
//! The verifier contracts hash `uint256[]` arrays with
//! `keccak256(abi.encodePacked(array))`, which is the concatenation of the
//! 32-byte big-endian words. Every digest produced by the adapter (FRI queue
//! hashes, memory page hashes, fact nodes) goes through [`keccak_words`].

use alloy_primitives::{keccak256, U256};

/// Size of one EVM word in bytes.
pub const WORD_SIZE: usize = 32;

/// Concatenates the big-endian encodings of `words`.
pub fn pack_words(words: &[U256]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * WORD_SIZE);
    for word in words {
        out.extend_from_slice(&word.to_be_bytes::<WORD_SIZE>());
    }
    out
}

/// `keccak256(abi.encodePacked(words))` as a word.
pub fn keccak_words(words: &[U256]) -> U256 {
    U256::from_be_bytes(keccak256(pack_words(words)).0)
}

/// Splits a byte string into big-endian words, zero-padding the final
/// partial word on the right.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<U256> {
    bytes
        .chunks(WORD_SIZE)
        .map(|chunk| {
            let mut word = [0u8; WORD_SIZE];
            word[..chunk.len()].copy_from_slice(chunk);
            U256::from_be_bytes(word)
        })
        .collect()
}
