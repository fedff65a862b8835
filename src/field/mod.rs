//! Arithmetic over the Stark prime field used by the on-chain verifiers.
//!
//! The adapter never evaluates polynomials; it only needs the handful of
//! modular operations the verifier contracts expect to find already applied
//! to their inputs:
//!
//! * field elements decommitted by the prover are handed to the contracts in
//!   Montgomery form with `R = 2^256`,
//! * memory pages carry the cumulative product
//!   `prod(z - (address + alpha * value))` used by the memory-page fact
//!   registry.
//!
//! All values are [`U256`] and every result is reduced modulo
//! [`STARK_PRIME`].

use alloy_primitives::U256;

/// The Stark prime `2^251 + 17 * 2^192 + 1`.
pub const STARK_PRIME: U256 = U256::from_limbs([1, 0, 0, 0x0800_0000_0000_0011]);

/// Returns `2^256 mod STARK_PRIME`, the Montgomery radix.
pub fn montgomery_radix() -> U256 {
    (U256::MAX % STARK_PRIME).add_mod(U256::ONE, STARK_PRIME)
}

/// Encodes a canonical element into Montgomery form (`x * 2^256 mod p`).
pub fn montgomery_encode(value: U256) -> U256 {
    value.mul_mod(montgomery_radix(), STARK_PRIME)
}

/// Subtraction modulo the Stark prime.
pub fn sub_mod(lhs: U256, rhs: U256) -> U256 {
    let rhs = rhs % STARK_PRIME;
    lhs.add_mod(STARK_PRIME - rhs, STARK_PRIME)
}

/// Folds one memory cell into a page product:
/// `prod * (z - (address + alpha * value)) mod p`.
pub fn accumulate_page_product(prod: U256, z: U256, alpha: U256, address: U256, value: U256) -> U256 {
    let term = address.add_mod(alpha.mul_mod(value, STARK_PRIME), STARK_PRIME);
    prod.mul_mod(sub_mod(z, term), STARK_PRIME)
}

/// Returns `log2(value)` when `value` is a power of two.
pub fn exact_log2(value: u64) -> Option<u32> {
    if value.is_power_of_two() {
        Some(value.trailing_zeros())
    } else {
        None
    }
}

/// Returns `ceil(log2(value))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
pub fn ceil_log2(value: u64) -> u32 {
    if value <= 1 {
        0
    } else {
        u64::BITS - (value - 1).leading_zeros()
    }
}

/// Height of a Merkle node index: `bit_len(index) - 1`.
pub fn node_height(index: U256) -> Option<usize> {
    index.bit_len().checked_sub(1)
}
