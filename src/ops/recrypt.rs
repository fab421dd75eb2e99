//! Re-randomization. Not bootstrapping: recrypt folds zero-ciphertexts
//! into the target until the tag density returns to the configured band,
//! then rotates every tag through the public permutation U. The encoded
//! value never changes.

use log::debug;
use rand::{CryptoRng, RngCore};

use crate::matrix::ubk_apply;
use crate::ops::arithmetic::ct_add;
use crate::ops::encrypt::{
    compact_edges, compact_layers, enc_value, enc_zero_depth, guard_budget, sigma_density,
};
use crate::{Cipher, EvalKey, PubKey, SecKey};

/// Builds an evaluation key: `pool_size` zero-ciphertexts at the given
/// depth hint plus one encryption of 1.
pub fn make_evalkey(
    pk: &PubKey,
    sk: &SecKey,
    pool_size: usize,
    depth_hint: i32,
    rng: &mut (impl RngCore + CryptoRng),
) -> EvalKey {
    let mut zero_pool = Vec::with_capacity(pool_size);
    for _ in 0..pool_size {
        zero_pool.push(enc_zero_depth(pk, sk, depth_hint, rng));
    }

    EvalKey {
        zero_pool,
        enc_one: enc_value(pk, sk, 1, rng),
    }
}

/// True when the tag density left the configured band.
pub fn sigma_needs_balance(pk: &PubKey, c: &Cipher) -> bool {
    let d = sigma_density(pk, c);
    d < pk.params.recrypt_lo || d > pk.params.recrypt_hi
}

/// # Recrypt
/// Restores tag balance after heavy algebra.
///
/// ## Algorithm:
/// * while the density is out of band and rounds remain: add a random
///   zero-ciphertext from the pool, permute every tag through U, guard
///   the edge budget
/// * finally compact edges and prune unreachable layers
///
/// Zero-ciphertexts decode to 0 and U is a public permutation ignored by
/// decryption, so the result decrypts identically to the input.
pub fn ct_recrypt(
    pk: &PubKey,
    ek: &EvalKey,
    input: &Cipher,
    rng: &mut (impl RngCore + CryptoRng),
) -> Cipher {
    if ek.zero_pool.is_empty() || input.edges.is_empty() {
        return input.clone();
    }

    let mut result = input.clone();

    for round in 0..pk.params.recrypt_rounds {
        if !sigma_needs_balance(pk, &result) {
            break;
        }
        debug!(
            "recrypt round {}: density {:.4}",
            round,
            sigma_density(pk, &result)
        );

        let pick = (rng.next_u64() % ek.zero_pool.len() as u64) as usize;
        result = ct_add(pk, &result, &ek.zero_pool[pick]);
        ubk_apply(pk, &mut result);
        guard_budget(pk, &mut result, "recrypt");
    }

    compact_edges(pk, &mut result);
    compact_layers(&mut result);
    result
}
