//! Decryption: reconstruct every layer's mask, divide it out of the
//! layer's signed weighted generator sum, and evaluate the layer DAG.

use crate::ctsafe as ct;
use crate::field::{fp_add, fp_inv, fp_mul, fp_sub, Fp, FP_ZERO};
use crate::lpn::prf_r;
use crate::{Cipher, Layer, PubKey, PvacError, Result, SecKey, Sign};

/// # Decryption
/// Recovers the field element a ciphertext encodes.
///
/// ## Algorithm:
/// * walk the layer arena in order: a base layer's mask is
///   `prf_r(seed)`, a product layer's is `R[pa] * R[pb]` (references
///   must point to earlier layers)
/// * accumulate each layer's `S = sum of sign * weight * g^idx` over its
///   edges
/// * the plaintext is `sum over layers of S / R`, the evaluation of the
///   sum-of-products DAG; a single fresh layer reduces to `S_0 / R_0`
///
/// ## Returns:
/// * the encoded element, or `PvacError::Decode` on a dangling layer
///   reference, an out-of-table index, or a zero mask.
pub fn dec_fp(pk: &PubKey, sk: &SecKey, c: &Cipher) -> Result<Fp> {
    let n = c.layers.len();

    let mut masks: Vec<Fp> = Vec::with_capacity(n);
    for (lid, layer) in c.layers.iter().enumerate() {
        let r = match layer {
            Layer::Base { seed } => prf_r(pk, sk, seed),
            Layer::Prod { pa, pb, .. } => {
                let (pa, pb) = (*pa as usize, *pb as usize);
                if pa >= lid || pb >= lid {
                    return Err(PvacError::Decode(format!(
                        "layer {} references a non-earlier layer",
                        lid
                    )));
                }
                fp_mul(masks[pa], masks[pb])
            }
        };
        masks.push(r);
    }

    let mut sums = vec![FP_ZERO; n];
    for e in &c.edges {
        let lid = e.layer_id as usize;
        if lid >= n {
            return Err(PvacError::Decode(format!(
                "edge references missing layer {}",
                e.layer_id
            )));
        }
        if usize::from(e.idx) >= pk.pow_g.len() {
            return Err(PvacError::Decode(format!(
                "edge index {} outside the generator table",
                e.idx
            )));
        }

        let term = fp_mul(e.weight, pk.pow_g[usize::from(e.idx)]);
        sums[lid] = match e.sign {
            Sign::Plus => fp_add(sums[lid], term),
            Sign::Minus => fp_sub(sums[lid], term),
        };
    }

    let mut acc = FP_ZERO;
    for (lid, s) in sums.iter().enumerate() {
        if ct::fp_is_zero(s) != 0 {
            continue;
        }
        if ct::fp_is_zero(&masks[lid]) != 0 {
            return Err(PvacError::Decode(format!("zero mask on layer {}", lid)));
        }
        acc = fp_add(acc, fp_mul(*s, fp_inv(masks[lid])));
    }

    Ok(acc)
}

/// Convenience wrapper over [`dec_fp`] for ciphertexts of small values.
pub fn dec_value(pk: &PubKey, sk: &SecKey, c: &Cipher) -> Result<Fp> {
    dec_fp(pk, sk, c)
}
