//! The LPN-Toeplitz pseudorandom function behind every layer mask.
//!
//! A single core draws `lpn_t` noisy inner products of secret `s` against
//! AES-CTR-generated sample rows, compresses the noisy bit string to 127
//! bits through a Toeplitz matrix, and maps the result into Fp \ {0}.
//! Three cores under independent domains are multiplied; a distinguisher
//! must break all three, cubing its advantage.

use sha2::{Digest, Sha256};

use crate::ctsafe as ct;
use crate::field::{fp_from_words, fp_mul, Fp, FP_ONE, MASK63};
use crate::xof::{fnv1a64, AesCtr256, XofShake};
use crate::{dom, PubKey, RSeed, SecKey};

#[inline(always)]
fn parity64(x: u64) -> u64 {
    u64::from(x.count_ones()) & 1
}

/// Folds 127 bits into a canonical nonzero field element. A zero result
/// is substituted with 1 via a branchless select.
pub fn hash_to_fp_nonzero(lo: u64, hi: u64) -> Fp {
    let r = fp_from_words(lo, hi & MASK63);
    let zero = ct::mask_from_bit(ct::fp_is_zero(&r));
    ct::fp_select(zero, &FP_ONE, &r)
}

/// Key material binding the PRF to the secret keys, the public structure
/// and the layer seed: `prf_k || canon_tag || H_digest || ztag ||
/// nonce.lo || nonce.hi || extra || FNV-1a(dom)`, integers little-endian.
fn prf_material(pk: &PubKey, sk: &SecKey, seed: &RSeed, dom_label: &str, extra: &[u64]) -> Vec<u8> {
    let mut m = Vec::with_capacity(8 * (4 + 4 + extra.len()) + 32);

    for k in &sk.prf_keys {
        m.extend_from_slice(&k.to_le_bytes());
    }
    m.extend_from_slice(&pk.canon_tag.to_le_bytes());
    m.extend_from_slice(&pk.h_digest);
    m.extend_from_slice(&seed.ztag.to_le_bytes());
    m.extend_from_slice(&seed.nonce.lo.to_le_bytes());
    m.extend_from_slice(&seed.nonce.hi.to_le_bytes());
    for x in extra {
        m.extend_from_slice(&x.to_le_bytes());
    }
    m.extend_from_slice(&fnv1a64(dom_label.as_bytes()).to_le_bytes());

    m
}

/// 32-byte stream key and 64-bit stream nonce from the key material.
fn stream_key(material: &[u8]) -> ([u8; 32], u64) {
    let mut h = Sha256::new();
    h.update(dom::PRF_LPN.as_bytes());
    h.update(material);
    h.update(0u64.to_le_bytes());
    let key: [u8; 32] = h.finalize().into();

    let mut h = Sha256::new();
    h.update(dom::PRF_LPN.as_bytes());
    h.update(material);
    h.update(1u64.to_le_bytes());
    let d: [u8; 32] = h.finalize().into();
    let nonce = u64::from_le_bytes(d[..8].try_into().unwrap());

    (key, nonce)
}

/// Produces the `lpn_t` noisy sample bits `y[r] = <row_r, s> ^ e_r` with
/// `e_r` Bernoulli(tau), packed into words.
fn lpn_ybits(pk: &PubKey, sk: &SecKey, seed: &RSeed, dom_label: &str, extra: &[u64]) -> Vec<u64> {
    let t = pk.params.lpn_t;
    let s_words = (pk.params.lpn_n + 63) / 64;
    let num = pk.params.lpn_tau_num;
    let den = pk.params.lpn_tau_den;

    let material = prf_material(pk, sk, seed, dom_label, extra);
    let (key, nonce) = stream_key(&material);
    let mut prg = AesCtr256::new(&key, nonce);

    let mut y = vec![0u64; (t + 63) / 64];

    for r in 0..t {
        let mut dot = 0u64;
        for wi in 0..s_words {
            let row = prg.next_u64();
            dot ^= parity64(row & sk.lpn_s_bits[wi]);
        }

        let e = u64::from(prg.bounded(den) < num);

        y[r >> 6] ^= ((dot ^ e) & 1) << (r & 63);
    }

    y
}

/// Compresses `t` sample bits to 127 output bits: output bit i is the
/// parity of the AND between the samples and the Toeplitz top row
/// shifted by i.
fn toep_127(top: &[u64], y: &[u64], t: usize) -> (u64, u64) {
    let y_words = (t + 63) / 64;
    let mut lo = 0u64;
    let mut hi = 0u64;

    for i in 0..127usize {
        let mut acc = 0u64;
        for (wj, &yw) in y.iter().enumerate().take(y_words) {
            let off = i + (wj << 6);
            let k = off >> 6;
            let sh = off & 63;
            let w_lo = top[k];
            let w_hi = if k + 1 < top.len() { top[k + 1] } else { 0 };
            let window = if sh == 0 {
                w_lo
            } else {
                (w_lo >> sh) | (w_hi << (64 - sh))
            };
            acc ^= window & yw;
        }
        let bit = parity64(acc);
        if i < 64 {
            lo |= bit << i;
        } else {
            hi |= bit << (i - 64);
        }
    }

    (lo, hi)
}

fn prf_core(pk: &PubKey, sk: &SecKey, seed: &RSeed, dom_label: &str, extra: &[u64]) -> Fp {
    let y = lpn_ybits(pk, sk, seed, dom_label, extra);

    // The Toeplitz row is deliberately shared across domains: the y-bit
    // streams already diverge per domain label.
    let mut words = Vec::with_capacity(8 + extra.len());
    words.extend_from_slice(&sk.prf_keys);
    words.push(pk.canon_tag);
    words.push(seed.ztag);
    words.push(seed.nonce.lo);
    words.push(seed.nonce.hi);
    words.extend_from_slice(extra);

    let mut xof = XofShake::new(dom::TOEP, &words);
    let top_words = (pk.params.lpn_t + 127 + 63) / 64;
    let mut top = vec![0u64; top_words];
    for w in &mut top {
        *w = xof.next_u64();
    }

    let (lo, hi) = toep_127(&top, &y, pk.params.lpn_t);
    hash_to_fp_nonzero(lo, hi)
}

/// One LPN-Toeplitz core under the given domain.
pub fn prf_r_core(pk: &PubKey, sk: &SecKey, seed: &RSeed, dom_label: &str) -> Fp {
    prf_core(pk, sk, seed, dom_label, &[])
}

/// # Layer mask PRF
/// Derives the multiplicative mask of a base layer from the secret key
/// and the layer seed.
///
/// ## Algorithm:
/// * `r1 = core("pvac.prf.r.1")`, `r2 = core("pvac.prf.r.2")`,
///   `r3 = core("pvac.prf.r.3")`
/// * `R = r1 * r2 * r3`
///
/// Deterministic in `(sk, pk.canon_tag, pk.H_digest, seed)`; flipping any
/// bit of the seed or key material yields an independent mask with
/// overwhelming probability. Each factor fails distinguishing only with
/// probability <= (2 tau (1 - tau))^(t/n), and the product cubes that.
pub fn prf_r(pk: &PubKey, sk: &SecKey, seed: &RSeed) -> Fp {
    let r1 = prf_r_core(pk, sk, seed, dom::PRF_R1);
    let r2 = prf_r_core(pk, sk, seed, dom::PRF_R2);
    let r3 = prf_r_core(pk, sk, seed, dom::PRF_R3);

    fp_mul(fp_mul(r1, r2), r3)
}

/// Auxiliary per-group delta PRF under the noise domains. Values for
/// distinct `(gid, which)` pairs are independent; `which` selects among
/// the three noise domains.
pub fn prf_noise_delta(pk: &PubKey, sk: &SecKey, seed: &RSeed, gid: u32, which: u32) -> Fp {
    let dom_label = match which % 3 {
        0 => dom::PRF_NOISE1,
        1 => dom::PRF_NOISE2,
        _ => dom::PRF_NOISE3,
    };
    prf_core(pk, sk, seed, dom_label, &[u64::from(gid), u64::from(which)])
}
