//! Homomorphic arithmetic. Addition concatenates layer arenas and edge
//! lists, scaling multiplies every weight, and multiplication builds the
//! cartesian product of the operands' layers with aggregated product
//! edges. All operations are total on well-formed ciphertexts.

use std::collections::HashMap;

use rand::{CryptoRng, RngCore};

use crate::ctsafe as ct;
use crate::field::{fp_add, fp_inv, fp_mul, fp_neg, Fp, FP_ONE};
use crate::matrix::{layer_ztag, sigma_from_h};
use crate::ops::encrypt::{compact_layers, guard_budget};
use crate::{Cipher, Edge, Layer, Nonce128, PubKey, PvacError, RSeed, Result, Sign};

fn shifted(layer: &Layer, off: u32) -> Layer {
    match layer {
        Layer::Prod { seed, pa, pb } => Layer::Prod {
            seed: *seed,
            pa: pa + off,
            pb: pb + off,
        },
        base => base.clone(),
    }
}

/// Sum of two ciphertexts: B's layers (product references shifted) and
/// edges are appended after A's. The per-layer structure is untouched, so
/// decryption sees `v_a + v_b`.
pub fn ct_add(pk: &PubKey, a: &Cipher, b: &Cipher) -> Cipher {
    let mut c = Cipher {
        layers: Vec::with_capacity(a.layers.len() + b.layers.len()),
        edges: Vec::with_capacity(a.edges.len() + b.edges.len()),
    };

    c.layers.extend(a.layers.iter().cloned());
    let off = a.layers.len() as u32;
    c.layers.extend(b.layers.iter().map(|l| shifted(l, off)));

    c.edges.extend(a.edges.iter().cloned());
    for e in &b.edges {
        let mut e = e.clone();
        e.layer_id += off;
        c.edges.push(e);
    }

    guard_budget(pk, &mut c, "add");
    compact_layers(&mut c);
    c
}

/// Multiplies every edge weight by `s`; both the signed sum and the
/// weighted sum scale by `s`, so the plaintext becomes `v * s`.
pub fn ct_scale(_pk: &PubKey, a: &Cipher, s: Fp) -> Cipher {
    let mut c = a.clone();
    for e in &mut c.edges {
        e.weight = fp_mul(e.weight, s);
    }
    c
}

pub fn ct_neg(pk: &PubKey, a: &Cipher) -> Cipher {
    ct_scale(pk, a, fp_neg(FP_ONE))
}

pub fn ct_sub(pk: &PubKey, a: &Cipher, b: &Cipher) -> Cipher {
    ct_add(pk, a, &ct_neg(pk, b))
}

/// # Ciphertext multiplication
/// Appends both operands' layer arenas, then one fresh product layer per
/// layer pair `(la, lb)`. Every edge pair multiplies into its pair layer
/// at index `(ia + ib) mod B` with sign `sa XNOR sb` and weight
/// `wa * wb`; contributions are aggregated per `(layer, idx, sign)` and
/// emitted once with a fresh tag.
///
/// If layer `la` carries `R_a * V_a` in its weighted sum and `lb` carries
/// `R_b * V_b`, the aggregated pair layer carries `R_a R_b V_a V_b` --
/// exactly what decryption divides by that layer's mask
/// `R[la] * R[lb]`.
pub fn ct_mul(
    pk: &PubKey,
    a: &Cipher,
    b: &Cipher,
    rng: &mut (impl RngCore + CryptoRng),
) -> Cipher {
    let la = a.layers.len() as u32;
    let lb = b.layers.len() as u32;

    let mut c = Cipher::default();
    c.layers.extend(a.layers.iter().cloned());
    let off = la;
    c.layers.extend(b.layers.iter().map(|l| shifted(l, off)));

    let base = c.layers.len() as u32;
    for pa in 0..la {
        for pb in 0..lb {
            let nonce = Nonce128::random(rng);
            let seed = RSeed {
                ztag: layer_ztag(pk.canon_tag, nonce),
                nonce,
            };
            c.layers.push(Layer::Prod {
                seed,
                pa,
                pb: off + pb,
            });
        }
    }

    let bmod = pk.params.b;
    let mut acc: HashMap<(u32, u16), [Option<Fp>; 2]> =
        HashMap::with_capacity(a.edges.len() * b.edges.len());

    for ea in &a.edges {
        for eb in &b.edges {
            let pair = ea.layer_id * lb + eb.layer_id;
            let idx = ((u32::from(ea.idx) + u32::from(eb.idx)) % bmod) as u16;
            let s = usize::from(ea.sign != eb.sign);
            let w = fp_mul(ea.weight, eb.weight);

            let slot = &mut acc.entry((pair, idx)).or_insert([None, None])[s];
            *slot = Some(match *slot {
                Some(x) => fp_add(x, w),
                None => w,
            });
        }
    }

    let mut items: Vec<_> = acc.into_iter().collect();
    items.sort_unstable_by_key(|&(key, _)| key);

    for ((pair, idx), buckets) in items {
        let lid = base + pair;
        let seed = *c.layers[lid as usize].seed();

        for (s, w) in buckets.iter().enumerate() {
            let w = match w {
                Some(w) if ct::fp_is_nonzero(w) != 0 => *w,
                _ => continue,
            };
            let sign = if s == 0 { Sign::Plus } else { Sign::Minus };
            c.edges.push(Edge {
                layer_id: lid,
                idx,
                sign,
                weight: w,
                tag: sigma_from_h(pk, seed.ztag, seed.nonce, idx, sign, rng.next_u64()),
            });
        }
    }

    guard_budget(pk, &mut c, "mul");
    compact_layers(&mut c);
    c
}

/// Division by a public constant: scaling by `k^-1`.
pub fn ct_div_const(pk: &PubKey, a: &Cipher, k: Fp) -> Result<Cipher> {
    if ct::fp_is_zero(&k) != 0 {
        return Err(PvacError::Param("division by zero constant".to_string()));
    }
    Ok(ct_scale(pk, a, fp_inv(k)))
}
