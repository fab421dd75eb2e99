//! Fresh-ciphertext construction and the shared housekeeping every
//! homomorphic operation leans on: noise planning, tag-density probing,
//! edge/layer compaction, and the edge-budget guard.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use rand::{CryptoRng, RngCore};

use crate::bitvec::BitVec;
use crate::ctsafe as ct;
use crate::field::{
    fp_add, fp_from_u64, fp_inv, fp_mul, fp_neg, fp_sub, rand_fp_nonzero, Fp, FP_ZERO,
};
use crate::lpn::prf_r;
use crate::matrix::{layer_ztag, sigma_from_h};
use crate::{Cipher, Edge, Layer, Nonce128, PubKey, RSeed, SecKey, Sign};

/// Splits the depth-scaled entropy budget into counts of 2-tuples and
/// 3-tuples: `budget = noise_entropy_bits + depth_slope_bits * max(0, d)`
/// spent at `2 log2 B` bits per 2-tuple and `3 log2 B` per 3-tuple.
pub fn plan_noise(pk: &PubKey, depth_hint: i32) -> (usize, usize) {
    let prm = &pk.params;
    let budget = prm.noise_entropy_bits + prm.depth_slope_bits * f64::from(depth_hint.max(0));

    let per2 = (2.0 * f64::from(prm.b).log2()).max(1e-6);
    let per3 = (3.0 * f64::from(prm.b).log2()).max(1e-6);

    let z2 = ((budget * prm.tuple2_fraction) / per2).floor().max(0.0) as usize;
    let z3 = ((budget * (1.0 - prm.tuple2_fraction)) / per3).floor().max(0.0) as usize;

    (z2, z3)
}

/// Fraction of set tag bits across all edges.
pub fn sigma_density(pk: &PubKey, c: &Cipher) -> f64 {
    if c.edges.is_empty() {
        return 0.0;
    }

    let ones: u64 = c.edges.iter().map(|e| e.tag.popcount()).sum();
    let total = (c.edges.len() * pk.params.m_bits) as f64;

    ones as f64 / total
}

/// Aggregates edges per `(layer, idx, sign)`: weights via field addition,
/// tags via XOR. Aggregates that vanish in both weight and tag are
/// dropped. Compaction must preserve canonical weights; anything else is
/// a bug.
pub fn compact_edges(pk: &PubKey, c: &mut Cipher) {
    let mut acc: BTreeMap<(u32, u16, u8), (Fp, BitVec)> = BTreeMap::new();

    for e in &c.edges {
        let key = (e.layer_id, e.idx, e.sign.as_u8());
        match acc.get_mut(&key) {
            Some((w, tag)) => {
                *w = fp_add(*w, e.weight);
                tag.xor_with(&e.tag);
            }
            None => {
                acc.insert(key, (e.weight, e.tag.clone()));
            }
        }
    }

    let mut out = Vec::with_capacity(acc.len());
    for ((layer_id, idx, sign), (weight, tag)) in acc {
        if ct::fp_is_nonzero(&weight) == 0 && tag.popcount() == 0 {
            continue;
        }
        let sign = Sign::from_u8(sign).expect("aggregation key holds a valid sign");
        out.push(Edge {
            layer_id,
            idx,
            sign,
            weight,
            tag,
        });
    }

    c.edges = out;
}

/// Drops layers no edge can reach. A layer is live if an edge sits on it
/// or a live product layer references it; the rest are removed and the
/// surviving ids rewritten.
pub fn compact_layers(c: &mut Cipher) {
    let n = c.layers.len();
    if n == 0 {
        return;
    }

    let mut used = vec![false; n];
    for e in &c.edges {
        if (e.layer_id as usize) < n {
            used[e.layer_id as usize] = true;
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for lid in 0..n {
            if !used[lid] {
                continue;
            }
            if let Layer::Prod { pa, pb, .. } = c.layers[lid] {
                for p in [pa as usize, pb as usize] {
                    if p < n && !used[p] {
                        used[p] = true;
                        changed = true;
                    }
                }
            }
        }
    }

    if used.iter().all(|&u| u) {
        return;
    }

    let mut remap = vec![u32::MAX; n];
    let mut layers = Vec::with_capacity(n);
    for (lid, layer) in c.layers.iter().enumerate() {
        if used[lid] {
            remap[lid] = layers.len() as u32;
            layers.push(layer.clone());
        }
    }

    for layer in &mut layers {
        if let Layer::Prod { pa, pb, .. } = layer {
            *pa = remap[*pa as usize];
            *pb = remap[*pb as usize];
        }
    }
    for e in &mut c.edges {
        e.layer_id = remap[e.layer_id as usize];
    }

    c.layers = layers;
}

/// Compacts when the edge count breaches the configured budget.
pub fn guard_budget(pk: &PubKey, c: &mut Cipher, where_: &str) {
    if c.edges.len() > pk.params.edge_budget {
        debug!("guard[{}]: {} edges -> compact", where_, c.edges.len());
        compact_edges(pk, c);
    }
}

fn fresh_base_layer(pk: &PubKey, rng: &mut (impl RngCore + CryptoRng)) -> Layer {
    let nonce = Nonce128::random(rng);
    let ztag = layer_ztag(pk.canon_tag, nonce);
    Layer::Base {
        seed: RSeed { ztag, nonce },
    }
}

fn push_edge(
    pk: &PubKey,
    seed: &RSeed,
    idx: u16,
    sign: Sign,
    weight: Fp,
    rng: &mut (impl RngCore + CryptoRng),
    edges: &mut Vec<Edge>,
) {
    let tag = sigma_from_h(pk, seed.ztag, seed.nonce, idx, sign, rng.next_u64());
    edges.push(Edge {
        layer_id: 0,
        idx,
        sign,
        weight,
        tag,
    });
}

/// Appends `z2` 2-tuples and `z3` 3-tuples of masked noise to layer 0.
/// Each tuple cancels in the weighted generator sum, the quantity
/// decryption reads, so the encoded value is untouched.
fn push_noise_tuples(
    pk: &PubKey,
    seed: &RSeed,
    mask: Fp,
    z2: usize,
    z3: usize,
    rng: &mut (impl RngCore + CryptoRng),
    edges: &mut Vec<Edge>,
) {
    let b = u64::from(pk.params.b);

    for _ in 0..z2 {
        let i = (rng.next_u64() % b) as usize;
        let j = loop {
            let j = (rng.next_u64() % b) as usize;
            if j != i {
                break j;
            }
        };

        // (+, i, alpha) and (-, j, alpha g^i g^-j): the weighted terms
        // are equal, so the signed pair sums to zero.
        let alpha = rand_fp_nonzero(rng);
        let gamma = fp_mul(alpha, fp_mul(pk.pow_g[i], fp_inv(pk.pow_g[j])));

        push_edge(pk, seed, i as u16, Sign::Plus, fp_mul(alpha, mask), rng, edges);
        push_edge(pk, seed, j as u16, Sign::Minus, fp_mul(gamma, mask), rng, edges);
    }

    for _ in 0..z3 {
        let i = (rng.next_u64() % b) as usize;
        let j = loop {
            let j = (rng.next_u64() % b) as usize;
            if j != i {
                break j;
            }
        };
        let k = loop {
            let k = (rng.next_u64() % b) as usize;
            if k != i && k != j {
                break k;
            }
        };

        // gamma = -(alpha g^i + beta g^j) g^-k closes the triple.
        let alpha = rand_fp_nonzero(rng);
        let beta = rand_fp_nonzero(rng);
        let sum = fp_add(fp_mul(alpha, pk.pow_g[i]), fp_mul(beta, pk.pow_g[j]));
        let gamma = fp_mul(fp_neg(sum), fp_inv(pk.pow_g[k]));

        push_edge(pk, seed, i as u16, Sign::Plus, fp_mul(alpha, mask), rng, edges);
        push_edge(pk, seed, j as u16, Sign::Plus, fp_mul(beta, mask), rng, edges);
        push_edge(pk, seed, k as u16, Sign::Plus, fp_mul(gamma, mask), rng, edges);
    }
}

/// # Encryption
/// Builds a fresh single-layer ciphertext of `v` at depth hint `d`.
///
/// ## Algorithm:
/// * create one base layer with a fresh nonce and its mask R = prf_r
/// * choose 8 distinct indices and random signs; draw the first six
///   weights at random
/// * solve the 2x2 system over Fp so the two remaining weights give the
///   eight edges a zero signed sum and a signed weighted generator sum
///   of exactly `v`
/// * emit the edges with weights scaled by R and fresh tags
/// * append the planned balanced noise tuples and guard the edge budget
///
/// The system is solvable because the two closing indices are distinct
/// and g has order B, so `g^ia != g^ib`.
pub fn enc_fp_depth(
    pk: &PubKey,
    sk: &SecKey,
    v: Fp,
    depth_hint: i32,
    rng: &mut (impl RngCore + CryptoRng),
) -> Cipher {
    const S: usize = 8;

    let layer = fresh_base_layer(pk, rng);
    let seed = *layer.seed();
    let mut c = Cipher {
        layers: vec![layer],
        edges: Vec::new(),
    };

    let b = u64::from(pk.params.b);

    let mut idx = [0u16; S];
    let mut used = HashSet::with_capacity(S * 2);
    for slot in idx.iter_mut() {
        *slot = loop {
            let x = (rng.next_u64() % b) as u16;
            if used.insert(x) {
                break x;
            }
        };
    }

    let mut signs = [Sign::Plus; S];
    for s in signs.iter_mut() {
        *s = Sign::random(rng);
    }

    let mut r = [FP_ZERO; S];
    let mut sum1 = FP_ZERO;
    let mut sumg = FP_ZERO;

    for j in 0..S - 2 {
        r[j] = rand_fp_nonzero(rng);
        let term = fp_mul(r[j], pk.pow_g[idx[j] as usize]);
        match signs[j] {
            Sign::Plus => {
                sum1 = fp_add(sum1, r[j]);
                sumg = fp_add(sumg, term);
            }
            Sign::Minus => {
                sum1 = fp_sub(sum1, r[j]);
                sumg = fp_sub(sumg, term);
            }
        }
    }

    let ga = pk.pow_g[idx[S - 2] as usize];
    let gb = pk.pow_g[idx[S - 1] as usize];
    let sa = signs[S - 2];
    let sb = signs[S - 1];

    let v_rem = fp_sub(v, sumg);
    let rhs = fp_sub(fp_neg(fp_mul(sum1, ga)), v_rem);
    let den = fp_sub(ga, gb);

    let mut rb = fp_mul(rhs, fp_inv(den));
    if sb == Sign::Minus {
        rb = fp_neg(rb);
    }

    let tmp = match sb {
        Sign::Plus => fp_sub(fp_neg(sum1), rb),
        Sign::Minus => fp_add(fp_neg(sum1), rb),
    };
    let ra = match sa {
        Sign::Plus => tmp,
        Sign::Minus => fp_neg(tmp),
    };

    r[S - 2] = ra;
    r[S - 1] = rb;

    let mask = prf_r(pk, sk, &seed);

    for j in 0..S {
        push_edge(
            pk,
            &seed,
            idx[j],
            signs[j],
            fp_mul(r[j], mask),
            rng,
            &mut c.edges,
        );
    }

    let (z2, z3) = plan_noise(pk, depth_hint);
    push_noise_tuples(pk, &seed, mask, z2, z3, rng, &mut c.edges);

    guard_budget(pk, &mut c, "enc");

    c
}

pub fn enc_value_depth(
    pk: &PubKey,
    sk: &SecKey,
    v: u64,
    depth_hint: i32,
    rng: &mut (impl RngCore + CryptoRng),
) -> Cipher {
    enc_fp_depth(pk, sk, fp_from_u64(v), depth_hint, rng)
}

pub fn enc_value(pk: &PubKey, sk: &SecKey, v: u64, rng: &mut (impl RngCore + CryptoRng)) -> Cipher {
    enc_value_depth(pk, sk, v, 0, rng)
}

/// A ciphertext of zero: one base layer carrying only balanced noise
/// tuples. Folding it into another ciphertext re-randomizes without
/// changing the encoded value.
pub fn enc_zero_depth(
    pk: &PubKey,
    sk: &SecKey,
    depth_hint: i32,
    rng: &mut (impl RngCore + CryptoRng),
) -> Cipher {
    let layer = fresh_base_layer(pk, rng);
    let seed = *layer.seed();
    let mut c = Cipher {
        layers: vec![layer],
        edges: Vec::new(),
    };

    let mask = prf_r(pk, sk, &seed);
    let (z2, z3) = plan_noise(pk, depth_hint);
    push_noise_tuples(pk, &seed, mask, z2, z3, rng, &mut c.edges);

    c
}
