//! Public combinatorial structure: the sparse parity-check matrix H, the
//! tag permutation U, and the per-edge tag synthesis. Everything here is
//! a deterministic function of public values (canon_tag, layer nonces,
//! salts); no secret-dependent selection happens in this module.

use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::bitvec::BitVec;
use crate::xof::{choose_k, sha256_label_words, Sha256Ctr};
use crate::{dom, Cipher, Nonce128, Params, PubKey, Sign, Ubk};

/// Generates the n columns of H and their digest. Column c sets
/// `h_col_wt` distinct rows chosen by a counter PRG seeded with
/// `(m, n, wt, c, canon_tag)`; the digest commits to the parameters and
/// every column's byte image.
pub fn gen_h(prm: &Params, canon_tag: u64) -> (Vec<BitVec>, [u8; 32]) {
    let m = prm.m_bits;
    let n = prm.n_bits;
    let wt = prm.h_col_wt;

    let cols: Vec<BitVec> = (0..n)
        .into_par_iter()
        .map(|c| {
            let words = [m as u64, n as u64, wt as u64, c as u64, canon_tag];
            let mut col = BitVec::new(m);
            for r in choose_k(wt, m, dom::H_GEN, &words) {
                col.set(r as usize);
            }
            col
        })
        .collect();

    let mut h = Sha256::new();
    h.update(b"H|v2");
    h.update((m as u64).to_le_bytes());
    h.update((n as u64).to_le_bytes());
    h.update((wt as u64).to_le_bytes());
    for col in &cols {
        h.update(col.to_le_bytes());
    }

    (cols, h.finalize().into())
}

/// Deterministic public permutation of [0, m_bits): Fisher-Yates driven
/// by a counter PRG keyed with canon_tag. The inverse is cached alongside.
pub fn gen_ubk(canon_tag: u64, m_bits: usize) -> Ubk {
    let mut perm: Vec<u32> = (0..m_bits as u32).collect();
    let mut rng = Sha256Ctr::new("UBK", &[canon_tag]);

    for i in (1..m_bits).rev() {
        let j = rng.bounded(i as u64 + 1) as usize;
        perm.swap(i, j);
    }

    let mut inv = vec![0u32; m_bits];
    for (i, &p) in perm.iter().enumerate() {
        inv[p as usize] = i as u32;
    }

    Ubk { perm, inv }
}

/// Routes each set bit of `v` through the inverse permutation.
pub fn apply_perm_tag(v: &BitVec, inv: &[u32]) -> BitVec {
    let mut out = BitVec::new(v.nbits);

    for (wi, &word) in v.words.iter().enumerate() {
        let mut x = word;
        while x != 0 {
            let bit = x.trailing_zeros() as usize;
            let src = (wi << 6) + bit;
            if src < v.nbits {
                out.set(inv[src] as usize);
            }
            x &= x - 1;
        }
    }

    out
}

/// ztag of a base layer: low 64 bits of
/// `SHA-256("pvac.dom.ztag" || canon_tag || nonce)`.
pub fn layer_ztag(canon_tag: u64, nonce: Nonce128) -> u64 {
    let digest = sha256_label_words(dom::ZTAG, &[canon_tag, nonce.lo, nonce.hi]);
    u64::from_le_bytes(digest[..8].try_into().unwrap())
}

/// Synthesizes an edge tag: XOR of `x_col_wt` distinct H columns chosen
/// under the x-seed domain, then `err_wt` extra bit flips under the noise
/// domain, both seeded by the same public 7-tuple. The salt only
/// decorrelates tags of edges sharing `(ztag, nonce, idx, sign)`.
pub fn sigma_from_h(
    pk: &PubKey,
    ztag: u64,
    nonce: Nonce128,
    idx: u16,
    sign: Sign,
    salt: u64,
) -> BitVec {
    let m = pk.params.m_bits;
    let n = pk.params.n_bits;

    let words = [
        pk.canon_tag,
        ztag,
        nonce.lo,
        nonce.hi,
        u64::from(idx),
        u64::from(sign.as_u8()),
        salt,
    ];

    let mut s = BitVec::new(m);

    for c in choose_k(pk.params.x_col_wt, n, dom::X_SEED, &words) {
        s.xor_with(&pk.h_cols[c as usize]);
    }

    for r in choose_k(pk.params.err_wt, m, dom::NOISE, &words) {
        s.flip(r as usize);
    }

    s
}

/// Applies the public permutation to every edge tag of a ciphertext.
/// Decryption ignores tags, so the encoded value is untouched.
pub fn ubk_apply(pk: &PubKey, c: &mut Cipher) {
    for e in &mut c.edges {
        e.tag = apply_perm_tag(&e.tag, &pk.ubk.inv);
    }
}
