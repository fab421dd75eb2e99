//! SHA-256 commitments to whole ciphertexts. Two encryptions of the same
//! value commit differently (the weights and nonces differ), and any
//! edit to layers or edges changes the digest.

use sha2::{Digest, Sha256};

use crate::{dom, Cipher, Layer, PubKey};

/// 32-byte commitment to a ciphertext under the public canon tag.
pub fn commit_ct(pk: &PubKey, c: &Cipher) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(dom::COMMIT.as_bytes());
    h.update(pk.canon_tag.to_le_bytes());
    h.update((c.layers.len() as u64).to_le_bytes());
    h.update((c.edges.len() as u64).to_le_bytes());

    for layer in &c.layers {
        match layer {
            Layer::Base { seed } => {
                h.update([0u8]);
                h.update(seed.ztag.to_le_bytes());
                h.update(seed.nonce.lo.to_le_bytes());
                h.update(seed.nonce.hi.to_le_bytes());
            }
            Layer::Prod { pa, pb, .. } => {
                h.update([1u8]);
                h.update(pa.to_le_bytes());
                h.update(pb.to_le_bytes());
            }
        }
    }

    for e in &c.edges {
        h.update(e.layer_id.to_le_bytes());
        h.update(e.idx.to_le_bytes());
        h.update([e.sign.as_u8(), 0]);
        h.update(e.weight.lo.to_le_bytes());
        h.update(e.weight.hi.to_le_bytes());
        h.update(e.tag.to_le_bytes());
    }

    h.finalize().into()
}
