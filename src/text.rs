//! Encodes strings as sequences of ciphertexts. Each chunk of up to 14
//! bytes is packed as `len || bytes` into the low 120 bits of a field
//! element, which keeps every chunk canonical, and encrypted at depth 0.

use rand::{CryptoRng, RngCore};

use crate::field::Fp;
use crate::ops::{dec_fp, enc_fp_depth};
use crate::{Cipher, PubKey, PvacError, Result, SecKey};

pub const CHUNK_BYTES: usize = 14;

pub fn enc_text(
    pk: &PubKey,
    sk: &SecKey,
    text: &str,
    rng: &mut (impl RngCore + CryptoRng),
) -> Vec<Cipher> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity((bytes.len() + CHUNK_BYTES - 1) / CHUNK_BYTES);

    for chunk in bytes.chunks(CHUNK_BYTES) {
        let mut buf = [0u8; 16];
        buf[0] = chunk.len() as u8;
        buf[1..1 + chunk.len()].copy_from_slice(chunk);

        let lo = u64::from_le_bytes(buf[..8].try_into().unwrap());
        let hi = u64::from_le_bytes(buf[8..].try_into().unwrap());

        out.push(enc_fp_depth(pk, sk, Fp { lo, hi }, 0, rng));
    }

    out
}

pub fn dec_text(pk: &PubKey, sk: &SecKey, cts: &[Cipher]) -> Result<String> {
    let mut bytes = Vec::with_capacity(cts.len() * CHUNK_BYTES);

    for c in cts {
        let v = dec_fp(pk, sk, c)?;

        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&v.lo.to_le_bytes());
        buf[8..].copy_from_slice(&v.hi.to_le_bytes());

        let len = buf[0] as usize;
        if len == 0 || len > CHUNK_BYTES {
            return Err(PvacError::Decode(format!(
                "corrupt text chunk length {}",
                len
            )));
        }

        bytes.extend_from_slice(&buf[1..1 + len]);
    }

    String::from_utf8(bytes).map_err(|_| PvacError::Decode("text is not valid UTF-8".to_string()))
}
