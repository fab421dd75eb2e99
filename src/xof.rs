//! Deterministic randomness plumbing: a counter-mode SHA-256 generator
//! for public index selection, a SHAKE-256 XOF for wide derivations, and
//! an AES-256-CTR stream for the LPN inner loop where throughput matters.
//!
//! All three expose the same `bounded(M)` sampler: rejection against
//! `u64::MAX - (u64::MAX % M)`, so the output is uniform in [0, M) and
//! the retry pattern depends only on public stream content.

use std::collections::HashSet;

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use ctr::Ctr128BE;
use sha2::{Digest, Sha256};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Shake256, Shake256Reader};

type Aes256Ctr = Ctr128BE<Aes256>;

/// FNV-1a over a byte string; used to fold domain labels into 64-bit
/// key-material words.
pub fn fnv1a64(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in data {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}

/// SHA-256 of `label` followed by each word little-endian.
pub fn sha256_label_words(label: &str, words: &[u64]) -> [u8; 32] {
    let mut h = Sha256::new();
    Digest::update(&mut h, label.as_bytes());
    for w in words {
        Digest::update(&mut h, w.to_le_bytes());
    }
    h.finalize().into()
}

fn bounded_from(mut next: impl FnMut() -> u64, m: u64) -> u64 {
    if m <= 1 {
        return 0;
    }
    let lim = u64::MAX - (u64::MAX % m);
    loop {
        let x = next();
        if x <= lim {
            return x % m;
        }
    }
}

/// Counter-mode SHA-256 generator seeded by a label and a word list.
/// Block r is `SHA-256(label || words || r)`; 32 bytes per refill.
pub struct Sha256Ctr {
    prefix: Vec<u8>,
    ctr: u64,
    buf: [u8; 32],
    pos: usize,
}

impl Sha256Ctr {
    pub fn new(label: &str, words: &[u64]) -> Sha256Ctr {
        let mut prefix = Vec::with_capacity(label.len() + words.len() * 8);
        prefix.extend_from_slice(label.as_bytes());
        for w in words {
            prefix.extend_from_slice(&w.to_le_bytes());
        }
        Sha256Ctr {
            prefix,
            ctr: 0,
            buf: [0; 32],
            pos: 32,
        }
    }

    fn refill(&mut self) {
        let mut h = Sha256::new();
        Digest::update(&mut h, &self.prefix);
        Digest::update(&mut h, self.ctr.to_le_bytes());
        self.ctr += 1;
        self.buf.copy_from_slice(&h.finalize());
        self.pos = 0;
    }

    pub fn next_u64(&mut self) -> u64 {
        if self.pos >= 32 {
            self.refill();
        }
        let x = u64::from_le_bytes(self.buf[self.pos..self.pos + 8].try_into().unwrap());
        self.pos += 8;
        x
    }

    pub fn bounded(&mut self, m: u64) -> u64 {
        bounded_from(|| self.next_u64(), m)
    }
}

/// Selects `k` distinct indices from [0, n), deterministically in
/// `(label, words)`.
pub fn choose_k(k: usize, n: usize, label: &str, words: &[u64]) -> Vec<u32> {
    let mut rng = Sha256Ctr::new(label, words);
    let mut used = HashSet::with_capacity(k * 2 + 1);
    let mut out = Vec::with_capacity(k);

    while out.len() < k {
        let x = rng.bounded(n as u64) as u32;
        if used.insert(x) {
            out.push(x);
        }
    }

    out
}

/// SHAKE-256 extendable-output stream seeded with a domain string and a
/// word list.
pub struct XofShake {
    reader: Shake256Reader,
}

impl XofShake {
    pub fn new(domain: &str, words: &[u64]) -> XofShake {
        let mut h = Shake256::default();
        h.update(domain.as_bytes());
        for w in words {
            h.update(&w.to_le_bytes());
        }
        XofShake {
            reader: h.finalize_xof(),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut b = [0u8; 8];
        self.reader.read(&mut b);
        u64::from_le_bytes(b)
    }

    pub fn bounded(&mut self, m: u64) -> u64 {
        bounded_from(|| self.next_u64(), m)
    }
}

/// AES-256-CTR keystream generator. The IV is the 64-bit nonce in the
/// leading bytes; the big-endian block counter lives in the trailing
/// bytes and never carries into the nonce at our stream lengths.
pub struct AesCtr256 {
    stream: Aes256Ctr,
    buf: [u8; 64],
    pos: usize,
}

impl AesCtr256 {
    pub fn new(key: &[u8; 32], nonce: u64) -> AesCtr256 {
        let mut iv = [0u8; 16];
        iv[..8].copy_from_slice(&nonce.to_le_bytes());
        AesCtr256 {
            stream: Aes256Ctr::new(&(*key).into(), &iv.into()),
            buf: [0; 64],
            pos: 64,
        }
    }

    fn refill(&mut self) {
        self.buf = [0; 64];
        self.stream.apply_keystream(&mut self.buf);
        self.pos = 0;
    }

    pub fn next_u64(&mut self) -> u64 {
        if self.pos >= 64 {
            self.refill();
        }
        let x = u64::from_le_bytes(self.buf[self.pos..self.pos + 8].try_into().unwrap());
        self.pos += 8;
        x
    }

    pub fn fill_u64(&mut self, dst: &mut [u64]) {
        for d in dst {
            *d = self.next_u64();
        }
    }

    pub fn bounded(&mut self, m: u64) -> u64 {
        bounded_from(|| self.next_u64(), m)
    }
}
