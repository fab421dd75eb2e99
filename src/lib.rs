//! # pvac
//!
//! A symmetric homomorphic encryption engine over the Mersenne field
//! Fp = 2^127 - 1. Ciphertexts support unbounded additions, subtractions
//! and scalar multiplications plus a bounded number of multiplications,
//! while the plaintext hides behind three independent layers of
//! structural noise:
//!
//! * a multiplicative masking scalar `R` derived per layer from an
//!   LPN-based pseudorandom function,
//! * an algebraically balanced hypergraph of signed, weighted edges whose
//!   generator sums telescope to the plaintext,
//! * a sparse bit-vector tag per edge drawn from a public parity-check
//!   matrix.
//!
//! The usual flow is [`keygen::keygen`] -> [`ops::enc_value`] ->
//! homomorphic ops in [`ops`] -> [`ops::dec_value`], with
//! [`ops::ct_recrypt`] restoring tag balance after heavy algebra.
//! Randomness is an injected capability: every randomized operation takes
//! an `RngCore + CryptoRng` handle, so deterministic tests can pass a
//! seeded generator while production callers pass `rand::rngs::OsRng`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bitvec;
pub mod commit;
pub mod ctsafe;
pub mod field;
pub mod keygen;
pub mod lpn;
pub mod matrix;
pub mod metrics;
pub mod ops;
pub mod serial;
pub mod text;
pub mod xof;

pub use bitvec::BitVec;
pub use field::Fp;
pub use keygen::keygen;
pub use ops::{
    ct_add, ct_div_const, ct_mul, ct_neg, ct_recrypt, ct_scale, ct_sub, dec_fp, dec_value,
    enc_value, enc_value_depth, make_evalkey,
};

/// Domain-separation labels. Streams that share seed material are split
/// by these fixed strings; changing any of them is a wire-format break.
pub mod dom {
    pub const H_GEN: &str = "pvac.dom.h_gen";
    pub const X_SEED: &str = "pvac.dom.x_seed";
    pub const NOISE: &str = "pvac.dom.noise";

    pub const PRF_LPN: &str = "pvac.dom.prf_lpn";
    pub const TOEP: &str = "pvac.dom.toeplitz";

    pub const ZTAG: &str = "pvac.dom.ztag";
    pub const COMMIT: &str = "pvac.dom.commit";

    pub const PRF_R1: &str = "pvac.prf.r.1";
    pub const PRF_R2: &str = "pvac.prf.r.2";
    pub const PRF_R3: &str = "pvac.prf.r.3";

    pub const PRF_NOISE1: &str = "pvac.prf.noise.1";
    pub const PRF_NOISE2: &str = "pvac.prf.noise.2";
    pub const PRF_NOISE3: &str = "pvac.prf.noise.3";
}

/// Error taxonomy of the crate. Invariant violations inside the library
/// (compaction producing a non-canonical element, impossible layer
/// states) are bugs and panic instead of surfacing here.
#[derive(Debug, Error)]
pub enum PvacError {
    /// Rejected configuration: B does not divide p - 1, dimensions out of
    /// the supported ranges, and similar.
    #[error("parameter error: {0}")]
    Param(String),

    /// Underlying I/O failure, including truncated streams.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A reader met a wrong magic number or version.
    #[error("format error: {0}")]
    Format(String),

    /// Decryption observed an impossible state: a zero mask or a layer
    /// DAG with dangling references.
    #[error("decode error: {0}")]
    Decode(String),

    /// An externally supplied field element was outside the canonical
    /// range.
    #[error("non-canonical field element")]
    NonCanonical,
}

pub type Result<T> = std::result::Result<T, PvacError>;

/// Scheme configuration. The defaults are the supported parameter set;
/// deviating from them requires understanding why each bound holds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Params {
    /// Order of the multiplicative subgroup carrying plaintext positions.
    /// A small prime dividing p - 1; it is a carrier of the homomorphic
    /// structure, not a discrete-log hardness assumption.
    pub b: u32,

    /// Tag length in bits.
    pub m_bits: usize,
    /// Number of parity-check columns.
    pub n_bits: usize,
    /// Rows set per H column.
    pub h_col_wt: usize,
    /// H columns XORed per tag.
    pub x_col_wt: usize,
    /// Extra noise bits flipped per tag.
    pub err_wt: usize,

    /// Entropy budget for the balanced noise tuples of a fresh layer.
    pub noise_entropy_bits: f64,
    /// Share of the noise budget spent on 2-tuples.
    pub tuple2_fraction: f64,
    /// Additional noise bits granted per unit of depth hint.
    pub depth_slope_bits: f64,
    /// Hard cap on the edge count; breaching it forces compaction.
    pub edge_budget: usize,

    /// LPN secret length in bits.
    pub lpn_n: usize,
    /// LPN samples per PRF evaluation.
    pub lpn_t: usize,
    /// Bernoulli noise rate numerator (tau = num / den).
    pub lpn_tau_num: u64,
    /// Bernoulli noise rate denominator.
    pub lpn_tau_den: u64,

    /// Tag-density band targeted by recrypt.
    pub recrypt_lo: f64,
    pub recrypt_hi: f64,
    /// Maximum zero-cipher folds per recrypt call.
    pub recrypt_rounds: u32,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            b: 337,

            m_bits: 8192,
            n_bits: 16384,
            h_col_wt: 192,
            x_col_wt: 128,
            err_wt: 128,

            noise_entropy_bits: 120.0,
            tuple2_fraction: 0.55,
            depth_slope_bits: 16.0,
            edge_budget: 1_200_000,

            // tau = 1/8: ~200+ bits classical, ~100+ bits quantum for
            // n = 4096, t = 16384.
            lpn_n: 4096,
            lpn_t: 16384,
            lpn_tau_num: 1,
            lpn_tau_den: 8,

            recrypt_lo: 0.495,
            recrypt_hi: 0.505,
            recrypt_rounds: 8,
        }
    }
}

/// Random 128-bit nonce for layer-level domain separation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce128 {
    pub lo: u64,
    pub hi: u64,
}

impl Nonce128 {
    pub fn random(rng: &mut (impl rand::RngCore + rand::CryptoRng)) -> Nonce128 {
        Nonce128 {
            lo: rng.next_u64(),
            hi: rng.next_u64(),
        }
    }
}

/// Seed attached to every base layer; `ztag` is derived from the public
/// `canon_tag` and the nonce (see [`matrix::layer_ztag`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RSeed {
    pub ztag: u64,
    pub nonce: Nonce128,
}

impl RSeed {
    pub const ZERO: RSeed = RSeed {
        ztag: 0,
        nonce: Nonce128 { lo: 0, hi: 0 },
    };
}

/// Edge orientation within a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Sign {
    Plus = 0,
    Minus = 1,
}

impl Sign {
    pub fn from_u8(v: u8) -> Option<Sign> {
        match v {
            0 => Some(Sign::Plus),
            1 => Some(Sign::Minus),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn random(rng: &mut (impl rand::RngCore + rand::CryptoRng)) -> Sign {
        if rng.next_u64() & 1 == 0 {
            Sign::Plus
        } else {
            Sign::Minus
        }
    }
}

/// A ciphertext layer. `Base` owns a seed from which its mask
/// R = prf_r(seed) is derived; `Prod` denotes the product of two earlier
/// layers (R = R\[pa\] * R\[pb\]). The layer list is a DAG by
/// construction: product layers only reference smaller indices.
///
/// A product layer carries a seed too, but only to give its aggregated
/// edges fresh tags at creation time; the seed is not serialized.
#[derive(Clone, Debug)]
pub enum Layer {
    Base { seed: RSeed },
    Prod { seed: RSeed, pa: u32, pb: u32 },
}

impl Layer {
    pub fn seed(&self) -> &RSeed {
        match self {
            Layer::Base { seed } => seed,
            Layer::Prod { seed, .. } => seed,
        }
    }
}

/// A signed, weighted, tagged contribution within one layer.
#[derive(Clone, Debug)]
pub struct Edge {
    pub layer_id: u32,
    pub idx: u16,
    pub sign: Sign,
    pub weight: Fp,
    pub tag: BitVec,
}

/// A ciphertext: a layer arena plus the edge multiset over it. Value
/// semantics; homomorphic operations consume references and return new
/// instances.
#[derive(Clone, Debug, Default)]
pub struct Cipher {
    pub layers: Vec<Layer>,
    pub edges: Vec<Edge>,
}

/// Public permutation of tag positions, with its inverse cached.
#[derive(Clone, Debug)]
pub struct Ubk {
    pub perm: Vec<u32>,
    pub inv: Vec<u32>,
}

/// Public key material. Structural artifact shared with decryption
/// rather than a public encryption key: the scheme is symmetric.
#[derive(Clone, Debug)]
pub struct PubKey {
    pub params: Params,
    pub canon_tag: u64,
    pub h_cols: Vec<BitVec>,
    pub h_digest: [u8; 32],
    pub ubk: Ubk,
    pub omega_b: Fp,
    pub pow_g: Vec<Fp>,
}

/// Secret key material: the PRF keys and the LPN secret. Created once in
/// keygen, read only by the PRF and decryption.
#[derive(Clone, Debug)]
pub struct SecKey {
    pub prf_keys: [u64; 4],
    pub lpn_s_bits: Vec<u64>,
}

/// Evaluation key for recrypt: a pool of zero-ciphertexts plus one
/// encryption of 1.
#[derive(Clone, Debug)]
pub struct EvalKey {
    pub zero_pool: Vec<Cipher>,
    pub enc_one: Cipher,
}
