//! The ciphertext engine: encryption, the homomorphic operations,
//! re-randomization, and decryption.

pub mod arithmetic;
pub mod decrypt;
pub mod encrypt;
pub mod recrypt;

pub use arithmetic::{ct_add, ct_div_const, ct_mul, ct_neg, ct_scale, ct_sub};
pub use decrypt::{dec_fp, dec_value};
pub use encrypt::{
    compact_edges, compact_layers, enc_fp_depth, enc_value, enc_value_depth, enc_zero_depth,
    guard_budget, plan_noise, sigma_density,
};
pub use recrypt::{ct_recrypt, make_evalkey, sigma_needs_balance};
