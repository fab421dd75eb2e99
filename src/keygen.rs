//! Key generation: parameter validation, the public structure (canon
//! tag, H, U), the PRF keys, the order-B generator with its power table,
//! the subgroup element omega, and the LPN secret.

use log::debug;
use rand::{CryptoRng, RngCore};

use crate::ctsafe as ct;
use crate::field::{fp_mul, fp_pow_u128, rand_fp_nonzero, FP_ONE, P};
use crate::matrix::{gen_h, gen_ubk};
use crate::{Params, PubKey, PvacError, Result, SecKey};

fn factor_small(n: u64) -> Vec<u64> {
    let mut primes = Vec::new();
    let mut x = n;
    let mut d = 2u64;

    while d * d <= x {
        if x % d == 0 {
            primes.push(d);
            while x % d == 0 {
                x /= d;
            }
        }
        d += 1;
    }

    if x > 1 {
        primes.push(x);
    }

    primes
}

fn validate(prm: &Params) -> Result<()> {
    let err = |m: &str| Err(PvacError::Param(m.to_string()));

    if prm.b < 8 || u64::from(prm.b) > u64::from(u16::MAX) {
        return err("b out of the supported range [8, 65535]");
    }
    if (P - 1) % u128::from(prm.b) != 0 {
        return err("b must divide p - 1");
    }
    if prm.m_bits == 0 || prm.n_bits == 0 {
        return err("tag dimensions must be positive");
    }
    if prm.h_col_wt == 0 || prm.h_col_wt > prm.m_bits {
        return err("h_col_wt must lie in [1, m_bits]");
    }
    if prm.x_col_wt == 0 || prm.x_col_wt > prm.n_bits {
        return err("x_col_wt must lie in [1, n_bits]");
    }
    if prm.err_wt > prm.m_bits {
        return err("err_wt exceeds m_bits");
    }
    if prm.lpn_n == 0 || prm.lpn_t == 0 {
        return err("lpn dimensions must be positive");
    }
    if prm.lpn_tau_den == 0 || prm.lpn_tau_num >= prm.lpn_tau_den {
        return err("lpn noise rate must satisfy 0 <= tau < 1");
    }
    if !(0.0..=1.0).contains(&prm.tuple2_fraction) {
        return err("tuple2_fraction must lie in [0, 1]");
    }
    if prm.recrypt_lo >= prm.recrypt_hi {
        return err("recrypt band is empty");
    }

    Ok(())
}

/// # Key generation
/// Produces the public structure and the secret key for the given
/// parameters.
///
/// ## Algorithm:
/// * verify the parameter ranges and B | p - 1
/// * draw `canon_tag`; derive H, its digest, and the permutation U
/// * draw the four PRF keys
/// * find the order-B generator g: random nonzero h, `g = h^((p-1)/B)`,
///   accepted when g != 1; tabulate `g^0 .. g^(B-1)`
/// * find omega_B the same way, additionally requiring
///   `omega^(B/q) != 1` for every prime q | B
/// * draw the `lpn_n`-bit secret and mask the trailing word
///
/// ## Returns:
/// * `(PubKey, SecKey)` on success, `PvacError::Param` on rejected
///   configuration.
pub fn keygen(prm: &Params, rng: &mut (impl RngCore + CryptoRng)) -> Result<(PubKey, SecKey)> {
    validate(prm)?;

    let canon_tag = rng.next_u64();
    let (h_cols, h_digest) = gen_h(prm, canon_tag);
    let ubk = gen_ubk(canon_tag, prm.m_bits);

    let mut prf_keys = [0u64; 4];
    for k in &mut prf_keys {
        *k = rng.next_u64();
    }

    let e = (P - 1) / u128::from(prm.b);

    let g = loop {
        let h = rand_fp_nonzero(rng);
        let acc = fp_pow_u128(h, e);
        if ct::fp_is_one(&acc) == 0 {
            break acc;
        }
    };

    let mut pow_g = vec![FP_ONE; prm.b as usize];
    for i in 1..prm.b as usize {
        pow_g[i] = fp_mul(pow_g[i - 1], g);
    }

    let primes = factor_small(u64::from(prm.b));
    let omega_b = 'search: loop {
        let h = rand_fp_nonzero(rng);
        let w = fp_pow_u128(h, e);
        if ct::fp_is_one(&w) != 0 {
            continue;
        }
        for &q in &primes {
            let t = fp_pow_u128(w, u128::from(u64::from(prm.b) / q));
            if ct::fp_is_one(&t) != 0 {
                continue 'search;
            }
        }
        break w;
    };

    let s_words = (prm.lpn_n + 63) / 64;
    let mut lpn_s_bits = vec![0u64; s_words];
    for w in &mut lpn_s_bits {
        *w = rng.next_u64();
    }
    if prm.lpn_n & 63 != 0 {
        let m = prm.lpn_n & 63;
        *lpn_s_bits.last_mut().expect("lpn secret is non-empty") &= (1u64 << m) - 1;
    }

    debug!(
        "keygen: canon_tag={:016x} H={}x{} B={}",
        canon_tag, prm.m_bits, prm.n_bits, prm.b
    );

    let pk = PubKey {
        params: prm.clone(),
        canon_tag,
        h_cols,
        h_digest,
        ubk,
        omega_b,
        pow_g,
    };
    let sk = SecKey {
        prf_keys,
        lpn_s_bits,
    };

    Ok((pk, sk))
}
