//! Arithmetic over the Mersenne field Fp, p = 2^127 - 1.
//!
//! Elements are two 64-bit limbs with the top bit of `hi` reserved.
//! Canonical form is `hi < 2^63` and not `(hi, lo) = (2^63 - 1, 2^64 - 1)`
//! (the modulus itself); every value produced here is canonical.
//! Operations are free functions rather than operator impls to keep the
//! constant-time discipline visible at call sites: no branches and no
//! table indices depend on secret limbs.

use rand::{CryptoRng, RngCore};

use crate::ctsafe as ct;

/// All ones below the reserved top bit; also the high limb of p.
pub const MASK63: u64 = 0x7FFF_FFFF_FFFF_FFFF;

/// p = 2^127 - 1 as a u128, for public-exponent walks.
pub const P: u128 = (1u128 << 127) - 1;

/// An element of Fp in canonical form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fp {
    pub lo: u64,
    pub hi: u64,
}

pub const FP_ZERO: Fp = Fp { lo: 0, hi: 0 };
pub const FP_ONE: Fp = Fp { lo: 1, hi: 0 };

#[inline(always)]
pub fn fp_from_u64(x: u64) -> Fp {
    Fp { lo: x, hi: 0 }
}

/// True iff `(lo, hi)` is already in canonical form. Used to vet
/// externally supplied values; internal ops never produce non-canonical
/// output.
pub fn fp_is_canonical(lo: u64, hi: u64) -> bool {
    hi < (1 << 63) && !(hi == MASK63 && lo == u64::MAX)
}

/// Builds a canonical element from two raw limbs, folding the reserved
/// bit (2^127 = 1 mod p) and conditionally subtracting p, all branchless.
#[inline]
pub fn fp_from_words(lo: u64, hi: u64) -> Fp {
    let extra = hi >> 63;
    let hi = hi & MASK63;

    let t = (lo as u128) + (extra as u128);
    let lo = t as u64;
    let hi = hi + ((t >> 64) as u64);

    // lo2/hi2 = (lo, hi) - p
    let (lo2, br) = lo.overflowing_sub(u64::MAX);
    let hi2 = hi.wrapping_sub(MASK63).wrapping_sub(br as u64);

    let need = ct::mask_from_bit((hi >> 63) | (ct::eq(hi, MASK63) & ct::eq(lo, u64::MAX)));

    Fp {
        lo: ct::select(need, lo2, lo),
        hi: ct::select(need, hi2, hi),
    }
}

#[inline]
pub fn fp_add(a: Fp, b: Fp) -> Fp {
    let t0 = (a.lo as u128) + (b.lo as u128);
    let lo = t0 as u64;
    let t1 = (a.hi as u128) + (b.hi as u128) + (t0 >> 64);
    fp_from_words(lo, t1 as u64)
}

#[inline]
pub fn fp_neg(a: Fp) -> Fp {
    // p - a never borrows for canonical a; p itself folds back to zero.
    fp_from_words(!a.lo, MASK63 - a.hi)
}

#[inline]
pub fn fp_sub(a: Fp, b: Fp) -> Fp {
    fp_add(a, fp_neg(b))
}

/// Full 128x128 -> 256 bit product as four limbs, low to high.
#[inline]
fn mul128x128(a: Fp, b: Fp) -> [u64; 4] {
    let c0 = (a.lo as u128) * (b.lo as u128);
    let c1 = (a.lo as u128) * (b.hi as u128);
    let c2 = (a.hi as u128) * (b.lo as u128);
    let c3 = (a.hi as u128) * (b.hi as u128);

    let z0 = c0 as u64;

    let t = (c0 >> 64) + ((c1 as u64) as u128) + ((c2 as u64) as u128);
    let z1 = t as u64;

    let t2 = (c1 >> 64) + (c2 >> 64) + ((c3 as u64) as u128) + (t >> 64);
    let z2 = t2 as u64;

    let z3 = ((c3 >> 64) + (t2 >> 64)) as u64;

    [z0, z1, z2, z3]
}

/// Reduces a 256-bit value with the Mersenne identity
/// `x mod p = (x mod 2^127) + (x div 2^127)`, applied twice, then a final
/// conditional subtract inside [`fp_from_words`].
#[inline]
fn fp_reduce256(z: [u64; 4]) -> Fp {
    let [z0, z1, z2, z3] = z;

    let l0 = z0;
    let l1 = z1 & MASK63;

    let h0 = (z1 >> 63) | (z2 << 1);
    let h1 = (z2 >> 63) | (z3 << 1);
    let h2 = z3 >> 63;

    let t0 = (l0 as u128) + (h0 as u128);
    let x0 = t0 as u64;
    let c0 = (t0 >> 64) as u64;

    let t1 = (l1 as u128) + (h1 as u128) + (c0 as u128);
    let x1 = t1 as u64;
    let c1 = (t1 >> 64) as u64;

    let x2 = h2 + c1;

    let yl0 = x0;
    let yl1 = x1 & MASK63;
    let yh0 = (x1 >> 63) | (x2 << 1);

    let s0 = (yl0 as u128) + (yh0 as u128);
    let y0 = s0 as u64;
    let y1 = yl1 + ((s0 >> 64) as u64);

    fp_from_words(y0, y1)
}

#[inline]
pub fn fp_mul(a: Fp, b: Fp) -> Fp {
    fp_reduce256(mul128x128(a, b))
}

/// Square-and-multiply with a public 64-bit exponent.
pub fn fp_pow_u64(a: Fp, e: u64) -> Fp {
    fp_pow_u128(a, e as u128)
}

/// Square-and-multiply with a public 128-bit exponent. The branch on the
/// exponent bits is fine: exponents here are public constants.
pub fn fp_pow_u128(mut a: Fp, mut e: u128) -> Fp {
    let mut r = FP_ONE;
    while e != 0 {
        if e & 1 != 0 {
            r = fp_mul(r, a);
        }
        a = fp_mul(a, a);
        e >>= 1;
    }
    r
}

/// Inverse by Fermat: a^(p - 2), walked MSB to LSB with a width-5 window
/// over a 32-entry table. The exponent is the fixed public constant
/// 2^127 - 3, so the schedule of squarings and multiplications is the
/// same for every input.
pub fn fp_inv(a: Fp) -> Fp {
    const W: i32 = 5;
    const T: usize = 1 << W;

    let mut tbl = [FP_ONE; T];
    tbl[1] = a;
    for i in 2..T {
        tbl[i] = fp_mul(tbl[i - 1], a);
    }

    let e: u128 = (1u128 << 127) - 3;
    let mut r = FP_ONE;
    let mut pos: i32 = 126;

    while pos >= 0 {
        if (e >> pos) & 1 == 0 {
            r = fp_mul(r, r);
            pos -= 1;
            continue;
        }

        let mut l = if pos - W + 1 > 0 { pos - W + 1 } else { 0 };
        let width = (pos - l + 1) as u32;
        let mut k = ((e >> l) & ((1u128 << width) - 1)) as usize;

        while k >= T {
            k >>= 1;
            l += 1;
        }

        for _ in 0..(pos - l + 1) {
            r = fp_mul(r, r);
        }

        r = fp_mul(r, tbl[k]);
        pos = l - 1;
    }

    r
}

/// Uniform nonzero element from the caller's CSPRNG.
pub fn rand_fp_nonzero(rng: &mut (impl RngCore + CryptoRng)) -> Fp {
    loop {
        let x = fp_from_words(rng.next_u64(), rng.next_u64() & MASK63);
        if ct::fp_is_nonzero(&x) != 0 {
            return x;
        }
    }
}
