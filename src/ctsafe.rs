//! Branchless predicates and selects over 64-bit words, lifted to field
//! elements and bit vectors. Everything here compiles to pure
//! arithmetic/logical instructions; no data-dependent branches, no
//! data-dependent table indices.

use crate::bitvec::BitVec;
use crate::field::Fp;

/// 1 if `x == 0`, else 0.
#[inline(always)]
pub fn is_zero(x: u64) -> u64 {
    let y = x | x.wrapping_neg();
    (y >> 63) ^ 1
}

/// 1 if `x != 0`, else 0.
#[inline(always)]
pub fn is_nonzero(x: u64) -> u64 {
    is_zero(x) ^ 1
}

/// 1 if `a == b`, else 0.
#[inline(always)]
pub fn eq(a: u64, b: u64) -> u64 {
    is_zero(a ^ b)
}

/// 1 if `a != b`, else 0.
#[inline(always)]
pub fn neq(a: u64, b: u64) -> u64 {
    is_nonzero(a ^ b)
}

/// 1 if `a < b`, else 0.
#[inline(always)]
pub fn lt(a: u64, b: u64) -> u64 {
    // Borrow bit of a - b, computed without a comparison instruction.
    let d = a.wrapping_sub(b);
    ((d & !a) | ((d | !a) & b)) >> 63
}

/// 1 if `a > b`, else 0.
#[inline(always)]
pub fn gt(a: u64, b: u64) -> u64 {
    lt(b, a)
}

/// Expands the low bit of `bit` into an all-ones or all-zeros mask.
#[inline(always)]
pub fn mask_from_bit(bit: u64) -> u64 {
    (bit & 1).wrapping_neg()
}

#[inline(always)]
pub fn zero_mask(x: u64) -> u64 {
    mask_from_bit(is_zero(x))
}

#[inline(always)]
pub fn nonzero_mask(x: u64) -> u64 {
    mask_from_bit(is_nonzero(x))
}

#[inline(always)]
pub fn eq_mask(a: u64, b: u64) -> u64 {
    mask_from_bit(eq(a, b))
}

#[inline(always)]
pub fn lt_mask(a: u64, b: u64) -> u64 {
    mask_from_bit(lt(a, b))
}

/// `a` where `mask` is all-ones, `b` where it is all-zeros.
#[inline(always)]
pub fn select(mask: u64, a: u64, b: u64) -> u64 {
    (a & mask) | (b & !mask)
}

/// Swaps `a` and `b` iff `mask` is all-ones.
#[inline(always)]
pub fn cswap(mask: u64, a: &mut u64, b: &mut u64) {
    let t = mask & (*a ^ *b);
    *a ^= t;
    *b ^= t;
}

#[inline(always)]
pub fn min(a: u64, b: u64) -> u64 {
    select(lt_mask(a, b), a, b)
}

#[inline(always)]
pub fn max(a: u64, b: u64) -> u64 {
    select(lt_mask(a, b), b, a)
}

#[inline(always)]
pub fn abs_diff(a: u64, b: u64) -> u64 {
    select(lt_mask(a, b), b.wrapping_sub(a), a.wrapping_sub(b))
}

/// Reads `arr[idx]` touching every element, so the access pattern is
/// independent of `idx`.
pub fn lookup(arr: &[u64], idx: usize) -> u64 {
    let mut res = arr[0];
    for (i, &v) in arr.iter().enumerate().skip(1) {
        res = select(eq_mask(i as u64, idx as u64), v, res);
    }
    res
}

/// Writes `val` to `arr[idx]` touching every element.
pub fn store(arr: &mut [u64], idx: usize, val: u64) {
    for (i, v) in arr.iter_mut().enumerate() {
        *v = select(eq_mask(i as u64, idx as u64), val, *v);
    }
}

/// Constant-time byte-slice equality: 1 if equal, else 0. Panics on
/// length mismatch (lengths are public).
pub fn memeq(a: &[u8], b: &[u8]) -> u64 {
    assert_eq!(a.len(), b.len());
    let mut diff = 0u64;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= u64::from(x ^ y);
    }
    is_zero(diff)
}

// Fp lifts: act on both limbs.

#[inline(always)]
pub fn fp_is_zero(x: &Fp) -> u64 {
    is_zero(x.lo | x.hi)
}

#[inline(always)]
pub fn fp_is_nonzero(x: &Fp) -> u64 {
    is_nonzero(x.lo | x.hi)
}

#[inline(always)]
pub fn fp_eq(a: &Fp, b: &Fp) -> u64 {
    eq(a.lo, b.lo) & eq(a.hi, b.hi)
}

#[inline(always)]
pub fn fp_is_one(x: &Fp) -> u64 {
    eq(x.lo, 1) & eq(x.hi, 0)
}

#[inline(always)]
pub fn fp_select(mask: u64, a: &Fp, b: &Fp) -> Fp {
    Fp {
        lo: select(mask, a.lo, b.lo),
        hi: select(mask, a.hi, b.hi),
    }
}

pub fn fp_cswap(mask: u64, a: &mut Fp, b: &mut Fp) {
    cswap(mask, &mut a.lo, &mut b.lo);
    cswap(mask, &mut a.hi, &mut b.hi);
}

// BitVec lifts.

pub fn bv_select(mask: u64, a: &BitVec, b: &BitVec) -> BitVec {
    assert_eq!(a.nbits, b.nbits);
    let mut r = BitVec::new(a.nbits);
    for (i, w) in r.words.iter_mut().enumerate() {
        *w = select(mask, a.words[i], b.words[i]);
    }
    r
}

pub fn bv_cswap(mask: u64, a: &mut BitVec, b: &mut BitVec) {
    let n = a.words.len().min(b.words.len());
    for i in 0..n {
        let (wa, wb) = (&mut a.words[i], &mut b.words[i]);
        let t = mask & (*wa ^ *wb);
        *wa ^= t;
        *wb ^= t;
    }
}
