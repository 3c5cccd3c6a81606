//! Big integer helpers: modular arithmetic and secure sampling.

use crate::error::{PsiSumError, Result};
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::OsRng;

/// Compute `base^exponent mod modulus` by square-and-multiply.
///
/// # Errors
/// Returns `PsiSumError::Domain` if `modulus` is zero.
pub fn modpow(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    if modulus.is_zero() {
        return Err(PsiSumError::Domain("modulus must be positive".to_string()));
    }
    Ok(base.modpow(exponent, modulus))
}

/// Compute `x` such that `a * x ≡ 1 (mod m)` using the extended Euclidean algorithm.
///
/// # Errors
/// Returns `PsiSumError::Domain` if `m` is zero and `PsiSumError::NotInvertible`
/// if `gcd(a, m) != 1`.
pub fn modinv(a: &BigUint, m: &BigUint) -> Result<BigUint> {
    if m.is_zero() {
        return Err(PsiSumError::Domain("modulus must be positive".to_string()));
    }
    if m.is_one() {
        return Ok(BigUint::zero());
    }

    let a = BigInt::from(a.clone());
    let m = BigInt::from(m.clone());
    let egcd = a.extended_gcd(&m);
    if !egcd.gcd.is_one() {
        return Err(PsiSumError::NotInvertible);
    }

    egcd.x
        .mod_floor(&m)
        .to_biguint()
        .ok_or(PsiSumError::NotInvertible)
}

/// Greatest common divisor.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    a.gcd(b)
}

/// Least common multiple.
pub fn lcm(a: &BigUint, b: &BigUint) -> BigUint {
    a.lcm(b)
}

/// Sample uniformly from `[lo, hi]` (inclusive) using the OS CSPRNG.
///
/// # Errors
/// Returns `PsiSumError::Domain` if `lo > hi`.
pub fn random_in_range(lo: &BigUint, hi: &BigUint) -> Result<BigUint> {
    if lo > hi {
        return Err(PsiSumError::Domain(format!(
            "empty sampling range: lower bound exceeds upper bound ({lo} > {hi})"
        )));
    }
    let mut rng = OsRng;
    let upper = hi + BigUint::one();
    Ok(rng.gen_biguint_range(lo, &upper))
}

/// Sample an odd integer of exactly `bits` bits (top bit forced set).
///
/// # Errors
/// Returns `PsiSumError::Domain` if `bits < 2`.
pub fn random_odd_with_bits(bits: u64) -> Result<BigUint> {
    if bits < 2 {
        return Err(PsiSumError::Domain(format!(
            "cannot sample an odd integer of {bits} bits"
        )));
    }
    let mut rng = OsRng;
    let mut candidate = rng.gen_biguint(bits);
    candidate |= BigUint::one() << (bits - 1);
    candidate |= BigUint::one();
    Ok(candidate)
}
