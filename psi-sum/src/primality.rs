//! Probabilistic primality testing and random prime generation.

use crate::bigint::{random_in_range, random_odd_with_bits};
use crate::error::{PsiSumError, Result};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use tracing::{debug, warn};

/// Primes below 256, used to discard candidates before Miller-Rabin.
const SMALL_PRIMES: [u32; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// Candidate budget per requested bit for `generate_prime`.
const PRIME_ATTEMPTS_PER_BIT: u64 = 1_000;

/// Candidate budget per squared bit for `generate_safe_prime`.
const SAFE_PRIME_ATTEMPTS_PER_BIT_SQUARED: u64 = 100;

/// Result of trial division by `SMALL_PRIMES`.
enum Sieve {
    Prime,
    Composite,
    Unknown,
}

fn sieve(n: &BigUint) -> Sieve {
    for &p in SMALL_PRIMES.iter() {
        if *n == BigUint::from(p) {
            return Sieve::Prime;
        }
        if (n % p).is_zero() {
            return Sieve::Composite;
        }
    }
    Sieve::Unknown
}

/// Miller-Rabin test with `rounds` independent random witnesses.
///
/// A composite passes with probability below `4^-rounds`. Primes are never
/// rejected.
pub fn is_probable_prime(n: &BigUint, rounds: usize) -> bool {
    let two = BigUint::from(2u32);
    let three = BigUint::from(3u32);
    if *n == two || *n == three {
        return true;
    }
    if *n < two || n.is_even() {
        return false;
    }
    match sieve(n) {
        Sieve::Prime => return true,
        Sieve::Composite => return false,
        Sieve::Unknown => {}
    }

    // n - 1 = d * 2^s with d odd
    let n_minus_one = n - 1u32;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;
    let witness_max = n - 2u32;

    'witness: for _ in 0..rounds {
        let a = match random_in_range(&two, &witness_max) {
            Ok(a) => a,
            Err(_) => return false,
        };
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Generate a random prime of exactly `bits` bits.
///
/// # Errors
/// Returns `PsiSumError::Domain` if `bits < 2`, or
/// `PsiSumError::RetriesExhausted` if no prime is found within the attempt cap.
pub fn generate_prime(bits: u64, rounds: usize) -> Result<BigUint> {
    let cap = bits.saturating_mul(PRIME_ATTEMPTS_PER_BIT).max(1);
    for attempt in 1..=cap {
        let candidate = random_odd_with_bits(bits)?;
        if is_probable_prime(&candidate, rounds) {
            debug!(bits, attempts = attempt, "generated prime");
            return Ok(candidate);
        }
    }
    warn!(bits, attempts = cap, "prime generation exhausted its attempt budget");
    Err(PsiSumError::RetriesExhausted {
        operation: "prime generation",
        attempts: cap as usize,
    })
}

/// Generate a safe prime `p = 2q + 1` where `q` is a prime of exactly `bits` bits.
///
/// Returns `(p, q)`.
///
/// # Errors
/// Returns `PsiSumError::Domain` if `bits < 2`, or
/// `PsiSumError::RetriesExhausted` if no safe prime is found within the attempt cap.
pub fn generate_safe_prime(bits: u64, rounds: usize) -> Result<(BigUint, BigUint)> {
    let cap = bits
        .saturating_mul(bits)
        .saturating_mul(SAFE_PRIME_ATTEMPTS_PER_BIT_SQUARED)
        .max(1);
    for attempt in 1..=cap {
        let q = random_odd_with_bits(bits)?;
        let p = (&q << 1u32) + 1u32;
        if matches!(sieve(&q), Sieve::Composite) || matches!(sieve(&p), Sieve::Composite) {
            continue;
        }
        if is_probable_prime(&q, rounds) && is_probable_prime(&p, rounds) {
            debug!(bits, attempts = attempt, "generated safe prime");
            return Ok((p, q));
        }
    }
    warn!(bits, attempts = cap, "safe prime generation exhausted its attempt budget");
    Err(PsiSumError::RetriesExhausted {
        operation: "safe prime generation",
        attempts: cap as usize,
    })
}

/// Check that `p = 2q + 1` with both `p` and `q` probable primes.
pub fn is_safe_prime_pair(p: &BigUint, q: &BigUint, rounds: usize) -> bool {
    if q.is_zero() || *p != (q << 1u32) + 1u32 {
        return false;
    }
    is_probable_prime(q, rounds) && is_probable_prime(p, rounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mersenne(exponent: u32) -> BigUint {
        (BigUint::one() << exponent) - 1u32
    }

    #[test]
    fn test_small_primes_accepted() {
        for p in [2u32, 3, 5, 7, 11, 13, 251, 257, 7919, 104_729] {
            assert!(is_probable_prime(&BigUint::from(p), 32), "{p} is prime");
        }
    }

    #[test]
    fn test_obvious_composites_rejected() {
        for n in [0u32, 1, 4, 9, 15, 91, 2047, 65_537 * 3] {
            assert!(!is_probable_prime(&BigUint::from(n), 32), "{n} is composite");
        }
    }

    #[test]
    fn test_carmichael_numbers_rejected() {
        for n in [561u32, 1105, 1729, 41_041, 825_265] {
            assert!(!is_probable_prime(&BigUint::from(n), 32), "{n} is a Carmichael number");
        }
    }

    #[test]
    fn test_known_mersenne_primes_accepted() {
        assert!(is_probable_prime(&mersenne(127), 16));
        assert!(is_probable_prime(&mersenne(521), 8));
        assert!(is_probable_prime(&mersenne(607), 8));
    }

    #[test]
    fn test_large_known_prime_accepted() {
        // 2^2203 - 1 is a Mersenne prime above 2048 bits.
        assert!(is_probable_prime(&mersenne(2203), 2));
    }

    #[test]
    fn test_mersenne_composite_rejected() {
        // 2^67 - 1 = 193707721 * 761838257287
        assert!(!is_probable_prime(&mersenne(67), 16));
        assert!(!is_probable_prime(&(mersenne(521) * mersenne(127)), 16));
    }

    #[test]
    fn test_acceptance_rate_matches_prime_density() {
        // Among odd 64-bit integers about 2 / ln(2^64), roughly 1 in 22, are prime.
        let bits = 64u64;
        let samples = 4_000u32;
        let accepted = (0..samples)
            .filter(|_| is_probable_prime(&random_odd_with_bits(bits).unwrap(), 20))
            .count() as f64;

        let expected = f64::from(samples) * 2.0 / (bits as f64 * std::f64::consts::LN_2);
        assert!(
            accepted > expected * 0.6 && accepted < expected * 1.4,
            "accepted {accepted} candidates, expected about {expected:.0}"
        );
    }

    #[test]
    fn test_generate_prime_exact_bits() {
        for bits in [8u64, 32, 64, 128] {
            let p = generate_prime(bits, 20).unwrap();
            assert_eq!(p.bits(), bits);
            assert!(is_probable_prime(&p, 20));
        }
    }

    #[test]
    fn test_generate_prime_rejects_tiny_length() {
        assert!(matches!(generate_prime(1, 20), Err(PsiSumError::Domain(_))));
    }

    #[test]
    fn test_generate_safe_prime() {
        let (p, q) = generate_safe_prime(48, 20).unwrap();
        assert_eq!(q.bits(), 48);
        assert_eq!(p, (&q << 1u32) + 1u32);
        assert!(is_probable_prime(&p, 20));
        assert!(is_probable_prime(&q, 20));
        assert!(is_safe_prime_pair(&p, &q, 20));
    }

    #[test]
    fn test_is_safe_prime_pair_rejects() {
        // 23 = 2 * 11 + 1 is safe; 29 = 2 * 14 + 1 is not
        assert!(is_safe_prime_pair(&BigUint::from(23u32), &BigUint::from(11u32), 20));
        assert!(!is_safe_prime_pair(&BigUint::from(29u32), &BigUint::from(14u32), 20));
        assert!(!is_safe_prime_pair(&BigUint::from(23u32), &BigUint::from(13u32), 20));
        assert!(!is_safe_prime_pair(&BigUint::from(1u32), &BigUint::from(0u32), 20));
    }
}
