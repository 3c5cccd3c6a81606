//! Prime-order subgroup of `Z_p^*` used for commutative blinding.
//!
//! The modulus is a safe prime `p = 2q + 1` and the generator `g` has order
//! `q`. An identifier is hashed to an exponent `h = H(id) mod q`, mapped to
//! `g^h`, and blinded by raising to a secret exponent. Blinding commutes:
//! `((g^h)^a)^b = ((g^h)^b)^a mod p`, which is what lets the two parties
//! compare identifiers only after both have applied their secret.

use crate::bigint::{modpow, random_in_range};
use crate::error::{PsiSumError, Result};
use crate::primality::{generate_safe_prime, is_safe_prime_pair};
use num_bigint::BigUint;
use num_traits::One;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Generator candidates tried per safe prime.
const GENERATOR_ATTEMPTS: usize = 128;

/// Safe primes tried before giving up on building a group.
const BUILD_ATTEMPTS: usize = 8;

/// A group element in `[1, p)` produced by blinding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlindedElement(BigUint);

impl BlindedElement {
    /// Wrap a raw integer. Membership is checked with [`BlindGroup::check_element`].
    pub fn from_biguint(value: BigUint) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

/// Public description `(p, q, g)` of the blinding group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindGroup {
    p: BigUint,
    q: BigUint,
    g: BigUint,
}

impl BlindGroup {
    /// Build a fresh group whose subgroup order `q` has `bit_length` bits.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` if `bit_length < 2`, or
    /// `PsiSumError::RetriesExhausted` if the randomized search does not converge.
    pub fn build(bit_length: u64, rounds: usize) -> Result<Self> {
        for _ in 0..BUILD_ATTEMPTS {
            let (p, q) = generate_safe_prime(bit_length, rounds)?;
            let lo = BigUint::from(2u32);
            let hi = &p - 2u32;
            for attempt in 1..=GENERATOR_ATTEMPTS {
                let g = random_in_range(&lo, &hi)?;
                if modpow(&g, &q, &p)?.is_one() {
                    debug!(
                        bits = p.bits(),
                        generator_attempts = attempt,
                        "built blinding group"
                    );
                    return Ok(Self { p, q, g });
                }
            }
        }
        warn!(bits = bit_length, attempts = BUILD_ATTEMPTS, "group construction gave up");
        Err(PsiSumError::RetriesExhausted {
            operation: "blinding group construction",
            attempts: BUILD_ATTEMPTS,
        })
    }

    /// Assemble a group from its parts, verifying it.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` if the triple is not a valid group description.
    pub fn from_parts(p: BigUint, q: BigUint, g: BigUint, rounds: usize) -> Result<Self> {
        let group = Self { p, q, g };
        group.verify(rounds)?;
        Ok(group)
    }

    /// The safe prime modulus `p`.
    pub fn modulus(&self) -> &BigUint {
        &self.p
    }

    /// The prime subgroup order `q`.
    pub fn order(&self) -> &BigUint {
        &self.q
    }

    /// The generator `g` of the order-`q` subgroup.
    pub fn generator(&self) -> &BigUint {
        &self.g
    }

    /// Check that `p = 2q + 1` with both prime, and that `g` has order exactly `q`.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` describing the first violated condition.
    pub fn verify(&self, rounds: usize) -> Result<()> {
        if !is_safe_prime_pair(&self.p, &self.q, rounds) {
            return Err(PsiSumError::Domain(
                "group modulus is not a safe prime p = 2q + 1".to_string(),
            ));
        }
        let p_minus_one = &self.p - 1u32;
        if self.g <= BigUint::one() || self.g >= p_minus_one {
            return Err(PsiSumError::Domain(
                "group generator must lie in [2, p - 2]".to_string(),
            ));
        }
        if !modpow(&self.g, &self.q, &self.p)?.is_one() {
            return Err(PsiSumError::Domain(
                "group generator does not have order q".to_string(),
            ));
        }
        Ok(())
    }

    /// Sample a secret exponent uniformly from `[1, q - 1]`.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` if `q < 2`, which a verified group rules out.
    pub fn random_exponent(&self) -> Result<BigUint> {
        random_in_range(&BigUint::one(), &(&self.q - 1u32))
    }

    /// Hash an identifier to an exponent: `SHA-256(identifier) mod q`.
    pub fn hash_to_exponent(&self, identifier: &str) -> BigUint {
        let digest = Sha256::digest(identifier.as_bytes());
        BigUint::from_bytes_be(&digest) % &self.q
    }

    /// Map an identifier to the subgroup element `g^H(identifier)`.
    pub fn hash_to_element(&self, identifier: &str) -> Result<BlindedElement> {
        let h = self.hash_to_exponent(identifier);
        Ok(BlindedElement(modpow(&self.g, &h, &self.p)?))
    }

    /// Compute `(g^H(identifier))^exponent mod p`.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` unless `exponent` is in `[1, q - 1]`.
    pub fn blind_hash(&self, identifier: &str, exponent: &BigUint) -> Result<BlindedElement> {
        self.check_exponent(exponent)?;
        let base = self.hash_to_element(identifier)?;
        Ok(BlindedElement(modpow(&base.0, exponent, &self.p)?))
    }

    /// Raise an already blinded element to `exponent`.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` unless `exponent` is in `[1, q - 1]` and
    /// `element` is a member of the order-`q` subgroup.
    pub fn blind(&self, element: &BlindedElement, exponent: &BigUint) -> Result<BlindedElement> {
        self.check_exponent(exponent)?;
        self.check_element(element)?;
        Ok(BlindedElement(modpow(&element.0, exponent, &self.p)?))
    }

    /// Blind every identifier in parallel, preserving input order.
    pub fn blind_hash_all(
        &self,
        identifiers: &[String],
        exponent: &BigUint,
    ) -> Result<Vec<BlindedElement>> {
        identifiers
            .par_iter()
            .map(|identifier| self.blind_hash(identifier, exponent))
            .collect()
    }

    /// Re-blind every element in parallel, preserving input order.
    pub fn blind_all(
        &self,
        elements: &[BlindedElement],
        exponent: &BigUint,
    ) -> Result<Vec<BlindedElement>> {
        elements
            .par_iter()
            .map(|element| self.blind(element, exponent))
            .collect()
    }

    /// Check that `element` is in `[1, p)` and in the order-`q` subgroup.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` otherwise.
    pub fn check_element(&self, element: &BlindedElement) -> Result<()> {
        if element.0 < BigUint::one() || element.0 >= self.p {
            return Err(PsiSumError::Domain(
                "group element is outside [1, p)".to_string(),
            ));
        }
        if !modpow(&element.0, &self.q, &self.p)?.is_one() {
            return Err(PsiSumError::Domain(
                "group element is not in the order-q subgroup".to_string(),
            ));
        }
        Ok(())
    }

    fn check_exponent(&self, exponent: &BigUint) -> Result<()> {
        if *exponent < BigUint::one() || *exponent >= self.q {
            return Err(PsiSumError::Domain(
                "blinding exponent must lie in [1, q - 1]".to_string(),
            ));
        }
        Ok(())
    }
}
