//! Paillier additively homomorphic encryption.
//!
//! The encryption key is the modulus `N = p1 * p2` with the fixed generator
//! `G = N + 1`. The decryption key holds `λ = lcm(p1 - 1, p2 - 1)` and
//! `μ = λ⁻¹ mod N`. Multiplying two ciphertexts modulo `N²` yields an
//! encryption of the sum of their plaintexts modulo `N`.

use crate::bigint::{gcd, lcm, modinv, modpow, random_in_range};
use crate::error::{PsiSumError, Result};
use crate::primality::generate_prime;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Attempts at drawing a prime pair with `p1 != p2` before giving up.
const KEYGEN_ATTEMPTS: usize = 16;

/// Attempts at drawing a randomizer coprime to `N` before giving up.
const RANDOMIZER_ATTEMPTS: usize = 1_000;

/// A Paillier ciphertext, an integer in `[1, N²)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext(BigUint);

impl Ciphertext {
    /// Wrap a raw integer. Range is checked when the ciphertext is used.
    pub fn from_biguint(value: BigUint) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

/// Homomorphically add two ciphertexts: `(c1 * c2) mod N²`.
///
/// Needs only the public `N²`; no key material is involved.
///
/// # Errors
/// Returns `PsiSumError::Domain` if `n_squared` is zero.
pub fn combine(c1: &Ciphertext, c2: &Ciphertext, n_squared: &BigUint) -> Result<Ciphertext> {
    if n_squared.is_zero() {
        return Err(PsiSumError::Domain("modulus must be positive".to_string()));
    }
    Ok(Ciphertext((&c1.0 * &c2.0) % n_squared))
}

/// Public Paillier key. Serializes as the bare modulus `N`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BigUint", into = "BigUint")]
pub struct EncryptionKey {
    n: BigUint,
    n_squared: BigUint,
    g: BigUint,
}

impl EncryptionKey {
    /// Build the public key for modulus `n`.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` if `n` is not an odd integer greater than 1.
    pub fn new(n: BigUint) -> Result<Self> {
        if n <= BigUint::one() || n.is_even() {
            return Err(PsiSumError::Domain(
                "Paillier modulus must be an odd integer greater than 1".to_string(),
            ));
        }
        let n_squared = &n * &n;
        let g = &n + 1u32;
        Ok(Self { n, n_squared, g })
    }

    /// The modulus `N`.
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// The ciphertext modulus `N²`.
    pub fn modulus_squared(&self) -> &BigUint {
        &self.n_squared
    }

    /// The generator `G = N + 1`.
    pub fn generator(&self) -> &BigUint {
        &self.g
    }

    /// Check that a plaintext lies in `[0, N)` and convert it.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` for negative or too-large plaintexts.
    pub fn check_plaintext(&self, plaintext: &BigInt) -> Result<BigUint> {
        let value = plaintext.to_biguint().ok_or_else(|| {
            PsiSumError::Domain(format!("plaintext must be non-negative, got {plaintext}"))
        })?;
        if value >= self.n {
            return Err(PsiSumError::Domain(format!(
                "plaintext must be below the {}-bit modulus",
                self.n.bits()
            )));
        }
        Ok(value)
    }

    /// Check that a ciphertext lies in `[1, N²)`.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` otherwise.
    pub fn check_ciphertext(&self, ciphertext: &Ciphertext) -> Result<()> {
        if ciphertext.0.is_zero() || ciphertext.0 >= self.n_squared {
            return Err(PsiSumError::Domain(
                "ciphertext is outside the range [1, N^2)".to_string(),
            ));
        }
        Ok(())
    }

    /// Encrypt `plaintext` with fresh randomness.
    ///
    /// Two encryptions of the same plaintext differ with overwhelming probability.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` unless `0 <= plaintext < N`, or
    /// `PsiSumError::RetriesExhausted` if no randomizer coprime to `N` is found.
    pub fn encrypt(&self, plaintext: &BigInt) -> Result<Ciphertext> {
        let message = self.check_plaintext(plaintext)?;
        let randomizer = self.sample_randomizer()?;
        self.encrypt_raw(&message, &randomizer)
    }

    /// Encrypt `plaintext` with caller-chosen randomness `r`, which must be a
    /// unit modulo `N`.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` if the plaintext is out of range or `r`
    /// is not in `[1, N)` and coprime to `N`.
    pub fn encrypt_with_randomness(&self, plaintext: &BigInt, r: &BigUint) -> Result<Ciphertext> {
        let message = self.check_plaintext(plaintext)?;
        if r.is_zero() || *r >= self.n || !gcd(r, &self.n).is_one() {
            return Err(PsiSumError::Domain(
                "randomizer must be a unit modulo N".to_string(),
            ));
        }
        self.encrypt_raw(&message, r)
    }

    /// Homomorphically add two ciphertexts under this key.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` if either ciphertext is out of range.
    pub fn add(&self, c1: &Ciphertext, c2: &Ciphertext) -> Result<Ciphertext> {
        self.check_ciphertext(c1)?;
        self.check_ciphertext(c2)?;
        combine(c1, c2, &self.n_squared)
    }

    fn encrypt_raw(&self, message: &BigUint, r: &BigUint) -> Result<Ciphertext> {
        let gm = modpow(&self.g, message, &self.n_squared)?;
        let rn = modpow(r, &self.n, &self.n_squared)?;
        Ok(Ciphertext((gm * rn) % &self.n_squared))
    }

    fn sample_randomizer(&self) -> Result<BigUint> {
        let upper = &self.n - 1u32;
        for _ in 0..RANDOMIZER_ATTEMPTS {
            let r = random_in_range(&BigUint::one(), &upper)?;
            if gcd(&r, &self.n).is_one() {
                return Ok(r);
            }
        }
        warn!(
            attempts = RANDOMIZER_ATTEMPTS,
            "no randomizer coprime to the Paillier modulus"
        );
        Err(PsiSumError::RetriesExhausted {
            operation: "Paillier randomizer sampling",
            attempts: RANDOMIZER_ATTEMPTS,
        })
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("modulus_bits", &self.n.bits())
            .finish()
    }
}

impl TryFrom<BigUint> for EncryptionKey {
    type Error = PsiSumError;

    fn try_from(n: BigUint) -> Result<Self> {
        Self::new(n)
    }
}

impl From<EncryptionKey> for BigUint {
    fn from(key: EncryptionKey) -> Self {
        key.n
    }
}

/// Private Paillier key together with its public half.
///
/// Not serializable and redacted from `Debug` output; it never leaves the
/// party that generated it.
#[derive(Clone)]
pub struct DecryptionKey {
    encryption_key: EncryptionKey,
    lambda: BigUint,
    mu: BigUint,
}

impl DecryptionKey {
    /// Generate a key pair whose modulus has `bit_length` bits, from two
    /// distinct primes of `bit_length / 2` bits each.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` for a bit length below 4, or
    /// `PsiSumError::KeyGen` if no usable prime pair is found.
    pub fn generate(bit_length: u64, rounds: usize) -> Result<Self> {
        if bit_length < 4 {
            return Err(PsiSumError::Domain(format!(
                "Paillier bit length must be at least 4, got {bit_length}"
            )));
        }
        let half = bit_length / 2;

        for attempt in 1..=KEYGEN_ATTEMPTS {
            let p1 = generate_prime(half, rounds)?;
            let p2 = generate_prime(half, rounds)?;
            match Self::from_primes(&p1, &p2) {
                Ok(key) => {
                    debug!(
                        bits = key.encryption_key.n.bits(),
                        attempts = attempt,
                        "generated Paillier key pair"
                    );
                    return Ok(key);
                }
                Err(e) => debug!(attempt, error = %e, "discarding Paillier prime pair"),
            }
        }
        Err(PsiSumError::KeyGen(format!(
            "no usable prime pair after {KEYGEN_ATTEMPTS} attempts"
        )))
    }

    /// Derive the key pair from two primes.
    ///
    /// # Errors
    /// Returns `PsiSumError::KeyGen` if `p1 == p2` or the primes do not yield an
    /// invertible `λ` modulo `N`.
    pub fn from_primes(p1: &BigUint, p2: &BigUint) -> Result<Self> {
        if p1 == p2 {
            return Err(PsiSumError::KeyGen("degenerate prime pair: p1 == p2".to_string()));
        }
        let encryption_key = EncryptionKey::new(p1 * p2)
            .map_err(|e| PsiSumError::KeyGen(e.to_string()))?;
        let lambda = lcm(&(p1 - 1u32), &(p2 - 1u32));
        let mu = modinv(&lambda, &encryption_key.n).map_err(|_| {
            PsiSumError::KeyGen("lambda is not invertible modulo N".to_string())
        })?;
        Ok(Self {
            encryption_key,
            lambda,
            mu,
        })
    }

    /// The public half of the key pair.
    pub fn encryption_key(&self) -> &EncryptionKey {
        &self.encryption_key
    }

    /// Decrypt: `L(c^λ mod N²) · μ mod N` with `L(u) = (u - 1) / N`.
    ///
    /// # Errors
    /// Returns `PsiSumError::Domain` if the ciphertext is outside `[1, N²)` or
    /// is not a valid encryption under this key.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<BigUint> {
        let key = &self.encryption_key;
        key.check_ciphertext(ciphertext)?;

        let u = modpow(&ciphertext.0, &self.lambda, &key.n_squared)?;
        if u.is_zero() {
            return Err(PsiSumError::Domain(
                "ciphertext is not a valid encryption under this key".to_string(),
            ));
        }
        let (l, remainder) = (u - 1u32).div_rem(&key.n);
        if !remainder.is_zero() {
            return Err(PsiSumError::Domain(
                "ciphertext is not a valid encryption under this key".to_string(),
            ));
        }
        Ok((l * &self.mu) % &key.n)
    }
}

impl fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKey")
            .field("encryption_key", &self.encryption_key)
            .field("lambda", &"<redacted>")
            .field("mu", &"<redacted>")
            .finish()
    }
}
