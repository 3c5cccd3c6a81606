//! Per-party secret state shared by both sides of the protocol.

use crate::error::Result;
use crate::group::BlindGroup;
use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use std::fmt;

/// A party's secret blinding exponent in `[1, q - 1]`.
///
/// Not `Clone` or `Serialize`, and `Debug` prints nothing of the value.
pub(crate) struct SecretExponent(BigUint);

impl SecretExponent {
    /// Sample a fresh exponent for `group`.
    pub(crate) fn random(group: &BlindGroup) -> Result<Self> {
        Ok(Self(group.random_exponent()?))
    }

    pub(crate) fn expose(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Debug for SecretExponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretExponent(<redacted>)")
    }
}

/// Shuffle in place with the OS CSPRNG.
pub(crate) fn shuffle<T>(items: &mut [T]) {
    items.shuffle(&mut OsRng);
}
