//! Protocol configuration.

use crate::error::{PsiSumError, Result};
use serde::{Deserialize, Serialize};

/// Default bit length of the blinding group's subgroup order `q`.
pub const DEFAULT_GROUP_BIT_LENGTH: u64 = 512;

/// Default bit length of the Paillier modulus `N`.
pub const DEFAULT_PAILLIER_BIT_LENGTH: u64 = 1024;

/// Default number of Miller-Rabin rounds.
pub const DEFAULT_PRIMALITY_ROUNDS: usize = 64;

const MIN_GROUP_BIT_LENGTH: u64 = 16;
const MIN_PAILLIER_BIT_LENGTH: u64 = 32;

/// Parameter sizes for one protocol session.
///
/// The defaults are demonstration grade. Production deployments need at least
/// a 2048-bit group modulus and a 2048-bit Paillier modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Bit length of the subgroup order `q` (the modulus `p = 2q + 1` is one bit longer).
    pub group_bit_length: u64,
    /// Bit length of the Paillier modulus `N = p1 * p2`.
    pub paillier_bit_length: u64,
    /// Miller-Rabin rounds; false-positive probability is below `4^-rounds`.
    pub primality_rounds: usize,
}

impl ProtocolConfig {
    /// Create a configuration and validate it.
    pub fn new(
        group_bit_length: u64,
        paillier_bit_length: u64,
        primality_rounds: usize,
    ) -> Result<Self> {
        let config = Self {
            group_bit_length,
            paillier_bit_length,
            primality_rounds,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| PsiSumError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the parameter sizes can produce a working session.
    pub fn validate(&self) -> Result<()> {
        if self.group_bit_length < MIN_GROUP_BIT_LENGTH {
            return Err(PsiSumError::Config(format!(
                "group_bit_length must be at least {MIN_GROUP_BIT_LENGTH}, got {}",
                self.group_bit_length
            )));
        }
        if self.paillier_bit_length < MIN_PAILLIER_BIT_LENGTH {
            return Err(PsiSumError::Config(format!(
                "paillier_bit_length must be at least {MIN_PAILLIER_BIT_LENGTH}, got {}",
                self.paillier_bit_length
            )));
        }
        if self.paillier_bit_length % 2 != 0 {
            return Err(PsiSumError::Config(format!(
                "paillier_bit_length must be even, got {}",
                self.paillier_bit_length
            )));
        }
        if self.primality_rounds == 0 {
            return Err(PsiSumError::Config(
                "primality_rounds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            group_bit_length: DEFAULT_GROUP_BIT_LENGTH,
            paillier_bit_length: DEFAULT_PAILLIER_BIT_LENGTH,
            primality_rounds: DEFAULT_PRIMALITY_ROUNDS,
        }
    }
}
