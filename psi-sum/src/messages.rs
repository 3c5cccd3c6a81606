//! Message types exchanged between PSI-Sum parties.
//!
//! Each phase of the protocol produces exactly one message for the
//! counterpart. Messages carry only public material: group elements,
//! ciphertexts and the public Paillier modulus.

use crate::error::{PsiSumError, Result};
use crate::group::{BlindGroup, BlindedElement};
use crate::paillier::{Ciphertext, EncryptionKey};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Phase 1 output, sent from Party B to Party A.
///
/// Carries the public group description and Party B's Paillier public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupMessage {
    /// Public blinding group `(p, q, g)`
    pub group: BlindGroup,
    /// Party B's Paillier public key (the modulus `N`)
    pub public_key: EncryptionKey,
}

/// Phase 2 output, sent from Party A to Party B.
///
/// Party A's identifiers blinded by `secret_A`, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncapsulatedSet {
    /// Singly-blinded elements
    pub elements: Vec<BlindedElement>,
}

impl EncapsulatedSet {
    /// Create a new encapsulated set message.
    pub fn new(elements: Vec<BlindedElement>) -> Self {
        Self { elements }
    }

    /// Returns the number of elements in this message.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if this message contains no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Phase 3 output, sent from Party B to Party A.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossProcessedMessage {
    /// Party A's elements re-blinded by `secret_B`, shuffled
    pub double_blinded: Vec<BlindedElement>,
    /// Party B's identifiers blinded by `secret_B`, each paired with an
    /// encryption of its value, shuffled
    pub blinded_records: Vec<(BlindedElement, Ciphertext)>,
}

impl CrossProcessedMessage {
    /// Create a new cross-processed message.
    pub fn new(
        double_blinded: Vec<BlindedElement>,
        blinded_records: Vec<(BlindedElement, Ciphertext)>,
    ) -> Self {
        Self {
            double_blinded,
            blinded_records,
        }
    }
}

/// Phase 4 output, sent from Party A to Party B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateMessage {
    /// Number of doubly-blinded matches Party A found
    pub match_count: usize,
    /// Homomorphic sum of the matched ciphertexts
    pub encrypted_sum: Ciphertext,
}

/// Final result of the PSI-Sum protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsiSumResult {
    /// Size of the intersection
    pub match_count: usize,
    /// Sum of Party B's values over the intersection
    pub aggregate_sum: BigUint,
}

impl PsiSumResult {
    /// Create a new PSI-Sum result.
    pub fn new(match_count: usize, aggregate_sum: BigUint) -> Self {
        Self {
            match_count,
            aggregate_sum,
        }
    }

    /// Returns the number of elements in the intersection.
    pub fn len(&self) -> usize {
        self.match_count
    }

    /// Returns true if the intersection is empty.
    pub fn is_empty(&self) -> bool {
        self.match_count == 0
    }
}

/// Check every element of an inbound message against `group`.
pub(crate) fn validate_elements<'a>(
    group: &BlindGroup,
    elements: impl IntoIterator<Item = &'a BlindedElement>,
) -> Result<()> {
    for element in elements {
        group
            .check_element(element)
            .map_err(|e| PsiSumError::InvalidMessage(e.to_string()))?;
    }
    Ok(())
}

/// Check every ciphertext of an inbound message against `key`.
pub(crate) fn validate_ciphertexts<'a>(
    key: &EncryptionKey,
    ciphertexts: impl IntoIterator<Item = &'a Ciphertext>,
) -> Result<()> {
    for ciphertext in ciphertexts {
        key.check_ciphertext(ciphertext)
            .map_err(|e| PsiSumError::InvalidMessage(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::DecryptionKey;
    use num_bigint::BigInt;

    #[test]
    fn test_encapsulated_set() {
        let msg = EncapsulatedSet::new(vec![BlindedElement::from_biguint(BigUint::from(4u32))]);
        assert_eq!(msg.len(), 1);
        assert!(!msg.is_empty());

        let empty = EncapsulatedSet::new(vec![]);
        assert_eq!(empty.len(), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_psi_sum_result() {
        let result = PsiSumResult::new(2, BigUint::from(300u32));
        assert_eq!(result.len(), 2);
        assert!(!result.is_empty());
        assert_eq!(result.aggregate_sum, BigUint::from(300u32));

        let empty = PsiSumResult::new(0, BigUint::from(0u32));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_validate_elements() {
        let group = BlindGroup::from_parts(
            BigUint::from(23u32),
            BigUint::from(11u32),
            BigUint::from(4u32),
            20,
        )
        .unwrap();
        let good = BlindedElement::from_biguint(BigUint::from(16u32));
        let bad = BlindedElement::from_biguint(BigUint::from(5u32));

        assert!(validate_elements(&group, [&good]).is_ok());
        assert!(matches!(
            validate_elements(&group, [&good, &bad]),
            Err(PsiSumError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_validate_ciphertexts() {
        let key = DecryptionKey::from_primes(&BigUint::from(11u32), &BigUint::from(13u32)).unwrap();
        let public = key.encryption_key();
        let good = public.encrypt(&BigInt::from(3)).unwrap();
        let bad = Ciphertext::from_biguint(public.modulus_squared().clone());

        assert!(validate_ciphertexts(public, [&good]).is_ok());
        assert!(matches!(
            validate_ciphertexts(public, [&bad]),
            Err(PsiSumError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_messages_json_round_trip() {
        let group = BlindGroup::build(32, 20).unwrap();
        let key = DecryptionKey::generate(64, 20).unwrap();
        let setup = SetupMessage {
            group,
            public_key: key.encryption_key().clone(),
        };

        let json = serde_json::to_string(&setup).unwrap();
        let restored: SetupMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, setup);

        let aggregate = AggregateMessage {
            match_count: 1,
            encrypted_sum: key.encryption_key().encrypt(&BigInt::from(9)).unwrap(),
        };
        let json = serde_json::to_string(&aggregate).unwrap();
        let restored: AggregateMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, aggregate);
    }
}
