//! Party A: holds identifiers only and performs the matching.

use crate::config::ProtocolConfig;
use crate::error::{PsiSumError, Result};
use crate::group::{BlindGroup, BlindedElement};
use crate::messages::{
    validate_ciphertexts, validate_elements, AggregateMessage, CrossProcessedMessage,
    EncapsulatedSet, SetupMessage,
};
use crate::paillier::{Ciphertext, EncryptionKey};
use crate::state::{shuffle, SecretExponent};
use num_bigint::BigInt;
use num_traits::Zero;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// Party A before encapsulation.
///
/// Created from Party B's [`SetupMessage`]; owns `secret_A`.
#[derive(Debug)]
pub struct PartyA {
    identifiers: Vec<String>,
    group: BlindGroup,
    public_key: EncryptionKey,
    secret: SecretExponent,
}

impl PartyA {
    /// Accept Party B's setup message and sample `secret_A`.
    ///
    /// Duplicate identifiers are collapsed; the intersection is a set.
    ///
    /// # Errors
    /// Returns `PsiSumError::EmptyInput` if no identifiers are given,
    /// `PsiSumError::Config` for an invalid configuration, and
    /// `PsiSumError::InvalidMessage` if the received group fails verification
    /// or either the group or the Paillier modulus is smaller than `config` asks for.
    pub fn new<I, S>(identifiers: I, setup: SetupMessage, config: &ProtocolConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        config.validate()?;
        let identifiers: Vec<String> = identifiers
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if identifiers.is_empty() {
            return Err(PsiSumError::EmptyInput);
        }

        setup
            .group
            .verify(config.primality_rounds)
            .map_err(|e| PsiSumError::InvalidMessage(e.to_string()))?;
        check_parameter_sizes(&setup, config)?;
        let secret = SecretExponent::random(&setup.group)?;
        debug!(
            identifiers = identifiers.len(),
            group_bits = setup.group.modulus().bits(),
            paillier_bits = setup.public_key.modulus().bits(),
            "party A accepted setup"
        );

        Ok(Self {
            identifiers,
            group: setup.group,
            public_key: setup.public_key,
            secret,
        })
    }

    /// Phase 2: blind every identifier with `secret_A` and shuffle.
    pub fn encapsulate(self) -> Result<(PartyAAwaitingResponse, EncapsulatedSet)> {
        let mut elements = self
            .group
            .blind_hash_all(&self.identifiers, self.secret.expose())?;
        shuffle(&mut elements);
        info!(elements = elements.len(), "party A encapsulated its set");

        let next = PartyAAwaitingResponse {
            group: self.group,
            public_key: self.public_key,
            secret: self.secret,
            sent: elements.len(),
        };
        Ok((next, EncapsulatedSet::new(elements)))
    }
}

// Two primes of half the length give a modulus of `paillier_bit_length` or one bit less.
fn check_parameter_sizes(setup: &SetupMessage, config: &ProtocolConfig) -> Result<()> {
    let order_bits = setup.group.order().bits();
    if order_bits < config.group_bit_length {
        return Err(PsiSumError::InvalidMessage(format!(
            "group order has {order_bits} bits, expected at least {}",
            config.group_bit_length
        )));
    }
    let modulus_bits = setup.public_key.modulus().bits();
    if modulus_bits + 1 < config.paillier_bit_length {
        return Err(PsiSumError::InvalidMessage(format!(
            "Paillier modulus has {modulus_bits} bits, expected at least {}",
            config.paillier_bit_length - 1
        )));
    }
    Ok(())
}

/// Party A after sending its encapsulated set, waiting for Party B's response.
#[derive(Debug)]
pub struct PartyAAwaitingResponse {
    group: BlindGroup,
    public_key: EncryptionKey,
    secret: SecretExponent,
    sent: usize,
}

impl PartyAAwaitingResponse {
    /// Phase 4: match doubly-blinded identifiers and add up the matched ciphertexts.
    ///
    /// Returns the aggregate for Party B to decrypt. When nothing matches the
    /// aggregate is a fresh encryption of zero.
    ///
    /// # Errors
    /// Returns `PsiSumError::InvalidMessage` if the response has the wrong
    /// number of elements, or contains elements outside the group or
    /// ciphertexts outside `[1, N²)`.
    pub fn aggregate(self, response: CrossProcessedMessage) -> Result<AggregateMessage> {
        if response.double_blinded.len() != self.sent {
            return Err(PsiSumError::InvalidMessage(format!(
                "expected {} doubly-blinded elements, got {}",
                self.sent,
                response.double_blinded.len()
            )));
        }
        validate_elements(&self.group, &response.double_blinded)?;
        validate_elements(
            &self.group,
            response.blinded_records.iter().map(|(element, _)| element),
        )?;
        validate_ciphertexts(
            &self.public_key,
            response.blinded_records.iter().map(|(_, ciphertext)| ciphertext),
        )?;

        let (elements, ciphertexts): (Vec<BlindedElement>, Vec<Ciphertext>) =
            response.blinded_records.into_iter().unzip();
        let reblinded = self.group.blind_all(&elements, self.secret.expose())?;
        let lookup: HashMap<BlindedElement, Ciphertext> =
            reblinded.into_iter().zip(ciphertexts).collect();

        let mut match_count = 0usize;
        let mut total: Option<Ciphertext> = None;
        for element in &response.double_blinded {
            if let Some(ciphertext) = lookup.get(element) {
                match_count += 1;
                total = Some(match total {
                    Some(acc) => self.public_key.add(&acc, ciphertext)?,
                    None => ciphertext.clone(),
                });
            }
        }

        let encrypted_sum = match total {
            Some(sum) => sum,
            None => self.public_key.encrypt(&BigInt::zero())?,
        };
        info!(match_count, "party A aggregated matches");

        Ok(AggregateMessage {
            match_count,
            encrypted_sum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::DecryptionKey;
    use num_bigint::BigUint;

    fn config() -> ProtocolConfig {
        ProtocolConfig::new(64, 128, 20).unwrap()
    }

    fn setup() -> (SetupMessage, DecryptionKey) {
        let config = config();
        let group = BlindGroup::build(config.group_bit_length, config.primality_rounds).unwrap();
        let key =
            DecryptionKey::generate(config.paillier_bit_length, config.primality_rounds).unwrap();
        let message = SetupMessage {
            group,
            public_key: key.encryption_key().clone(),
        };
        (message, key)
    }

    #[test]
    fn test_new_empty_input() {
        let (message, _) = setup();
        let result = PartyA::new(Vec::<String>::new(), message, &config());
        assert!(matches!(result, Err(PsiSumError::EmptyInput)));
    }

    #[test]
    fn test_new_rejects_invalid_group() {
        let (message, _) = setup();
        assert!(PartyA::new(["a"], message.clone(), &config()).is_ok());

        // p - 1 has order 2, not q
        let mut json = serde_json::to_value(&message).unwrap();
        json["group"]["g"] = serde_json::to_value(message.group.modulus() - 1u32).unwrap();
        let tampered: SetupMessage = serde_json::from_value(json).unwrap();
        let result = PartyA::new(["a"], tampered, &config());
        assert!(matches!(result, Err(PsiSumError::InvalidMessage(_))));
    }

    #[test]
    fn test_new_rejects_undersized_group() {
        // A well-formed group with q = 11: distinct identifiers collide.
        let (mut message, _) = setup();
        message.group = BlindGroup::from_parts(
            BigUint::from(23u32),
            BigUint::from(11u32),
            BigUint::from(4u32),
            20,
        )
        .unwrap();
        let result = PartyA::new(["a", "b"], message, &config());
        assert!(matches!(result, Err(PsiSumError::InvalidMessage(_))));
    }

    #[test]
    fn test_new_rejects_undersized_paillier_key() {
        let (mut message, _) = setup();
        let small = DecryptionKey::generate(64, 20).unwrap();
        message.public_key = small.encryption_key().clone();
        let result = PartyA::new(["a"], message, &config());
        assert!(matches!(result, Err(PsiSumError::InvalidMessage(_))));
    }

    #[test]
    fn test_new_accepts_modulus_one_bit_short() {
        // 11 * 13 = 143 has 8 bits; a 9-bit request still accepts it.
        let (mut message, _) = setup();
        let key = DecryptionKey::from_primes(&BigUint::from(11u32), &BigUint::from(13u32)).unwrap();
        message.public_key = key.encryption_key().clone();
        let nine_bits = ProtocolConfig {
            paillier_bit_length: 9,
            ..config()
        };
        assert!(check_parameter_sizes(&message, &nine_bits).is_ok());

        let ten_bits = ProtocolConfig {
            paillier_bit_length: 10,
            ..config()
        };
        assert!(matches!(
            check_parameter_sizes(&message, &ten_bits),
            Err(PsiSumError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_encapsulate_deduplicates_and_blinds() {
        let (message, _) = setup();
        let party = PartyA::new(["userA", "userB", "userA"], message, &config()).unwrap();
        let (_, set) = party.encapsulate().unwrap();
        assert_eq!(set.len(), 2);
        assert_ne!(set.elements[0], set.elements[1]);
    }

    #[test]
    fn test_aggregate_rejects_wrong_length() {
        let (message, _) = setup();
        let party = PartyA::new(["userA", "userB"], message, &config()).unwrap();
        let (waiting, set) = party.encapsulate().unwrap();

        let response = CrossProcessedMessage::new(set.elements[..1].to_vec(), vec![]);
        let result = waiting.aggregate(response);
        assert!(matches!(result, Err(PsiSumError::InvalidMessage(_))));
    }

    #[test]
    fn test_aggregate_rejects_element_outside_group() {
        let (message, _) = setup();
        let modulus = message.group.modulus().clone();
        let party = PartyA::new(["userA"], message, &config()).unwrap();
        let (waiting, _) = party.encapsulate().unwrap();

        let response =
            CrossProcessedMessage::new(vec![BlindedElement::from_biguint(modulus)], vec![]);
        let result = waiting.aggregate(response);
        assert!(matches!(result, Err(PsiSumError::InvalidMessage(_))));
    }

    #[test]
    fn test_aggregate_without_matches_encrypts_zero() {
        let (message, key) = setup();
        let party = PartyA::new(["userA"], message, &config()).unwrap();
        let (waiting, set) = party.encapsulate().unwrap();

        // Echo A's own elements back without B's records: nothing can match.
        let response = CrossProcessedMessage::new(set.elements, vec![]);
        let aggregate = waiting.aggregate(response).unwrap();
        assert_eq!(aggregate.match_count, 0);
        assert_eq!(key.decrypt(&aggregate.encrypted_sum).unwrap(), BigUint::zero());
    }
}
