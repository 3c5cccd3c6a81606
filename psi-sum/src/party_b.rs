//! Party B: holds identifier/value records and the Paillier private key.

use crate::config::ProtocolConfig;
use crate::error::{PsiSumError, Result};
use crate::group::{BlindGroup, BlindedElement};
use crate::messages::{
    validate_ciphertexts, validate_elements, AggregateMessage, CrossProcessedMessage,
    EncapsulatedSet, PsiSumResult, SetupMessage,
};
use crate::paillier::{Ciphertext, DecryptionKey};
use crate::state::{shuffle, SecretExponent};
use num_bigint::{BigInt, Sign};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info};

/// Party B before cross-processing.
///
/// Owns `secret_B` and the Paillier decryption key; only the group
/// description and the public key leave this object.
#[derive(Debug)]
pub struct PartyB {
    records: Vec<(String, BigInt)>,
    group: BlindGroup,
    secret: SecretExponent,
    key: DecryptionKey,
}

impl PartyB {
    /// Phase 1: build the blinding group, generate the Paillier key pair and
    /// sample `secret_B`.
    ///
    /// # Errors
    /// Returns `PsiSumError::EmptyInput` for no records, `PsiSumError::Domain`
    /// for duplicate identifiers, negative values or values totalling `N` or
    /// more, and any error from parameter generation.
    pub fn setup<I, S, V>(records: I, config: &ProtocolConfig) -> Result<(Self, SetupMessage)>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<BigInt>,
    {
        config.validate()?;
        let records = collect_records(records)?;
        let group = BlindGroup::build(config.group_bit_length, config.primality_rounds)?;
        Self::assemble(records, group, config)
    }

    /// Phase 1 with a group description that was agreed on out of band.
    ///
    /// # Errors
    /// As [`PartyB::setup`], plus `PsiSumError::Domain` if `group` fails verification
    /// or its order is shorter than `config.group_bit_length`.
    pub fn with_group<I, S, V>(
        records: I,
        group: BlindGroup,
        config: &ProtocolConfig,
    ) -> Result<(Self, SetupMessage)>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<BigInt>,
    {
        config.validate()?;
        let records = collect_records(records)?;
        group.verify(config.primality_rounds)?;
        if group.order().bits() < config.group_bit_length {
            return Err(PsiSumError::Domain(format!(
                "group order has {} bits, expected at least {}",
                group.order().bits(),
                config.group_bit_length
            )));
        }
        Self::assemble(records, group, config)
    }

    fn assemble(
        records: Vec<(String, BigInt)>,
        group: BlindGroup,
        config: &ProtocolConfig,
    ) -> Result<(Self, SetupMessage)> {
        let key = DecryptionKey::generate(config.paillier_bit_length, config.primality_rounds)?;
        // Any intersection sum is bounded by the total, so it cannot wrap mod N.
        let total: BigInt = records.iter().map(|(_, value)| value).sum();
        key.encryption_key()
            .check_plaintext(&total)
            .map_err(|_| {
                PsiSumError::Domain(format!(
                    "sum of all values must be below the {}-bit Paillier modulus",
                    key.encryption_key().modulus().bits()
                ))
            })?;
        let secret = SecretExponent::random(&group)?;
        debug!(
            records = records.len(),
            group_bits = group.modulus().bits(),
            paillier_bits = key.encryption_key().modulus().bits(),
            "party B completed setup"
        );

        let message = SetupMessage {
            group: group.clone(),
            public_key: key.encryption_key().clone(),
        };
        Ok((
            Self {
                records,
                group,
                secret,
                key,
            },
            message,
        ))
    }

    /// Phase 3: re-blind Party A's set and blind-and-encrypt Party B's own records.
    ///
    /// Both outputs are shuffled independently.
    ///
    /// # Errors
    /// Returns `PsiSumError::InvalidMessage` if Party A's set is empty or has
    /// elements outside the group.
    pub fn cross_process(
        self,
        set: EncapsulatedSet,
    ) -> Result<(PartyBAwaitingAggregate, CrossProcessedMessage)> {
        if set.is_empty() {
            return Err(PsiSumError::InvalidMessage(
                "encapsulated set cannot be empty".to_string(),
            ));
        }
        validate_elements(&self.group, &set.elements)?;

        let mut double_blinded = self.group.blind_all(&set.elements, self.secret.expose())?;
        shuffle(&mut double_blinded);

        let public_key = self.key.encryption_key();
        let mut blinded_records = self
            .records
            .par_iter()
            .map(|(identifier, value)| -> Result<(BlindedElement, Ciphertext)> {
                let element = self.group.blind_hash(identifier, self.secret.expose())?;
                let ciphertext = public_key.encrypt(value)?;
                Ok((element, ciphertext))
            })
            .collect::<Result<Vec<_>>>()?;
        shuffle(&mut blinded_records);
        info!(
            received = double_blinded.len(),
            records = blinded_records.len(),
            "party B cross-processed sets"
        );

        let next = PartyBAwaitingAggregate {
            key: self.key,
            max_matches: double_blinded.len().min(blinded_records.len()),
        };
        Ok((
            next,
            CrossProcessedMessage::new(double_blinded, blinded_records),
        ))
    }
}

/// Party B after cross-processing, waiting for Party A's aggregate.
#[derive(Debug)]
pub struct PartyBAwaitingAggregate {
    key: DecryptionKey,
    max_matches: usize,
}

impl PartyBAwaitingAggregate {
    /// Decrypt the aggregate and reveal the intersection sum.
    ///
    /// # Errors
    /// Returns `PsiSumError::InvalidMessage` if the reported match count exceeds
    /// what the exchanged sets allow or the ciphertext is malformed.
    pub fn reveal(self, aggregate: AggregateMessage) -> Result<PsiSumResult> {
        if aggregate.match_count > self.max_matches {
            return Err(PsiSumError::InvalidMessage(format!(
                "match count {} exceeds the largest possible intersection {}",
                aggregate.match_count, self.max_matches
            )));
        }
        validate_ciphertexts(self.key.encryption_key(), [&aggregate.encrypted_sum])?;

        let aggregate_sum = self
            .key
            .decrypt(&aggregate.encrypted_sum)
            .map_err(|e| PsiSumError::InvalidMessage(e.to_string()))?;
        info!(match_count = aggregate.match_count, "party B revealed the sum");
        Ok(PsiSumResult::new(aggregate.match_count, aggregate_sum))
    }
}

fn collect_records<I, S, V>(records: I) -> Result<Vec<(String, BigInt)>>
where
    I: IntoIterator<Item = (S, V)>,
    S: Into<String>,
    V: Into<BigInt>,
{
    let records: Vec<(String, BigInt)> = records
        .into_iter()
        .map(|(identifier, value)| (identifier.into(), value.into()))
        .collect();
    if records.is_empty() {
        return Err(PsiSumError::EmptyInput);
    }

    let mut seen = HashSet::with_capacity(records.len());
    for (identifier, value) in &records {
        if value.sign() == Sign::Minus {
            return Err(PsiSumError::Domain(format!(
                "value for identifier {identifier:?} must be non-negative"
            )));
        }
        if !seen.insert(identifier.as_str()) {
            return Err(PsiSumError::Domain(format!(
                "duplicate identifier {identifier:?}"
            )));
        }
    }
    Ok(records)
}
