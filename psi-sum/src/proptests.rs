//! Property-based tests for the cryptographic building blocks
//!
//! Tests for:
//! - Homomorphic round trip and additivity
//! - Order independence of blinding
//! - Validity of generated groups
//! - Miller-Rabin soundness on composites

use crate::group::BlindGroup;
use crate::paillier::{combine, DecryptionKey};
use crate::primality::is_probable_prime;
use num_bigint::{BigInt, BigUint};
use num_traits::One;
use proptest::prelude::*;
use std::sync::OnceLock;

fn shared_key() -> &'static DecryptionKey {
    static KEY: OnceLock<DecryptionKey> = OnceLock::new();
    KEY.get_or_init(|| DecryptionKey::generate(128, 20).unwrap())
}

fn shared_group() -> &'static BlindGroup {
    static GROUP: OnceLock<BlindGroup> = OnceLock::new();
    GROUP.get_or_init(|| BlindGroup::build(64, 20).unwrap())
}

// Map arbitrary bytes to an exponent in [1, q - 1]
fn exponent_from(bytes: &[u8], group: &BlindGroup) -> BigUint {
    BigUint::from_bytes_be(bytes) % (group.order() - 1u32) + 1u32
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For all plaintexts below N, decryption inverts encryption
    #[test]
    fn prop_paillier_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..15)) {
        let key = shared_key();
        let m = BigUint::from_bytes_be(&bytes);
        let ciphertext = key.encryption_key().encrypt(&BigInt::from(m.clone())).unwrap();
        prop_assert_eq!(key.decrypt(&ciphertext).unwrap(), m);
    }

    /// Combining ciphertexts adds plaintexts
    #[test]
    fn prop_paillier_additivity(m1 in any::<u64>(), m2 in any::<u64>()) {
        let key = shared_key();
        let public = key.encryption_key();
        let c1 = public.encrypt(&BigInt::from(m1)).unwrap();
        let c2 = public.encrypt(&BigInt::from(m2)).unwrap();

        let sum = combine(&c1, &c2, public.modulus_squared()).unwrap();
        prop_assert_eq!(
            key.decrypt(&sum).unwrap(),
            BigUint::from(m1) + BigUint::from(m2)
        );
    }

    /// Negative plaintexts are always rejected
    #[test]
    fn prop_paillier_rejects_negative(m in i64::MIN..0i64) {
        let key = shared_key();
        prop_assert!(key.encryption_key().encrypt(&BigInt::from(m)).is_err());
    }

    /// Applying a then b equals applying b then a
    #[test]
    fn prop_blinding_commutes(
        identifier in "\\PC{0,32}",
        a_bytes in any::<[u8; 16]>(),
        b_bytes in any::<[u8; 16]>(),
    ) {
        let group = shared_group();
        let a = exponent_from(&a_bytes, group);
        let b = exponent_from(&b_bytes, group);

        let ab = group.blind(&group.blind_hash(&identifier, &a).unwrap(), &b).unwrap();
        let ba = group.blind(&group.blind_hash(&identifier, &b).unwrap(), &a).unwrap();
        prop_assert_eq!(ab, ba);
    }

    /// Products of two integers > 1 are never reported prime
    #[test]
    fn prop_composites_rejected(a in 2u64..1_000_000, b in 2u64..1_000_000) {
        let n = BigUint::from(a) * BigUint::from(b);
        prop_assert!(!is_probable_prime(&n, 20));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Generated groups satisfy p = 2q + 1, both prime, g of order q
    #[test]
    fn prop_group_validity(bits in 16u64..48) {
        let group = BlindGroup::build(bits, 20).unwrap();
        let (p, q, g) = (group.modulus(), group.order(), group.generator());

        prop_assert_eq!(q.bits(), bits);
        prop_assert_eq!(p.clone(), (q << 1u32) + 1u32);
        prop_assert!(is_probable_prime(p, 20));
        prop_assert!(is_probable_prime(q, 20));
        prop_assert!(!g.is_one());
        prop_assert!(g.modpow(q, p).is_one());
    }
}
