//! # Private Set Intersection with Sum (PSI-Sum)
//!
//! This library implements a two-party protocol in which Party A holds a set
//! of identifiers and Party B holds `(identifier, value)` records. Together
//! they learn the number of identifiers common to both sets and the sum of
//! Party B's values over that intersection. Party A never sees individual
//! values and Party B never learns which of Party A's identifiers matched.
//!
//! Two primitives are composed:
//!
//! - **Commutative blinding** in the order-`q` subgroup of `Z_p^*` for a safe
//!   prime `p = 2q + 1`: identifiers are hashed to `g^H(id)` and raised to
//!   each party's secret exponent. Equal identifiers collide only once both
//!   secrets have been applied, in either order.
//! - **Paillier encryption**: Party B encrypts its values; Party A multiplies
//!   the ciphertexts of matched records, which adds the plaintexts, and hands
//!   the aggregate back for Party B to decrypt.
//!
//! ## Features
//!
//! - **Transport Agnostic**: Each phase consumes and produces plain message
//!   structs; moving them between parties is left to the caller.
//! - **Serialization Ready**: All messages implement `serde` traits.
//! - **Type-State Parties**: Each party moves through distinct state types,
//!   so phases cannot be skipped, reordered or replayed.
//! - **Secrets Stay Put**: Secret exponents and the Paillier private key are
//!   private fields of the party objects and never appear in a message.
//!
//! ## Protocol Overview
//!
//! 1. **Setup** (B → A): Party B builds the group, generates its Paillier key
//!    pair and sends a [`SetupMessage`]. Party A verifies the group.
//! 2. **Encapsulation** (A → B): Party A blinds its identifiers and sends the
//!    shuffled [`EncapsulatedSet`].
//! 3. **Cross-processing** (B → A): Party B re-blinds A's set and blinds and
//!    encrypts its own records, sending a [`CrossProcessedMessage`].
//! 4. **Matching and aggregation** (A → B): Party A finishes the blinding of
//!    B's records, matches, adds the matched ciphertexts and sends an
//!    [`AggregateMessage`]. Party B decrypts it into a [`PsiSumResult`].
//!
//! ## Example Usage
//!
//! ```ignore
//! use psi_sum::{PartyA, PartyB, ProtocolConfig};
//!
//! let config = ProtocolConfig::default();
//!
//! let (party_b, setup) = PartyB::setup([("userA", 100), ("userC", 200)], &config)?;
//! let party_a = PartyA::new(["userA", "userB"], setup, &config)?;
//!
//! let (party_a, encapsulated) = party_a.encapsulate()?;
//! let (party_b, cross_processed) = party_b.cross_process(encapsulated)?;
//! let aggregate = party_a.aggregate(cross_processed)?;
//! let result = party_b.reveal(aggregate)?;
//!
//! assert_eq!(result.match_count, 1);
//! # Ok::<(), psi_sum::PsiSumError>(())
//! ```
//!
//! ## Security Considerations
//!
//! - The parties are assumed semi-honest. Inbound messages are validated
//!   structurally (group membership, ciphertext range, sizes), but nothing
//!   proves that the counterpart followed the protocol.
//! - The channel must be authenticated (e.g. TLS). Without it an active
//!   attacker can substitute the setup message and learn Party A's blinded set.
//! - The default parameter sizes are demonstration grade.
//!
//! ## Modules
//!
//! - [`bigint`] - Modular arithmetic and secure sampling
//! - [`primality`] - Miller-Rabin and prime generation
//! - [`paillier`] - Additively homomorphic encryption
//! - [`group`] - Safe-prime group and commutative blinding
//! - [`messages`] - Message types for protocol exchange
//! - [`protocol`] - In-memory session driver
//! - [`config`] - Parameter sizes
//! - [`error`] - Error types

pub use config::ProtocolConfig;
pub use error::{PsiSumError, Result};
pub use group::{BlindGroup, BlindedElement};
pub use messages::{
    AggregateMessage, CrossProcessedMessage, EncapsulatedSet, PsiSumResult, SetupMessage,
};
pub use paillier::{Ciphertext, DecryptionKey, EncryptionKey};
pub use party_a::{PartyA, PartyAAwaitingResponse};
pub use party_b::{PartyB, PartyBAwaitingAggregate};
pub use protocol::run;

pub mod bigint;
pub mod config;
pub mod error;
pub mod group;
pub mod messages;
pub mod paillier;
pub mod primality;
pub mod protocol;

mod party_a;
mod party_b;
mod state;

#[cfg(test)]
mod proptests;
