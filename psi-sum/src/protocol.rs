//! In-memory driver for the four protocol phases.

use crate::config::ProtocolConfig;
use crate::error::Result;
use crate::messages::PsiSumResult;
use crate::party_a::PartyA;
use crate::party_b::PartyB;
use num_bigint::BigInt;
use tracing::info;

/// Run a complete PSI-Sum session between two in-process parties.
///
/// Messages are handed from one party to the other directly, in the order a
/// reliable channel would deliver them. Any error aborts the session.
///
/// # Arguments
/// * `identifiers_a` - Party A's identifiers
/// * `pairs_b` - Party B's `(identifier, value)` records
/// * `config` - Parameter sizes for the session
///
/// # Returns
/// The intersection size and the sum of Party B's values over the intersection
pub fn run<IA, SA, IB, SB, V>(
    identifiers_a: IA,
    pairs_b: IB,
    config: &ProtocolConfig,
) -> Result<PsiSumResult>
where
    IA: IntoIterator<Item = SA>,
    SA: Into<String>,
    IB: IntoIterator<Item = (SB, V)>,
    SB: Into<String>,
    V: Into<BigInt>,
{
    // Phase 1: setup
    let (party_b, setup) = PartyB::setup(pairs_b, config)?;
    let party_a = PartyA::new(identifiers_a, setup, config)?;

    // Phase 2: encapsulation (A -> B)
    let (party_a, encapsulated) = party_a.encapsulate()?;

    // Phase 3: cross-processing (B -> A)
    let (party_b, cross_processed) = party_b.cross_process(encapsulated)?;

    // Phase 4: matching and aggregation (A -> B), then decryption
    let aggregate = party_a.aggregate(cross_processed)?;
    let result = party_b.reveal(aggregate)?;

    info!(match_count = result.match_count, "PSI-Sum session complete");
    Ok(result)
}
