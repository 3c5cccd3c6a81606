//! In-memory example of PSI-Sum protocol execution.
//!
//! This example runs both parties within a single process, handing each
//! phase's message straight to the other party without network I/O.
//!
//! Run with:
//! ```bash
//! cargo run --release --bin in_memory [config.toml]
//! ```

use num_bigint::BigUint;
use psi_sum::{PartyA, PartyB, ProtocolConfig, PsiSumResult};
use std::env;
use std::fs;
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<ProtocolConfig, Box<dyn std::error::Error>> {
    match env::args().nth(1) {
        Some(path) => Ok(ProtocolConfig::from_toml_str(&fs::read_to_string(path)?)?),
        None => Ok(ProtocolConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    println!("=== PSI-Sum In-Memory Example ===\n");
    println!(
        "Group order: {} bits, Paillier modulus: {} bits, Miller-Rabin rounds: {}",
        config.group_bit_length, config.paillier_bit_length, config.primality_rounds
    );

    // Party A's private identifiers
    let identifiers_a = vec!["userA", "userB", "userC", "userD"];

    // Party B's private (identifier, value) records
    let pairs_b = vec![("userA", 100u64), ("userC", 200), ("userE", 50), ("userF", 75)];

    println!("\nParty A's identifiers ({}):", identifiers_a.len());
    for (i, id) in identifiers_a.iter().enumerate() {
        println!("  {}: {}", i + 1, id);
    }

    println!("\nParty B's records ({}):", pairs_b.len());
    for (i, (id, value)) in pairs_b.iter().enumerate() {
        println!("  {}: {} = {}", i + 1, id, value);
    }

    // === Phase 1: Setup ===
    println!("\n--- Phase 1: Setup ---");
    let (party_b, setup) = PartyB::setup(pairs_b, &config)?;
    println!(
        "Party B built a {}-bit group and a {}-bit Paillier key",
        setup.group.modulus().bits(),
        setup.public_key.modulus().bits()
    );
    let party_a = PartyA::new(identifiers_a, setup, &config)?;
    println!("Party A verified the group and sampled its secret");

    // === Phase 2: Encapsulation ===
    println!("\n--- Phase 2: Encapsulation (A -> B) ---");
    let (party_a, encapsulated) = party_a.encapsulate()?;
    println!("Party A sent {} blinded identifiers", encapsulated.len());

    // === Phase 3: Cross-processing ===
    println!("\n--- Phase 3: Cross-Processing (B -> A) ---");
    let (party_b, cross_processed) = party_b.cross_process(encapsulated)?;
    println!(
        "Party B sent {} doubly-blinded identifiers and {} encrypted records",
        cross_processed.double_blinded.len(),
        cross_processed.blinded_records.len()
    );

    // === Phase 4: Matching and aggregation ===
    println!("\n--- Phase 4: Matching and Aggregation (A -> B) ---");
    let aggregate = party_a.aggregate(cross_processed)?;
    println!("Party A found {} matches", aggregate.match_count);

    let result: PsiSumResult = party_b.reveal(aggregate)?;

    // === Results ===
    println!("\n=== Results ===");
    println!("Intersection size: {}", result.match_count);
    println!("Intersection sum: {}", result.aggregate_sum);

    println!("\nExpected: 2 matches, sum 300");
    if result.match_count == 2 && result.aggregate_sum == BigUint::from(300u32) {
        println!("✓ Protocol completed successfully!");
        Ok(())
    } else {
        Err("result does not match the expected intersection".into())
    }
}
