//! TCP-based PSI-Sum protocol example.
//!
//! Party B runs as the server and Party A as the client. Messages are sent as
//! one JSON document per line.
//!
//! Run server:
//! ```bash
//! cargo run --release --bin tcp_sync -- server [config.toml]
//! ```
//!
//! Run client (in another terminal):
//! ```bash
//! cargo run --release --bin tcp_sync -- client [config.toml]
//! ```

use psi_sum::{
    AggregateMessage, CrossProcessedMessage, EncapsulatedSet, PartyA, PartyB, ProtocolConfig,
    PsiSumResult, SetupMessage,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::env;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use tracing::info;
use tracing_subscriber::EnvFilter;

const ADDRESS: &str = "127.0.0.1:7878";

/// Write one message as a single JSON line.
fn send<T: Serialize>(stream: &mut TcpStream, message: &T) -> Result<(), Box<dyn std::error::Error>> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    stream.write_all(line.as_bytes())?;
    stream.flush()?;
    Ok(())
}

/// Read one JSON line and decode it.
fn receive<T: DeserializeOwned>(
    reader: &mut BufReader<TcpStream>,
) -> Result<T, Box<dyn std::error::Error>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err("connection closed by peer".into());
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

fn load_config(path: Option<&String>) -> Result<ProtocolConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(ProtocolConfig::from_toml_str(&fs::read_to_string(path)?)?),
        None => Ok(ProtocolConfig::default()),
    }
}

/// Run the server (Party B)
fn run_server(config: &ProtocolConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== PSI-Sum TCP Server (Party B) ===");

    // Define server's private records
    let records = vec![
        ("shared_item_1", 120u64),
        ("bob_only_1", 7),
        ("shared_item_2", 30),
        ("bob_only_2", 999),
    ];
    println!("\nServer's records ({}):", records.len());
    for (i, (id, value)) in records.iter().enumerate() {
        println!("  {}: {} = {}", i + 1, id, value);
    }

    // === Phase 1: Setup (before accepting, key generation takes a while) ===
    println!("\n--- Phase 1: Setup ---");
    let (party_b, setup) = PartyB::setup(records, config)?;
    println!("Generated group and Paillier key");

    let listener = TcpListener::bind(ADDRESS)?;
    println!("Listening on {}", ADDRESS);
    let (mut stream, addr) = listener.accept()?;
    info!(%addr, "client connected");
    let mut reader = BufReader::new(stream.try_clone()?);

    send(&mut stream, &setup)?;
    println!("Sent group description and public key");

    // === Phase 3: Cross-processing ===
    println!("\n--- Phase 3: Cross-Processing ---");
    let encapsulated: EncapsulatedSet = receive(&mut reader)?;
    println!("Received {} blinded identifiers", encapsulated.len());
    let (party_b, cross_processed) = party_b.cross_process(encapsulated)?;
    send(&mut stream, &cross_processed)?;
    println!(
        "Sent {} doubly-blinded identifiers and {} encrypted records",
        cross_processed.double_blinded.len(),
        cross_processed.blinded_records.len()
    );

    // === Reveal ===
    println!("\n--- Reveal ---");
    let aggregate: AggregateMessage = receive(&mut reader)?;
    let result = party_b.reveal(aggregate)?;
    send(&mut stream, &result)?;

    println!("\n=== Results ===");
    println!("Intersection size: {}", result.match_count);
    println!("Intersection sum: {}", result.aggregate_sum);
    println!("\n✓ Server protocol completed!");

    Ok(())
}

/// Run the client (Party A)
fn run_client(config: &ProtocolConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== PSI-Sum TCP Client (Party A) ===");
    println!("Connecting to {}", ADDRESS);

    let mut stream = TcpStream::connect(ADDRESS)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    println!("Connected to server");

    // Define client's private identifiers
    let identifiers = vec!["alice_only_1", "shared_item_1", "alice_only_2", "shared_item_2"];
    println!("\nClient's identifiers ({}):", identifiers.len());
    for (i, id) in identifiers.iter().enumerate() {
        println!("  {}: {}", i + 1, id);
    }

    // === Phase 1: Setup ===
    println!("\n--- Phase 1: Setup ---");
    let setup: SetupMessage = receive(&mut reader)?;
    let party_a = PartyA::new(identifiers, setup, config)?;
    println!("Verified server's group description");

    // === Phase 2: Encapsulation ===
    println!("\n--- Phase 2: Encapsulation ---");
    let (party_a, encapsulated) = party_a.encapsulate()?;
    send(&mut stream, &encapsulated)?;
    println!("Sent {} blinded identifiers", encapsulated.len());

    // === Phase 4: Matching and aggregation ===
    println!("\n--- Phase 4: Matching and Aggregation ---");
    let cross_processed: CrossProcessedMessage = receive(&mut reader)?;
    let aggregate = party_a.aggregate(cross_processed)?;
    println!("Found {} matches", aggregate.match_count);
    send(&mut stream, &aggregate)?;

    let result: PsiSumResult = receive(&mut reader)?;
    println!("\n=== Results ===");
    println!("Intersection size: {}", result.match_count);
    println!("Intersection sum: {}", result.aggregate_sum);
    println!("\n✓ Client protocol completed!");

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <server|client> [config.toml]", args[0]);
        eprintln!("\nRun server first: {} server", args[0]);
        eprintln!("Then run client: {} client", args[0]);
        std::process::exit(1);
    }

    let config = load_config(args.get(2))?;
    match args[1].as_str() {
        "server" => run_server(&config),
        "client" => run_client(&config),
        _ => {
            eprintln!("Unknown mode: {}", args[1]);
            eprintln!("Usage: {} <server|client> [config.toml]", args[0]);
            std::process::exit(1);
        }
    }
}
