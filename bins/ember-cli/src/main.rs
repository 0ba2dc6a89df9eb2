//! ember-cli: Command-line client for an Ember board node.
//!
//! Submits entries, reads the ranked board, and manages refunds over the
//! node's JSON-RPC interface.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ember_core::constants::DEFAULT_RPC_PORT;
use ember_core::traits::{Clock, SystemClock};
use ember_core::types::{Amount, MessageId, Sender};
use ember_core::validation::validate_content;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde_json::Value;

/// Ember board command-line client.
#[derive(Parser)]
#[command(name = "ember-cli")]
#[command(version, about = "Bid for a place on the Ember board.")]
struct Cli {
    /// RPC endpoint URL.
    #[arg(short, long, global = true, default_value_t = default_endpoint())]
    rpc_endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an entry with a bid.
    Submit(SubmitArgs),
    /// List the board, best first.
    List,
    /// Show how many entries the board holds.
    Count,
    /// Show the bid a new entry must exceed right now.
    MinBid,
    /// Show the refund owed to a sender.
    Refund(SenderArgs),
    /// Withdraw everything owed to a sender.
    Withdraw(SenderArgs),
    /// Show aggregate board figures.
    Info,
    /// Derive a message id from content and a nonce without submitting.
    DeriveId(DeriveIdArgs),
}

#[derive(Args)]
struct SubmitArgs {
    /// Message text.
    content: String,

    /// Sender address (40 hex characters, optional 0x).
    #[arg(short, long)]
    from: String,

    /// Bid in base units.
    #[arg(short, long)]
    bid: Amount,

    /// Explicit message id (64 hex characters). Derived from content and
    /// nonce when omitted.
    #[arg(long)]
    id: Option<String>,

    /// Nonce mixed into the derived id (default: current Unix time).
    #[arg(long)]
    nonce: Option<u64>,
}

#[derive(Args)]
struct SenderArgs {
    /// Sender address (40 hex characters, optional 0x).
    sender: String,
}

#[derive(Args)]
struct DeriveIdArgs {
    /// Message text.
    content: String,

    /// Nonce mixed into the id.
    #[arg(long)]
    nonce: u64,
}

fn default_endpoint() -> String {
    format!("http://127.0.0.1:{DEFAULT_RPC_PORT}")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Submit(args) => submit(&cli.rpc_endpoint, args).await,
        Commands::List => list(&cli.rpc_endpoint).await,
        Commands::Count => count(&cli.rpc_endpoint).await,
        Commands::MinBid => min_bid(&cli.rpc_endpoint).await,
        Commands::Refund(args) => refund(&cli.rpc_endpoint, args).await,
        Commands::Withdraw(args) => withdraw(&cli.rpc_endpoint, args).await,
        Commands::Info => info(&cli.rpc_endpoint).await,
        Commands::DeriveId(args) => derive_id(args),
    }
}

/// Submit an entry and report its rank and any eviction.
async fn submit(endpoint: &str, args: SubmitArgs) -> Result<()> {
    validate_content(&args.content).context("Invalid content")?;
    let sender: Sender = args.from.parse().context("Invalid sender address")?;

    let id = submission_id(&args, &SystemClock)?;

    let client = connect(endpoint)?;
    let mut params = ArrayParams::new();
    params.insert(args.content.as_str())?;
    params.insert(id.to_string())?;
    params.insert(sender.to_string())?;
    params.insert(args.bid.to_string())?;

    let result: Value = client
        .request("submit", params)
        .await
        .context("RPC submit failed")?;

    println!("Admitted: {}", str_field(&result, "id"));
    println!("Rank: {}", result["rank"]);
    println!("Submitted at: {}", result["submitted_at"]);
    if let Some(evicted) = result.get("evicted").filter(|v| !v.is_null()) {
        println!(
            "Evicted: {} (refund {} owed to {})",
            str_field(evicted, "id"),
            str_field(evicted, "refund"),
            str_field(evicted, "sender"),
        );
    }
    Ok(())
}

/// The explicit id, or one derived from content and a nonce that defaults
/// to the current time.
fn submission_id(args: &SubmitArgs, clock: &dyn Clock) -> Result<MessageId> {
    match &args.id {
        Some(hex_id) => hex_id.parse::<MessageId>().context("Invalid message id"),
        None => {
            let nonce = args.nonce.unwrap_or_else(|| clock.now());
            Ok(MessageId::derive(&args.content, &nonce.to_le_bytes()))
        }
    }
}

/// Print the ranked board.
async fn list(endpoint: &str) -> Result<()> {
    let client = connect(endpoint)?;
    let entries: Vec<Value> = client
        .request("listtop", ArrayParams::new())
        .await
        .context("RPC listtop failed")?;

    if entries.is_empty() {
        println!("The board is empty.");
        return Ok(());
    }

    println!("{:>4}  {:>20}  {:>20}  {:>10}  CONTENT", "RANK", "VALUE", "BID", "SUBMITTED");
    for entry in &entries {
        println!(
            "{:>4}  {:>20}  {:>20}  {:>10}  {}",
            entry["rank"],
            str_field(entry, "effective_value"),
            str_field(entry, "raw_bid"),
            entry["submitted_at"],
            str_field(entry, "content"),
        );
    }
    Ok(())
}

async fn count(endpoint: &str) -> Result<()> {
    let client = connect(endpoint)?;
    let count: usize = client
        .request("getcount", ArrayParams::new())
        .await
        .context("RPC getcount failed")?;
    println!("{count}");
    Ok(())
}

async fn min_bid(endpoint: &str) -> Result<()> {
    let client = connect(endpoint)?;
    let minimum: String = client
        .request("getminimumbid", ArrayParams::new())
        .await
        .context("RPC getminimumbid failed")?;
    println!("A bid must exceed {minimum}");
    Ok(())
}

async fn refund(endpoint: &str, args: SenderArgs) -> Result<()> {
    let sender: Sender = args.sender.parse().context("Invalid sender address")?;
    let client = connect(endpoint)?;
    let mut params = ArrayParams::new();
    params.insert(sender.to_string())?;
    let owed: String = client
        .request("getpendingrefund", params)
        .await
        .context("RPC getpendingrefund failed")?;
    println!("{sender}: {owed} owed");
    Ok(())
}

async fn withdraw(endpoint: &str, args: SenderArgs) -> Result<()> {
    let sender: Sender = args.sender.parse().context("Invalid sender address")?;
    let client = connect(endpoint)?;
    let mut params = ArrayParams::new();
    params.insert(sender.to_string())?;
    let amount: String = client
        .request("withdraw", params)
        .await
        .context("RPC withdraw failed")?;
    println!("Withdrew {amount} to {sender}");
    Ok(())
}

async fn info(endpoint: &str) -> Result<()> {
    let client = connect(endpoint)?;
    let info: Value = client
        .request("getinfo", ArrayParams::new())
        .await
        .context("RPC getinfo failed")?;
    println!("Entries: {} / {}", info["count"], info["capacity"]);
    println!("Minimum bid: {}", str_field(&info, "minimum_bid"));
    println!("Half-life: {}s", info["half_life_secs"]);
    println!("Node time: {}", info["now"]);
    println!("Refunds owed: {}", str_field(&info, "total_refunds_owed"));
    Ok(())
}

fn derive_id(args: DeriveIdArgs) -> Result<()> {
    validate_content(&args.content).context("Invalid content")?;
    println!("{}", MessageId::derive(&args.content, &args.nonce.to_le_bytes()));
    Ok(())
}

fn connect(endpoint: &str) -> Result<HttpClient> {
    HttpClientBuilder::default()
        .build(endpoint)
        .context("Failed to connect to RPC")
}

/// A string field of a JSON object, or empty when absent.
fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or_default()
}
