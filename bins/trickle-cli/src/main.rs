//! trickle-cli: Command-line client for a running trickle-faucet.
//!
//! Claims tokens, queries eligibility and faucet status, and drives the
//! administrator endpoints with a bearer token.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::debug;
use trickle_core::Address;

/// Trickle faucet command-line client.
#[derive(Parser)]
#[command(name = "trickle-cli")]
#[command(version, about = "Claim and administer a Trickle faucet.")]
struct Cli {
    /// Faucet base URL.
    #[arg(short, long, global = true, default_value = "http://127.0.0.1:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Claim tokens for an address.
    Claim(AddressArgs),
    /// Show global faucet status.
    Status,
    /// Show balance and eligibility of an address.
    Account(AddressArgs),
    /// Pause the faucet (administrator only).
    Pause(AdminArgs),
    /// Resume the faucet (administrator only).
    Unpause(AdminArgs),
    /// Bind the faucet to a ledger (administrator only).
    Bind(BindArgs),
    /// Show recent faucet events.
    Events(EventsArgs),
}

#[derive(Args)]
struct AddressArgs {
    /// Requester address (0x-prefixed hex).
    address: String,
}

#[derive(Args)]
struct AdminArgs {
    /// Administrator bearer token.
    #[arg(short, long, env = "FAUCET_ADMIN_TOKEN")]
    token: String,
}

#[derive(Args)]
struct BindArgs {
    /// Ledger address to bind.
    ledger: String,

    /// Administrator bearer token.
    #[arg(short, long, env = "FAUCET_ADMIN_TOKEN")]
    token: String,
}

#[derive(Args)]
struct EventsArgs {
    /// Maximum number of events to show.
    #[arg(short, long, default_value = "20")]
    limit: usize,
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
    let client = FaucetClient::new(&cli.url);

    match cli.command {
        Commands::Claim(args) => claim(&client, args).await,
        Commands::Status => status(&client).await,
        Commands::Account(args) => account(&client, args).await,
        Commands::Pause(args) => set_paused(&client, &args.token, true).await,
        Commands::Unpause(args) => set_paused(&client, &args.token, false).await,
        Commands::Bind(args) => bind(&client, args).await,
        Commands::Events(args) => events(&client, args).await,
    }
}

/// Thin JSON client over the faucet HTTP API.
struct FaucetClient {
    base: String,
    http: reqwest::Client,
}

impl FaucetClient {
    fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base, path);
        debug!(%url, "GET");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach faucet at {}", self.base))?;
        Self::decode(resp).await
    }

    async fn post(&self, path: &str, body: Value, token: Option<&str>) -> Result<Value> {
        let url = format!("{}{}", self.base, path);
        debug!(%url, "POST");
        let mut req = self.http.post(&url).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("Failed to reach faucet at {}", self.base))?;
        Self::decode(resp).await
    }

    /// Parse the JSON body, turning an error status into an `Err` carrying
    /// the server's message.
    async fn decode(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        let body: Value = resp.json().await.context("Invalid JSON response")?;
        if !status.is_success() {
            let msg = body["error"].as_str().unwrap_or("unknown error");
            let kind = body["kind"].as_str().unwrap_or("unknown");
            bail!("{msg} ({kind}, HTTP {})", status.as_u16());
        }
        Ok(body)
    }
}

/// Validate an address locally before sending it.
fn parse_address(raw: &str) -> Result<Address> {
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid address: {raw}"))
}

async fn claim(client: &FaucetClient, args: AddressArgs) -> Result<()> {
    let address = parse_address(&args.address)?;
    let body = client
        .post("/api/faucet", json!({ "address": address }), None)
        .await?;

    println!("Claimed {} tokens for {}", body["amount_tokens"].as_str().unwrap_or("?"), address);
    println!("  Claims used:         {}", body["claims"]);
    println!("  Remaining allowance: {}", body["remaining_allowance"].as_str().unwrap_or("?"));
    if let Some(next) = body["next_claim_at"].as_u64() {
        println!("  Next claim at:       {next}");
    }
    Ok(())
}

async fn status(client: &FaucetClient) -> Result<()> {
    let s = client.get("/api/status").await?;
    let policy = &s["policy"];
    let token = &s["token"];

    println!("Faucet {}", s["engine"].as_str().unwrap_or("?"));
    println!("  Paused:        {}", s["paused"]);
    println!("  Administrator: {}", s["administrator"].as_str().unwrap_or("?"));
    println!("  Ledger:        {}", s["ledger"].as_str().unwrap_or("(unbound)"));
    println!(
        "  Per claim:     {} {}",
        policy["claim_amount_tokens"].as_str().unwrap_or("?"),
        token["symbol"].as_str().unwrap_or("")
    );
    println!("  Cooldown:      {}s", policy["cooldown_secs"]);
    println!("  Max claims:    {}", policy["max_claims"]);
    println!("  Requesters:    {}", s["requesters"]);
    println!("  Total supply:  {}", token["total_supply"].as_str().unwrap_or("?"));
    Ok(())
}

async fn account(client: &FaucetClient, args: AddressArgs) -> Result<()> {
    let address = parse_address(&args.address)?;
    let a = client.get(&format!("/api/accounts/{address}")).await?;

    println!("Account {address}");
    println!("  Balance:             {}", a["balance"].as_str().unwrap_or("?"));
    println!("  Can claim:           {}", a["can_claim"]);
    println!("  Claims:              {} / {}", a["claims"], a["max_claims"]);
    println!("  Remaining allowance: {}", a["remaining_allowance"].as_str().unwrap_or("?"));
    if let Some(next) = a["next_claim_at_utc"].as_str() {
        println!("  Next claim at:       {next}");
    }
    Ok(())
}

async fn set_paused(client: &FaucetClient, token: &str, paused: bool) -> Result<()> {
    client
        .post("/api/admin/pause", json!({ "paused": paused }), Some(token))
        .await?;
    println!("Faucet {}", if paused { "paused" } else { "resumed" });
    Ok(())
}

async fn bind(client: &FaucetClient, args: BindArgs) -> Result<()> {
    let ledger = parse_address(&args.ledger)?;
    client
        .post("/api/admin/ledger", json!({ "address": ledger }), Some(&args.token))
        .await?;
    println!("Bound ledger {ledger}");
    Ok(())
}

async fn events(client: &FaucetClient, args: EventsArgs) -> Result<()> {
    let body = client
        .get(&format!("/api/events?limit={}", args.limit))
        .await?;
    let events = body["events"].as_array().cloned().unwrap_or_default();
    if events.is_empty() {
        println!("No events");
    }
    for event in events {
        println!("{event}");
    }
    Ok(())
}
