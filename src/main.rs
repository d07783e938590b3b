//! Relend Monitor - wrapped token deployments, vaults and yields
//!
//! Run with: cargo run -- tokens

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use console::style;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod apy;
mod cap;
mod computers;
mod config;
mod contracts;
mod display;
mod networks;
mod pools;
mod registry;
mod retry;
mod token_service;
mod vaults;

use apy::{ApyRates, CombinedApy, RemoteApyCombiner};
use cap::{decode_cap, CapLimit};
use config::Config;
use display::{euler_vault_link, format_percent, friendly_format_number, velodrome_link};
use networks::{explorer_address_url, rpc_url_for_chain, Network, ETHEREUM_CHAIN_ID};
use pools::{PoolData, PoolReader};
use token_service::{TokenData, TokenService};
use vaults::{VaultLine, VaultReader};

/// Relend Monitor - read-only view of Relend wrapped token deployments
#[derive(Parser)]
#[command(name = "relend-monitor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file (environment variables are used otherwise)
    #[arg(short, long, env = "RELEND_CONFIG")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of styled text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List live tokens with their supply
    Tokens,

    /// Deployment details of one token: bridge, lending vaults, pools
    Token {
        /// L1 wrapped token address
        address: String,
    },

    /// Blended supply/borrow APY of an Euler vault
    Apy {
        /// Vault address (defaults to APY_VAULT_ADDRESS)
        #[arg(long)]
        vault: Option<String>,
    },

    /// Decode a packed Euler supply/borrow cap
    DecodeCap {
        cap: u16,
    },

    /// Show the effective configuration
    Config {
        /// Write it to a TOML file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

// ============================================
// JSON REPORTS
// ============================================

#[derive(Serialize)]
struct TokensReport {
    generated_at: DateTime<Utc>,
    tokens: Vec<TokenData>,
}

#[derive(Serialize)]
struct VaultReport {
    #[serde(flatten)]
    line: VaultLine,
    apy: Option<CombinedApy>,
}

#[derive(Serialize)]
struct TokenReport {
    generated_at: DateTime<Utc>,
    token: TokenData,
    vaults: Vec<VaultReport>,
    pools: Vec<PoolData>,
}

#[derive(Serialize)]
struct ApyReport {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    apy: CombinedApy,
}

#[derive(Serialize)]
struct CapReport {
    packed: u16,
    unlimited: bool,
    raw: String,
}

// ============================================
// OUTPUT HELPERS
// ============================================

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🔭 RELEND MONITOR - Wrapped Token Deployments").cyan().bold()
    );
    println!(
        "{}",
        style("    Supply | Lending Vaults | Pools | Blended APY").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn print_section(title: &str) {
    println!();
    println!("{}", style(format!("═══ {} ═══", title)).blue().bold());
    println!();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Spinner on stderr; hidden in JSON mode so stdout stays parseable
fn create_spinner(message: &str, json: bool) -> ProgressBar {
    if json {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(spinner_style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_link(label: &str, url: Option<String>) {
    if let Some(url) = url {
        println!("  {:<18} {}", label, style(url).dim());
    }
}

fn print_rates(label: &str, rates: &ApyRates) {
    let source = if rates.is_fallback() {
        style(rates.source.clone()).yellow()
    } else {
        style(rates.source.clone()).green()
    };
    println!(
        "    {:<10} supply {:>8}  borrow {:>8}  ({})",
        label,
        format_percent(rates.supply_apy),
        format_percent(rates.borrow_apy),
        source
    );
}

fn print_apy(apy: &CombinedApy) {
    print_rates("Base", &apy.base);
    print_rates("Rewards", &apy.incentive);
    println!(
        "    {:<10} supply {:>8}  borrow {:>8}  ({})",
        style("Total").bold(),
        style(format_percent(apy.total.supply_apy)).green().bold(),
        style(format_percent(apy.total.borrow_apy)).green().bold(),
        apy.total.source
    );

    if let Some(record) = &apy.incentive.apr_record {
        for (side, detail) in [("lend", &record.lend), ("borrow", &record.borrow)] {
            if let Some(detail) = detail {
                for b in &detail.breakdowns {
                    println!(
                        "      └─ {} {} {} {:.2}%",
                        side, b.distribution_type, b.kind, b.value
                    );
                }
            }
        }
    }
}

fn print_vault(vault: &VaultReport) {
    let line = &vault.line;
    let network = Network::from_chain_id(line.chain_id);

    let Some(data) = &line.data else {
        let status = if line.kind.eq_ignore_ascii_case("euler") {
            style("Error").red()
        } else {
            style("not tracked").dim()
        };
        println!("  {} {} {}", style(&line.kind).cyan(), line.address, status);
        return;
    };

    println!("  {} {}", style(&line.kind).cyan(), style(&data.name).bold());
    println!("    Address:     {}", line.address);
    println!("    Supply:      {}", friendly_format_number(data.total_supply));
    println!("    Borrows:     {}", friendly_format_number(data.total_borrows));
    println!("    Utilization: {}", format_percent(data.utilization() * 100.0));
    println!("    Cash:        {}", friendly_format_number(data.balance_of_underlying));
    println!("    Debt token:  {}", friendly_format_number(data.total_supply_debt_token));
    println!(
        "    Supply cap:  {}",
        data.supply_cap_units()
            .map(friendly_format_number)
            .unwrap_or_else(|| "Unlimited".to_string())
    );
    println!(
        "    Borrow cap:  {}",
        data.borrow_cap_units()
            .map(friendly_format_number)
            .unwrap_or_else(|| "Unlimited".to_string())
    );
    if let Some(headroom) = data.borrow_headroom() {
        println!("    Headroom:    {}", friendly_format_number(headroom));
    }
    if let Some(apy) = &vault.apy {
        println!("    APY:");
        print_apy(apy);
    }
    println!("    {}", style(euler_vault_link(&line.address, network)).dim());
}

fn print_pool(pool: &PoolData, network: Network, symbol: &str) {
    println!("  {} {}", style(&pool.kind).cyan(), style(&pool.name).bold());
    println!("    Address: {}", pool.address);
    match &pool.tokens {
        Some(tokens) => {
            for token in tokens {
                println!(
                    "    {:<10} {:>12}  {}",
                    token.symbol,
                    friendly_format_number(token.total_supply),
                    token.address
                );
            }
        }
        None => println!("    {}", style("Error").red()),
    }
    if pool.kind.eq_ignore_ascii_case("velodrome") {
        println!("    {}", style(velodrome_link(network, symbol)).dim());
    }
}

// ============================================
// COMMANDS
// ============================================

async fn run_tokens(config: &Config, json: bool) -> Result<()> {
    let service = TokenService::new(config.clone())?;

    let spinner = create_spinner("Fetching token manifest and supplies...", json);
    let tokens = service.fetch_token_data().await;
    spinner.finish_and_clear();
    let tokens = tokens?;

    if json {
        return print_json(&TokensReport { generated_at: Utc::now(), tokens });
    }

    print_section("LIVE TOKENS");
    if tokens.is_empty() {
        println!("{}", style("No live tokens in the manifest.").yellow());
        return Ok(());
    }

    for (i, token) in tokens.iter().enumerate() {
        println!(
            "  {:>2}. {:<24} {:<16} {:<10} supply {:>10}  ${:>10}",
            i + 1,
            style(&token.network).cyan(),
            token.name,
            token.symbol,
            friendly_format_number(token.total_supply),
            friendly_format_number(token.total_supply_usdc)
        );
        println!("      {}", style(&token.address).dim());
    }

    let total_usdc: f64 = tokens.iter().map(|t| t.total_supply_usdc).sum();
    println!();
    println!(
        "{} {} token(s), ${} total supply",
        style("✓").green(),
        tokens.len(),
        friendly_format_number(total_usdc)
    );
    Ok(())
}

async fn read_vault_reports(config: &Config, lines: Vec<VaultLine>) -> Result<Vec<VaultReport>> {
    // One combiner per chain that has read vaults; `None` where no lens is deployed
    let mut combiners: HashMap<u64, Option<RemoteApyCombiner>> = HashMap::new();
    for line in lines.iter().filter(|l| l.data.is_some()) {
        if combiners.contains_key(&line.chain_id) {
            continue;
        }
        let combiner = RemoteApyCombiner::for_chain(config, line.chain_id)?;
        if combiner.is_none() {
            warn!(
                "No Euler lens on chain {} (lens chain is {}), skipping APY",
                line.chain_id, config.utils_lens_chain_id
            );
        }
        combiners.insert(line.chain_id, combiner);
    }

    let reads = lines.into_iter().map(|line| {
        let combiner = combiners.get(&line.chain_id).and_then(Option::as_ref);
        async move {
            let apy = match (&line.data, combiner) {
                (Some(data), Some(combiner)) => Some(combiner.combined_apy(data.address).await),
                _ => None,
            };
            VaultReport { line, apy }
        }
    });
    Ok(join_all(reads).await)
}

async fn run_token(config: &Config, address: &str, json: bool) -> Result<()> {
    let service = TokenService::new(config.clone())?;

    let spinner = create_spinner("Reading token deployment...", json);
    let token = service.fetch_token(address).await;
    let token = match token {
        Ok(Some(token)) => token,
        Ok(None) => {
            spinner.finish_and_clear();
            return Err(eyre!("No live token with address {}", address));
        }
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    spinner.set_message("Reading lending vaults and pools...");
    let (lines, pools) = match rpc_url_for_chain(token.l2_chain_id, config) {
        Ok(rpc_url) => {
            let vault_reader = VaultReader::connect(&rpc_url, config.retry_policy())?;
            let pool_reader = PoolReader::connect(&rpc_url, config.retry_policy())?;
            tokio::join!(
                vault_reader.read_lending_venues(&token),
                pool_reader.read_pools(&token)
            )
        }
        Err(e) => {
            warn!("Skipping vaults and pools of {}: {}", token.symbol, e);
            (Vec::new(), Vec::new())
        }
    };

    spinner.set_message("Reading APYs...");
    let vaults = read_vault_reports(config, lines).await;
    spinner.finish_and_clear();
    let vaults = vaults?;

    if json {
        return print_json(&TokenReport {
            generated_at: Utc::now(),
            token,
            vaults,
            pools,
        });
    }

    let l2_network = Network::from_chain_id(token.l2_chain_id);

    print_section(&format!("{} ({})", token.name, token.network));
    println!("  Symbol:          {}", token.symbol);
    match token.home_network.chain_id() {
        Some(chain_id) => println!("  Home network:    {} ({})", token.home_network, chain_id),
        None => println!("  Home network:    {}", token.home_network),
    }
    println!("  Total supply:    {}", friendly_format_number(token.total_supply));
    println!("  Supply (USDC):   ${}", friendly_format_number(token.total_supply_usdc));
    println!("  L2 network:      {} ({})", l2_network, token.l2_chain_id);
    println!("  OFT:             {}", if token.is_oft { "yes" } else { "no" });

    print_section("BRIDGE");
    print_link("L1 token", explorer_address_url(ETHEREUM_CHAIN_ID, &token.address));
    print_link("L1 bridge", explorer_address_url(ETHEREUM_CHAIN_ID, &token.l1_bridge_address));
    print_link("L2 token", explorer_address_url(token.l2_chain_id, &token.l2_token_address));
    print_link("L2 bridge", explorer_address_url(token.l2_chain_id, &token.l2_bridge_address));
    if !token.bridge_url.is_empty() {
        print_link("Bridge app", Some(token.bridge_url.clone()));
    }

    print_section("LENDING VENUES");
    if vaults.is_empty() {
        println!("  {}", style("None").dim());
    }
    for vault in &vaults {
        print_vault(vault);
        println!();
    }

    print_section("POOLS");
    if pools.is_empty() {
        println!("  {}", style("None").dim());
    }
    for pool in &pools {
        print_pool(pool, l2_network, &token.symbol);
        println!();
    }

    Ok(())
}

async fn run_apy(config: &Config, vault: Option<String>, json: bool) -> Result<()> {
    let vault = match vault {
        Some(v) => Address::from_str(&v).map_err(|e| eyre!("Invalid vault address {}: {}", v, e))?,
        None => config.apy_vault()?,
    };

    let combiner = RemoteApyCombiner::from_config(config)?;
    let spinner = create_spinner("Reading Euler Lens and Merkl rewards...", json);
    let apy = combiner.combined_apy(vault).await;
    spinner.finish_and_clear();

    if json {
        return print_json(&ApyReport { generated_at: Utc::now(), apy });
    }

    print_section("BLENDED APY");
    println!("  Vault: {}", style(vault).cyan());
    println!();
    print_apy(&apy);
    Ok(())
}

fn run_decode_cap(cap: u16, json: bool) -> Result<()> {
    let limit = CapLimit::from_packed(cap);
    let report = CapReport {
        packed: cap,
        unlimited: limit.is_unlimited(),
        raw: decode_cap(cap).to_string(),
    };

    if json {
        return print_json(&report);
    }

    println!(
        "Cap {} (mantissa {}, exponent {}) => {}",
        cap,
        cap >> 6,
        cap & 63,
        style(limit).green().bold()
    );
    if !limit.is_unlimited() {
        println!("  raw units: {}", limit.raw());
        println!("  with 6 decimals:  {}", limit.to_units(6).map(friendly_format_number).unwrap_or_default());
        println!("  with 18 decimals: {}", limit.to_units(18).map(friendly_format_number).unwrap_or_default());
    }
    Ok(())
}

fn run_config(config: &Config, save: Option<PathBuf>, json: bool) -> Result<()> {
    if json {
        print_json(config)?;
    } else {
        config.print_summary();
    }

    if let Some(path) = save {
        config.save_to_file(&path)?;
        info!("💾 Configuration written to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relend_monitor=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    // Decoding needs no configuration
    if let Commands::DecodeCap { cap } = cli.command {
        return run_decode_cap(cap, cli.json);
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }

    if !cli.json {
        print_banner();
    }

    match cli.command {
        Commands::Tokens => run_tokens(&config, cli.json).await,
        Commands::Token { address } => run_token(&config, &address, cli.json).await,
        Commands::Apy { vault } => run_apy(&config, vault, cli.json).await,
        Commands::Config { save } => run_config(&config, save, cli.json),
        Commands::DecodeCap { cap } => run_decode_cap(cap, cli.json),
    }
}
