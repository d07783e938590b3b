//! Diagnostic tool - Check monitor configuration
//!
//! Run with: cargo run --bin diagnose

use std::env;

fn shorten(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 50 {
        let head: String = chars[..30].iter().collect();
        let tail: String = chars[chars.len() - 15..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        value.to_string()
    }
}

fn main() {
    println!("🔍 RELEND MONITOR DIAGNOSTIC CHECK\n");

    // Load .env
    dotenvy::dotenv().ok();

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    // Defaults mirror the DEFAULT_* constants in src/config.rs and
    // src/networks.rs; keep them in step when those change.
    let checks = [
        (
            "MANIFEST_URL",
            "https://raw.githubusercontent.com/relend-network/RelendAssets/refs/heads/feature/reorga/instances/current.json",
            "Token manifest",
        ),
        ("SWELL_RPC_URL", "https://swell-mainnet.alt.technology", "Swellchain RPC"),
        ("SONIC_RPC_URL", "https://rpc.soniclabs.com", "Sonic RPC"),
        ("MERKL_API_URL", "https://api.merkl.xyz", "Merkl rewards API"),
        ("MERKL_CHAIN_ID", "1923", "Chain scanned for Merkl opportunities by `apy`"),
        ("UTILS_LENS_ADDRESS", "0x681eD47409AF872B7EE81885cDb6A6cF3b2B9242", "Euler UtilsLens"),
        ("UTILS_LENS_CHAIN_ID", "1923", "Chain the UtilsLens lives on"),
        ("APY_VAULT_ADDRESS", "0xc5976e0356f0A3Ce8307fF08C88bB05933F88761", "Default APY vault"),
        ("RETRY_ATTEMPTS", "3", "Attempts per rate-limited call"),
        ("RETRY_DELAY_MS", "1000", "Delay between rate-limited attempts"),
        ("HTTP_TIMEOUT_SECS", "10", "HTTP timeout"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let is_default = env::var(key).is_err();
        let marker = if is_default { "(default)" } else { "(from .env)" };
        println!("  {}: {} {}", key, shorten(&value), marker);
        println!("    └─ {}\n", desc);
    }

    println!("═══════════════════════════════════════════════════");
    println!("                  NETWORK READINESS                 ");
    println!("═══════════════════════════════════════════════════\n");

    let l1 = env::var("L1_RPC_URL").ok().filter(|s| !s.trim().is_empty());
    match &l1 {
        Some(url) if url.contains("YOUR_API_KEY") => {
            println!("  L1_RPC_URL: ⚠️  placeholder ({})", shorten(url));
        }
        Some(url) => println!("  L1_RPC_URL: ✅ {}", shorten(url)),
        None => println!("  L1_RPC_URL: ❌ Not set"),
    }
    println!("  Bitlayer:   ✅ https://rpc.bitlayer.org (fixed)");

    let retry_attempts: usize = env::var("RETRY_ATTEMPTS")
        .unwrap_or_else(|_| "3".to_string())
        .parse()
        .unwrap_or(3);

    println!("\n═══════════════════════════════════════════════════");
    println!("                  WHAT TO EXPECT                    ");
    println!("═══════════════════════════════════════════════════\n");

    if l1.is_none() {
        println!("  • Ethereum tokens show as \"Unknown Token\" with zero supply");
    } else {
        println!("  • Ethereum tokens are read from L1_RPC_URL");
    }
    println!("  • Tokens on unsupported networks show empty metadata");
    println!("  • APY falls back to fixed rates when a source is down");
    println!("  • Vaults off the lens chain are listed without APY");

    if retry_attempts <= 1 {
        println!("\n  ⚠️  Retries disabled! Public RPCs and Merkl rate limit often;");
        println!("     expect fallback values under load.");
    }

    println!("\n✅ Diagnostic complete!\n");
}
