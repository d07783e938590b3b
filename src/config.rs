//! Configuration for the Relend monitor
//!
//! Everything can be set from the environment (or a `.env` file); a TOML
//! file works as well for pinned setups.

use alloy_primitives::Address;
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::networks::{DEFAULT_SONIC_RPC_URL, DEFAULT_SWELL_RPC_URL, SWELLCHAIN_CHAIN_ID};
use crate::retry::RetryPolicy;

// ============================================
// DEFAULTS
// ============================================

/// Token manifest published in the RelendAssets repository
pub const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/relend-network/RelendAssets/refs/heads/feature/reorga/instances/current.json";

pub const DEFAULT_MERKL_API_URL: &str = "https://api.merkl.xyz";

/// Euler UtilsLens on Swellchain
pub const DEFAULT_UTILS_LENS_ADDRESS: &str = "0x681eD47409AF872B7EE81885cDb6A6cF3b2B9242";

/// Euler vault whose blended APY is shown by default
pub const DEFAULT_APY_VAULT_ADDRESS: &str = "0xc5976e0356f0A3Ce8307fF08C88bB05933F88761";

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Token Registry ==========
    /// Remote JSON manifest listing every wrapped token
    pub manifest_url: String,

    // ========== Network Settings ==========
    /// Ethereum mainnet RPC (no public default, must be configured)
    pub l1_rpc_url: Option<String>,

    /// Swellchain RPC
    pub swell_rpc_url: String,

    /// Sonic RPC
    pub sonic_rpc_url: String,

    // ========== APY Sources ==========
    /// Merkl API base URL (without `/v4`)
    pub merkl_api_url: String,

    /// Chain whose Merkl opportunities are scanned
    pub merkl_chain_id: u64,

    /// Euler UtilsLens contract used for base lending rates
    pub utils_lens_address: String,

    /// Chain the UtilsLens is deployed on; vaults elsewhere get no APY
    #[serde(default = "default_utils_lens_chain_id")]
    pub utils_lens_chain_id: u64,

    /// Vault shown by `apy` when none is given
    pub apy_vault_address: String,

    // ========== Remote Calls ==========
    /// Attempts per call when the remote answers 429
    pub retry_attempts: usize,

    /// Fixed delay between rate-limited attempts
    pub retry_delay_ms: u64,

    /// Timeout for HTTP calls (manifest, Merkl)
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            manifest_url: env::var("MANIFEST_URL")
                .unwrap_or_else(|_| DEFAULT_MANIFEST_URL.to_string()),

            // Networks
            l1_rpc_url: env::var("L1_RPC_URL").ok().filter(|s| !s.trim().is_empty()),
            swell_rpc_url: env::var("SWELL_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_SWELL_RPC_URL.to_string()),
            sonic_rpc_url: env::var("SONIC_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_SONIC_RPC_URL.to_string()),

            // APY sources
            merkl_api_url: env::var("MERKL_API_URL")
                .unwrap_or_else(|_| DEFAULT_MERKL_API_URL.to_string()),
            merkl_chain_id: env::var("MERKL_CHAIN_ID")
                .unwrap_or_else(|_| SWELLCHAIN_CHAIN_ID.to_string())
                .parse()
                .unwrap_or(SWELLCHAIN_CHAIN_ID),
            utils_lens_address: env::var("UTILS_LENS_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_UTILS_LENS_ADDRESS.to_string()),
            utils_lens_chain_id: env::var("UTILS_LENS_CHAIN_ID")
                .unwrap_or_else(|_| SWELLCHAIN_CHAIN_ID.to_string())
                .parse()
                .unwrap_or(SWELLCHAIN_CHAIN_ID),
            apy_vault_address: env::var("APY_VAULT_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_APY_VAULT_ADDRESS.to_string()),

            // Remote calls
            retry_attempts: env::var("RETRY_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn utils_lens(&self) -> Result<Address> {
        Address::from_str(&self.utils_lens_address)
            .map_err(|e| eyre!("Invalid UTILS_LENS_ADDRESS {}: {}", self.utils_lens_address, e))
    }

    pub fn apy_vault(&self) -> Result<Address> {
        Address::from_str(&self.apy_vault_address)
            .map_err(|e| eyre!("Invalid APY_VAULT_ADDRESS {}: {}", self.apy_vault_address, e))
    }

    /// Sanity-check the configuration before any remote call
    pub fn validate(&self) -> Result<()> {
        for (key, url) in [
            ("MANIFEST_URL", &self.manifest_url),
            ("SWELL_RPC_URL", &self.swell_rpc_url),
            ("SONIC_RPC_URL", &self.sonic_rpc_url),
            ("MERKL_API_URL", &self.merkl_api_url),
        ] {
            if url.trim().is_empty() {
                return Err(eyre!("{} must not be empty", key));
            }
        }

        if let Some(l1) = &self.l1_rpc_url {
            if l1.contains("YOUR_API_KEY") {
                return Err(eyre!("Invalid L1_RPC_URL - please set a valid Alchemy/Infura URL"));
            }
        }

        if self.http_timeout_secs == 0 {
            return Err(eyre!("HTTP_TIMEOUT_SECS must be at least 1"));
        }

        self.utils_lens()?;
        self.apy_vault()?;

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              RELEND MONITOR - CONFIGURATION                ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ NETWORKS                                                   ║");
        println!("║ • L1 RPC:          {:^40} ║",
            if self.l1_rpc_url.is_some() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!("║ • Swell RPC:       {:^40} ║", shorten(&self.swell_rpc_url, 40));
        println!("║ • Sonic RPC:       {:^40} ║", shorten(&self.sonic_rpc_url, 40));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ APY SOURCES                                                ║");
        println!("║ • Merkl API:       {:^40} ║", shorten(&self.merkl_api_url, 40));
        println!("║ • Merkl Chain:     {:^40} ║", self.merkl_chain_id);
        println!("║ • Euler Lens:      {:^40} ║", shorten(&self.utils_lens_address, 40));
        println!("║ • Lens Chain:      {:^40} ║", self.utils_lens_chain_id);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ REMOTE CALLS                                               ║");
        println!("║ • Retry Attempts:  {:^40} ║", self.retry_attempts);
        println!("║ • Retry Delay:     {:>37} ms ║", self.retry_delay_ms);
        println!("║ • HTTP Timeout:    {:>38} s ║", self.http_timeout_secs);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

fn default_utils_lens_chain_id() -> u64 {
    SWELLCHAIN_CHAIN_ID
}

/// Keep long URLs inside the summary box
pub fn shorten(s: &str, max: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max || max < 5 {
        return s.to_string();
    }
    let keep = max - 3;
    let head: String = chars[..keep / 2].iter().collect();
    let tail: String = chars[chars.len() - (keep - keep / 2)..].iter().collect();
    format!("{}...{}", head, tail)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            l1_rpc_url: None,
            swell_rpc_url: DEFAULT_SWELL_RPC_URL.to_string(),
            sonic_rpc_url: DEFAULT_SONIC_RPC_URL.to_string(),
            merkl_api_url: DEFAULT_MERKL_API_URL.to_string(),
            merkl_chain_id: SWELLCHAIN_CHAIN_ID,
            utils_lens_address: DEFAULT_UTILS_LENS_ADDRESS.to_string(),
            utils_lens_chain_id: SWELLCHAIN_CHAIN_ID,
            apy_vault_address: DEFAULT_APY_VAULT_ADDRESS.to_string(),
            retry_attempts: 3,
            retry_delay_ms: 1000,
            http_timeout_secs: 10,
        }
    }
}

// ============================================
// TESTS
// ============================================
