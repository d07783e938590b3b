//! Token registry - the remote manifest of wrapped token deployments

use eyre::{eyre, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::networks::Network;
use crate::retry::{RateLimited, RetryPolicy};

// ============================================
// MANIFEST TYPES
// ============================================

/// Treat an explicit `null` like a missing field
pub fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A lending venue listed for a token (`type` is e.g. "Euler")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingVenue {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
}

impl LendingVenue {
    pub fn is_euler(&self) -> bool {
        self.kind.eq_ignore_ascii_case("euler")
    }
}

/// A DEX pool listed for a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDefinition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
}

/// One entry of the manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenDefinition {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "L1UnderlyingTokenName", deserialize_with = "null_as_default")]
    pub l1_underlying_token_name: String,
    #[serde(rename = "L1UnderlyingTokenAddress", deserialize_with = "null_as_default")]
    pub l1_underlying_token_address: String,
    #[serde(rename = "L1WrappedTokenName", deserialize_with = "null_as_default")]
    pub l1_wrapped_token_name: String,
    #[serde(rename = "L1WrappedTokenAddress", deserialize_with = "null_as_default")]
    pub l1_wrapped_token_address: String,
    #[serde(rename = "L1OFTAdapterAddress", deserialize_with = "null_as_default")]
    pub l1_oft_adapter_address: String,
    #[serde(rename = "L2TokenName", deserialize_with = "null_as_default")]
    pub l2_token_name: String,
    #[serde(rename = "L2TokenAddress", deserialize_with = "null_as_default")]
    pub l2_token_address: String,
    #[serde(rename = "L2TokenIsOFT", deserialize_with = "null_as_default")]
    pub l2_token_is_oft: bool,
    #[serde(rename = "L2ChainID", deserialize_with = "null_as_default")]
    pub l2_chain_id: u64,
    #[serde(rename = "L2ChainEVM", deserialize_with = "null_as_default")]
    pub l2_chain_evm: bool,
    #[serde(rename = "BridgeUrl", deserialize_with = "null_as_default")]
    pub bridge_url: String,
    #[serde(rename = "wrappedTokenLogoURI", deserialize_with = "null_as_default")]
    pub wrapped_token_logo_uri: String,
    #[serde(deserialize_with = "null_as_default")]
    pub live: bool,
    #[serde(rename = "rpcUrl", deserialize_with = "null_as_default")]
    pub rpc_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub network: Network,
    #[serde(rename = "L1BridgeAddress", deserialize_with = "null_as_default")]
    pub l1_bridge_address: String,
    #[serde(rename = "L2BridgeAddress", deserialize_with = "null_as_default")]
    pub l2_bridge_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lending: Vec<LendingVenue>,
    #[serde(deserialize_with = "null_as_default")]
    pub pools: Vec<PoolDefinition>,
    /// USD price of one wrapped token; absent means pegged to 1
    #[serde(rename = "usdPrice", deserialize_with = "null_as_default")]
    pub usd_price: Option<f64>,
}

impl TokenDefinition {
    pub fn usd_price(&self) -> f64 {
        self.usd_price.unwrap_or(1.0)
    }
}

/// Parse manifest entries one by one; an unreadable entry is skipped, not fatal
pub fn parse_definitions(entries: Vec<Value>) -> Vec<TokenDefinition> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<TokenDefinition>(entry) {
            Ok(definition) => Some(definition),
            Err(e) => {
                warn!("Skipping unreadable manifest entry #{}: {}", i, e);
                None
            }
        })
        .collect()
}

/// Keep only the definitions flagged `live`
pub fn live_definitions(definitions: Vec<TokenDefinition>) -> Vec<TokenDefinition> {
    definitions.into_iter().filter(|d| d.live).collect()
}

// ============================================
// MANIFEST FETCHER
// ============================================

pub struct ManifestFetcher {
    http_client: Client,
    url: String,
    retry: RetryPolicy,
}

impl ManifestFetcher {
    pub fn new(url: String, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client, url, retry })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.manifest_url.clone(), config.http_timeout(), config.retry_policy())
    }

    /// Fetch the full manifest, live or not
    pub async fn fetch_all(&self) -> Result<Vec<TokenDefinition>> {
        let entries = self.retry.run(|attempt| self.fetch_once(attempt)).await?;
        Ok(parse_definitions(entries))
    }

    /// Fetch the manifest and keep only live tokens
    pub async fn fetch_definitions(&self) -> Result<Vec<TokenDefinition>> {
        let all = self.fetch_all().await?;
        let total = all.len();
        let live = live_definitions(all);
        info!("📜 Manifest: {} live token(s) out of {}", live.len(), total);
        Ok(live)
    }

    async fn fetch_once(&self, attempt: usize) -> Result<Vec<Value>> {
        debug!("Fetching token manifest (attempt {}): {}", attempt, self.url);

        let response = self.http_client.get(&self.url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RateLimited::new("token manifest").into());
        }
        if !status.is_success() {
            return Err(eyre!("Failed to fetch remote token data: HTTP {}", status));
        }

        let entries: Vec<Value> = response.json().await?;
        Ok(entries)
    }
}

// ============================================
// TESTS
// ============================================
