//! Merkl rewards API - incentive APR per vault
//!
//! API: https://api.merkl.xyz/v4/opportunities?chainId=1923

use alloy_primitives::Address;
use eyre::{eyre, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use super::{ApyRates, AprDetail, AprRecord, IncentiveSource, MERKL_SOURCE};
use crate::config::Config;
use crate::retry::{RateLimited, RetryPolicy};

/// Fields of a live opportunity the monitor looks at
#[derive(Debug)]
struct Opportunity {
    apr: f64,
    apr_record: Option<AprDetail>,
}

/// Parse an APR sent as a number or a numeric string; anything else is 0
pub fn parse_apr(value: &Value) -> f64 {
    let apr = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if apr.is_finite() { apr } else { 0.0 }
}

fn str_field<'a>(raw: &'a Value, key: &str) -> &'a str {
    raw.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// An unreadable record is dropped, the opportunity itself still counts
fn read_apr_record(raw: &Value) -> Option<AprDetail> {
    match raw.get("aprRecord") {
        None | Some(Value::Null) => None,
        Some(record) => match AprDetail::deserialize(record) {
            Ok(detail) => Some(detail),
            Err(e) => {
                debug!("Ignoring unreadable Merkl APR record: {}", e);
                None
            }
        },
    }
}

/// Pick the live lend/borrow opportunities of `vault` and turn them into rates
pub fn incentive_from_opportunities(opportunities: &[Value], vault: Address) -> Result<ApyRates> {
    let needle = vault.to_string().to_lowercase();

    let mut lend: Vec<Opportunity> = Vec::new();
    let mut borrow: Vec<Opportunity> = Vec::new();

    for raw in opportunities {
        let address_match = str_field(raw, "address").eq_ignore_ascii_case(&needle);
        if !address_match && !raw.to_string().to_lowercase().contains(&needle) {
            continue;
        }
        if !str_field(raw, "status").eq_ignore_ascii_case("live") {
            continue;
        }

        let action = str_field(raw, "action").to_lowercase();
        let opportunity = Opportunity {
            apr: raw.get("apr").map(parse_apr).unwrap_or(0.0),
            apr_record: read_apr_record(raw),
        };
        trace!(
            "Merkl opportunity {}: {} apr {}",
            str_field(raw, "address"), action, opportunity.apr
        );
        match action.as_str() {
            "lend" => lend.push(opportunity),
            "borrow" => borrow.push(opportunity),
            _ => {}
        }
    }

    if borrow.len() > 1 {
        return Err(eyre!("Multiple borrow opportunities found for {}", vault));
    }
    if lend.len() > 1 {
        return Err(eyre!("Multiple lend opportunities found for {}", vault));
    }

    let lend = lend.pop();
    let borrow = borrow.pop();

    Ok(ApyRates {
        supply_apy: lend.as_ref().map(|o| o.apr).unwrap_or(0.0),
        borrow_apy: borrow.as_ref().map(|o| o.apr).unwrap_or(0.0),
        source: MERKL_SOURCE.to_string(),
        apr_record: Some(AprRecord {
            lend: lend.and_then(|o| o.apr_record),
            borrow: borrow.and_then(|o| o.apr_record),
        }),
    })
}

// ============================================
// CLIENT
// ============================================

pub struct MerklClient {
    http_client: Client,
    base_url: String,
    chain_id: u64,
    retry: RetryPolicy,
}

impl MerklClient {
    pub fn new(base_url: String, chain_id: u64, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_id,
            retry,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.merkl_api_url.clone(),
            config.merkl_chain_id,
            config.http_timeout(),
            config.retry_policy(),
        )
    }

    /// Every opportunity Merkl lists for the chain, as raw JSON
    pub async fn fetch_opportunities(&self) -> Result<Vec<Value>> {
        self.retry.run(|attempt| self.fetch_once(attempt)).await
    }

    async fn fetch_once(&self, attempt: usize) -> Result<Vec<Value>> {
        let url = format!("{}/v4/opportunities", self.base_url);
        debug!("Fetching Merkl opportunities for chain {} (attempt {})", self.chain_id, attempt);

        let response = self
            .http_client
            .get(&url)
            .query(&[("chainId", self.chain_id.to_string())])
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RateLimited::new("Merkl API").into());
        }
        if !status.is_success() {
            return Err(eyre!("Merkl API responded with status: {}", status));
        }

        let opportunities: Vec<Value> = response.json().await?;
        Ok(opportunities)
    }
}

impl IncentiveSource for MerklClient {
    async fn incentive_rates(&self, vault: Address) -> Result<ApyRates> {
        let opportunities = self.fetch_opportunities().await?;
        incentive_from_opportunities(&opportunities, vault)
    }
}

// ============================================
// TESTS
// ============================================
