//! Blended lending APY
//!
//! The base rate comes from the Euler lens on-chain, reward incentives from
//! the Merkl API. A lens failure replaces only the base rate with fixed
//! values; a Merkl failure replaces both rates.

mod euler;
mod merkl;

pub use euler::EulerLensSource;
pub use merkl::MerklClient;

use alloy_primitives::Address;
use eyre::Result;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::computers::RpcCaller;
use crate::config::Config;
use crate::networks::rpc_url_for_chain;
use crate::registry::null_as_default;

// ============================================
// CONSTANTS
// ============================================

pub const EULER_LENS_SOURCE: &str = "Euler Lens";
pub const EULER_LENS_FALLBACK_SOURCE: &str = "Euler Lens (Fallback)";
pub const MERKL_SOURCE: &str = "Merkl API";
pub const MERKL_FALLBACK_SOURCE: &str = "Merkl API (Fallback)";
pub const COMBINED_SOURCE: &str = "Combined";

/// Base rates shown when the lens call fails (percent)
const FALLBACK_BASE_SUPPLY_APY: f64 = 2.8;
const FALLBACK_BASE_BORROW_APY: f64 = 3.5;

/// Incentive rates shown when Merkl fails (percent)
const FALLBACK_INCENTIVE_SUPPLY_APY: f64 = 0.3;
const FALLBACK_INCENTIVE_BORROW_APY: f64 = 0.5;

// ============================================
// RATE TYPES
// ============================================

/// One reward line of a Merkl APR record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AprBreakdown {
    #[serde(deserialize_with = "null_as_default")]
    pub distribution_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub identifier: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub value: f64,
    #[serde(deserialize_with = "string_or_number")]
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AprDetail {
    #[serde(deserialize_with = "null_as_default")]
    pub breakdowns: Vec<AprBreakdown>,
    #[serde(deserialize_with = "lenient_f64")]
    pub cumulated: f64,
    #[serde(deserialize_with = "string_or_number")]
    pub timestamp: String,
}

/// APR details for the lend and borrow sides of a vault
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AprRecord {
    pub lend: Option<AprDetail>,
    pub borrow: Option<AprDetail>,
}

/// Rates in percent, tagged with where they came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApyRates {
    pub supply_apy: f64,
    pub borrow_apy: f64,
    pub source: String,
    pub apr_record: Option<AprRecord>,
}

impl ApyRates {
    pub fn new(supply_apy: f64, borrow_apy: f64, source: &str) -> Self {
        Self {
            supply_apy,
            borrow_apy,
            source: source.to_string(),
            apr_record: None,
        }
    }

    pub fn base_fallback() -> Self {
        Self::new(FALLBACK_BASE_SUPPLY_APY, FALLBACK_BASE_BORROW_APY, EULER_LENS_FALLBACK_SOURCE)
    }

    pub fn incentive_fallback() -> Self {
        Self::new(
            FALLBACK_INCENTIVE_SUPPLY_APY,
            FALLBACK_INCENTIVE_BORROW_APY,
            MERKL_FALLBACK_SOURCE,
        )
    }

    pub fn is_fallback(&self) -> bool {
        self.source == EULER_LENS_FALLBACK_SOURCE || self.source == MERKL_FALLBACK_SOURCE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedApy {
    pub vault: Address,
    pub base: ApyRates,
    pub incentive: ApyRates,
    pub total: ApyRates,
}

impl CombinedApy {
    /// Rewards add to what suppliers earn and subtract from what borrowers pay
    pub fn combine(vault: Address, base: ApyRates, incentive: ApyRates) -> Self {
        let total = ApyRates::new(
            base.supply_apy + incentive.supply_apy,
            base.borrow_apy - incentive.borrow_apy,
            COMBINED_SOURCE,
        );
        Self { vault, base, incentive, total }
    }
}

/// Merkl sends timestamps either as strings or as unix seconds
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Numbers, numeric strings and null all read as a rate; anything else is 0
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(merkl::parse_apr(&value))
}

// ============================================
// SOURCES
// ============================================

#[allow(async_fn_in_trait)]
pub trait BaseRateSource {
    async fn base_rates(&self, vault: Address) -> Result<ApyRates>;
}

#[allow(async_fn_in_trait)]
pub trait IncentiveSource {
    async fn incentive_rates(&self, vault: Address) -> Result<ApyRates>;
}

// ============================================
// COMBINER
// ============================================

pub struct ApyCombiner<B, I> {
    base: B,
    incentive: I,
}

/// Combiner over the live lens and Merkl API
pub type RemoteApyCombiner = ApyCombiner<EulerLensSource<RpcCaller>, MerklClient>;

impl RemoteApyCombiner {
    /// Lens on its configured chain, Merkl scanning `MERKL_CHAIN_ID`
    pub fn from_config(config: &Config) -> Result<Self> {
        let rpc_url = rpc_url_for_chain(config.utils_lens_chain_id, config)?;
        Self::connect(config, &rpc_url, MerklClient::from_config(config)?)
    }

    /// Combiner for vaults deployed on `chain_id`, or `None` when the lens
    /// does not live there
    pub fn for_chain(config: &Config, chain_id: u64) -> Result<Option<Self>> {
        if chain_id != config.utils_lens_chain_id {
            return Ok(None);
        }

        let rpc_url = rpc_url_for_chain(chain_id, config)?;
        let incentive = MerklClient::new(
            config.merkl_api_url.clone(),
            chain_id,
            config.http_timeout(),
            config.retry_policy(),
        )?;
        Self::connect(config, &rpc_url, incentive).map(Some)
    }

    fn connect(config: &Config, rpc_url: &str, incentive: MerklClient) -> Result<Self> {
        let caller = RpcCaller::new(rpc_url, config.retry_policy())?;
        let base = EulerLensSource::new(caller, config.utils_lens()?);
        Ok(Self::new(base, incentive))
    }
}

impl<B: BaseRateSource, I: IncentiveSource> ApyCombiner<B, I> {
    pub fn new(base: B, incentive: I) -> Self {
        Self { base, incentive }
    }

    pub async fn combined_apy(&self, vault: Address) -> CombinedApy {
        let (base, incentive) = tokio::join!(
            self.base.base_rates(vault),
            self.incentive.incentive_rates(vault),
        );

        let base = base.unwrap_or_else(|e| {
            warn!("Euler Lens unavailable for {}, using fallback values: {}", vault, e);
            ApyRates::base_fallback()
        });
        let (base, incentive) = match incentive {
            Ok(incentive) => (base, incentive),
            Err(e) => {
                warn!("Merkl rewards unavailable for {}, using fallback values for both rates: {}", vault, e);
                (ApyRates::base_fallback(), ApyRates::incentive_fallback())
            }
        };

        let combined = CombinedApy::combine(vault, base, incentive);
        info!(
            "📈 APY for {}: supply {:.2}%, borrow {:.2}%",
            vault, combined.total.supply_apy, combined.total.borrow_apy
        );
        combined
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use eyre::eyre;

    const VAULT: Address = address!("c5976e0356f0A3Ce8307fF08C88bB05933F88761");

    struct FixedBase(Option<(f64, f64)>);

    impl BaseRateSource for FixedBase {
        async fn base_rates(&self, _vault: Address) -> Result<ApyRates> {
            self.0
                .map(|(supply, borrow)| ApyRates::new(supply, borrow, EULER_LENS_SOURCE))
                .ok_or_else(|| eyre!("execution reverted"))
        }
    }

    struct FixedIncentive(Option<(f64, f64)>);

    impl IncentiveSource for FixedIncentive {
        async fn incentive_rates(&self, _vault: Address) -> Result<ApyRates> {
            self.0
                .map(|(supply, borrow)| ApyRates::new(supply, borrow, MERKL_SOURCE))
                .ok_or_else(|| eyre!("Merkl API responded with status: 503"))
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[tokio::test]
    async fn test_both_sources_available() {
        let combiner = ApyCombiner::new(FixedBase(Some((4.0, 6.0))), FixedIncentive(Some((1.5, 0.75))));
        let apy = combiner.combined_apy(VAULT).await;

        assert_eq!(apy.base.source, EULER_LENS_SOURCE);
        assert_eq!(apy.incentive.source, MERKL_SOURCE);
        assert_eq!(apy.total.source, COMBINED_SOURCE);
        assert!(close(apy.total.supply_apy, 5.5));
        assert!(close(apy.total.borrow_apy, 5.25));
    }

    #[tokio::test]
    async fn test_merkl_failure_replaces_both_rates() {
        let combiner = ApyCombiner::new(FixedBase(Some((4.0, 6.0))), FixedIncentive(None));
        let apy = combiner.combined_apy(VAULT).await;

        assert_eq!(apy.base.source, EULER_LENS_FALLBACK_SOURCE);
        assert_eq!(apy.incentive.source, MERKL_FALLBACK_SOURCE);
        assert!(apy.base.is_fallback());
        assert!(apy.incentive.is_fallback());
        assert!(close(apy.total.supply_apy, 3.1));
        assert!(close(apy.total.borrow_apy, 3.0));
    }

    #[tokio::test]
    async fn test_lens_failure_keeps_incentives() {
        let combiner = ApyCombiner::new(FixedBase(None), FixedIncentive(Some((1.5, 0.75))));
        let apy = combiner.combined_apy(VAULT).await;

        assert_eq!(apy.base.source, EULER_LENS_FALLBACK_SOURCE);
        assert_eq!(apy.incentive.source, MERKL_SOURCE);
        assert!(close(apy.total.supply_apy, 4.3));
        assert!(close(apy.total.borrow_apy, 2.75));
    }

    #[test]
    fn test_combiner_only_for_lens_chain() {
        let config = Config::default();

        let swell = RemoteApyCombiner::for_chain(&config, crate::networks::SWELLCHAIN_CHAIN_ID).unwrap();
        assert!(swell.is_some());

        let sonic = RemoteApyCombiner::for_chain(&config, crate::networks::SONIC_CHAIN_ID).unwrap();
        assert!(sonic.is_none());
        assert!(RemoteApyCombiner::for_chain(&config, 42).unwrap().is_none());
    }

    #[test]
    fn test_combiner_follows_lens_chain() {
        let config = Config {
            utils_lens_chain_id: crate::networks::SONIC_CHAIN_ID,
            ..Default::default()
        };

        assert!(RemoteApyCombiner::for_chain(&config, crate::networks::SONIC_CHAIN_ID).unwrap().is_some());
        assert!(RemoteApyCombiner::for_chain(&config, crate::networks::SWELLCHAIN_CHAIN_ID).unwrap().is_none());
        assert!(RemoteApyCombiner::from_config(&config).is_ok());

        // No L1 endpoint configured
        let config = Config {
            utils_lens_chain_id: crate::networks::ETHEREUM_CHAIN_ID,
            ..Default::default()
        };
        assert!(RemoteApyCombiner::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_both_sources_down() {
        let combiner = ApyCombiner::new(FixedBase(None), FixedIncentive(None));
        let apy = combiner.combined_apy(VAULT).await;

        assert_eq!(apy.base.source, EULER_LENS_FALLBACK_SOURCE);
        assert!(close(apy.total.supply_apy, 3.1));
        assert!(close(apy.total.borrow_apy, 3.0));
    }

    #[test]
    fn test_apr_detail_timestamps() {
        let detail: AprDetail = serde_json::from_value(serde_json::json!({
            "breakdowns": [{
                "distributionType": "DUTCH_AUCTION",
                "identifier": "0xabc",
                "type": "CAMPAIGN",
                "value": 1.25,
                "timestamp": 1735689600
            }],
            "cumulated": 1.25,
            "timestamp": "1735689600"
        }))
        .unwrap();

        assert_eq!(detail.breakdowns[0].timestamp, "1735689600");
        assert_eq!(detail.breakdowns[0].kind, "CAMPAIGN");
        assert_eq!(detail.timestamp, "1735689600");
    }

    #[test]
    fn test_apr_detail_tolerates_nulls() {
        let detail: AprDetail = serde_json::from_value(serde_json::json!({
            "breakdowns": [{ "type": null, "value": "0.8", "timestamp": null }],
            "cumulated": null,
            "timestamp": 1735689600
        }))
        .unwrap();

        assert_eq!(detail.cumulated, 0.0);
        assert_eq!(detail.breakdowns[0].value, 0.8);
        assert_eq!(detail.breakdowns[0].kind, "");

        let detail: AprDetail = serde_json::from_value(serde_json::json!({ "breakdowns": null })).unwrap();
        assert!(detail.breakdowns.is_empty());
    }
}
