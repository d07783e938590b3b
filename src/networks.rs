//! Networks a wrapped token can live on, their chain ids, explorers and
//! RPC endpoints.

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;

// ============================================
// CHAIN IDS
// ============================================

pub const ETHEREUM_CHAIN_ID: u64 = 1;
pub const SONIC_CHAIN_ID: u64 = 146;
pub const SWELLCHAIN_CHAIN_ID: u64 = 1923;
pub const BITLAYER_CHAIN_ID: u64 = 200901;

/// Bitlayer has a single public endpoint
pub const BITLAYER_RPC_URL: &str = "https://rpc.bitlayer.org";

pub const DEFAULT_SWELL_RPC_URL: &str = "https://swell-mainnet.alt.technology";
pub const DEFAULT_SONIC_RPC_URL: &str = "https://rpc.soniclabs.com";

// ============================================
// NETWORK
// ============================================

/// Home network of a token definition (the manifest's `network` field)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Ethereum,
    Swell,
    Sonic,
    Bitlayer,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Ethereum => write!(f, "Ethereum"),
            Network::Swell => write!(f, "Swell"),
            Network::Sonic => write!(f, "Sonic"),
            Network::Bitlayer => write!(f, "Bitlayer"),
            Network::Unknown => write!(f, "Unknown"),
        }
    }
}

impl Network {
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Network::Ethereum => Some(ETHEREUM_CHAIN_ID),
            Network::Swell => Some(SWELLCHAIN_CHAIN_ID),
            Network::Sonic => Some(SONIC_CHAIN_ID),
            Network::Bitlayer => Some(BITLAYER_CHAIN_ID),
            Network::Unknown => None,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Self {
        match chain_id {
            ETHEREUM_CHAIN_ID => Network::Ethereum,
            SWELLCHAIN_CHAIN_ID => Network::Swell,
            SONIC_CHAIN_ID => Network::Sonic,
            BITLAYER_CHAIN_ID => Network::Bitlayer,
            _ => Network::Unknown,
        }
    }

    /// Name used by Euler / Velodrome in their `network=` query parameters
    pub fn app_slug(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Swell => "swellchain",
            Network::Sonic => "sonic",
            Network::Bitlayer => "bitlayer",
            Network::Unknown => "unknown",
        }
    }
}

// ============================================
// BLOCK EXPLORERS
// ============================================

fn explorer_base_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        ETHEREUM_CHAIN_ID => Some("https://etherscan.io"),
        SONIC_CHAIN_ID => Some("https://sonicscan.org"),
        BITLAYER_CHAIN_ID => Some("https://www.btrscan.com"),
        SWELLCHAIN_CHAIN_ID => Some("https://explorer.swellnetwork.io"),
        _ => None,
    }
}

/// Explorer link for an address on a supported chain
pub fn explorer_address_url(chain_id: u64, address: &str) -> Option<String> {
    explorer_base_url(chain_id).map(|base| format!("{}/address/{}", base, address))
}

// ============================================
// RPC ENDPOINTS
// ============================================

/// Supplies the JSON-RPC endpoint of one network.
///
/// Everything else about reading a token is shared; an endpoint is the only
/// thing that differs per network.
pub trait RpcEndpoint: Send + Sync {
    fn network(&self) -> Network;
    fn rpc_url(&self) -> Result<String>;
}

pub struct EthereumEndpoint {
    url: Option<String>,
}

impl EthereumEndpoint {
    pub fn new(url: Option<String>) -> Self {
        Self { url }
    }
}

impl RpcEndpoint for EthereumEndpoint {
    fn network(&self) -> Network {
        Network::Ethereum
    }

    fn rpc_url(&self) -> Result<String> {
        self.url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                eyre!("L1_RPC_URL is not defined in the environment variables. Please check your .env file")
            })
    }
}

pub struct BitlayerEndpoint;

impl RpcEndpoint for BitlayerEndpoint {
    fn network(&self) -> Network {
        Network::Bitlayer
    }

    fn rpc_url(&self) -> Result<String> {
        Ok(BITLAYER_RPC_URL.to_string())
    }
}

pub struct SwellEndpoint {
    url: String,
}

impl SwellEndpoint {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl RpcEndpoint for SwellEndpoint {
    fn network(&self) -> Network {
        Network::Swell
    }

    fn rpc_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }
}

pub struct SonicEndpoint {
    url: String,
}

impl SonicEndpoint {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl RpcEndpoint for SonicEndpoint {
    fn network(&self) -> Network {
        Network::Sonic
    }

    fn rpc_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }
}

/// Endpoint for a network, `None` when there is no reader for it
pub fn endpoint_for(network: Network, config: &Config) -> Option<Box<dyn RpcEndpoint>> {
    match network {
        Network::Ethereum => Some(Box::new(EthereumEndpoint::new(config.l1_rpc_url.clone()))),
        Network::Bitlayer => Some(Box::new(BitlayerEndpoint)),
        Network::Swell => Some(Box::new(SwellEndpoint::new(config.swell_rpc_url.clone()))),
        Network::Sonic => Some(Box::new(SonicEndpoint::new(config.sonic_rpc_url.clone()))),
        Network::Unknown => None,
    }
}

/// RPC URL for an L2 chain id (vaults and pools live on the L2)
pub fn rpc_url_for_chain(chain_id: u64, config: &Config) -> Result<String> {
    let network = Network::from_chain_id(chain_id);
    endpoint_for(network, config)
        .ok_or_else(|| eyre!("No RPC endpoint for chain {}", chain_id))?
        .rpc_url()
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_manifest_string() {
        let n: Network = serde_json::from_str("\"Bitlayer\"").unwrap();
        assert_eq!(n, Network::Bitlayer);

        let n: Network = serde_json::from_str("\"Starknet\"").unwrap();
        assert_eq!(n, Network::Unknown);
        assert_eq!(Network::default(), Network::Unknown);
    }

    #[test]
    fn test_chain_id_round_trip() {
        for network in [Network::Ethereum, Network::Swell, Network::Sonic, Network::Bitlayer] {
            let id = network.chain_id().unwrap();
            assert_eq!(Network::from_chain_id(id), network);
        }
        assert_eq!(Network::from_chain_id(42), Network::Unknown);
    }

    #[test]
    fn test_explorer_url() {
        assert_eq!(
            explorer_address_url(1, "0xabc").as_deref(),
            Some("https://etherscan.io/address/0xabc")
        );
        assert_eq!(
            explorer_address_url(1923, "0xabc").as_deref(),
            Some("https://explorer.swellnetwork.io/address/0xabc")
        );
        assert!(explorer_address_url(999, "0xabc").is_none());
    }

    #[test]
    fn test_ethereum_endpoint_requires_url() {
        assert!(EthereumEndpoint::new(None).rpc_url().is_err());
        assert!(EthereumEndpoint::new(Some("  ".into())).rpc_url().is_err());
        assert_eq!(
            EthereumEndpoint::new(Some("https://eth.example".into())).rpc_url().unwrap(),
            "https://eth.example"
        );
    }

    #[test]
    fn test_endpoint_for() {
        let config = Config::default();
        assert!(endpoint_for(Network::Unknown, &config).is_none());

        let bitlayer = endpoint_for(Network::Bitlayer, &config).unwrap();
        assert_eq!(bitlayer.rpc_url().unwrap(), BITLAYER_RPC_URL);

        let swell = rpc_url_for_chain(SWELLCHAIN_CHAIN_ID, &config).unwrap();
        assert_eq!(swell, config.swell_rpc_url);

        assert!(rpc_url_for_chain(42, &config).is_err());
    }
}
