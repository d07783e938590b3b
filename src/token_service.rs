//! Token service - manifest + per-token on-chain reads

use eyre::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::computers::{DataComputerFactory, TokenDataComputer};
use crate::config::Config;
use crate::networks::Network;
use crate::registry::{LendingVenue, ManifestFetcher, PoolDefinition, TokenDefinition};

pub const UNKNOWN_TOKEN_NAME: &str = "Unknown Token";
pub const UNKNOWN_TOKEN_SYMBOL: &str = "Unknown Symbol";

/// Everything known about one deployed wrapped token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    /// L1 wrapped token address
    pub address: String,
    pub name: String,
    pub symbol: String,
    /// Deployment name from the manifest
    pub network: String,
    /// Network the wrapped token lives on
    pub home_network: Network,
    pub total_supply: f64,
    pub total_supply_usdc: f64,
    pub bridge_url: String,
    pub l1_bridge_address: String,
    pub l2_chain_id: u64,
    pub l2_token_address: String,
    pub l2_bridge_address: String,
    pub is_oft: bool,
    pub lending: Vec<LendingVenue>,
    pub pools: Vec<PoolDefinition>,
}

impl TokenData {
    /// Token data with placeholder metadata, used when reads fail
    pub fn unresolved(definition: &TokenDefinition) -> Self {
        Self {
            address: definition.l1_wrapped_token_address.clone(),
            name: UNKNOWN_TOKEN_NAME.to_string(),
            symbol: UNKNOWN_TOKEN_SYMBOL.to_string(),
            network: definition.name.clone(),
            home_network: definition.network,
            total_supply: 0.0,
            total_supply_usdc: 0.0,
            bridge_url: definition.bridge_url.clone(),
            l1_bridge_address: definition.l1_bridge_address.clone(),
            l2_chain_id: definition.l2_chain_id,
            l2_token_address: definition.l2_token_address.clone(),
            l2_bridge_address: definition.l2_bridge_address.clone(),
            is_oft: definition.l2_token_is_oft,
            lending: definition.lending.clone(),
            pools: definition.pools.clone(),
        }
    }
}

/// Read one token's metadata; each field falls back on its own failure
pub async fn read_token_data<T: TokenDataComputer>(
    definition: &TokenDefinition,
    computer: &T,
) -> TokenData {
    let mut data = TokenData::unresolved(definition);
    let address = &definition.l1_wrapped_token_address;

    let (name, symbol, supply, supply_usdc) = tokio::join!(
        computer.name(),
        computer.symbol(),
        computer.total_supply(),
        computer.total_supply_usdc(),
    );

    match name {
        Ok(name) => data.name = name,
        Err(e) => warn!("Failed to fetch name for token at address {}: {}", address, e),
    }
    match symbol {
        Ok(symbol) => data.symbol = symbol,
        Err(e) => warn!("Failed to fetch symbol for token at address {}: {}", address, e),
    }
    match supply {
        Ok(supply) => data.total_supply = supply,
        Err(e) => warn!("Failed to fetch supply for token at address {}: {}", address, e),
    }
    match supply_usdc {
        Ok(value) => data.total_supply_usdc = value,
        Err(e) => warn!("Failed to value supply for token at address {}: {}", address, e),
    }

    data
}

/// Case-insensitive lookup by L1 wrapped token address
pub fn find_by_address<'a>(
    definitions: &'a [TokenDefinition],
    address: &str,
) -> Option<&'a TokenDefinition> {
    definitions
        .iter()
        .find(|d| d.l1_wrapped_token_address.eq_ignore_ascii_case(address))
}

pub struct TokenService {
    config: Config,
    fetcher: ManifestFetcher,
}

impl TokenService {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = ManifestFetcher::from_config(&config)?;
        Ok(Self { config, fetcher })
    }

    /// Fetch every live token and read its on-chain data in parallel
    pub async fn fetch_token_data(&self) -> Result<Vec<TokenData>> {
        let definitions = self.fetcher.fetch_definitions().await?;

        let reads = definitions.iter().map(|definition| self.resolve(definition));

        let tokens = join_all(reads).await;
        info!("🪙 Resolved {} token(s)", tokens.len());
        Ok(tokens)
    }

    /// Read only the live token with this L1 address
    pub async fn fetch_token(&self, address: &str) -> Result<Option<TokenData>> {
        let definitions = self.fetcher.fetch_definitions().await?;
        let Some(definition) = find_by_address(&definitions, address) else {
            return Ok(None);
        };

        Ok(Some(self.resolve(definition).await))
    }

    async fn resolve(&self, definition: &TokenDefinition) -> TokenData {
        match DataComputerFactory::create(definition, &self.config) {
            Ok(computer) => read_token_data(definition, &computer).await,
            Err(e) => {
                warn!("No data computer for {}: {}", definition.name, e);
                TokenData::unresolved(definition)
            }
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computers::{Erc20DataComputer, MockCaller};
    use crate::contracts::IERC20;
    use crate::networks::SwellEndpoint;
    use alloy_primitives::{address, Address, U256};
    use httpmock::prelude::*;
    use serde_json::json;

    const TOKEN: Address = address!("1111111111111111111111111111111111111111");

    fn definition() -> TokenDefinition {
        TokenDefinition {
            name: "Swell rUSDC".to_string(),
            l1_wrapped_token_address: "0x1111111111111111111111111111111111111111".to_string(),
            l2_chain_id: 1923,
            network: Network::Swell,
            live: true,
            ..Default::default()
        }
    }

    fn computer(caller: MockCaller) -> Erc20DataComputer<MockCaller> {
        Erc20DataComputer::with_caller(
            Box::new(SwellEndpoint::new("https://swell.example".to_string())),
            TOKEN,
            1.0,
            caller,
        )
    }

    #[tokio::test]
    async fn test_read_token_data() {
        let caller = MockCaller::new()
            .with::<IERC20::nameCall>(TOKEN, &"Relend USDC".to_string())
            .with::<IERC20::symbolCall>(TOKEN, &"rUSDC".to_string())
            .with::<IERC20::decimalsCall>(TOKEN, &18u8)
            .with::<IERC20::totalSupplyCall>(TOKEN, &(U256::from(3u64) * U256::from(10u64).pow(U256::from(18u64))));

        let data = read_token_data(&definition(), &computer(caller)).await;
        assert_eq!(data.name, "Relend USDC");
        assert_eq!(data.symbol, "rUSDC");
        assert_eq!(data.network, "Swell rUSDC");
        assert_eq!(data.total_supply, 3.0);
        assert_eq!(data.total_supply_usdc, 3.0);
        assert_eq!(data.l2_chain_id, 1923);
    }

    #[tokio::test]
    async fn test_read_failures_fall_back() {
        // Only the name is readable
        let caller = MockCaller::new().with::<IERC20::nameCall>(TOKEN, &"Relend USDC".to_string());

        let data = read_token_data(&definition(), &computer(caller)).await;
        assert_eq!(data.name, "Relend USDC");
        assert_eq!(data.symbol, UNKNOWN_TOKEN_SYMBOL);
        assert_eq!(data.total_supply, 0.0);
    }

    #[test]
    fn test_find_by_address_ignores_case() {
        let definitions = vec![definition()];
        assert!(find_by_address(&definitions, "0x1111111111111111111111111111111111111111").is_some());
        assert!(find_by_address(&definitions, "0X1111111111111111111111111111111111111111").is_some());
        assert!(find_by_address(&definitions, "0x2222222222222222222222222222222222222222").is_none());
    }

    #[tokio::test]
    async fn test_fetch_token_data_without_rpc() {
        // An Ethereum token with no L1 RPC configured and a token on a network
        // without a reader: neither needs a live endpoint.
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/current.json");
                then.status(200).json_body(json!([
                    { "name": "L1 token", "L1WrappedTokenAddress": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "network": "Ethereum", "live": true },
                    { "name": "Starknet token", "L1WrappedTokenAddress": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", "network": "Starknet", "live": true },
                    { "name": "Retired", "L1WrappedTokenAddress": "0xcccccccccccccccccccccccccccccccccccccccc", "network": "Ethereum", "live": false }
                ]));
            })
            .await;

        let config = Config {
            manifest_url: server.url("/current.json"),
            l1_rpc_url: None,
            ..Default::default()
        };
        let service = TokenService::new(config).unwrap();
        let tokens = service.fetch_token_data().await.unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].name, UNKNOWN_TOKEN_NAME);
        assert_eq!(tokens[0].network, "L1 token");
        assert_eq!(tokens[1].name, "");
        assert_eq!(tokens[1].home_network, Network::Unknown);
    }

    #[tokio::test]
    async fn test_fetch_token_reads_only_the_match() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/current.json");
                then.status(200).json_body(json!([
                    { "name": "Swell token", "L1WrappedTokenAddress": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "network": "Swell", "live": true },
                    { "name": "Starknet token", "L1WrappedTokenAddress": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", "network": "Starknet", "live": true }
                ]));
            })
            .await;
        let rpc = server
            .mock_async(|when, then| {
                when.method(POST).path("/rpc");
                then.status(500);
            })
            .await;

        let config = Config {
            manifest_url: server.url("/current.json"),
            swell_rpc_url: server.url("/rpc"),
            retry_attempts: 1,
            ..Default::default()
        };
        let service = TokenService::new(config).unwrap();

        let token = service
            .fetch_token("0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token.network, "Starknet token");
        rpc.assert_hits_async(0).await;

        let missing = service
            .fetch_token("0x2222222222222222222222222222222222222222")
            .await
            .unwrap();
        assert!(missing.is_none());
        rpc.assert_hits_async(0).await;
    }
}
