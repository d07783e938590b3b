//! DEX pool composition - which tokens a pool pairs, and their supplies

use alloy_primitives::Address;
use eyre::{eyre, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::cap::to_decimal;
use crate::computers::{read, ContractCaller, RpcCaller};
use crate::contracts::{ICLPool, IERC20};
use crate::retry::RetryPolicy;
use crate::token_service::TokenData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolTokenData {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolData {
    pub address: String,
    /// `SYMBOL0/SYMBOL1` once read, the manifest name otherwise
    pub name: String,
    pub kind: String,
    pub tokens: Option<[PoolTokenData; 2]>,
}

pub struct PoolReader<C> {
    caller: C,
}

impl PoolReader<RpcCaller> {
    pub fn connect(rpc_url: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(Self::new(RpcCaller::new(rpc_url, retry)?))
    }
}

impl<C: ContractCaller> PoolReader<C> {
    pub fn new(caller: C) -> Self {
        Self { caller }
    }

    pub async fn read_pool_token(&self, token: Address) -> Result<PoolTokenData> {
        let c = &self.caller;
        let (name, symbol, decimals, supply) = tokio::try_join!(
            read(c, token, IERC20::nameCall {}),
            read(c, token, IERC20::symbolCall {}),
            read(c, token, IERC20::decimalsCall {}),
            read(c, token, IERC20::totalSupplyCall {}),
        )?;

        Ok(PoolTokenData {
            address: token,
            name,
            symbol,
            decimals,
            total_supply: to_decimal(supply, decimals),
        })
    }

    pub async fn read_pool(&self, pool: Address, kind: &str) -> Result<PoolData> {
        let pair = read(&self.caller, pool, ICLPool::tokensCall {}).await?;
        let (token0, token1) = tokio::try_join!(
            self.read_pool_token(pair.token0),
            self.read_pool_token(pair.token1),
        )?;

        let name = format!("{}/{}", token0.symbol, token1.symbol);
        debug!("💧 Pool {} ({}): {}", pool, kind, name);

        Ok(PoolData {
            address: pool.to_string(),
            name,
            kind: kind.to_string(),
            tokens: Some([token0, token1]),
        })
    }

    /// Read every pool of a token in parallel; failures keep the manifest entry
    pub async fn read_pools(&self, token: &TokenData) -> Vec<PoolData> {
        let reads = token.pools.iter().map(|def| async move {
            let result = match Address::from_str(&def.address) {
                Ok(pool) => self.read_pool(pool, &def.kind).await,
                Err(e) => Err(eyre!("invalid address: {}", e)),
            };

            match result {
                Ok(mut data) => {
                    data.address = def.address.clone();
                    data
                }
                Err(e) => {
                    warn!("Error when fetching pool {}: {}", def.address, e);
                    PoolData {
                        address: def.address.clone(),
                        name: def.name.clone(),
                        kind: def.kind.clone(),
                        tokens: None,
                    }
                }
            }
        });
        join_all(reads).await
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computers::MockCaller;
    use crate::registry::{PoolDefinition, TokenDefinition};
    use alloy_primitives::{address, U256};

    const POOL: Address = address!("6666666666666666666666666666666666666666");
    const RUSDC: Address = address!("3333333333333333333333333333333333333333");
    const USDE: Address = address!("4444444444444444444444444444444444444444");

    fn pool_caller() -> MockCaller {
        MockCaller::new()
            .with::<ICLPool::tokensCall>(POOL, &ICLPool::tokensReturn { token0: RUSDC, token1: USDE })
            .with::<IERC20::nameCall>(RUSDC, &"Relend USDC".to_string())
            .with::<IERC20::symbolCall>(RUSDC, &"rUSDC".to_string())
            .with::<IERC20::decimalsCall>(RUSDC, &6u8)
            .with::<IERC20::totalSupplyCall>(RUSDC, &U256::from(5_000_000u64))
            .with::<IERC20::nameCall>(USDE, &"USDe".to_string())
            .with::<IERC20::symbolCall>(USDE, &"USDe".to_string())
            .with::<IERC20::decimalsCall>(USDE, &18u8)
            .with::<IERC20::totalSupplyCall>(USDE, &U256::from(10u64).pow(U256::from(18u64)))
    }

    #[tokio::test]
    async fn test_read_pool() {
        let reader = PoolReader::new(pool_caller());
        let pool = reader.read_pool(POOL, "Velodrome").await.unwrap();

        assert_eq!(pool.name, "rUSDC/USDe");
        let [token0, token1] = pool.tokens.unwrap();
        assert_eq!(token0.total_supply, 5.0);
        assert_eq!(token1.decimals, 18);
        assert_eq!(token1.total_supply, 1.0);
    }

    #[tokio::test]
    async fn test_read_pools_keeps_manifest_on_failure() {
        let pools = vec![
            PoolDefinition {
                address: "0x6666666666666666666666666666666666666666".to_string(),
                name: "manifest name".to_string(),
                kind: "Velodrome".to_string(),
            },
            PoolDefinition {
                address: "0x7777777777777777777777777777777777777777".to_string(),
                name: "rUSDC/WETH".to_string(),
                kind: "Velodrome".to_string(),
            },
        ];

        let definition = TokenDefinition { pools, ..Default::default() };
        let token = TokenData::unresolved(&definition);

        let reader = PoolReader::new(pool_caller());
        let pools = reader.read_pools(&token).await;

        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].name, "rUSDC/USDe");
        assert_eq!(pools[0].address, "0x6666666666666666666666666666666666666666");
        assert_eq!(pools[1].name, "rUSDC/WETH");
        assert!(pools[1].tokens.is_none());
    }
}
