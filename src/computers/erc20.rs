//! ERC-20 token data, read over JSON-RPC

use alloy_primitives::Address;
use eyre::Result;
use std::str::FromStr;
use tracing::debug;

use super::caller::{read, ContractCaller, RpcCaller};
use super::TokenDataComputer;
use crate::cap::to_decimal;
use crate::contracts::IERC20;
use crate::networks::RpcEndpoint;
use crate::retry::RetryPolicy;

pub struct Erc20DataComputer<C> {
    endpoint: Box<dyn RpcEndpoint>,
    token: Address,
    usd_price: f64,
    caller: C,
}

impl Erc20DataComputer<RpcCaller> {
    /// Bind a token to the RPC endpoint of its network
    pub fn connect(
        endpoint: Box<dyn RpcEndpoint>,
        token: &str,
        usd_price: f64,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let rpc_url = endpoint.rpc_url()?;
        let caller = RpcCaller::new(&rpc_url, retry)?;
        let token = Address::from_str(token)
            .map_err(|e| eyre::eyre!("Invalid token address {}: {}", token, e))?;
        Ok(Self::with_caller(endpoint, token, usd_price, caller))
    }
}

impl<C: ContractCaller> Erc20DataComputer<C> {
    pub fn with_caller(endpoint: Box<dyn RpcEndpoint>, token: Address, usd_price: f64, caller: C) -> Self {
        Self { endpoint, token, usd_price, caller }
    }

    pub async fn decimals(&self) -> Result<u8> {
        read(&self.caller, self.token, IERC20::decimalsCall {}).await
    }
}

impl<C: ContractCaller> TokenDataComputer for Erc20DataComputer<C> {
    fn rpc_url(&self) -> Result<String> {
        self.endpoint.rpc_url()
    }

    async fn name(&self) -> Result<String> {
        let name = read(&self.caller, self.token, IERC20::nameCall {}).await?;
        debug!("name({}) = {}", self.token, name);
        Ok(name)
    }

    async fn symbol(&self) -> Result<String> {
        let symbol = read(&self.caller, self.token, IERC20::symbolCall {}).await?;
        debug!("symbol({}) = {}", self.token, symbol);
        Ok(symbol)
    }

    async fn total_supply(&self) -> Result<f64> {
        let (raw, decimals) = tokio::try_join!(
            read(&self.caller, self.token, IERC20::totalSupplyCall {}),
            self.decimals(),
        )?;
        debug!(
            "totalSupply({}) = {} ({} decimals) on {}",
            self.token,
            raw,
            decimals,
            self.endpoint.network()
        );
        Ok(to_decimal(raw, decimals))
    }

    async fn total_supply_usdc(&self) -> Result<f64> {
        Ok(self.total_supply().await? * self.usd_price)
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computers::caller::mock::MockCaller;
    use crate::networks::{BitlayerEndpoint, EthereumEndpoint, BITLAYER_RPC_URL};
    use alloy_primitives::{address, U256};
    use std::time::Duration;

    const TOKEN: Address = address!("1111111111111111111111111111111111111111");

    fn token_caller() -> MockCaller {
        MockCaller::new()
            .with::<IERC20::nameCall>(TOKEN, &"Relend USDC".to_string())
            .with::<IERC20::symbolCall>(TOKEN, &"rUSDC".to_string())
            .with::<IERC20::decimalsCall>(TOKEN, &6u8)
            .with::<IERC20::totalSupplyCall>(TOKEN, &U256::from(2_500_000_000_000u64))
    }

    #[tokio::test]
    async fn test_reads_metadata_and_supply() {
        let computer =
            Erc20DataComputer::with_caller(Box::new(BitlayerEndpoint), TOKEN, 1.0, token_caller());

        assert_eq!(computer.name().await.unwrap(), "Relend USDC");
        assert_eq!(computer.symbol().await.unwrap(), "rUSDC");
        assert_eq!(computer.total_supply().await.unwrap(), 2_500_000.0);
        assert_eq!(computer.rpc_url().unwrap(), BITLAYER_RPC_URL);
    }

    #[tokio::test]
    async fn test_supply_usdc_uses_price() {
        let computer =
            Erc20DataComputer::with_caller(Box::new(BitlayerEndpoint), TOKEN, 0.5, token_caller());
        assert_eq!(computer.total_supply_usdc().await.unwrap(), 1_250_000.0);
    }

    #[tokio::test]
    async fn test_missing_decimals_fails_supply() {
        let caller = MockCaller::new()
            .with::<IERC20::totalSupplyCall>(TOKEN, &U256::from(1u64));
        let computer = Erc20DataComputer::with_caller(Box::new(BitlayerEndpoint), TOKEN, 1.0, caller);
        assert!(computer.total_supply().await.is_err());
    }

    #[test]
    fn test_connect_requires_l1_url() {
        let res = Erc20DataComputer::connect(
            Box::new(EthereumEndpoint::new(None)),
            "0x1111111111111111111111111111111111111111",
            1.0,
            RetryPolicy::new(1, Duration::ZERO),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_connect_rejects_bad_token_address() {
        let res = Erc20DataComputer::connect(Box::new(BitlayerEndpoint), "0xnope", 1.0, RetryPolicy::new(1, Duration::ZERO));
        assert!(res.is_err());
    }
}
