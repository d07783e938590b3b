//! Per-network token data computers
//!
//! A computer reads name, symbol and supply of one wrapped token. ERC-20
//! networks share a single implementation and differ only by RPC endpoint;
//! networks without a reader get the empty computer.

mod caller;
mod empty;
mod erc20;

pub use caller::{read, ContractCaller, RpcCaller};
pub use empty::EmptyDataComputer;
pub use erc20::Erc20DataComputer;

#[cfg(test)]
pub use caller::mock::MockCaller;

use eyre::Result;
use tracing::debug;

use crate::config::Config;
use crate::networks::endpoint_for;
use crate::registry::TokenDefinition;

#[allow(async_fn_in_trait)]
pub trait TokenDataComputer {
    fn rpc_url(&self) -> Result<String>;
    async fn name(&self) -> Result<String>;
    async fn symbol(&self) -> Result<String>;
    /// Supply in whole tokens
    async fn total_supply(&self) -> Result<f64>;
    /// Supply valued in USDC
    async fn total_supply_usdc(&self) -> Result<f64>;
}

/// Computer chosen for a definition's network
pub enum DataComputer {
    Erc20(Erc20DataComputer<RpcCaller>),
    Empty(EmptyDataComputer),
}

impl TokenDataComputer for DataComputer {
    fn rpc_url(&self) -> Result<String> {
        match self {
            DataComputer::Erc20(c) => c.rpc_url(),
            DataComputer::Empty(c) => c.rpc_url(),
        }
    }

    async fn name(&self) -> Result<String> {
        match self {
            DataComputer::Erc20(c) => c.name().await,
            DataComputer::Empty(c) => c.name().await,
        }
    }

    async fn symbol(&self) -> Result<String> {
        match self {
            DataComputer::Erc20(c) => c.symbol().await,
            DataComputer::Empty(c) => c.symbol().await,
        }
    }

    async fn total_supply(&self) -> Result<f64> {
        match self {
            DataComputer::Erc20(c) => c.total_supply().await,
            DataComputer::Empty(c) => c.total_supply().await,
        }
    }

    async fn total_supply_usdc(&self) -> Result<f64> {
        match self {
            DataComputer::Erc20(c) => c.total_supply_usdc().await,
            DataComputer::Empty(c) => c.total_supply_usdc().await,
        }
    }
}

pub struct DataComputerFactory;

impl DataComputerFactory {
    pub fn create(definition: &TokenDefinition, config: &Config) -> Result<DataComputer> {
        match endpoint_for(definition.network, config) {
            Some(endpoint) => {
                debug!("{}: ERC-20 computer on {}", definition.name, endpoint.network());
                let computer = Erc20DataComputer::connect(
                    endpoint,
                    &definition.l1_wrapped_token_address,
                    definition.usd_price(),
                    config.retry_policy(),
                )?;
                Ok(DataComputer::Erc20(computer))
            }
            None => {
                debug!("{}: no reader for network {}", definition.name, definition.network);
                Ok(DataComputer::Empty(EmptyDataComputer))
            }
        }
    }
}
