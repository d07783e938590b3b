//! Euler vault reader
//!
//! Reads supply, borrows and caps of the lending vaults listed for a token,
//! plus the underlying balance held by the vault and the debt token supply.

use alloy_primitives::Address;
use eyre::{eyre, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::cap::{to_decimal, CapLimit};
use crate::computers::{read, ContractCaller, RpcCaller};
use crate::contracts::{IERC20, IEVault};
use crate::retry::RetryPolicy;
use crate::token_service::TokenData;

// ============================================
// VAULT DATA
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultData {
    pub address: Address,
    pub name: String,
    pub decimals: u8,
    /// Vault shares outstanding, in whole units
    pub total_supply: f64,
    pub total_borrows: f64,
    pub supply_cap: CapLimit,
    pub borrow_cap: CapLimit,
    pub asset: Address,
    /// Underlying tokens sitting in the vault
    pub balance_of_underlying: f64,
    pub debt_token: Address,
    pub total_supply_debt_token: f64,
}

impl VaultData {
    pub fn supply_cap_units(&self) -> Option<f64> {
        self.supply_cap.to_units(self.decimals)
    }

    pub fn borrow_cap_units(&self) -> Option<f64> {
        self.borrow_cap.to_units(self.decimals)
    }

    /// Borrows over supply, 0 for an empty vault
    pub fn utilization(&self) -> f64 {
        if self.total_supply <= 0.0 {
            return 0.0;
        }
        self.total_borrows / self.total_supply
    }

    /// Room left under the borrow cap; `None` when uncapped
    pub fn borrow_headroom(&self) -> Option<f64> {
        self.borrow_cap_units()
            .map(|cap| (cap - self.total_borrows).max(0.0))
    }
}

/// A lending venue as shown for a token; `data` is `None` when it could not be read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultLine {
    pub address: String,
    pub kind: String,
    pub chain_id: u64,
    pub data: Option<VaultData>,
}

// ============================================
// VAULT READER
// ============================================

pub struct VaultReader<C> {
    caller: C,
}

impl VaultReader<RpcCaller> {
    pub fn connect(rpc_url: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(Self::new(RpcCaller::new(rpc_url, retry)?))
    }
}

impl<C: ContractCaller> VaultReader<C> {
    pub fn new(caller: C) -> Self {
        Self { caller }
    }

    pub async fn read_vault(&self, vault: Address) -> Result<VaultData> {
        let c = &self.caller;
        let (name, decimals, supply, borrows, caps, asset, debt_token) = tokio::try_join!(
            read(c, vault, IEVault::nameCall {}),
            read(c, vault, IEVault::decimalsCall {}),
            read(c, vault, IEVault::totalSupplyCall {}),
            read(c, vault, IEVault::totalBorrowsCall {}),
            read(c, vault, IEVault::capsCall {}),
            read(c, vault, IEVault::assetCall {}),
            read(c, vault, IEVault::dTokenCall {}),
        )?;

        let (underlying, debt_supply) = tokio::try_join!(
            read(c, asset, IERC20::balanceOfCall { account: vault }),
            read(c, debt_token, IERC20::totalSupplyCall {}),
        )?;

        let data = VaultData {
            address: vault,
            name,
            decimals,
            total_supply: to_decimal(supply, decimals),
            total_borrows: to_decimal(borrows, decimals),
            supply_cap: CapLimit::from_packed(caps.supplyCap),
            borrow_cap: CapLimit::from_packed(caps.borrowCap),
            asset,
            balance_of_underlying: to_decimal(underlying, decimals),
            debt_token,
            total_supply_debt_token: to_decimal(debt_supply, decimals),
        };

        debug!(
            "🏦 Vault {} ({}): supply {:.2}, borrows {:.2}, borrow cap {}",
            data.name, vault, data.total_supply, data.total_borrows, data.borrow_cap
        );
        Ok(data)
    }

    async fn read_line(&self, venue_address: &str, kind: &str, chain_id: u64, euler: bool) -> VaultLine {
        let mut line = VaultLine {
            address: venue_address.to_string(),
            kind: kind.to_string(),
            chain_id,
            data: None,
        };

        if !euler {
            debug!("Skipping {} venue {}", kind, venue_address);
            return line;
        }

        let result = match Address::from_str(venue_address) {
            Ok(vault) => self.read_vault(vault).await,
            Err(e) => Err(eyre!("invalid address: {}", e)),
        };

        match result {
            Ok(data) => line.data = Some(data),
            Err(e) => warn!("Error when fetching lending venue {}: {}", venue_address, e),
        }
        line
    }

    /// Read every lending venue of a token in parallel
    pub async fn read_lending_venues(&self, token: &TokenData) -> Vec<VaultLine> {
        let reads = token.lending.iter().map(|venue| {
            self.read_line(&venue.address, &venue.kind, token.l2_chain_id, venue.is_euler())
        });
        let lines = join_all(reads).await;

        let ok = lines.iter().filter(|l| l.data.is_some()).count();
        info!("🏦 {} of {} lending venue(s) read for {}", ok, lines.len(), token.symbol);
        lines
    }
}

// ============================================
// TESTS
// ============================================
