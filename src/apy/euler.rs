use alloy_primitives::Address;
use eyre::Result;
use tracing::debug;

use super::{ApyRates, BaseRateSource, EULER_LENS_SOURCE};
use crate::cap::to_decimal;
use crate::computers::{read, ContractCaller};
use crate::contracts::IUtilsLens;

/// Ray (1e27) to percent
const RAY_PERCENT_DECIMALS: u8 = 25;

/// Base lending rates read from the Euler UtilsLens
pub struct EulerLensSource<C> {
    caller: C,
    lens: Address,
}

impl<C: ContractCaller> EulerLensSource<C> {
    pub fn new(caller: C, lens: Address) -> Self {
        Self { caller, lens }
    }
}

impl<C: ContractCaller> BaseRateSource for EulerLensSource<C> {
    async fn base_rates(&self, vault: Address) -> Result<ApyRates> {
        let apys = read(&self.caller, self.lens, IUtilsLens::getAPYsCall { vault }).await?;

        let supply = to_decimal(apys.supplyAPY, RAY_PERCENT_DECIMALS);
        let borrow = to_decimal(apys.borrowAPY, RAY_PERCENT_DECIMALS);
        debug!("Euler Lens {}: supply {:.4}%, borrow {:.4}%", vault, supply, borrow);

        Ok(ApyRates::new(supply, borrow, EULER_LENS_SOURCE))
    }
}
