use eyre::Result;

use super::TokenDataComputer;

/// Stand-in for networks without a reader: empty metadata, zero supply
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDataComputer;

impl TokenDataComputer for EmptyDataComputer {
    fn rpc_url(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn name(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn symbol(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn total_supply(&self) -> Result<f64> {
        Ok(0.0)
    }

    async fn total_supply_usdc(&self) -> Result<f64> {
        Ok(0.0)
    }
}
