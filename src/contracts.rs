//! Solidity interfaces read by the monitor

use alloy_sol_types::sol;

sol! {
    /// Plain ERC-20 metadata and supply
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }

    /// Euler V2 vault (EVault) views
    interface IEVault {
        function name() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function totalBorrows() external view returns (uint256);
        function caps() external view returns (uint16 supplyCap, uint16 borrowCap);
        function asset() external view returns (address);
        function dToken() external view returns (address);
    }

    /// Euler UtilsLens - APYs in ray precision (1e27)
    interface IUtilsLens {
        function getAPYs(address vault) external view returns (uint256 borrowAPY, uint256 supplyAPY);
    }

    /// Velodrome / Aerodrome concentrated liquidity pool
    interface ICLPool {
        function tokens() external view returns (address token0, address token1);
    }
}
