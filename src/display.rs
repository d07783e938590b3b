//! Number formatting and venue links for console output

use crate::networks::Network;

/// Round half away from zero to `decimals` places
pub fn round_to(num: f64, decimals: u32) -> f64 {
    let pow = 10f64.powi(decimals as i32);
    ((num + f64::EPSILON) * pow).round() / pow
}

/// Compact human form: `1.5M`, `12.34K`, `0.1234`, `0.000012`
pub fn friendly_format_number(num: f64) -> String {
    if num == 0.0 || num.is_nan() {
        return "0".to_string();
    }

    if num > 1e9 {
        format!("{}B", round_to(num / 1e9, 2))
    } else if num > 1e6 {
        format!("{}M", round_to(num / 1e6, 2))
    } else if num > 1e3 {
        format!("{}K", round_to(num / 1e3, 2))
    } else if num < 1e-3 {
        format!("{:.6}", num)
    } else {
        format!("{}", round_to(num, 4))
    }
}

/// Percent with two decimals, e.g. `3.10%`
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

pub fn euler_vault_link(address: &str, network: Network) -> String {
    format!(
        "https://app.euler.finance/vault/{}?network={}",
        address,
        network.app_slug()
    )
}

/// Velodrome liquidity page filtered to a network and searched by `query`
pub fn velodrome_link(network: Network, query: &str) -> String {
    format!(
        "https://velodrome.finance/liquidity?filters={}&query={}",
        network.app_slug(),
        query
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_format_number() {
        assert_eq!(friendly_format_number(0.0), "0");
        assert_eq!(friendly_format_number(2_500_000_000.0), "2.5B");
        assert_eq!(friendly_format_number(1_234_567.0), "1.23M");
        assert_eq!(friendly_format_number(12_000.0), "12K");
        assert_eq!(friendly_format_number(999.123456), "999.1235");
        assert_eq!(friendly_format_number(0.0001234), "0.000123");
        // Exactly on a boundary stays in the lower band
        assert_eq!(friendly_format_number(1000.0), "1000");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.005, 2), 1.01);
        assert_eq!(round_to(2.0, 4), 2.0);
        assert_eq!(round_to(3.14159, 3), 3.142);
    }

    #[test]
    fn test_links() {
        assert_eq!(
            euler_vault_link("0xc5976e0356f0A3Ce8307fF08C88bB05933F88761", Network::Swell),
            "https://app.euler.finance/vault/0xc5976e0356f0A3Ce8307fF08C88bB05933F88761?network=swellchain"
        );
        assert_eq!(
            velodrome_link(Network::Swell, "rUSDC"),
            "https://velodrome.finance/liquidity?filters=swellchain&query=rUSDC"
        );
        assert_eq!(format_percent(3.1), "3.10%");
    }
}
