//! Euler AmountCap decoding
//!
//! Supply and borrow caps are stored as a packed `u16`: the low 6 bits are a
//! base-10 exponent, the high 10 bits a mantissa scaled by 100. Zero means
//! "no cap".

use alloy_primitives::U256;
use alloy_primitives::utils::format_units;
use serde::{Deserialize, Serialize};

/// Mask for the exponent bits of a packed cap
const EXPONENT_MASK: u16 = 63;

/// Mantissa is stored with two implied decimals
const MANTISSA_SCALE: u64 = 100;

/// Decode a packed cap into raw token units (`U256::MAX` when unlimited)
pub fn decode_cap(cap: u16) -> U256 {
    if cap == 0 {
        return U256::MAX;
    }
    let exponent = U256::from(cap & EXPONENT_MASK);
    let mantissa = U256::from(cap >> 6);
    U256::from(10u64).pow(exponent) * mantissa / U256::from(MANTISSA_SCALE)
}

/// A decoded cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapLimit {
    Unlimited,
    Limited(U256),
}

impl CapLimit {
    pub fn from_packed(cap: u16) -> Self {
        let raw = decode_cap(cap);
        if raw == U256::MAX {
            CapLimit::Unlimited
        } else {
            CapLimit::Limited(raw)
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, CapLimit::Unlimited)
    }

    /// Raw amount, `U256::MAX` for unlimited
    pub fn raw(&self) -> U256 {
        match self {
            CapLimit::Unlimited => U256::MAX,
            CapLimit::Limited(v) => *v,
        }
    }

    /// Cap in whole tokens; `None` when unlimited
    pub fn to_units(&self, decimals: u8) -> Option<f64> {
        match self {
            CapLimit::Unlimited => None,
            CapLimit::Limited(v) => Some(to_decimal(*v, decimals)),
        }
    }
}

impl std::fmt::Display for CapLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapLimit::Unlimited => write!(f, "Unlimited"),
            CapLimit::Limited(v) => write!(f, "{}", v),
        }
    }
}

/// Scale a raw on-chain amount by `decimals` into a float
pub fn to_decimal(raw: U256, decimals: u8) -> f64 {
    format_units(raw, decimals)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

// ============================================
// TESTS
// ============================================
