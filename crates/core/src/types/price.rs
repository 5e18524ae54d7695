//! Currency codes and the store-wide money rounding convention.
//!
//! Every amount the pricing engine produces, and every total an order stores,
//! is rounded through [`CurrencyCode::round`] so previews, cart lines and
//! orders agree to the last displayed digit.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// ISO 4217 currency codes the storefront can price in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    /// Nepalese rupee. Displayed in whole rupees.
    NPR,
}

impl CurrencyCode {
    /// Number of decimal places amounts are rounded to.
    #[must_use]
    pub const fn scale(self) -> u32 {
        match self {
            Self::NPR => 0,
            Self::USD | Self::EUR | Self::GBP | Self::CAD | Self::AUD => 2,
        }
    }

    /// Round an amount to this currency's display scale.
    ///
    /// Midpoints round away from zero, and the result always carries exactly
    /// `scale()` decimal places (`1349` becomes `1349.00` for USD).
    #[must_use]
    pub fn round(self, amount: Decimal) -> Decimal {
        let mut rounded =
            amount.round_dp_with_strategy(self.scale(), RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(self.scale());
        rounded
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::NPR => "NPR",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "NPR" => Ok(Self::NPR),
            other => Err(CoreError::validation(format!(
                "unsupported currency code '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_two_decimals() {
        let rounded = CurrencyCode::USD.round(Decimal::new(1_349_005, 3));
        assert_eq!(rounded, Decimal::new(134_901, 2));
        assert_eq!(rounded.to_string(), "1349.01");
    }

    #[test]
    fn test_round_pads_to_scale() {
        assert_eq!(CurrencyCode::USD.round(Decimal::from(1349)).to_string(), "1349.00");
    }

    #[test]
    fn test_round_whole_units_for_rupees() {
        assert_eq!(CurrencyCode::NPR.round(Decimal::new(12_995, 1)).to_string(), "1300");
        assert_eq!(CurrencyCode::NPR.round(Decimal::new(12_994, 1)).to_string(), "1299");
    }

    #[test]
    fn test_parse_currency_code() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!(" NPR ".parse::<CurrencyCode>().unwrap(), CurrencyCode::NPR);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_default_currency_is_usd() {
        assert_eq!(CurrencyCode::default(), CurrencyCode::USD);
        assert_eq!(CurrencyCode::default().to_string(), "USD");
    }
}
