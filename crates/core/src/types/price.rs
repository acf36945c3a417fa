//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
///
/// Arithmetic helpers keep the currency of `self`; callers are expected to
/// only combine prices of one currency (a cart is priced in a single
/// currency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Multiply the amount by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Add another amount, keeping this price's currency.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        Self::new(self.amount + other.amount, self.currency_code)
    }

    /// Subtract another amount, keeping this price's currency.
    ///
    /// The result may be negative.
    #[must_use]
    pub fn minus(self, other: Self) -> Self {
        Self::new(self.amount - other.amount, self.currency_code)
    }

    /// Returns the amount clamped at zero.
    #[must_use]
    pub fn clamp_non_negative(self) -> Self {
        if self.amount.is_sign_negative() {
            Self::zero(self.currency_code)
        } else {
            self
        }
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Format for display (e.g., "$19.99", "NT$1,412").
    #[must_use]
    pub fn display(&self) -> String {
        let places = self.currency_code.minor_units();
        let rounded = self.amount.round_dp(places);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let abs = rounded.abs();
        let whole = abs.trunc();
        let fraction = abs - whole;

        let grouped = group_thousands(&whole.to_string());
        if places == 0 {
            format!("{sign}{}{grouped}", self.currency_code.symbol())
        } else {
            let digits = format!("{:.*}", places as usize, fraction);
            let decimals = digits.trim_start_matches('0');
            format!("{sign}{}{grouped}{decimals}", self.currency_code.symbol())
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    TWD,
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::TWD => "NT$",
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TWD => "TWD",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Number of decimal places shown for this currency.
    #[must_use]
    pub const fn minor_units(&self) -> u32 {
        match self {
            Self::TWD => 0,
            _ => 2,
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TWD" => Ok(Self::TWD),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn twd(amount: i64) -> Price {
        Price::new(Decimal::from(amount), CurrencyCode::TWD)
    }

    #[test]
    fn test_times_and_plus() {
        let line = twd(288).times(2).plus(twd(388).times(2));
        assert_eq!(line.amount, Decimal::from(1352));
    }

    #[test]
    fn test_minus_can_go_negative_and_clamp() {
        let raw = twd(100).minus(twd(150));
        assert!(raw.is_negative());
        assert_eq!(raw.clamp_non_negative(), twd(0));
    }

    #[test]
    fn test_display_without_minor_units() {
        assert_eq!(twd(1412).display(), "NT$1,412");
        assert_eq!(twd(60).display(), "NT$60");
        assert_eq!(twd(-5).display(), "-NT$5");
    }

    #[test]
    fn test_display_with_minor_units() {
        let price = Price::new(Decimal::new(123_456, 2), CurrencyCode::USD);
        assert_eq!(price.display(), "$1,234.56");
        let price = Price::new(Decimal::new(5, 1), CurrencyCode::USD);
        assert_eq!(price.display(), "$0.50");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("twd".parse::<CurrencyCode>().unwrap(), CurrencyCode::TWD);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
