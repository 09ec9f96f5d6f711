// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Money type with fixed-precision decimal arithmetic and a currency code.
//!
//! Never use floating-point for money. All amounts are `rust_decimal::Decimal`
//! values (scaled integers), constructed either from decimal literals or from
//! integer minor units (cents).

use crate::error::LedgerError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// ISO 4217 currency codes supported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    /// Number of decimal places for the currency's minor unit.
    pub fn minor_units(&self) -> u32 {
        match self {
            Currency::Usd | Currency::Eur | Currency::Gbp => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Eur => write!(f, "EUR"),
            Currency::Gbp => write!(f, "GBP"),
        }
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            other => Err(LedgerError::UnknownCurrency(other.to_string())),
        }
    }
}

/// A monetary amount paired with its currency.
///
/// Arithmetic across currencies is rejected with
/// [`LedgerError::CurrencyMismatch`]; the ledger performs no conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Builds an amount from integer minor units (e.g. cents).
    pub fn from_minor_units(units: i64, currency: Currency) -> Self {
        Self {
            amount: Decimal::new(units, currency.minor_units()),
            currency,
        }
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Adds another amount of the same currency.
    pub fn try_add(&self, other: &Money) -> Result<Money, LedgerError> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency))
    }

    /// Subtracts another amount of the same currency.
    pub fn try_sub(&self, other: &Money) -> Result<Money, LedgerError> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, self.currency))
    }

    /// Rounds half-up to the currency's minor unit.
    pub fn round_to_minor(&self) -> Money {
        Money::new(
            self.amount.round_dp_with_strategy(
                self.currency.minor_units(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            self.currency,
        )
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), LedgerError> {
        if self.currency != other.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }
}

/// Amounts are comparable only within a currency.
impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.currency != other.currency {
            return None;
        }
        self.amount.partial_cmp(&other.amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn from_minor_units_scales_to_cents() {
        let m = Money::from_minor_units(12345, Currency::Usd);
        assert_eq!(m.amount, dec!(123.45));
    }

    #[test]
    fn try_add_same_currency() {
        let a = Money::new(dec!(10.50), Currency::Usd);
        let b = Money::new(dec!(4.25), Currency::Usd);
        assert_eq!(a.try_add(&b).unwrap().amount, dec!(14.75));
    }

    #[test]
    fn try_add_rejects_currency_mismatch() {
        let a = Money::new(dec!(10.00), Currency::Usd);
        let b = Money::new(dec!(10.00), Currency::Eur);
        assert_eq!(
            a.try_add(&b),
            Err(LedgerError::CurrencyMismatch {
                expected: Currency::Usd,
                found: Currency::Eur,
            })
        );
    }

    #[test]
    fn round_to_minor_is_half_up() {
        // 1.975 -> 1.98, 1.9726 -> 1.97
        let m = Money::new(dec!(1.975), Currency::Usd);
        assert_eq!(m.round_to_minor().amount, dec!(1.98));
        let m = Money::new(dec!(1.9726), Currency::Usd);
        assert_eq!(m.round_to_minor().amount, dec!(1.97));
    }

    #[test]
    fn ordering_is_partial_across_currencies() {
        let a = Money::new(dec!(1.00), Currency::Usd);
        let b = Money::new(dec!(2.00), Currency::Eur);
        assert_eq!(a.partial_cmp(&b), None);

        let c = Money::new(dec!(2.00), Currency::Usd);
        assert!(a < c);
    }

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert!("XXX".parse::<Currency>().is_err());
    }
}
