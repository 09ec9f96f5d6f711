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

//! Interest calculation, keyed by account kind.
//!
//! Simple daily accrual: `balance * annual_rate / 365 * days`, rounded
//! half-up to the currency's minor unit. Idempotence per calendar day is
//! enforced by the account's `last_accrual` date, not here.

use crate::account::AccountKind;
use crate::money::{Currency, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const DAYS_PER_YEAR: Decimal = dec!(365);

/// Interest earned by `balance` over `days` whole days at the kind's
/// annual rate.
///
/// Returns zero for a non-positive balance, a zero rate, or `days <= 0`.
pub fn interest_for_period(
    kind: &AccountKind,
    balance: Decimal,
    days: i64,
    currency: Currency,
) -> Money {
    if balance <= Decimal::ZERO || days <= 0 {
        return Money::zero(currency);
    }
    let rate = kind.annual_rate();
    if rate.is_zero() {
        return Money::zero(currency);
    }
    let daily_rate = rate / DAYS_PER_YEAR;
    Money::new(balance * daily_rate * Decimal::from(days), currency).round_to_minor()
}
