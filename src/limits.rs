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

//! Per-account rolling daily and monthly usage limits.
//!
//! Check and commit are deliberately split: `check` validates without
//! consuming, `commit` records usage only after the guarded debit actually
//! succeeded. A rejected withdrawal therefore never charges the limit.
//!
//! Windows roll over lazily: counters reset when the current date (or
//! month) differs from the stored window start, evaluated on each call.
//! No background timer.

use crate::base::AccountId;
use crate::error::LedgerError;
use chrono::{Datelike, NaiveDate};
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Limit amounts applied to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub daily_limit: Decimal,
    pub monthly_limit: Decimal,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            daily_limit: dec!(10000.00),
            monthly_limit: dec!(50000.00),
        }
    }
}

/// Rolling usage counters for one account.
#[derive(Debug)]
struct LimitWindows {
    daily_used: Decimal,
    monthly_used: Decimal,
    daily_window: NaiveDate,
    monthly_window: (i32, u32),
}

impl LimitWindows {
    fn new(today: NaiveDate) -> Self {
        Self {
            daily_used: Decimal::ZERO,
            monthly_used: Decimal::ZERO,
            daily_window: today,
            monthly_window: (today.year(), today.month()),
        }
    }

    fn roll_over(&mut self, today: NaiveDate) {
        if today != self.daily_window {
            self.daily_used = Decimal::ZERO;
            self.daily_window = today;
        }
        let month = (today.year(), today.month());
        if month != self.monthly_window {
            self.monthly_used = Decimal::ZERO;
            self.monthly_window = month;
        }
    }
}

/// Tracks per-account daily and monthly usage against a [`LimitPolicy`].
///
/// Callers must invoke [`LimitTracker::check`] and
/// [`LimitTracker::commit`] while holding the account's lock so recorded
/// usage stays consistent with the balance mutation it accompanies.
#[derive(Debug)]
pub struct LimitTracker {
    policy: LimitPolicy,
    windows: DashMap<AccountId, LimitWindows>,
}

impl LimitTracker {
    pub fn new(policy: LimitPolicy) -> Self {
        Self {
            policy,
            windows: DashMap::new(),
        }
    }

    pub fn policy(&self) -> LimitPolicy {
        self.policy
    }

    /// Validates that `amount` fits within both windows as of `today`.
    ///
    /// Rolls expired windows over but never consumes usage; a failed check
    /// leaves the counters untouched.
    ///
    /// # Errors
    ///
    /// [`LedgerError::LimitExceeded`] if either window would overflow.
    pub fn check(
        &self,
        account_id: AccountId,
        amount: Decimal,
        today: NaiveDate,
    ) -> Result<(), LedgerError> {
        let mut entry = self
            .windows
            .entry(account_id)
            .or_insert_with(|| LimitWindows::new(today));
        entry.roll_over(today);

        if amount + entry.daily_used > self.policy.daily_limit
            || amount + entry.monthly_used > self.policy.monthly_limit
        {
            return Err(LedgerError::LimitExceeded);
        }
        Ok(())
    }

    /// Records `amount` against both windows.
    ///
    /// Call only after the guarded operation has succeeded.
    pub fn commit(&self, account_id: AccountId, amount: Decimal, today: NaiveDate) {
        let mut entry = self
            .windows
            .entry(account_id)
            .or_insert_with(|| LimitWindows::new(today));
        entry.roll_over(today);
        entry.daily_used += amount;
        entry.monthly_used += amount;
    }

    /// Usage consumed in the current daily window.
    pub fn daily_used(&self, account_id: AccountId, today: NaiveDate) -> Decimal {
        match self.windows.get(&account_id) {
            Some(entry) if entry.daily_window == today => entry.daily_used,
            _ => Decimal::ZERO,
        }
    }

    /// Usage consumed in the current monthly window.
    pub fn monthly_used(&self, account_id: AccountId, today: NaiveDate) -> Decimal {
        match self.windows.get(&account_id) {
            Some(entry) if entry.monthly_window == (today.year(), today.month()) => {
                entry.monthly_used
            }
            _ => Decimal::ZERO,
        }
    }
}

impl Default for LimitTracker {
    fn default() -> Self {
        Self::new(LimitPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn check_within_limit_passes() {
        let tracker = LimitTracker::default();
        let id = AccountId::new();
        tracker.check(id, dec!(9000.00), day(2026, 3, 1)).unwrap();
    }

    #[test]
    fn failed_check_does_not_consume() {
        let tracker = LimitTracker::default();
        let id = AccountId::new();
        let today = day(2026, 3, 1);

        assert_eq!(
            tracker.check(id, dec!(10000.01), today),
            Err(LedgerError::LimitExceeded)
        );
        assert_eq!(tracker.daily_used(id, today), Decimal::ZERO);
    }

    #[test]
    fn committed_usage_counts_against_later_checks() {
        let tracker = LimitTracker::default();
        let id = AccountId::new();
        let today = day(2026, 3, 1);

        tracker.check(id, dec!(9000.00), today).unwrap();
        tracker.commit(id, dec!(9000.00), today);

        assert_eq!(
            tracker.check(id, dec!(2000.00), today),
            Err(LedgerError::LimitExceeded)
        );
        tracker.check(id, dec!(1000.00), today).unwrap();
        assert_eq!(tracker.daily_used(id, today), dec!(9000.00));
    }

    #[test]
    fn daily_window_rolls_over_at_date_change() {
        let tracker = LimitTracker::default();
        let id = AccountId::new();

        tracker.commit(id, dec!(9000.00), day(2026, 3, 1));
        assert_eq!(
            tracker.check(id, dec!(2000.00), day(2026, 3, 1)),
            Err(LedgerError::LimitExceeded)
        );

        // Next day: daily resets, monthly still carries 9000.
        tracker.check(id, dec!(2000.00), day(2026, 3, 2)).unwrap();
        assert_eq!(tracker.daily_used(id, day(2026, 3, 2)), Decimal::ZERO);
        assert_eq!(tracker.monthly_used(id, day(2026, 3, 2)), dec!(9000.00));
    }

    #[test]
    fn monthly_window_caps_across_days() {
        let tracker = LimitTracker::new(LimitPolicy {
            daily_limit: dec!(10000.00),
            monthly_limit: dec!(15000.00),
        });
        let id = AccountId::new();

        tracker.commit(id, dec!(10000.00), day(2026, 3, 1));
        assert_eq!(
            tracker.check(id, dec!(6000.00), day(2026, 3, 2)),
            Err(LedgerError::LimitExceeded)
        );
        tracker.check(id, dec!(5000.00), day(2026, 3, 2)).unwrap();

        // New month: both windows reset.
        tracker.check(id, dec!(10000.00), day(2026, 4, 1)).unwrap();
        assert_eq!(tracker.monthly_used(id, day(2026, 4, 1)), Decimal::ZERO);
    }

    #[test]
    fn accounts_are_tracked_independently() {
        let tracker = LimitTracker::default();
        let a = AccountId::new();
        let b = AccountId::new();
        let today = day(2026, 3, 1);

        tracker.commit(a, dec!(10000.00), today);
        tracker.check(b, dec!(10000.00), today).unwrap();
    }
}
