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

//! Property-based tests for the ledger core.
//!
//! These verify invariants that should hold for any sequence of valid
//! operations: conservation under transfers, the policy floor, limit
//! monotonicity, and interest idempotence.

use bank_ledger_rs::{
    AccountId, AccountKind, Currency, FraudScreen, LedgerService, LimitPolicy, LimitTracker,
    ManualClock, Money, OwnerId,
};
use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::Usd)
}

/// Ledger with screening disabled and limits wide open, so property runs
/// exercise only the balance rules under test.
fn unconstrained_ledger() -> LedgerService {
    LedgerService::in_memory()
        .with_fraud_screen(FraudScreen::none())
        .with_limit_policy(LimitPolicy {
            daily_limit: Decimal::MAX,
            monthly_limit: Decimal::MAX,
        })
}

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Positive amount between 0.01 and 1000.00.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// (source index, dest index, amount) for a pool of `n` accounts.
fn arb_transfer(n: usize) -> impl Strategy<Value = (usize, usize, Decimal)> {
    (0..n, 0..n, arb_amount())
}

// =============================================================================
// Conservation
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The sum of all balances is invariant under any sequence of
    /// transfers, whether they succeed or are rejected.
    #[test]
    fn transfers_conserve_total_balance(
        transfers in prop::collection::vec(arb_transfer(4), 1..40),
    ) {
        let ledger = unconstrained_ledger();
        let owner = OwnerId::new();
        let accounts: Vec<_> = (0..4)
            .map(|_| {
                ledger
                    .create_account(AccountKind::checking(), owner, usd(dec!(1000.00)))
                    .unwrap()
            })
            .collect();

        for (from, to, amount) in transfers {
            let _ = ledger.transfer(
                accounts[from].id(),
                accounts[to].id(),
                usd(amount),
                "shuffle",
            );
        }

        let total: Decimal = accounts.iter().map(|a| a.balance().amount).sum();
        prop_assert_eq!(total, dec!(4000.00));
    }

    /// A checking balance never drops below the overdraft floor, a
    /// savings balance never below the minimum, no matter what mix of
    /// deposits and withdrawals is attempted.
    #[test]
    fn balance_never_breaches_policy_floor(
        operations in prop::collection::vec((any::<bool>(), arb_amount()), 1..60),
    ) {
        let ledger = unconstrained_ledger();
        let owner = OwnerId::new();
        let checking = ledger
            .create_account(AccountKind::checking(), owner, usd(dec!(50.00)))
            .unwrap();
        let savings = ledger
            .create_account(AccountKind::savings(), owner, usd(dec!(500.00)))
            .unwrap();

        for (is_deposit, amount) in operations {
            for account in [&checking, &savings] {
                if is_deposit {
                    let _ = ledger.deposit(account.id(), usd(amount), "");
                } else {
                    let _ = ledger.withdraw(account.id(), usd(amount), "");
                }
            }
        }

        prop_assert!(checking.balance().amount >= dec!(-100.00));
        prop_assert!(savings.balance().amount >= dec!(100.00));
    }
}

// =============================================================================
// Limit Monotonicity
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Committed usage never exceeds the daily limit when every commit is
    /// guarded by a successful check, and a failed check consumes nothing.
    #[test]
    fn daily_usage_never_exceeds_limit(
        amounts in prop::collection::vec(arb_amount(), 1..50),
    ) {
        let limit = dec!(5000.00);
        let tracker = LimitTracker::new(LimitPolicy {
            daily_limit: limit,
            monthly_limit: Decimal::MAX,
        });
        let id = AccountId::new();
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        for amount in amounts {
            let before = tracker.daily_used(id, today);
            if tracker.check(id, amount, today).is_ok() {
                tracker.commit(id, amount, today);
            } else {
                // Rejected check leaves usage untouched.
                prop_assert_eq!(tracker.daily_used(id, today), before);
            }
            prop_assert!(tracker.daily_used(id, today) <= limit);
        }
    }
}

// =============================================================================
// Interest Idempotence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Applying interest twice for the same date credits exactly once.
    #[test]
    fn interest_is_idempotent_per_date(
        balance_cents in 1i64..=10_000_000i64,
        days in 1i64..=365i64,
    ) {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ledger = LedgerService::in_memory()
            .with_clock(Arc::new(ManualClock::new(start)));
        let account = ledger
            .create_account(
                AccountKind::savings(),
                OwnerId::new(),
                usd(Decimal::new(balance_cents, 2)),
            )
            .unwrap();

        let as_of = start.date_naive() + chrono::Duration::days(days);
        let first = ledger.apply_interest(account.id(), as_of).unwrap();
        let balance_after = ledger.get_balance(account.id()).unwrap();

        let second = ledger.apply_interest(account.id(), as_of).unwrap();
        prop_assert!(second.is_zero());
        prop_assert_eq!(ledger.get_balance(account.id()).unwrap(), balance_after);

        // And the credited amount matches the balance delta.
        prop_assert_eq!(
            balance_after.amount,
            Decimal::new(balance_cents, 2) + first.amount
        );
    }
}
