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

//! Concurrency tests using parking_lot's built-in deadlock detector.
//!
//! These verify that the canonical ascending-id lock ordering used for
//! transfers cannot deadlock, and that concurrent operations never lose
//! updates or breach the conservation invariant.

use bank_ledger_rs::{
    AccountKind, Currency, FraudScreen, LedgerService, LimitPolicy, Money, OwnerId,
};
use parking_lot::deadlock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::Usd)
}

/// Ledger with screening and limits out of the way, so the tests hammer
/// the locking paths as fast as possible.
fn unconstrained_ledger() -> Arc<LedgerService> {
    Arc::new(
        LedgerService::in_memory()
            .with_fraud_screen(FraudScreen::none())
            .with_limit_policy(LimitPolicy {
                daily_limit: Decimal::MAX,
                monthly_limit: Decimal::MAX,
            }),
    )
}

/// Watches for lock cycles while the test runs.
fn spawn_deadlock_detector(rounds: u32) -> Arc<AtomicBool> {
    let found = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&found);
    thread::spawn(move || {
        for _ in 0..rounds {
            thread::sleep(Duration::from_millis(50));
            if !deadlock::check_deadlock().is_empty() {
                flag.store(true, Ordering::SeqCst);
                return;
            }
        }
    });
    found
}

#[test]
fn opposite_direction_transfers_do_not_deadlock() {
    let ledger = unconstrained_ledger();
    let owner = OwnerId::new();
    let a = ledger
        .create_account(AccountKind::checking(), owner, usd(dec!(100000.00)))
        .unwrap();
    let b = ledger
        .create_account(AccountKind::checking(), owner, usd(dec!(100000.00)))
        .unwrap();

    let deadlocked = spawn_deadlock_detector(100);

    let forward = {
        let ledger = Arc::clone(&ledger);
        let (a, b) = (a.id(), b.id());
        thread::spawn(move || {
            for _ in 0..500 {
                ledger.transfer(a, b, usd(dec!(50.00)), "forward").unwrap();
            }
        })
    };
    let backward = {
        let ledger = Arc::clone(&ledger);
        let (a, b) = (a.id(), b.id());
        thread::spawn(move || {
            for _ in 0..500 {
                ledger.transfer(b, a, usd(dec!(30.00)), "backward").unwrap();
            }
        })
    };

    forward.join().unwrap();
    backward.join().unwrap();

    assert!(!deadlocked.load(Ordering::SeqCst), "deadlock detected");

    // Conservation, and the deterministic net: 500*(50-30) out of A.
    let total = a.balance().amount + b.balance().amount;
    assert_eq!(total, dec!(200000.00));
    assert_eq!(a.balance().amount, dec!(90000.00));
    assert_eq!(b.balance().amount, dec!(110000.00));
}

#[test]
fn ring_of_transfers_across_many_accounts() {
    let ledger = unconstrained_ledger();
    let owner = OwnerId::new();
    let accounts: Vec<_> = (0..8)
        .map(|_| {
            ledger
                .create_account(AccountKind::checking(), owner, usd(dec!(10000.00)))
                .unwrap()
        })
        .collect();

    let deadlocked = spawn_deadlock_detector(100);

    // Each thread pushes money one step around the ring; neighbours
    // contend on shared accounts from both sides.
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            let from = accounts[i].id();
            let to = accounts[(i + 1) % 8].id();
            thread::spawn(move || {
                for _ in 0..200 {
                    ledger.transfer(from, to, usd(dec!(10.00)), "ring").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(!deadlocked.load(Ordering::SeqCst), "deadlock detected");

    // Every account sent and received exactly 200 * 10, so each balance
    // is back where it started and the total is conserved.
    for account in &accounts {
        assert_eq!(account.balance().amount, dec!(10000.00));
    }
}

#[test]
fn concurrent_deposits_never_lose_updates() {
    let ledger = unconstrained_ledger();
    let account = ledger
        .create_account(AccountKind::checking(), OwnerId::new(), usd(dec!(0)))
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            let id = account.id();
            thread::spawn(move || {
                for _ in 0..250 {
                    ledger.deposit(id, usd(dec!(1.00)), "").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(account.balance().amount, dec!(1000.00));
    assert_eq!(ledger.get_history(account.id()).unwrap().len(), 1000);
}

#[test]
fn disjoint_accounts_progress_independently() {
    let ledger = unconstrained_ledger();
    let owner = OwnerId::new();

    let deadlocked = spawn_deadlock_detector(50);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let account = ledger
                    .create_account(AccountKind::checking(), owner, usd(dec!(500.00)))
                    .unwrap();
                for _ in 0..100 {
                    ledger.deposit(account.id(), usd(dec!(5.00)), "").unwrap();
                    ledger.withdraw(account.id(), usd(dec!(5.00)), "").unwrap();
                }
                account
            })
        })
        .collect();

    for handle in handles {
        let account = handle.join().unwrap();
        assert_eq!(account.balance().amount, dec!(500.00));
    }

    assert!(!deadlocked.load(Ordering::SeqCst), "deadlock detected");
}

#[test]
fn concurrent_withdrawals_respect_the_floor() {
    let ledger = unconstrained_ledger();
    let account = ledger
        .create_account(AccountKind::savings(), OwnerId::new(), usd(dec!(1000.00)))
        .unwrap();

    // 20 threads race to withdraw 100 each; only 9 can succeed before
    // the 100.00 savings floor stops the rest.
    let handles: Vec<_> = (0..20)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            let id = account.id();
            thread::spawn(move || ledger.withdraw(id, usd(dec!(100.00)), "").is_ok())
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 9);
    assert_eq!(account.balance().amount, dec!(100.00));
}
