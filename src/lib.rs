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

//! # Bank Ledger
//!
//! This library provides a transactional bank ledger core: accounts holding
//! balances, an append-only transaction log, and the rules governing when a
//! mutation is permitted (overdraft/minimum-balance policy, velocity
//! limits, fraud screening, interest accrual).
//!
//! ## Core Components
//!
//! - [`LedgerService`]: Single entry point for deposits, withdrawals,
//!   atomic two-account transfers, and interest accrual
//! - [`Account`]: Balance-holding entity with a per-account lock and a
//!   kind-specific withdrawal policy
//! - [`TransactionRecord`]: Immutable log entry describing a balance change
//! - [`LimitTracker`]: Rolling daily/monthly usage windows with a
//!   check/commit split
//! - [`FraudScreen`]: Ordered chain of checks run before a commit
//! - [`AccountRepository`] / [`TransactionRepository`]: The persistence
//!   boundary; in-memory implementations are provided
//!
//! ## Example
//!
//! ```
//! use bank_ledger_rs::{AccountKind, Currency, LedgerService, Money, OwnerId};
//! use rust_decimal_macros::dec;
//!
//! let ledger = LedgerService::in_memory();
//! let owner = OwnerId::new();
//!
//! let a = ledger
//!     .create_account(AccountKind::checking(), owner, Money::new(dec!(500.00), Currency::Usd))
//!     .unwrap();
//! let b = ledger
//!     .create_account(AccountKind::checking(), owner, Money::new(dec!(500.00), Currency::Usd))
//!     .unwrap();
//!
//! let (out, incoming) = ledger
//!     .transfer(a.id(), b.id(), Money::new(dec!(500.00), Currency::Usd), "rent")
//!     .unwrap();
//! assert_eq!(out.correlation_id(), incoming.correlation_id());
//! assert_eq!(ledger.get_balance(a.id()).unwrap().amount, dec!(0));
//! assert_eq!(ledger.get_balance(b.id()).unwrap().amount, dec!(1000.00));
//! ```
//!
//! ## Thread Safety
//!
//! Every account carries its own lock; operations on disjoint accounts run
//! in parallel. Transfers hold both locks in canonical ascending-id order
//! across the whole commit, so a half-applied transfer is never observable
//! and opposite-direction transfers cannot deadlock.

pub mod account;
mod base;
mod clock;
pub mod error;
pub mod fraud;
mod interest;
mod limits;
mod money;
pub mod notify;
pub mod repository;
mod service;
mod transaction;

pub use account::{Account, AccountKind, AccountSnapshot, AccountStatus};
pub use base::{AccountId, CorrelationId, OwnerId, TransactionId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::LedgerError;
pub use fraud::{AmountThresholdCheck, FraudCheck, FraudScreen, VelocityCheck, Verdict};
pub use interest::interest_for_period;
pub use limits::{LimitPolicy, LimitTracker};
pub use money::{Currency, Money};
pub use notify::{CollectingSink, NotificationHub, NotificationSink, TracingSink};
pub use repository::{
    AccountRepository, InMemoryAccountRepository, InMemoryTransactionRepository,
    TransactionRepository,
};
pub use service::LedgerService;
pub use transaction::{TransactionKind, TransactionRecord};
