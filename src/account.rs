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

//! Account state and withdrawal-eligibility policy.
//!
//! Status state machine:
//!
//! ```text
//! Active ──freeze──► Frozen ──unfreeze──► Active
//!    │                  │
//!    └──────close───────┴──► Closed (terminal, requires zero balance)
//! ```
//!
//! Frozen blocks debits but still accepts credits; Closed accepts nothing.
//!
//! # Example
//!
//! ```
//! use bank_ledger_rs::{Account, AccountKind, Currency, Money, OwnerId};
//! use chrono::Utc;
//! use rust_decimal_macros::dec;
//!
//! let account = Account::open(
//!     AccountKind::savings(),
//!     OwnerId::new(),
//!     Money::new(dec!(1000.00), Currency::Usd),
//!     Utc::now(),
//! )
//! .unwrap();
//! assert_eq!(account.balance().amount, dec!(1000.00));
//! ```

use crate::base::{AccountId, OwnerId};
use crate::error::LedgerError;
use crate::interest;
use crate::money::{Currency, Money};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::str::FromStr;

/// Account kind with its policy parameters.
///
/// A tagged variant instead of subclassing: the withdrawal floor and
/// interest rate are table lookups on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AccountKind {
    /// May overdraw down to `-overdraft_limit`.
    Checking { overdraft_limit: Decimal },
    /// May not drop below `minimum_balance` on withdrawal.
    Savings { minimum_balance: Decimal },
}

impl AccountKind {
    /// Checking with the default overdraft limit.
    pub fn checking() -> Self {
        AccountKind::Checking {
            overdraft_limit: dec!(100.00),
        }
    }

    /// Savings with the default minimum balance.
    pub fn savings() -> Self {
        AccountKind::Savings {
            minimum_balance: dec!(100.00),
        }
    }

    /// Lowest balance a withdrawal may leave behind.
    pub fn floor(&self) -> Decimal {
        match self {
            AccountKind::Checking { overdraft_limit } => -overdraft_limit,
            AccountKind::Savings { minimum_balance } => *minimum_balance,
        }
    }

    /// Annual interest rate for the kind.
    pub fn annual_rate(&self) -> Decimal {
        match self {
            AccountKind::Checking { .. } => dec!(0.001),
            AccountKind::Savings { .. } => dec!(0.02),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccountKind::Checking { .. } => "checking",
            AccountKind::Savings { .. } => "savings",
        }
    }
}

impl FromStr for AccountKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(AccountKind::checking()),
            "savings" => Ok(AccountKind::savings()),
            other => Err(LedgerError::InvalidKind(other.to_string())),
        }
    }
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Frozen => write!(f, "frozen"),
            AccountStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Point-in-time copy of an account's state, taken under its lock.
///
/// Handed to fraud checks and callers so nothing outside the ledger
/// touches live account state.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub kind: AccountKind,
    pub status: AccountStatus,
    pub balance: Money,
    pub interest_accrued: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub(crate) struct AccountData {
    kind: AccountKind,
    owner_id: OwnerId,
    currency: Currency,
    balance: Decimal,
    status: AccountStatus,
    created_at: DateTime<Utc>,
    interest_accrued: Decimal,
    last_accrual: NaiveDate,
}

impl AccountData {
    fn new(
        kind: AccountKind,
        owner_id: OwnerId,
        currency: Currency,
        balance: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            owner_id,
            currency,
            balance,
            status: AccountStatus::Active,
            created_at,
            interest_accrued: Decimal::ZERO,
            last_accrual: created_at.date_naive(),
        }
    }

    pub(crate) fn balance(&self) -> Money {
        Money::new(self.balance, self.currency)
    }

    pub(crate) fn status(&self) -> AccountStatus {
        self.status
    }

    pub(crate) fn kind(&self) -> AccountKind {
        self.kind
    }

    fn require_currency(&self, amount: &Money) -> Result<(), LedgerError> {
        if amount.currency != self.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.currency,
                found: amount.currency,
            });
        }
        Ok(())
    }

    /// Withdrawal-eligibility policy: Active status, positive amount, and
    /// the balance after the debit stays at or above the kind's floor.
    pub(crate) fn can_withdraw(&self, amount: Decimal) -> bool {
        self.status == AccountStatus::Active
            && amount > Decimal::ZERO
            && self.balance - amount >= self.kind.floor()
    }

    /// Increases the balance. Permitted on Frozen accounts: a freeze
    /// blocks outgoing funds, not incoming.
    pub(crate) fn credit(&mut self, amount: &Money) -> Result<(), LedgerError> {
        self.require_currency(amount)?;
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount);
        }
        if self.status == AccountStatus::Closed {
            return Err(LedgerError::AccountClosed);
        }
        self.balance += amount.amount;
        Ok(())
    }

    /// Decreases the balance if the withdrawal policy permits.
    pub(crate) fn debit(&mut self, amount: &Money) -> Result<(), LedgerError> {
        self.require_currency(amount)?;
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount);
        }
        if !self.can_withdraw(amount.amount) {
            return Err(LedgerError::WithdrawalNotPermitted);
        }
        self.balance -= amount.amount;
        debug_assert!(
            self.balance >= self.kind.floor(),
            "Invariant violated: balance {} fell below policy floor {}",
            self.balance,
            self.kind.floor()
        );
        Ok(())
    }

    /// Undoes a just-applied debit while the same lock is still held.
    ///
    /// Compensation only: bypasses the withdrawal policy, which must not
    /// be allowed to refuse restoring funds it already released.
    pub(crate) fn reverse_debit(&mut self, amount: &Money) {
        self.balance += amount.amount;
    }

    /// Undoes a just-applied credit while the same lock is still held.
    pub(crate) fn reverse_credit(&mut self, amount: &Money) {
        self.balance -= amount.amount;
    }

    pub(crate) fn freeze(&mut self) -> Result<(), LedgerError> {
        if self.status == AccountStatus::Closed {
            return Err(LedgerError::AccountClosed);
        }
        self.status = AccountStatus::Frozen;
        Ok(())
    }

    pub(crate) fn unfreeze(&mut self) -> Result<(), LedgerError> {
        if self.status == AccountStatus::Closed {
            return Err(LedgerError::AccountClosed);
        }
        self.status = AccountStatus::Active;
        Ok(())
    }

    /// Closes the account. Terminal; requires a zero balance.
    pub(crate) fn close(&mut self) -> Result<(), LedgerError> {
        if self.status == AccountStatus::Closed {
            return Err(LedgerError::AccountClosed);
        }
        if self.balance != Decimal::ZERO {
            return Err(LedgerError::NonZeroBalance);
        }
        self.status = AccountStatus::Closed;
        Ok(())
    }

    /// Accrues interest for whole days elapsed since the last accrual.
    ///
    /// Returns the credited amount (zero when no days elapsed, the rate
    /// is zero, or the balance is non-positive). Advances `last_accrual`
    /// to `as_of` whenever `as_of` is later, even for a zero credit, so
    /// the same period can never accrue twice.
    pub(crate) fn apply_interest(&mut self, as_of: NaiveDate) -> Result<Money, LedgerError> {
        if self.status == AccountStatus::Closed {
            return Err(LedgerError::AccountClosed);
        }
        if as_of <= self.last_accrual {
            return Ok(Money::zero(self.currency));
        }
        let days = (as_of - self.last_accrual).num_days();
        self.last_accrual = as_of;

        let interest = interest::interest_for_period(&self.kind, self.balance, days, self.currency);
        if interest.is_positive() {
            self.balance += interest.amount;
            self.interest_accrued += interest.amount;
        }
        Ok(interest)
    }

    /// Date up to which interest has been accrued.
    pub(crate) fn accrual_cursor(&self) -> NaiveDate {
        self.last_accrual
    }

    /// Undoes a just-applied accrual while the same lock is still held,
    /// restoring balance, accrued total, and the cursor captured before
    /// the accrual.
    pub(crate) fn reverse_interest(&mut self, credited: &Money, cursor: NaiveDate) {
        self.balance -= credited.amount;
        self.interest_accrued -= credited.amount;
        self.last_accrual = cursor;
    }

    pub(crate) fn snapshot(&self, id: AccountId) -> AccountSnapshot {
        AccountSnapshot {
            id,
            kind: self.kind,
            status: self.status,
            balance: Money::new(self.balance, self.currency),
            interest_accrued: Money::new(self.interest_accrued, self.currency),
            created_at: self.created_at,
        }
    }
}

/// A balance-holding ledger account.
///
/// All mutable state lives behind one `parking_lot::Mutex`; that guard is
/// the mutual-exclusion scope every balance mutation and policy evaluation
/// for this account must pass through. The id lives outside the mutex so
/// two-account operations can order their lock acquisition without locking.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    inner: Mutex<AccountData>,
}

impl Account {
    /// Opens a new Active account holding the initial deposit.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NegativeDeposit`] if the initial deposit is negative.
    pub fn open(
        kind: AccountKind,
        owner_id: OwnerId,
        initial_deposit: Money,
        opened_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if initial_deposit.is_negative() {
            return Err(LedgerError::NegativeDeposit);
        }
        Ok(Self {
            id: AccountId::new(),
            inner: Mutex::new(AccountData::new(
                kind,
                owner_id,
                initial_deposit.currency,
                initial_deposit.amount,
                opened_at,
            )),
        })
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn kind(&self) -> AccountKind {
        self.inner.lock().kind
    }

    pub fn owner_id(&self) -> OwnerId {
        self.inner.lock().owner_id
    }

    pub fn currency(&self) -> Currency {
        self.inner.lock().currency
    }

    pub fn status(&self) -> AccountStatus {
        self.inner.lock().status
    }

    pub fn balance(&self) -> Money {
        self.inner.lock().balance()
    }

    /// Interest credited so far; non-decreasing over the account's life.
    pub fn interest_accrued(&self) -> Money {
        let data = self.inner.lock();
        Money::new(data.interest_accrued, data.currency)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.lock().created_at
    }

    /// Consistent point-in-time copy of the account state.
    pub fn snapshot(&self) -> AccountSnapshot {
        self.inner.lock().snapshot(self.id)
    }

    /// Acquires the account's mutual-exclusion scope.
    pub(crate) fn lock(&self) -> MutexGuard<'_, AccountData> {
        self.inner.lock()
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Account", 6)?;
        state.serialize_field("account", &self.id)?;
        state.serialize_field("kind", data.kind.name())?;
        state.serialize_field("currency", &data.currency)?;
        state.serialize_field("status", &data.status)?;
        state.serialize_field(
            "balance",
            &data
                .balance
                .round_dp(data.currency.minor_units()),
        )?;
        state.serialize_field(
            "interest_accrued",
            &data.interest_accrued.round_dp(data.currency.minor_units()),
        )?;
        state.end()
    }
}
