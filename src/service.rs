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

//! The ledger service: the single entry point external callers use.
//!
//! Every operation is atomic with respect to concurrent callers on the
//! same account(s): the account lock (both locks, canonically ordered, for
//! a transfer) is held across fraud screening, the limit check, the
//! balance mutation, the record append, and the limit commit. Operations
//! on disjoint accounts proceed in parallel; there is no global lock.
//!
//! # Example
//!
//! ```
//! use bank_ledger_rs::{AccountKind, Currency, LedgerService, Money, OwnerId};
//! use rust_decimal_macros::dec;
//!
//! let ledger = LedgerService::in_memory();
//! let account = ledger
//!     .create_account(
//!         AccountKind::checking(),
//!         OwnerId::new(),
//!         Money::new(dec!(100.00), Currency::Usd),
//!     )
//!     .unwrap();
//!
//! ledger
//!     .deposit(account.id(), Money::new(dec!(50.00), Currency::Usd), "payroll")
//!     .unwrap();
//! assert_eq!(ledger.get_balance(account.id()).unwrap().amount, dec!(150.00));
//! ```

use crate::account::{Account, AccountData, AccountKind, AccountStatus};
use crate::base::{AccountId, OwnerId};
use crate::clock::{Clock, SystemClock};
use crate::error::LedgerError;
use crate::fraud::{FraudScreen, Verdict};
use crate::limits::{LimitPolicy, LimitTracker};
use crate::money::Money;
use crate::notify::{NotificationHub, NotificationSink};
use crate::repository::{
    AccountRepository, InMemoryAccountRepository, InMemoryTransactionRepository,
    TransactionRepository,
};
use crate::transaction::{TransactionKind, TransactionRecord};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Orchestrates deposits, withdrawals, transfers, and interest accrual
/// against the account and transaction repositories.
///
/// The service holds repositories, never the reverse: accounts are plain
/// data-plus-lock structs with no back-reference to the service.
pub struct LedgerService {
    accounts: Arc<dyn AccountRepository>,
    transactions: Arc<dyn TransactionRepository>,
    limits: LimitTracker,
    fraud: FraudScreen,
    hub: NotificationHub,
    clock: Arc<dyn Clock>,
}

impl LedgerService {
    /// Service with the default fraud chain, default limits, the system
    /// clock, and no notification sinks.
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        transactions: Arc<dyn TransactionRepository>,
    ) -> Self {
        Self {
            accounts,
            transactions,
            limits: LimitTracker::default(),
            fraud: FraudScreen::default_chain(),
            hub: NotificationHub::disabled(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Convenience constructor backed by the in-memory repositories.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(InMemoryTransactionRepository::new()),
        )
    }

    pub fn with_fraud_screen(mut self, fraud: FraudScreen) -> Self {
        self.fraud = fraud;
        self
    }

    pub fn with_limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.limits = LimitTracker::new(policy);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Installs observers invoked after each successful commit.
    /// They never run on a failure path and never block the commit.
    pub fn with_sinks(mut self, sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        self.hub = NotificationHub::new(sinks);
        self
    }

    /// Opens a new Active account holding the initial deposit.
    ///
    /// A positive initial deposit is recorded as the account's first
    /// Deposit record.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NegativeDeposit`] if the initial deposit is negative.
    #[instrument(skip(self))]
    pub fn create_account(
        &self,
        kind: AccountKind,
        owner_id: OwnerId,
        initial_deposit: Money,
    ) -> Result<Arc<Account>, LedgerError> {
        let account = Arc::new(Account::open(
            kind,
            owner_id,
            initial_deposit,
            self.clock.now(),
        )?);
        self.accounts.save(Arc::clone(&account));

        if initial_deposit.is_positive() {
            let record = TransactionRecord::new(
                TransactionKind::Deposit,
                initial_deposit,
                account.id(),
                self.clock.now(),
                "initial deposit",
            )?;
            self.transactions.append(record.clone())?;
            self.hub.publish(&record);
        }

        info!(account = %account.id(), kind = kind.name(), "account opened");
        Ok(account)
    }

    /// Credits an account. Permitted while Frozen; rejected when Closed.
    #[instrument(skip(self, description))]
    pub fn deposit(
        &self,
        account_id: AccountId,
        amount: Money,
        description: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        let account = self.resolve(account_id)?;
        let record = TransactionRecord::new(
            TransactionKind::Deposit,
            amount,
            account_id,
            self.clock.now(),
            description,
        )?;

        let mut data = account.lock();
        self.screen(&record, &data, account_id)?;
        data.credit(&amount)?;
        if let Err(err) = self.transactions.append(record.clone()) {
            data.reverse_credit(&amount);
            return Err(err);
        }
        self.accounts.save(Arc::clone(&account));
        drop(data);

        self.hub.publish(&record);
        info!(account = %account_id, amount = %amount, "deposit committed");
        Ok(record)
    }

    /// Debits an account, subject to the withdrawal policy and limits.
    ///
    /// Limit usage is committed only after the debit succeeds; a rejected
    /// withdrawal never consumes the limit.
    #[instrument(skip(self, description))]
    pub fn withdraw(
        &self,
        account_id: AccountId,
        amount: Money,
        description: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        let account = self.resolve(account_id)?;
        let record = TransactionRecord::new(
            TransactionKind::Withdrawal,
            amount,
            account_id,
            self.clock.now(),
            description,
        )?;

        let mut data = account.lock();
        self.screen(&record, &data, account_id)?;
        let today = self.clock.today();
        self.limits.check(account_id, amount.amount, today)?;
        data.debit(&amount)?;
        if let Err(err) = self.transactions.append(record.clone()) {
            data.reverse_debit(&amount);
            return Err(err);
        }
        self.accounts.save(Arc::clone(&account));
        self.limits.commit(account_id, amount.amount, today);
        drop(data);

        self.hub.publish(&record);
        info!(account = %account_id, amount = %amount, "withdrawal committed");
        Ok(record)
    }

    /// Atomically moves funds between two accounts.
    ///
    /// Both account locks are acquired in ascending-id order and held
    /// across the whole commit, so no caller ever observes a half-applied
    /// transfer. Returns the linked (TransferOut, TransferIn) records.
    #[instrument(skip(self, description))]
    pub fn transfer(
        &self,
        source_id: AccountId,
        dest_id: AccountId,
        amount: Money,
        description: &str,
    ) -> Result<(TransactionRecord, TransactionRecord), LedgerError> {
        if source_id == dest_id {
            return Err(LedgerError::SameAccount);
        }
        let source = self.resolve(source_id)?;
        let dest = self.resolve(dest_id)?;

        let (out_record, in_record) = TransactionRecord::transfer_pair(
            source_id,
            dest_id,
            amount,
            self.clock.now(),
            description,
        )?;

        // Canonical ascending-id lock order. Two concurrent transfers on
        // the same pair in opposite directions acquire in the same order.
        let (mut src_data, mut dst_data) = if source.id() < dest.id() {
            let s = source.lock();
            let d = dest.lock();
            (s, d)
        } else {
            let d = dest.lock();
            let s = source.lock();
            (s, d)
        };

        self.screen(&out_record, &src_data, source_id)?;
        let today = self.clock.today();
        self.limits.check(source_id, amount.amount, today)?;

        // Preconditions the destination credit could fail on, validated
        // before the source debit so no rollback is ever needed.
        if dst_data.status() == AccountStatus::Closed {
            return Err(LedgerError::AccountClosed);
        }
        if dst_data.balance().currency != amount.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: dst_data.balance().currency,
                found: amount.currency,
            });
        }

        move_funds(&mut src_data, &mut dst_data, &amount)?;

        if let Err(err) = self
            .transactions
            .append(out_record.clone())
            .and_then(|()| self.transactions.append(in_record.clone()))
        {
            // Balances are restored under the locks still held; the
            // transfer surfaces the append error with no net effect.
            src_data.reverse_debit(&amount);
            dst_data.reverse_credit(&amount);
            return Err(err);
        }
        self.accounts.save(Arc::clone(&source));
        self.accounts.save(Arc::clone(&dest));
        self.limits.commit(source_id, amount.amount, today);
        drop(src_data);
        drop(dst_data);

        self.hub.publish(&out_record);
        self.hub.publish(&in_record);
        info!(
            source = %source_id,
            dest = %dest_id,
            amount = %amount,
            correlation = %out_record.correlation_id().map(|c| c.to_string()).unwrap_or_default(),
            "transfer committed"
        );
        Ok((out_record, in_record))
    }

    /// Accrues interest for the whole days elapsed since the account's
    /// last accrual, up to `as_of`.
    ///
    /// Returns the credited amount; zero when no time has elapsed or the
    /// kind earns nothing. Idempotent per calendar day: the second call
    /// with the same `as_of` credits zero.
    #[instrument(skip(self))]
    pub fn apply_interest(
        &self,
        account_id: AccountId,
        as_of: chrono::NaiveDate,
    ) -> Result<Money, LedgerError> {
        let account = self.resolve(account_id)?;

        let mut data = account.lock();
        let cursor = data.accrual_cursor();
        let credited = data.apply_interest(as_of)?;
        if credited.is_positive() {
            let record = TransactionRecord::new(
                TransactionKind::Interest,
                credited,
                account_id,
                self.clock.now(),
                "interest accrual",
            )?;
            if let Err(err) = self.transactions.append(record.clone()) {
                data.reverse_interest(&credited, cursor);
                return Err(err);
            }
            self.accounts.save(Arc::clone(&account));
            drop(data);

            self.hub.publish(&record);
            info!(account = %account_id, amount = %credited, "interest credited");
        } else {
            // The accrual cursor advances even when the credit rounds to
            // zero; a persisting repository must see the new cursor or the
            // same days would accrue again after a reload.
            self.accounts.save(Arc::clone(&account));
        }
        Ok(credited)
    }

    /// Debits a bank-initiated fee. Fees go through the withdrawal policy
    /// but are not screened or counted against velocity limits.
    #[instrument(skip(self, description))]
    pub fn charge_fee(
        &self,
        account_id: AccountId,
        amount: Money,
        description: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        let account = self.resolve(account_id)?;
        let record = TransactionRecord::new(
            TransactionKind::Fee,
            amount,
            account_id,
            self.clock.now(),
            description,
        )?;

        let mut data = account.lock();
        data.debit(&amount)?;
        if let Err(err) = self.transactions.append(record.clone()) {
            data.reverse_debit(&amount);
            return Err(err);
        }
        self.accounts.save(Arc::clone(&account));
        drop(data);

        self.hub.publish(&record);
        info!(account = %account_id, amount = %amount, "fee charged");
        Ok(record)
    }

    /// Current balance of an account.
    pub fn get_balance(&self, account_id: AccountId) -> Result<Money, LedgerError> {
        Ok(self.resolve(account_id)?.balance())
    }

    /// Committed records for an account, ordered by commit time.
    pub fn get_history(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.resolve(account_id)?;
        Ok(self.transactions.find_by_account(&account_id))
    }

    /// Blocks debits on the account; credits still land.
    #[instrument(skip(self))]
    pub fn freeze_account(&self, account_id: AccountId) -> Result<(), LedgerError> {
        let account = self.resolve(account_id)?;
        account.lock().freeze()?;
        self.accounts.save(account);
        warn!(account = %account_id, "account frozen");
        Ok(())
    }

    /// Lifts a freeze.
    #[instrument(skip(self))]
    pub fn unfreeze_account(&self, account_id: AccountId) -> Result<(), LedgerError> {
        let account = self.resolve(account_id)?;
        account.lock().unfreeze()?;
        self.accounts.save(account);
        info!(account = %account_id, "account unfrozen");
        Ok(())
    }

    /// Closes the account. Terminal; the balance must be zero.
    #[instrument(skip(self))]
    pub fn close_account(&self, account_id: AccountId) -> Result<(), LedgerError> {
        let account = self.resolve(account_id)?;
        account.lock().close()?;
        self.accounts.save(account);
        info!(account = %account_id, "account closed");
        Ok(())
    }

    /// All accounts known to the repository.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        self.accounts.list()
    }

    fn resolve(&self, account_id: AccountId) -> Result<Arc<Account>, LedgerError> {
        self.accounts
            .find(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    fn screen(
        &self,
        candidate: &TransactionRecord,
        data: &AccountData,
        account_id: AccountId,
    ) -> Result<(), LedgerError> {
        let snapshot = data.snapshot(account_id);
        let history = self.transactions.find_by_account(&account_id);
        match self.fraud.screen(candidate, &snapshot, &history) {
            Verdict::Pass => Ok(()),
            Verdict::Block(reason) => Err(LedgerError::FraudBlocked(reason)),
        }
    }
}

/// Debits the source and credits the destination under both locks.
///
/// The caller has already validated the destination can accept the credit
/// (not Closed, same currency), so the credit failing here is an invariant
/// violation: the source debit is compensated and the transfer surfaces as
/// [`LedgerError::TransferFailed`] with no net effect.
fn move_funds(
    source: &mut AccountData,
    dest: &mut AccountData,
    amount: &Money,
) -> Result<(), LedgerError> {
    source.debit(amount)?;
    if let Err(err) = dest.credit(amount) {
        warn!(%err, "destination credit failed after source debit; compensating");
        source.reverse_debit(amount);
        return Err(LedgerError::TransferFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::Usd)
    }

    fn open(kind: AccountKind, balance: rust_decimal::Decimal) -> Account {
        Account::open(kind, OwnerId::new(), usd(balance), Utc::now()).unwrap()
    }

    #[test]
    fn move_funds_debits_and_credits() {
        let source = open(AccountKind::checking(), dec!(500.00));
        let dest = open(AccountKind::checking(), dec!(100.00));

        let mut src_data = source.lock();
        let mut dst_data = dest.lock();
        move_funds(&mut src_data, &mut dst_data, &usd(dec!(200.00))).unwrap();

        assert_eq!(src_data.balance().amount, dec!(300.00));
        assert_eq!(dst_data.balance().amount, dec!(300.00));
    }

    #[test]
    fn failed_source_debit_leaves_destination_untouched() {
        let source = open(AccountKind::savings(), dec!(100.00));
        let dest = open(AccountKind::checking(), dec!(0));

        let mut src_data = source.lock();
        let mut dst_data = dest.lock();
        let result = move_funds(&mut src_data, &mut dst_data, &usd(dec!(50.00)));

        assert_eq!(result, Err(LedgerError::WithdrawalNotPermitted));
        assert_eq!(src_data.balance().amount, dec!(100.00));
        assert_eq!(dst_data.balance().amount, dec!(0));
    }

    #[test]
    fn compensating_credit_restores_source_on_late_credit_failure() {
        // Hand move_funds a destination that refuses the credit (closed),
        // as if the state changed after the service's precondition check.
        let source = open(AccountKind::checking(), dec!(500.00));
        let dest = open(AccountKind::checking(), dec!(0));
        dest.lock().close().unwrap();

        let mut src_data = source.lock();
        let mut dst_data = dest.lock();
        let result = move_funds(&mut src_data, &mut dst_data, &usd(dec!(200.00)));

        assert_eq!(result, Err(LedgerError::TransferFailed));
        // No net effect on either side.
        assert_eq!(src_data.balance().amount, dec!(500.00));
        assert_eq!(dst_data.balance().amount, dec!(0));
    }
}
