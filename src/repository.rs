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

//! Persistence boundary for accounts and the transaction log.
//!
//! The ledger service only ever talks to these traits; in-memory, file,
//! and database backends are all valid implementations. The in-memory
//! implementations provided here back the tests and the CLI driver.

use crate::account::Account;
use crate::base::{AccountId, TransactionId};
use crate::error::LedgerError;
use crate::transaction::TransactionRecord;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use std::sync::Arc;

/// Storage for accounts.
///
/// Accounts are owned by the repository; the service holds only transient
/// `Arc` references during an operation.
pub trait AccountRepository: Send + Sync {
    /// Looks up an account by id.
    fn find(&self, id: &AccountId) -> Option<Arc<Account>>;

    /// Inserts a new account or persists the current state of an
    /// existing one.
    fn save(&self, account: Arc<Account>);

    /// All accounts, in no particular order.
    fn list(&self) -> Vec<Arc<Account>>;
}

/// Append-only storage for committed transaction records.
pub trait TransactionRepository: Send + Sync {
    /// Appends a committed record.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateTransaction`] if a record with the same id
    /// was already appended. Records are never mutated or deleted.
    fn append(&self, record: TransactionRecord) -> Result<(), LedgerError>;

    /// Records for one account, ordered by commit.
    fn find_by_account(&self, id: &AccountId) -> Vec<TransactionRecord>;
}

/// In-memory account store indexed by account id.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: DashMap<AccountId, Arc<Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }
}

impl AccountRepository for InMemoryAccountRepository {
    fn find(&self, id: &AccountId) -> Option<Arc<Account>> {
        self.accounts.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn save(&self, account: Arc<Account>) {
        // Balance mutations happen in place under the account lock, so
        // re-saving an already stored account is a no-op upsert.
        self.accounts.insert(account.id(), account);
    }

    fn list(&self) -> Vec<Arc<Account>> {
        self.accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

/// In-memory append-only transaction log.
///
/// A `DashMap` keyed by transaction id gives an atomic check-and-insert
/// for duplicate detection; a per-account vector preserves commit order
/// for history queries.
#[derive(Debug, Default)]
pub struct InMemoryTransactionRepository {
    by_id: DashMap<TransactionId, Arc<TransactionRecord>>,
    by_account: DashMap<AccountId, RwLock<Vec<Arc<TransactionRecord>>>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_account: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl TransactionRepository for InMemoryTransactionRepository {
    fn append(&self, record: TransactionRecord) -> Result<(), LedgerError> {
        let record = Arc::new(record);

        // Entry API gives an atomic check-and-insert; two appends racing
        // on the same id cannot both win.
        match self.by_id.entry(record.id()) {
            Entry::Occupied(_) => return Err(LedgerError::DuplicateTransaction),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&record));
            }
        }

        self.by_account
            .entry(record.account_id())
            .or_default()
            .write()
            .push(record);
        Ok(())
    }

    fn find_by_account(&self, id: &AccountId) -> Vec<TransactionRecord> {
        match self.by_account.get(id) {
            Some(entry) => entry.read().iter().map(|r| (**r).clone()).collect(),
            None => Vec::new(),
        }
    }
}
