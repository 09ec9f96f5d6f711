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

//! Immutable transaction records.
//!
//! A [`TransactionRecord`] is an append-only log entry describing one balance
//! change. Amounts are always positive; direction is carried by the kind.
//! A transfer produces exactly two records (TransferOut on the source,
//! TransferIn on the destination) sharing one correlation id.

use crate::base::{AccountId, CorrelationId, TransactionId};
use crate::error::LedgerError;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The kind of balance change a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    TransferOut,
    TransferIn,
    Interest,
    Fee,
}

impl TransactionKind {
    /// Transfer kinds carry a counterparty account; all others must not.
    pub fn is_transfer(&self) -> bool {
        matches!(self, TransactionKind::TransferOut | TransactionKind::TransferIn)
    }
}

/// An immutable log entry describing one committed balance change.
///
/// Fields are private; records cannot be mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    id: TransactionId,
    kind: TransactionKind,
    amount: Money,
    account_id: AccountId,
    counterparty: Option<AccountId>,
    correlation_id: Option<CorrelationId>,
    timestamp: DateTime<Utc>,
    description: String,
}

impl TransactionRecord {
    /// Creates a non-transfer record.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if the amount is not positive.
    /// - [`LedgerError::InvalidKind`] if `kind` is a transfer kind
    ///   (use [`TransactionRecord::transfer_pair`] instead).
    pub fn new(
        kind: TransactionKind,
        amount: Money,
        account_id: AccountId,
        timestamp: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        if kind.is_transfer() {
            return Err(LedgerError::InvalidKind(
                "transfer records must be created as a pair".to_string(),
            ));
        }
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Self {
            id: TransactionId::new(),
            kind,
            amount,
            account_id,
            counterparty: None,
            correlation_id: None,
            timestamp,
            description: description.into(),
        })
    }

    /// Creates the linked TransferOut/TransferIn pair for one transfer.
    ///
    /// Both records share a freshly minted correlation id and reference
    /// each other as counterparty.
    pub fn transfer_pair(
        source: AccountId,
        destination: AccountId,
        amount: Money,
        timestamp: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Result<(Self, Self), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount);
        }
        if source == destination {
            return Err(LedgerError::SameAccount);
        }
        let correlation = CorrelationId::new();
        let description = description.into();
        let out = Self {
            id: TransactionId::new(),
            kind: TransactionKind::TransferOut,
            amount,
            account_id: source,
            counterparty: Some(destination),
            correlation_id: Some(correlation),
            timestamp,
            description: description.clone(),
        };
        let incoming = Self {
            id: TransactionId::new(),
            kind: TransactionKind::TransferIn,
            amount,
            account_id: destination,
            counterparty: Some(source),
            correlation_id: Some(correlation),
            timestamp,
            description,
        };
        Ok((out, incoming))
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Always positive; direction is carried by [`TransactionRecord::kind`].
    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Present iff the record is one half of a transfer.
    pub fn counterparty(&self) -> Option<AccountId> {
        self.counterparty
    }

    /// Shared by the two records of one transfer, absent otherwise.
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}
