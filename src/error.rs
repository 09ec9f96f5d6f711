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

//! Error types for ledger operations.
//!
//! Every variant is a local, recoverable condition surfaced to the caller;
//! none is process-fatal. Callers can match on the variant to distinguish
//! policy rejections from invariant violations.

use crate::base::AccountId;
use crate::money::Currency;
use thiserror::Error;

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Initial deposit on account creation is negative
    #[error("initial deposit cannot be negative")]
    NegativeDeposit,

    /// Account kind string could not be parsed
    #[error("invalid account kind: {0}")]
    InvalidKind(String),

    /// Currency code could not be parsed
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),

    /// Arithmetic attempted across two different currencies
    #[error("currency mismatch (expected {expected}, found {found})")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// Referenced account does not exist
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// Operation attempted on a closed account
    #[error("account is closed")]
    AccountClosed,

    /// Debit rejected by the account's withdrawal policy
    /// (overdraft limit, minimum balance, frozen or closed status)
    #[error("withdrawal not permitted by account policy")]
    WithdrawalNotPermitted,

    /// Transaction blocked by the fraud screen
    #[error("blocked by fraud screen: {0}")]
    FraudBlocked(String),

    /// Daily or monthly usage limit would be exceeded
    #[error("transaction limit exceeded")]
    LimitExceeded,

    /// Transfer source and destination are the same account
    #[error("cannot transfer to the same account")]
    SameAccount,

    /// Close attempted on an account with a non-zero balance
    #[error("account balance must be zero to close")]
    NonZeroBalance,

    /// Transfer could not complete after the source debit; the source
    /// was restored by a compensating credit
    #[error("transfer failed and was rolled back")]
    TransferFailed,

    /// Duplicate transaction ID in the append-only log
    #[error("duplicate transaction ID")]
    DuplicateTransaction,
}
