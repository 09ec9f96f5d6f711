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

//! Fraud screening: an ordered chain of independent checks run before a
//! transaction commits.
//!
//! Each check sees the candidate record, a snapshot of the target account,
//! and the account's recent history, and either passes or blocks with a
//! reason. The first blocking check wins. New checks append to the chain
//! without touching the ledger service.

use crate::account::AccountSnapshot;
use crate::transaction::TransactionRecord;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Outcome of a single fraud check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Block(String),
}

/// One independent, stateless fraud check.
pub trait FraudCheck: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(
        &self,
        candidate: &TransactionRecord,
        account: &AccountSnapshot,
        history: &[TransactionRecord],
    ) -> Verdict;
}

/// Blocks any single transaction above an absolute amount threshold.
#[derive(Debug)]
pub struct AmountThresholdCheck {
    threshold: Decimal,
}

impl AmountThresholdCheck {
    pub fn new(threshold: Decimal) -> Self {
        Self { threshold }
    }
}

impl Default for AmountThresholdCheck {
    fn default() -> Self {
        Self::new(dec!(10000.00))
    }
}

impl FraudCheck for AmountThresholdCheck {
    fn name(&self) -> &'static str {
        "amount_threshold"
    }

    fn check(
        &self,
        candidate: &TransactionRecord,
        _account: &AccountSnapshot,
        _history: &[TransactionRecord],
    ) -> Verdict {
        if candidate.amount().amount > self.threshold {
            return Verdict::Block(format!(
                "amount {} exceeds threshold {}",
                candidate.amount().amount,
                self.threshold
            ));
        }
        Verdict::Pass
    }
}

/// Blocks when too many transactions land within a trailing time window.
#[derive(Debug)]
pub struct VelocityCheck {
    max_transactions: usize,
    window: chrono::Duration,
}

impl VelocityCheck {
    pub fn new(max_transactions: usize, window: chrono::Duration) -> Self {
        Self {
            max_transactions,
            window,
        }
    }
}

impl Default for VelocityCheck {
    fn default() -> Self {
        Self::new(10, chrono::Duration::hours(24))
    }
}

impl FraudCheck for VelocityCheck {
    fn name(&self) -> &'static str {
        "velocity"
    }

    fn check(
        &self,
        candidate: &TransactionRecord,
        _account: &AccountSnapshot,
        history: &[TransactionRecord],
    ) -> Verdict {
        // The window is inclusive: a record exactly window-old still counts.
        let cutoff = candidate.timestamp() - self.window;
        let recent = history
            .iter()
            .filter(|record| record.timestamp() >= cutoff)
            .count();
        if recent >= self.max_transactions {
            return Verdict::Block(format!(
                "{} transactions within the last {}h (max {})",
                recent,
                self.window.num_hours(),
                self.max_transactions
            ));
        }
        Verdict::Pass
    }
}

/// Ordered chain of fraud checks.
///
/// Iterated in insertion order; the first [`Verdict::Block`] stops the
/// scan and fails the transaction.
pub struct FraudScreen {
    checks: Vec<Box<dyn FraudCheck>>,
}

impl FraudScreen {
    /// Empty screen that passes everything.
    pub fn none() -> Self {
        Self { checks: Vec::new() }
    }

    /// Default chain: amount threshold, then velocity.
    ///
    /// Behavioral and geographic checks slot in behind these via
    /// [`FraudScreen::push`].
    pub fn default_chain() -> Self {
        Self {
            checks: vec![
                Box::new(AmountThresholdCheck::default()),
                Box::new(VelocityCheck::default()),
            ],
        }
    }

    /// Appends a check to the end of the chain.
    pub fn push(&mut self, check: Box<dyn FraudCheck>) {
        self.checks.push(check);
    }

    /// Runs the chain; returns the first blocking verdict, if any.
    pub fn screen(
        &self,
        candidate: &TransactionRecord,
        account: &AccountSnapshot,
        history: &[TransactionRecord],
    ) -> Verdict {
        for check in &self.checks {
            if let Verdict::Block(reason) = check.check(candidate, account, history) {
                tracing::warn!(
                    check = check.name(),
                    account = %account.id,
                    %reason,
                    "fraud check blocked transaction"
                );
                return Verdict::Block(reason);
            }
        }
        Verdict::Pass
    }
}

impl Default for FraudScreen {
    fn default() -> Self {
        Self::default_chain()
    }
}
