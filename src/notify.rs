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

//! Best-effort notification fan-out for committed transactions.
//!
//! Sinks (email, SMS, audit log — all external concerns) observe records
//! after a successful commit. Delivery runs on a dedicated drain thread
//! fed by an unbounded channel, so the commit path only does a
//! non-blocking send. A failing or panicking sink never reaches the
//! ledger operation, and sinks are never invoked on a failure path.

use crate::transaction::TransactionRecord;
use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Observer of committed transaction records.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, record: &TransactionRecord);
}

/// Sink that logs each committed record via `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, record: &TransactionRecord) {
        tracing::info!(
            transaction = %record.id(),
            account = %record.account_id(),
            kind = ?record.kind(),
            amount = %record.amount(),
            "transaction committed"
        );
    }
}

/// Sink that collects records in memory; used by tests and the CLI.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<TransactionRecord>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TransactionRecord> {
        self.records.lock().clone()
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, record: &TransactionRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Fans committed records out to sinks on a background thread.
///
/// Dropping the hub closes the channel and joins the drain thread, so
/// notifications already published are delivered before shutdown.
pub struct NotificationHub {
    sender: Option<Sender<TransactionRecord>>,
    drain: Option<JoinHandle<()>>,
}

impl NotificationHub {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        if sinks.is_empty() {
            return Self {
                sender: None,
                drain: None,
            };
        }
        let (sender, receiver) = channel::unbounded::<TransactionRecord>();
        let drain = std::thread::spawn(move || {
            for record in receiver {
                for sink in &sinks {
                    // A misbehaving sink must not take the drain thread
                    // (or any later sink) down with it.
                    let _ = catch_unwind(AssertUnwindSafe(|| sink.notify(&record)));
                }
            }
        });
        Self {
            sender: Some(sender),
            drain: Some(drain),
        }
    }

    /// Hub with no sinks; publishing is a no-op.
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    /// Queues a committed record for delivery. Never blocks, never fails.
    pub fn publish(&self, record: &TransactionRecord) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(record.clone());
        }
    }
}

impl Drop for NotificationHub {
    fn drop(&mut self) {
        // Closing the sender ends the drain loop once the queue is empty.
        self.sender.take();
        if let Some(handle) = self.drain.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::AccountId;
    use crate::money::{Currency, Money};
    use crate::transaction::TransactionKind;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record() -> TransactionRecord {
        TransactionRecord::new(
            TransactionKind::Deposit,
            Money::new(dec!(5.00), Currency::Usd),
            AccountId::new(),
            Utc::now(),
            "",
        )
        .unwrap()
    }

    #[test]
    fn published_records_reach_all_sinks() {
        let first = Arc::new(CollectingSink::new());
        let second = Arc::new(CollectingSink::new());
        let hub = NotificationHub::new(vec![
            Arc::clone(&first) as Arc<dyn NotificationSink>,
            Arc::clone(&second) as Arc<dyn NotificationSink>,
        ]);

        for _ in 0..3 {
            hub.publish(&record());
        }
        drop(hub); // joins the drain thread

        assert_eq!(first.records().len(), 3);
        assert_eq!(second.records().len(), 3);
    }

    #[test]
    fn panicking_sink_does_not_stop_delivery() {
        struct PanickingSink;
        impl NotificationSink for PanickingSink {
            fn notify(&self, _: &TransactionRecord) {
                panic!("sink failure");
            }
        }

        let collector = Arc::new(CollectingSink::new());
        let hub = NotificationHub::new(vec![
            Arc::new(PanickingSink) as Arc<dyn NotificationSink>,
            Arc::clone(&collector) as Arc<dyn NotificationSink>,
        ]);

        hub.publish(&record());
        hub.publish(&record());
        drop(hub);

        assert_eq!(collector.records().len(), 2);
    }

    #[test]
    fn disabled_hub_is_a_no_op() {
        let hub = NotificationHub::disabled();
        hub.publish(&record());
    }
}
