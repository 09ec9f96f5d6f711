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

use bank_ledger_rs::{AccountId, AccountKind, Currency, LedgerService, Money, OwnerId};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Bank Ledger - process an operations CSV against an in-memory ledger
///
/// Reads ledger operations from a CSV file and outputs final account
/// states to stdout. Accounts are referenced by a caller-chosen name.
#[derive(Parser, Debug)]
#[command(name = "bank-ledger-rs")]
#[command(about = "A bank ledger that processes operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,account,counterparty,kind,amount,description
    /// Ops: open, deposit, withdraw, transfer, freeze, unfreeze, close
    /// Example: cargo run -- operations.csv > accounts.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let (ledger, names) = match process_operations(BufReader::new(file)) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_accounts(&ledger, &names, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, account, counterparty, kind, amount, description`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    account: String,
    #[serde(default)]
    counterparty: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    description: Option<String>,
}

/// Applies every operation in the CSV, returning the ledger and the
/// name-to-id mapping used for output.
///
/// Individual operation rejections (policy, limits, fraud) are reported
/// to stderr and skipped; only malformed input aborts the run.
fn process_operations<R: Read>(
    reader: R,
) -> Result<(LedgerService, HashMap<String, AccountId>), Box<dyn std::error::Error>> {
    let ledger = LedgerService::in_memory();
    let owner = OwnerId::new();
    let mut names: HashMap<String, AccountId> = HashMap::new();

    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    for (line, result) in csv_reader.deserialize::<CsvRecord>().enumerate() {
        let record = result?;
        if let Err(e) = apply(&ledger, &owner, &mut names, &record) {
            eprintln!("line {}: {} rejected: {}", line + 2, record.op, e);
        }
    }

    Ok((ledger, names))
}

fn apply(
    ledger: &LedgerService,
    owner: &OwnerId,
    names: &mut HashMap<String, AccountId>,
    record: &CsvRecord,
) -> Result<(), Box<dyn std::error::Error>> {
    let description = record.description.as_deref().unwrap_or_default();

    match record.op.as_str() {
        "open" => {
            let kind: AccountKind = record
                .kind
                .as_deref()
                .ok_or("missing account kind")?
                .parse()?;
            let initial = Money::new(record.amount.unwrap_or(Decimal::ZERO), Currency::Usd);
            let account = ledger.create_account(kind, *owner, initial)?;
            names.insert(record.account.clone(), account.id());
        }
        "deposit" => {
            let id = resolve(names, &record.account)?;
            let amount = required_amount(record)?;
            ledger.deposit(id, amount, description)?;
        }
        "withdraw" => {
            let id = resolve(names, &record.account)?;
            let amount = required_amount(record)?;
            ledger.withdraw(id, amount, description)?;
        }
        "transfer" => {
            let source = resolve(names, &record.account)?;
            let dest = resolve(
                names,
                record.counterparty.as_deref().ok_or("missing counterparty")?,
            )?;
            let amount = required_amount(record)?;
            ledger.transfer(source, dest, amount, description)?;
        }
        "freeze" => ledger.freeze_account(resolve(names, &record.account)?)?,
        "unfreeze" => ledger.unfreeze_account(resolve(names, &record.account)?)?,
        "close" => ledger.close_account(resolve(names, &record.account)?)?,
        other => return Err(format!("unknown operation '{}'", other).into()),
    }
    Ok(())
}

fn resolve(
    names: &HashMap<String, AccountId>,
    name: &str,
) -> Result<AccountId, Box<dyn std::error::Error>> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| format!("unknown account '{}'", name).into())
}

fn required_amount(record: &CsvRecord) -> Result<Money, Box<dyn std::error::Error>> {
    let amount = record.amount.ok_or("missing amount")?;
    Ok(Money::new(amount, Currency::Usd))
}

/// Writes final account states as CSV.
fn write_accounts<W: Write>(
    ledger: &LedgerService,
    names: &HashMap<String, AccountId>,
    writer: W,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut by_id: HashMap<AccountId, &str> = HashMap::new();
    for (name, id) in names {
        by_id.insert(*id, name);
    }

    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["name", "kind", "status", "balance", "interest_accrued"])?;

    let mut accounts = ledger.accounts();
    accounts.sort_by_key(|account| by_id.get(&account.id()).copied().unwrap_or("").to_string());

    for account in accounts {
        let snapshot = account.snapshot();
        wtr.write_record([
            by_id.get(&account.id()).copied().unwrap_or(""),
            snapshot.kind.name(),
            &snapshot.status.to_string(),
            &snapshot.balance.round_to_minor().amount.to_string(),
            &snapshot.interest_accrued.round_to_minor().amount.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
