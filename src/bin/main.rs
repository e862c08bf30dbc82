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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use escrow_ledger_rs::{
    AdminId, BankDetails, BookingId, Engine, LedgerConfig, OfferId, OwnerId, PayoutMode, RequestId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Escrow Ledger - Replay marketplace ledger operations from a CSV file
///
/// Reads operations from a CSV file, runs them through the ledger engine,
/// and outputs final wallet states to stdout. Supports wallet credits, offer
/// escrows, settlements, and the withdrawal request lifecycle.
#[derive(Parser, Debug)]
#[command(name = "escrow-ledger-rs")]
#[command(about = "Replays a marketplace ledger operations CSV", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,owner,offer,booking,amount
    /// Example: cargo run -- operations.csv > wallets.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Admin ID stamped on approve/reject operations
    #[arg(long, default_value_t = 0)]
    admin: u64,

    /// Minimum deposit per offer, in minor units
    #[arg(long, default_value_t = 20000)]
    min_deposit: i64,

    /// Maturity window in days before deposits become withdrawable
    #[arg(long, default_value_t = 30)]
    maturity_days: i64,
}

fn main() {
    tracing_subscriber::fmt().init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let config = LedgerConfig {
        min_deposit_per_offer: Decimal::new(args.min_deposit, 0),
        maturity_window: chrono::Duration::days(args.maturity_days),
        ..LedgerConfig::default()
    };

    let engine = match process_operations(BufReader::new(file), config, AdminId(args.admin)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_wallets(&engine, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, owner, offer, booking, amount` — unused columns may be left
/// empty per operation.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    owner: Option<u64>,
    offer: Option<u64>,
    booking: Option<u64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
}

/// Withdrawal requests are keyed by generated IDs, so the replay tracks the
/// open request per offer to let later rows reference it by offer column.
type OpenRequests = HashMap<u64, RequestId>;

/// The replay format carries no bank details; requests use a fixed stand-in.
fn replay_bank_details() -> BankDetails {
    BankDetails {
        account_holder: "replay".into(),
        account_number: "0000000000".into(),
        bank_name: "replay".into(),
        routing_code: "REPLAY0".into(),
    }
}

fn apply_record(
    engine: &Engine,
    record: CsvRecord,
    open_requests: &mut OpenRequests,
    admin: AdminId,
) -> Result<(), String> {
    let owner = record.owner.map(OwnerId);
    let offer = record.offer.map(OfferId);
    let booking = record.booking.map(BookingId);

    let missing = |field: &str| format!("missing {} column", field);

    match record.op.to_lowercase().as_str() {
        "credit" => {
            let owner = owner.ok_or_else(|| missing("owner"))?;
            let amount = record.amount.ok_or_else(|| missing("amount"))?;
            engine.credit_wallet(owner, amount).map_err(|e| e.to_string())?;
        }
        "open_escrow" => {
            let owner = owner.ok_or_else(|| missing("owner"))?;
            let offer = offer.ok_or_else(|| missing("offer"))?;
            let amount = record.amount.ok_or_else(|| missing("amount"))?;
            engine
                .open_offer_escrow(owner, offer, amount)
                .map_err(|e| e.to_string())?;
        }
        "cancel_escrow" => {
            let owner = owner.ok_or_else(|| missing("owner"))?;
            let offer = offer.ok_or_else(|| missing("offer"))?;
            engine.cancel_offer_escrow(owner, offer).map_err(|e| e.to_string())?;
        }
        "expire_escrow" => {
            let offer = offer.ok_or_else(|| missing("offer"))?;
            engine.expire_offer_escrow(offer).map_err(|e| e.to_string())?;
        }
        "sweep" => {
            engine.sweep_matured_escrows();
        }
        "register_booking" => {
            let booking = booking.ok_or_else(|| missing("booking"))?;
            let offer = offer.ok_or_else(|| missing("offer"))?;
            engine.register_booking(booking, offer).map_err(|e| e.to_string())?;
        }
        "accept_content" => {
            let booking = booking.ok_or_else(|| missing("booking"))?;
            engine.accept_content(booking).map_err(|e| e.to_string())?;
        }
        "settle" => {
            let booking = booking.ok_or_else(|| missing("booking"))?;
            let amount = record.amount.ok_or_else(|| missing("amount"))?;
            engine
                .record_settlement(booking, amount, PayoutMode::BankTransfer)
                .map_err(|e| e.to_string())?;
        }
        "request_withdrawal" => {
            let owner = owner.ok_or_else(|| missing("owner"))?;
            let offer = offer.ok_or_else(|| missing("offer"))?;
            let request = engine
                .request_withdrawal(owner, offer, replay_bank_details())
                .map_err(|e| e.to_string())?;
            open_requests.insert(offer.0, request.id);
        }
        "cancel_withdrawal" => {
            let owner = owner.ok_or_else(|| missing("owner"))?;
            let offer = offer.ok_or_else(|| missing("offer"))?;
            let request_id = open_requests
                .remove(&offer.0)
                .ok_or("no open request for offer")?;
            engine.cancel_withdrawal(request_id, owner).map_err(|e| e.to_string())?;
        }
        "approve_withdrawal" => {
            let offer = offer.ok_or_else(|| missing("offer"))?;
            let request_id = open_requests
                .remove(&offer.0)
                .ok_or("no open request for offer")?;
            engine.approve_withdrawal(request_id, admin).map_err(|e| e.to_string())?;
        }
        "reject_withdrawal" => {
            let offer = offer.ok_or_else(|| missing("offer"))?;
            let request_id = open_requests
                .remove(&offer.0)
                .ok_or("no open request for offer")?;
            engine
                .reject_withdrawal(request_id, admin, "rejected during replay")
                .map_err(|e| e.to_string())?;
        }
        other => return Err(format!("unknown op '{}'", other)),
    }

    Ok(())
}

/// Process operations from a CSV reader.
///
/// Streams the file row by row; malformed rows and failed operations are
/// skipped so one bad row never aborts a replay.
///
/// # CSV Format
///
/// Expected columns: `op, owner, offer, booking, amount`
///
/// ```csv
/// op,owner,offer,booking,amount
/// credit,1,,,50000
/// open_escrow,1,10,,20000
/// register_booking,,10,100,
/// accept_content,,,100,
/// settle,,,100,20000
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
/// Individual operation errors are logged in debug mode but don't stop
/// processing.
pub fn process_operations<R: Read>(
    reader: R,
    config: LedgerConfig,
    admin: AdminId,
) -> Result<Engine, csv::Error> {
    let engine = Engine::with_config(config);
    let mut open_requests = OpenRequests::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " credit "
        .flexible(true) // Allow trailing empty columns
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                // Apply the operation, ignoring failures (silent skip)
                if let Err(_reason) = apply_record(&engine, record, &mut open_requests, admin) {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping operation: {}", _reason);
                }
            }
            Err(_e) => {
                // Skip malformed rows
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", _e);
                continue;
            }
        }
    }

    Ok(engine)
}

/// Write final wallet states to a CSV writer.
///
/// # CSV Format
///
/// Columns: `owner, total, locked, available, archived`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_wallets<W: Write>(engine: &Engine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for wallet in engine.wallets() {
        wtr.serialize(&*wallet)?;
    }

    wtr.flush()?;
    Ok(())
}
