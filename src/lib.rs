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

//! # Escrow Ledger
//!
//! Wallet ledger and escrow core for a two-sided promotional marketplace.
//! Businesses pre-fund a wallet, a fixed security deposit is locked per
//! offer, and the locked amount is later released either as a creator payout
//! (settlement) or reclaimed by the business (withdrawal).
//!
//! ## Core Components
//!
//! - [`Engine`]: single entry point for every balance mutation
//! - [`Wallet`]: per-owner total/locked/available balances with atomic commits
//! - [`Journal`]: append-only transaction trail with per-owner pagination
//! - [`OfferEscrow`]: per-offer deposit lifecycle state machine
//! - [`WithdrawalRequest`]: pending/approved/rejected request state machine
//! - [`LedgerError`]: typed failures; nothing in this core panics
//!
//! ## Example
//!
//! ```
//! use escrow_ledger_rs::{Engine, OfferId, OwnerId};
//! use rust_decimal_macros::dec;
//!
//! let engine = Engine::new();
//!
//! // A business tops up, then an offer locks its security deposit.
//! engine.credit_wallet(OwnerId(1), dec!(50000)).unwrap();
//! let summary = engine
//!     .open_offer_escrow(OwnerId(1), OfferId(1), dec!(20000))
//!     .map(|_| engine.wallet_summary(OwnerId(1)).unwrap())
//!     .unwrap();
//!
//! assert_eq!(summary.locked, dec!(20000));
//! assert_eq!(summary.available, dec!(30000));
//! ```
//!
//! ## Thread Safety
//!
//! Wallets are mutated through a compare-and-swap commit loop, so concurrent
//! operations against the same wallet serialize while different owners never
//! contend. Every balance write and its ledger entry commit together.

pub mod engine;
pub mod error;
pub mod escrow;
pub mod journal;
pub mod settlement;
pub mod wallet;
pub mod withdrawal;

mod base;
mod transaction;

pub use base::{AdminId, BookingId, OfferId, OwnerId, RequestId, TransactionId};
pub use engine::{Engine, LedgerConfig};
pub use error::LedgerError;
pub use escrow::{EscrowState, OfferEscrow};
pub use journal::{Journal, Page};
pub use settlement::{Booking, PayoutMode, PayoutRecord, PayoutStatus};
pub use transaction::{Reference, Transaction, TransactionKind, TransactionStatus};
pub use wallet::{Balances, Wallet, WalletSummary};
pub use withdrawal::{BankDetails, WithdrawalRequest, WithdrawalStatus};
