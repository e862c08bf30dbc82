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

//! Immutable ledger entries.
//!
//! A [`Transaction`] records exactly one balance mutation, with the full
//! three-balance snapshot before and after for audit and reconciliation.
//! Entries are created inside the same atomic commit as the balance write
//! they describe and are never mutated afterwards.

use crate::base::{BookingId, OfferId, OwnerId, RequestId, TransactionId};
use crate::wallet::Balances;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of balance mutation a ledger entry records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Top-up confirmed by the payment gateway; raises total and available.
    Credit,
    /// Settlement payout; lowers total and locked.
    Debit,
    /// Escrow deposit taken at offer creation; available to locked.
    Lock,
    /// Deposit returned on operator-driven escrow expiry; locked to available.
    Unlock,
    /// Deposit returned on owner-driven offer cancellation; locked to available.
    Refund,
    /// Approved withdrawal paid out to the business; lowers total and locked.
    Withdrawal,
}

/// Settlement state of a ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// What a ledger entry was recorded against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Reference {
    /// Escrow lifecycle of a specific offer.
    Offer(OfferId),
    /// External wallet top-up; the gateway reference lives outside this core.
    Recharge,
    /// A withdrawal request being paid out.
    Withdrawal(RequestId),
    /// A creator settlement for a booking.
    Settlement(BookingId),
}

/// Immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub owner_id: OwnerId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub balance_before: Balances,
    pub balance_after: Balances,
    pub reference: Reference,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a completed entry for a mutation that just committed.
    pub(crate) fn completed(
        owner_id: OwnerId,
        kind: TransactionKind,
        amount: Decimal,
        balance_before: Balances,
        balance_after: Balances,
        reference: Reference,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            owner_id,
            kind,
            amount,
            status: TransactionStatus::Completed,
            balance_before,
            balance_after,
            reference,
            created_at: Utc::now(),
        }
    }
}
