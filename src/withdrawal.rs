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

//! Withdrawal requests.
//!
//! Implemented state machine:
//!
//! ```text
//!  Pending ──approve──► Approved (terminal)
//!     │
//!     ├──reject───► Rejected (terminal)
//!     │
//!     └──cancel───► (request deleted, not stored)
//! ```

use crate::base::{AdminId, OfferId, OwnerId, RequestId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Destination account for an approved withdrawal payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_holder: String,
    pub account_number: String,
    pub bank_name: String,
    pub routing_code: String,
}

impl BankDetails {
    /// All fields are required; the payout is executed manually outside the
    /// platform's books, so there is nothing to fall back on.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let complete = !self.account_holder.trim().is_empty()
            && !self.account_number.trim().is_empty()
            && !self.bank_name.trim().is_empty()
            && !self.routing_code.trim().is_empty();
        if complete {
            Ok(())
        } else {
            Err(LedgerError::MissingBankDetails)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A business's request to reclaim a matured offer deposit.
///
/// Retained as an audit record once resolved; only a pending request may be
/// cancelled, and cancellation deletes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: RequestId,
    pub owner_id: OwnerId,
    pub offer_id: OfferId,
    pub amount: Decimal,
    pub bank_details: BankDetails,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub processed_by: Option<AdminId>,
    pub processed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
}

impl WithdrawalRequest {
    pub(crate) fn new(
        owner_id: OwnerId,
        offer_id: OfferId,
        amount: Decimal,
        bank_details: BankDetails,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            owner_id,
            offer_id,
            amount,
            bank_details,
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
            processed_by: None,
            processed_at: None,
            admin_notes: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }

    pub(crate) fn approve(&mut self, admin_id: AdminId) -> Result<(), LedgerError> {
        if !self.is_pending() {
            return Err(LedgerError::RequestNotPending);
        }
        self.status = WithdrawalStatus::Approved;
        self.processed_by = Some(admin_id);
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    pub(crate) fn reject(&mut self, admin_id: AdminId, reason: &str) -> Result<(), LedgerError> {
        if reason.trim().is_empty() {
            return Err(LedgerError::MissingRejectionReason);
        }
        if !self.is_pending() {
            return Err(LedgerError::RequestNotPending);
        }
        self.status = WithdrawalStatus::Rejected;
        self.processed_by = Some(admin_id);
        self.processed_at = Some(Utc::now());
        self.admin_notes = Some(reason.trim().to_string());
        Ok(())
    }
}
