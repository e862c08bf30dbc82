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

//! Booking registry and settlement outcomes.
//!
//! The booking workflow itself (matching, delivery, moderation) lives outside
//! this core; the external flow registers a booking's offer linkage and flags
//! content acceptance, and the settlement manager records at most one paid
//! payout per booking.

use crate::base::{BookingId, OfferId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a creator payout leaves the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMode {
    BankTransfer,
    Upi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Paid,
}

/// Settlement outcome attached to a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub amount: Decimal,
    pub mode: PayoutMode,
    pub status: PayoutStatus,
    pub settled_at: Option<DateTime<Utc>>,
}

impl PayoutRecord {
    pub(crate) fn paid(amount: Decimal, mode: PayoutMode) -> Self {
        Self {
            amount,
            mode,
            status: PayoutStatus::Paid,
            settled_at: Some(Utc::now()),
        }
    }
}

/// Minimal booking view this core needs for settlement preconditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: BookingId,
    pub offer_id: OfferId,
    /// Set by the external moderation flow once the creator's content is
    /// accepted; settlement is refused until then.
    pub content_accepted: bool,
    pub payout: Option<PayoutRecord>,
}

impl Booking {
    pub(crate) fn new(booking_id: BookingId, offer_id: OfferId) -> Self {
        Self {
            booking_id,
            offer_id,
            content_accepted: false,
            payout: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(
            self.payout,
            Some(PayoutRecord {
                status: PayoutStatus::Paid,
                ..
            })
        )
    }
}
