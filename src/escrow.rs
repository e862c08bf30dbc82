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

//! Per-offer escrow records.
//!
//! Implemented state machine:
//!
//! ```text
//!  Locked ──maturity sweep──► EligibleForWithdrawal ──request──► WithdrawalPending
//!
//!  Locked | EligibleForWithdrawal ──settle to zero / close──► Released
//!  WithdrawalPending ──cancel / reject──► EligibleForWithdrawal
//!  WithdrawalPending ──approve pays out──► Released
//! ```
//!
//! "No escrow" is represented by absence from the engine's registry, so an
//! escrow value always describes a deposit that was actually locked.

use crate::base::{OfferId, OwnerId, RequestId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an offer's deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EscrowState {
    /// Deposit held, maturity window still running.
    Locked { eligible_at: DateTime<Utc> },
    /// Maturity elapsed with the deposit unconsumed; a withdrawal request
    /// may be opened.
    EligibleForWithdrawal,
    /// Exactly one open withdrawal request claims the deposit.
    WithdrawalPending { request_id: RequestId },
    /// Deposit fully consumed or returned. Terminal.
    Released,
}

/// Escrow record for a single offer's security deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferEscrow {
    pub offer_id: OfferId,
    pub owner_id: OwnerId,
    locked_amount: Decimal,
    state: EscrowState,
    pub opened_at: DateTime<Utc>,
}

impl OfferEscrow {
    pub(crate) fn open(
        offer_id: OfferId,
        owner_id: OwnerId,
        deposit: Decimal,
        opened_at: DateTime<Utc>,
        eligible_at: DateTime<Utc>,
    ) -> Self {
        Self {
            offer_id,
            owner_id,
            locked_amount: deposit,
            state: EscrowState::Locked { eligible_at },
            opened_at,
        }
    }

    /// Deposit still tracked against this offer.
    pub fn locked_amount(&self) -> Decimal {
        self.locked_amount
    }

    pub fn state(&self) -> EscrowState {
        self.state
    }

    /// Maturity sweep transition. Returns true if the escrow flipped to
    /// eligible; running it again on the same escrow is a no-op. The state
    /// is re-checked here, under the caller's entry lock, so the sweep never
    /// overwrites a withdrawal request that landed after its scan.
    pub(crate) fn mark_eligible(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            EscrowState::Locked { eligible_at }
                if eligible_at <= now && self.locked_amount > Decimal::ZERO =>
            {
                self.state = EscrowState::EligibleForWithdrawal;
                true
            }
            _ => false,
        }
    }

    /// Claims the deposit for a new withdrawal request. Returns the amount
    /// the request is for.
    pub(crate) fn begin_withdrawal(&mut self, request_id: RequestId) -> Result<Decimal, LedgerError> {
        match self.state {
            EscrowState::EligibleForWithdrawal => {
                self.state = EscrowState::WithdrawalPending { request_id };
                Ok(self.locked_amount)
            }
            EscrowState::WithdrawalPending { .. } => Err(LedgerError::DuplicateWithdrawalRequest),
            EscrowState::Locked { .. } => Err(LedgerError::NotEligibleForWithdrawal),
            EscrowState::Released => Err(LedgerError::EscrowReleased),
        }
    }

    /// Releases the claim after a cancelled or rejected request. The deposit
    /// stays locked in the wallet and becomes requestable again.
    pub(crate) fn clear_withdrawal(&mut self, request_id: RequestId) -> Result<(), LedgerError> {
        match self.state {
            EscrowState::WithdrawalPending { request_id: claimed } if claimed == request_id => {
                self.state = EscrowState::EligibleForWithdrawal;
                Ok(())
            }
            _ => Err(LedgerError::RequestNotPending),
        }
    }

    /// Checks that a settlement of `amount` can be taken from this escrow.
    /// Called before any side effect; the actual decrement happens in
    /// [`Self::settle`] after the wallet debit commits.
    pub(crate) fn check_settlement(&self, amount: Decimal) -> Result<(), LedgerError> {
        match self.state {
            EscrowState::Released => Err(LedgerError::EscrowReleased),
            // An open request has claimed the deposit; it must be resolved
            // before the funds can settle.
            EscrowState::WithdrawalPending { .. } => Err(LedgerError::DuplicateWithdrawalRequest),
            EscrowState::Locked { .. } | EscrowState::EligibleForWithdrawal => {
                if self.locked_amount < amount {
                    Err(LedgerError::EscrowInsufficient)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Decrements the tracked deposit after a successful settlement debit.
    /// At zero the escrow is released and no longer withdrawable.
    pub(crate) fn settle(&mut self, amount: Decimal) {
        debug_assert!(self.locked_amount >= amount);
        self.locked_amount -= amount;
        if self.locked_amount == Decimal::ZERO {
            self.state = EscrowState::Released;
        }
    }

    /// Pays out the full deposit for an approved withdrawal request.
    pub(crate) fn payout(&mut self, request_id: RequestId) -> Result<Decimal, LedgerError> {
        match self.state {
            EscrowState::WithdrawalPending { request_id: claimed } if claimed == request_id => {
                let amount = self.locked_amount;
                self.locked_amount = Decimal::ZERO;
                self.state = EscrowState::Released;
                Ok(amount)
            }
            _ => Err(LedgerError::RequestNotPending),
        }
    }

    /// Non-mutating close check: the remaining deposit this escrow would
    /// return. Validated before the unlock commits so a failed unlock leaves
    /// the escrow untouched.
    pub(crate) fn closable(&self) -> Result<Decimal, LedgerError> {
        match self.state {
            EscrowState::Released => Err(LedgerError::EscrowReleased),
            EscrowState::WithdrawalPending { .. } => Err(LedgerError::DuplicateWithdrawalRequest),
            EscrowState::Locked { .. } | EscrowState::EligibleForWithdrawal => Ok(self.locked_amount),
        }
    }

    /// Returns the remaining deposit and closes the escrow, for offers
    /// cancelled or expired without ever settling.
    pub(crate) fn close_remaining(&mut self) -> Result<Decimal, LedgerError> {
        match self.state {
            EscrowState::Released => Err(LedgerError::EscrowReleased),
            EscrowState::WithdrawalPending { .. } => Err(LedgerError::DuplicateWithdrawalRequest),
            EscrowState::Locked { .. } | EscrowState::EligibleForWithdrawal => {
                let remaining = self.locked_amount;
                self.locked_amount = Decimal::ZERO;
                self.state = EscrowState::Released;
                Ok(remaining)
            }
        }
    }
}
