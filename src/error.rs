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

//! Error types for ledger and escrow operations.

use thiserror::Error;

/// Ledger and escrow operation errors.
///
/// Every failure is returned to the caller as a typed result; nothing in this
/// core is fatal to the process. Validation errors are raised before any
/// mutation, balance errors leave the wallet untouched, and the idempotency
/// guards reject without side effects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Offer deposit is below the configured minimum
    #[error("deposit below the minimum per offer")]
    DepositBelowMinimum,

    /// Bank details are missing or incomplete
    #[error("missing or incomplete bank details")]
    MissingBankDetails,

    /// Rejecting a withdrawal request requires a reason
    #[error("rejection reason is required")]
    MissingRejectionReason,

    /// Lock would exceed the available balance
    #[error("insufficient available balance")]
    InsufficientAvailableBalance,

    /// Unlock or debit would exceed the locked balance
    #[error("insufficient locked balance")]
    InsufficientLockedBalance,

    /// No wallet exists for the owner
    #[error("wallet not found")]
    WalletNotFound,

    /// Wallet has been soft-archived and rejects mutations
    #[error("wallet is archived")]
    WalletArchived,

    /// No escrow record exists for the offer
    #[error("offer escrow not found")]
    OfferNotFound,

    /// An escrow record already exists for the offer
    #[error("offer escrow already exists")]
    DuplicateOffer,

    /// No booking is registered under the given ID
    #[error("booking not found")]
    BookingNotFound,

    /// A booking is already registered under the given ID
    #[error("booking already registered")]
    DuplicateBooking,

    /// No withdrawal request exists under the given ID
    #[error("withdrawal request not found")]
    RequestNotFound,

    /// Caller does not own the referenced record
    #[error("caller does not own this record")]
    OwnerMismatch,

    /// Booking already has a successful settlement
    #[error("booking is already settled")]
    AlreadySettled,

    /// Booking content has not been accepted yet
    #[error("booking content has not been accepted")]
    ContentNotAccepted,

    /// Offer already has an open withdrawal request
    #[error("offer already has an open withdrawal request")]
    DuplicateWithdrawalRequest,

    /// Offer deposit has not matured into withdrawal eligibility
    #[error("offer is not eligible for withdrawal")]
    NotEligibleForWithdrawal,

    /// Offer escrow has already been released
    #[error("offer escrow already released")]
    EscrowReleased,

    /// Withdrawal request is no longer pending
    #[error("withdrawal request is not pending")]
    RequestNotPending,

    /// Escrow cannot cover the settlement amount (data-integrity anomaly)
    #[error("escrow cannot cover the settlement amount")]
    EscrowInsufficient,

    /// Optimistic commit retries exhausted under contention
    #[error("transient storage conflict, retry the operation")]
    TransientFailure,
}
