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

//! Ledger engine.
//!
//! The [`Engine`] is the single entry point for every balance mutation. The
//! escrow, settlement, and withdrawal flows never touch raw balances; they go
//! through the wallet commit path, which pairs each balance write with exactly
//! one journal entry.
//!
//! # Thread Safety
//!
//! Wallets, escrows, bookings, and requests live in [`DashMap`] registries, so
//! operations on different owners run in parallel. Cross-record operations
//! acquire entry locks in a fixed order — booking or request, then offer, then
//! wallet — keeping the lock graph acyclic.

use crate::base::{AdminId, BookingId, OfferId, OwnerId, RequestId, TransactionId};
use crate::error::LedgerError;
use crate::escrow::{EscrowState, OfferEscrow};
use crate::journal::{Journal, Page};
use crate::settlement::{Booking, PayoutMode, PayoutRecord};
use crate::transaction::{Reference, Transaction, TransactionKind};
use crate::wallet::{Wallet, WalletOp, WalletSummary};
use crate::withdrawal::{BankDetails, WithdrawalRequest};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error};

/// Platform-wide ledger parameters.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Smallest security deposit accepted per offer, in minor units.
    pub min_deposit_per_offer: Decimal,
    /// Waiting period before an unused deposit becomes withdrawable.
    pub maturity_window: Duration,
    /// Bound on internal commit retries before surfacing `TransientFailure`.
    pub max_commit_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_deposit_per_offer: Decimal::new(20_000, 0),
            maturity_window: Duration::days(30),
            max_commit_retries: 8,
        }
    }
}

/// Wallet ledger and escrow engine.
///
/// # Invariants
///
/// - For every wallet, `total == locked + available` and all three are >= 0.
/// - Every committed mutation has exactly one `Completed` journal entry,
///   written in the same atomic step as the balance change.
/// - An offer has at most one open withdrawal request; a booking has at most
///   one paid settlement.
pub struct Engine {
    config: LedgerConfig,
    /// Business wallets indexed by owner ID; created lazily, never removed.
    wallets: DashMap<OwnerId, Wallet>,
    /// Append-only ledger of every committed mutation.
    journal: Journal,
    offers: DashMap<OfferId, OfferEscrow>,
    bookings: DashMap<BookingId, Booking>,
    requests: DashMap<RequestId, WithdrawalRequest>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Engine {
            config,
            wallets: DashMap::new(),
            journal: Journal::new(),
            offers: DashMap::new(),
            bookings: DashMap::new(),
            requests: DashMap::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn summary(&self, owner_id: OwnerId, wallet: &Wallet) -> WalletSummary {
        let balances = wallet.balances();
        WalletSummary {
            owner_id,
            total: balances.total,
            locked: balances.locked,
            available: balances.available,
            min_deposit_per_offer: self.config.min_deposit_per_offer,
        }
    }

    // === Wallet service ===

    /// Credits a confirmed top-up. Creates the wallet on first use.
    pub fn credit_wallet(
        &self,
        owner_id: OwnerId,
        amount: Decimal,
    ) -> Result<WalletSummary, LedgerError> {
        let wallet = self
            .wallets
            .entry(owner_id)
            .or_insert_with(|| Wallet::new(owner_id));
        wallet.commit(
            WalletOp::Credit(amount),
            TransactionKind::Credit,
            Reference::Recharge,
            &self.journal,
            self.config.max_commit_retries,
        )?;

        debug!(%owner_id, %amount, "wallet credited");
        Ok(self.summary(owner_id, &wallet))
    }

    /// Current balances plus the platform's deposit floor.
    pub fn wallet_summary(&self, owner_id: OwnerId) -> Result<WalletSummary, LedgerError> {
        let wallet = self.wallets.get(&owner_id).ok_or(LedgerError::WalletNotFound)?;
        Ok(self.summary(owner_id, &wallet))
    }

    /// Soft-archives a wallet. Balances stay on the books for audit; all
    /// further mutations are rejected.
    pub fn archive_wallet(&self, owner_id: OwnerId) -> Result<(), LedgerError> {
        let wallet = self.wallets.get(&owner_id).ok_or(LedgerError::WalletNotFound)?;
        wallet.archive();
        Ok(())
    }

    /// One page of an owner's ledger entries, newest first.
    pub fn list_transactions(
        &self,
        owner_id: OwnerId,
        page: u32,
        page_size: u32,
    ) -> Page<Arc<Transaction>> {
        self.journal.list(owner_id, page, page_size)
    }

    pub fn get_transaction(&self, id: &TransactionId) -> Option<Arc<Transaction>> {
        self.journal.get(id)
    }

    /// Iterator over all wallets, for reporting.
    pub fn wallets(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, OwnerId, Wallet>> {
        self.wallets.iter()
    }

    // === Offer escrow manager ===

    /// Locks the security deposit for a new offer.
    ///
    /// The lock and the escrow record are a single conceptual transaction:
    /// if the lock fails, no escrow record exists and offer creation must be
    /// aborted by the caller.
    pub fn open_offer_escrow(
        &self,
        owner_id: OwnerId,
        offer_id: OfferId,
        deposit: Decimal,
    ) -> Result<OfferEscrow, LedgerError> {
        if deposit < self.config.min_deposit_per_offer {
            return Err(LedgerError::DepositBelowMinimum);
        }

        // Entry API reserves the offer slot atomically; the deposit lock
        // happens with the slot held so a racing open of the same offer
        // cannot double-lock.
        match self.offers.entry(offer_id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateOffer),
            Entry::Vacant(slot) => {
                let wallet = self
                    .wallets
                    .entry(owner_id)
                    .or_insert_with(|| Wallet::new(owner_id));
                wallet.commit(
                    WalletOp::Lock(deposit),
                    TransactionKind::Lock,
                    Reference::Offer(offer_id),
                    &self.journal,
                    self.config.max_commit_retries,
                )?;
                drop(wallet);

                let now = Utc::now();
                let escrow = OfferEscrow::open(
                    offer_id,
                    owner_id,
                    deposit,
                    now,
                    now + self.config.maturity_window,
                );
                slot.insert(escrow.clone());

                debug!(%owner_id, %offer_id, %deposit, "offer escrow opened");
                Ok(escrow)
            }
        }
    }

    /// Flips every matured, unclaimed escrow to withdrawal-eligible.
    /// Idempotent and safe to run concurrently with settlements and
    /// withdrawal requests; each escrow re-checks its state under the entry
    /// lock at write time.
    pub fn sweep_matured_escrows(&self) -> usize {
        self.sweep_matured_escrows_at(Utc::now())
    }

    pub fn sweep_matured_escrows_at(&self, now: DateTime<Utc>) -> usize {
        let mut flipped = 0;
        for mut entry in self.offers.iter_mut() {
            if entry.value_mut().mark_eligible(now) {
                debug!(offer_id = %entry.key(), "escrow matured into withdrawal eligibility");
                flipped += 1;
            }
        }
        flipped
    }

    /// Returns the unconsumed deposit when the owner abandons an offer that
    /// never settled. Ledger kind `Refund`.
    pub fn cancel_offer_escrow(
        &self,
        owner_id: OwnerId,
        offer_id: OfferId,
    ) -> Result<WalletSummary, LedgerError> {
        let mut escrow = self.offers.get_mut(&offer_id).ok_or(LedgerError::OfferNotFound)?;
        if escrow.owner_id != owner_id {
            return Err(LedgerError::OwnerMismatch);
        }
        self.close_escrow(&mut escrow, TransactionKind::Refund)?;
        drop(escrow);
        self.wallet_summary(owner_id)
    }

    /// Operator-driven variant of the same unlock path, for offers past
    /// their retention horizon. Ledger kind `Unlock`.
    pub fn expire_offer_escrow(&self, offer_id: OfferId) -> Result<WalletSummary, LedgerError> {
        let mut escrow = self.offers.get_mut(&offer_id).ok_or(LedgerError::OfferNotFound)?;
        let owner_id = escrow.owner_id;
        self.close_escrow(&mut escrow, TransactionKind::Unlock)?;
        drop(escrow);
        self.wallet_summary(owner_id)
    }

    /// Unlocks the remaining deposit and releases the escrow. The escrow is
    /// validated before the unlock commits, and the caller holds the offer
    /// entry exclusively, so the two writes cannot interleave with anything.
    fn close_escrow(
        &self,
        escrow: &mut OfferEscrow,
        kind: TransactionKind,
    ) -> Result<(), LedgerError> {
        let remaining = escrow.closable()?;
        let wallet = self
            .wallets
            .get(&escrow.owner_id)
            .ok_or(LedgerError::WalletNotFound)?;
        wallet.commit(
            WalletOp::Unlock(remaining),
            kind,
            Reference::Offer(escrow.offer_id),
            &self.journal,
            self.config.max_commit_retries,
        )?;
        escrow.close_remaining()?;

        debug!(owner_id = %escrow.owner_id, offer_id = %escrow.offer_id, %remaining,
               "escrow closed and deposit returned");
        Ok(())
    }

    pub fn offer_escrow(&self, offer_id: OfferId) -> Option<OfferEscrow> {
        self.offers.get(&offer_id).map(|escrow| escrow.clone())
    }

    // === Settlement manager ===

    /// Registers a booking's offer linkage. The booking workflow itself is
    /// external; this core only needs to know which escrow a settlement
    /// draws from.
    pub fn register_booking(
        &self,
        booking_id: BookingId,
        offer_id: OfferId,
    ) -> Result<(), LedgerError> {
        if !self.offers.contains_key(&offer_id) {
            return Err(LedgerError::OfferNotFound);
        }
        match self.bookings.entry(booking_id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateBooking),
            Entry::Vacant(slot) => {
                slot.insert(Booking::new(booking_id, offer_id));
                Ok(())
            }
        }
    }

    /// Flags a booking's content as accepted by the moderation flow.
    pub fn accept_content(&self, booking_id: BookingId) -> Result<(), LedgerError> {
        let mut booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or(LedgerError::BookingNotFound)?;
        booking.content_accepted = true;
        Ok(())
    }

    /// Pays a creator out of the offer's locked escrow.
    ///
    /// All preconditions are checked before any side effect; a second call
    /// against an already-paid booking returns [`LedgerError::AlreadySettled`]
    /// and never double-pays.
    pub fn record_settlement(
        &self,
        booking_id: BookingId,
        amount: Decimal,
        mode: PayoutMode,
    ) -> Result<PayoutRecord, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        // Lock order: booking, then offer, then wallet.
        let mut booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or(LedgerError::BookingNotFound)?;
        if booking.is_settled() {
            return Err(LedgerError::AlreadySettled);
        }
        if !booking.content_accepted {
            return Err(LedgerError::ContentNotAccepted);
        }

        let mut escrow = self
            .offers
            .get_mut(&booking.offer_id)
            .ok_or(LedgerError::OfferNotFound)?;
        if let Err(err) = escrow.check_settlement(amount) {
            if err == LedgerError::EscrowInsufficient {
                error!(%booking_id, offer_id = %escrow.offer_id, %amount,
                       tracked = %escrow.locked_amount(),
                       "settlement exceeds tracked escrow");
            }
            return Err(err);
        }

        let wallet = self
            .wallets
            .get(&escrow.owner_id)
            .ok_or(LedgerError::WalletNotFound)?;
        wallet
            .commit(
                WalletOp::Debit(amount),
                TransactionKind::Debit,
                Reference::Settlement(booking_id),
                &self.journal,
                self.config.max_commit_retries,
            )
            .map_err(|err| match err {
                // The escrow check passed, so the wallet's locked balance
                // no longer covers its own escrow records.
                LedgerError::InsufficientLockedBalance => {
                    error!(%booking_id, owner_id = %escrow.owner_id, %amount,
                           "locked balance below tracked escrow during settlement");
                    LedgerError::EscrowInsufficient
                }
                other => other,
            })?;

        escrow.settle(amount);
        let record = PayoutRecord::paid(amount, mode);
        booking.payout = Some(record.clone());

        debug!(%booking_id, %amount, "settlement recorded");
        Ok(record)
    }

    pub fn booking(&self, booking_id: BookingId) -> Option<Booking> {
        self.bookings.get(&booking_id).map(|booking| booking.clone())
    }

    // === Withdrawal request manager ===

    /// Opens a withdrawal request against a matured offer deposit. The offer
    /// can carry at most one open request; the escrow claim enforces that.
    pub fn request_withdrawal(
        &self,
        owner_id: OwnerId,
        offer_id: OfferId,
        bank_details: BankDetails,
    ) -> Result<WithdrawalRequest, LedgerError> {
        bank_details.validate()?;

        let request = {
            let mut escrow = self.offers.get_mut(&offer_id).ok_or(LedgerError::OfferNotFound)?;
            if escrow.owner_id != owner_id {
                return Err(LedgerError::OwnerMismatch);
            }

            let mut request =
                WithdrawalRequest::new(owner_id, offer_id, Decimal::ZERO, bank_details);
            request.amount = escrow.begin_withdrawal(request.id)?;
            request
        };

        // The request ID is unpublished until this insert, so nothing can
        // race the escrow claim above.
        let snapshot = request.clone();
        self.requests.insert(request.id, request);

        debug!(%owner_id, %offer_id, request_id = %snapshot.id, amount = %snapshot.amount,
               "withdrawal requested");
        Ok(snapshot)
    }

    /// Deletes a pending request at its owner's instruction and makes the
    /// deposit requestable again.
    pub fn cancel_withdrawal(
        &self,
        request_id: RequestId,
        owner_id: OwnerId,
    ) -> Result<(), LedgerError> {
        {
            let request = self
                .requests
                .get_mut(&request_id)
                .ok_or(LedgerError::RequestNotFound)?;
            if request.owner_id != owner_id {
                return Err(LedgerError::OwnerMismatch);
            }
            if !request.is_pending() {
                return Err(LedgerError::RequestNotPending);
            }

            let mut escrow = self
                .offers
                .get_mut(&request.offer_id)
                .ok_or(LedgerError::OfferNotFound)?;
            escrow.clear_withdrawal(request_id)?;
        }

        // Cancelled requests are removed outright, not kept as audit records.
        self.requests.remove(&request_id);
        debug!(%owner_id, %request_id, "withdrawal request cancelled");
        Ok(())
    }

    /// Approves a pending request: the locked deposit leaves the platform's
    /// books entirely, since the payout happens externally.
    pub fn approve_withdrawal(
        &self,
        request_id: RequestId,
        admin_id: AdminId,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let mut request = self
            .requests
            .get_mut(&request_id)
            .ok_or(LedgerError::RequestNotFound)?;
        if !request.is_pending() {
            return Err(LedgerError::RequestNotPending);
        }

        let mut escrow = self
            .offers
            .get_mut(&request.offer_id)
            .ok_or(LedgerError::OfferNotFound)?;
        // Peek the claim before any side effect; the entry lock keeps the
        // escrow stable through the debit below.
        match escrow.state() {
            EscrowState::WithdrawalPending { request_id: claimed } if claimed == request_id => {}
            _ => return Err(LedgerError::RequestNotPending),
        }

        let wallet = self
            .wallets
            .get(&request.owner_id)
            .ok_or(LedgerError::WalletNotFound)?;
        wallet.commit(
            WalletOp::Debit(request.amount),
            TransactionKind::Withdrawal,
            Reference::Withdrawal(request_id),
            &self.journal,
            self.config.max_commit_retries,
        )?;

        escrow.payout(request_id)?;
        request.approve(admin_id)?;

        debug!(%request_id, %admin_id, amount = %request.amount, "withdrawal approved");
        Ok(request.clone())
    }

    /// Rejects a pending request. No funds move; the deposit stays locked
    /// and becomes requestable again.
    pub fn reject_withdrawal(
        &self,
        request_id: RequestId,
        admin_id: AdminId,
        reason: &str,
    ) -> Result<WithdrawalRequest, LedgerError> {
        if reason.trim().is_empty() {
            return Err(LedgerError::MissingRejectionReason);
        }

        let mut request = self
            .requests
            .get_mut(&request_id)
            .ok_or(LedgerError::RequestNotFound)?;
        if !request.is_pending() {
            return Err(LedgerError::RequestNotPending);
        }

        let mut escrow = self
            .offers
            .get_mut(&request.offer_id)
            .ok_or(LedgerError::OfferNotFound)?;
        escrow.clear_withdrawal(request_id)?;
        request.reject(admin_id, reason)?;

        debug!(%request_id, %admin_id, "withdrawal rejected");
        Ok(request.clone())
    }

    pub fn withdrawal_request(&self, request_id: RequestId) -> Option<WithdrawalRequest> {
        self.requests.get(&request_id).map(|request| request.clone())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
