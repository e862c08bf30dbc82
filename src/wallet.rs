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

//! Wallet balance management.
//!
//! A wallet tracks three balances for one business owner, with the invariant
//! `total == locked + available` and all three non-negative. Every mutation is
//! a single atomic read-validate-commit against the wallet, guarded by a
//! compare-and-swap on a revision counter, and writes exactly one ledger entry
//! inside the winning commit's critical section.
//!
//! # Example
//!
//! ```
//! use escrow_ledger_rs::{OwnerId, Wallet};
//! use rust_decimal_macros::dec;
//!
//! let wallet = Wallet::new(OwnerId(1));
//! assert_eq!(wallet.balances().available, dec!(0));
//! ```

use crate::base::OwnerId;
use crate::error::LedgerError;
use crate::journal::Journal;
use crate::transaction::{Reference, Transaction, TransactionKind};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Snapshot of a wallet's three balances, in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub total: Decimal,
    pub locked: Decimal,
    pub available: Decimal,
}

impl Balances {
    pub fn zero() -> Self {
        Self {
            total: Decimal::ZERO,
            locked: Decimal::ZERO,
            available: Decimal::ZERO,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.total == self.locked + self.available,
            "Invariant violated: total {} != locked {} + available {}",
            self.total,
            self.locked,
            self.available
        );
        debug_assert!(
            self.available >= Decimal::ZERO,
            "Invariant violated: available balance went negative: {}",
            self.available
        );
        debug_assert!(
            self.locked >= Decimal::ZERO,
            "Invariant violated: locked balance went negative: {}",
            self.locked
        );
    }
}

/// A single balance mutation, validated against a snapshot before commit.
///
/// `Lock`/`Unlock` are zero-sum transfers between available and locked;
/// only `Credit` and `Debit` change the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WalletOp {
    Credit(Decimal),
    Lock(Decimal),
    Unlock(Decimal),
    Debit(Decimal),
}

impl WalletOp {
    fn amount(&self) -> Decimal {
        match self {
            Self::Credit(amount) | Self::Lock(amount) | Self::Unlock(amount) | Self::Debit(amount) => {
                *amount
            }
        }
    }

    /// Validates against the snapshot and returns the resulting balances.
    /// No side effects; the caller commits the result atomically.
    fn evaluate(&self, before: Balances) -> Result<Balances, LedgerError> {
        let amount = self.amount();
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        let after = match self {
            Self::Credit(_) => Balances {
                total: before.total + amount,
                locked: before.locked,
                available: before.available + amount,
            },
            Self::Lock(_) => {
                if before.available < amount {
                    return Err(LedgerError::InsufficientAvailableBalance);
                }
                Balances {
                    total: before.total,
                    locked: before.locked + amount,
                    available: before.available - amount,
                }
            }
            Self::Unlock(_) => {
                if before.locked < amount {
                    return Err(LedgerError::InsufficientLockedBalance);
                }
                Balances {
                    total: before.total,
                    locked: before.locked - amount,
                    available: before.available + amount,
                }
            }
            Self::Debit(_) => {
                // Debits only ever draw from locked funds (settlements and
                // approved withdrawals), so the locked check implies the
                // total check.
                if before.locked < amount {
                    return Err(LedgerError::InsufficientLockedBalance);
                }
                Balances {
                    total: before.total - amount,
                    locked: before.locked - amount,
                    available: before.available,
                }
            }
        };

        after.assert_invariants();
        Ok(after)
    }
}

#[derive(Debug)]
struct WalletData {
    owner_id: OwnerId,
    balances: Balances,
    /// Bumped on every committed mutation; the commit loop CAS-checks it.
    revision: u64,
    archived: bool,
}

/// Per-owner wallet with serialized mutations.
#[derive(Debug)]
pub struct Wallet {
    inner: RwLock<WalletData>,
}

impl Wallet {
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            inner: RwLock::new(WalletData {
                owner_id,
                balances: Balances::zero(),
                revision: 0,
                archived: false,
            }),
        }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.inner.read().owner_id
    }

    pub fn balances(&self) -> Balances {
        self.inner.read().balances
    }

    pub fn archived(&self) -> bool {
        self.inner.read().archived
    }

    /// Soft-archive: the wallet stays on the books but rejects mutations.
    pub(crate) fn archive(&self) {
        self.inner.write().archived = true;
    }

    /// Atomically applies `op` and appends the matching ledger entry.
    ///
    /// The snapshot is read and validated without holding the write lock;
    /// the commit then re-checks the revision under the write lock and
    /// retries from a fresh snapshot if another mutation won the race.
    /// The journal append happens inside the winning critical section, so
    /// a balance change and its ledger entry are indivisible.
    ///
    /// # Errors
    ///
    /// - Validation and balance errors from [`WalletOp::evaluate`], with no
    ///   mutation applied.
    /// - [`LedgerError::WalletArchived`] for any op on an archived wallet.
    /// - [`LedgerError::TransientFailure`] when `max_retries` commit attempts
    ///   all lost the revision race.
    pub(crate) fn commit(
        &self,
        op: WalletOp,
        kind: TransactionKind,
        reference: Reference,
        journal: &Journal,
        max_retries: u32,
    ) -> Result<Arc<Transaction>, LedgerError> {
        for _ in 0..max_retries.max(1) {
            let (seen_revision, before, owner_id) = {
                let data = self.inner.read();
                if data.archived {
                    return Err(LedgerError::WalletArchived);
                }
                (data.revision, data.balances, data.owner_id)
            };

            let after = op.evaluate(before)?;

            let mut data = self.inner.write();
            if data.revision != seen_revision {
                // Lost the race; re-validate against the new snapshot.
                continue;
            }
            data.balances = after;
            data.revision += 1;

            let entry = Transaction::completed(owner_id, kind, op.amount(), before, after, reference);
            return Ok(journal.append(entry));
        }

        Err(LedgerError::TransientFailure)
    }
}

impl Serialize for Wallet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.read();
        let mut state = serializer.serialize_struct("Wallet", 5)?;
        state.serialize_field("owner", &data.owner_id)?;
        state.serialize_field("total", &data.balances.total)?;
        state.serialize_field("locked", &data.balances.locked)?;
        state.serialize_field("available", &data.balances.available)?;
        state.serialize_field("archived", &data.archived)?;
        state.end()
    }
}

/// Wallet snapshot returned to callers, with the platform's deposit floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub owner_id: OwnerId,
    pub total: Decimal,
    pub locked: Decimal,
    pub available: Decimal,
    pub min_deposit_per_offer: Decimal,
}
