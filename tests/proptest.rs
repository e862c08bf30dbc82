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

//! Property-based tests for the escrow ledger engine.
//!
//! These tests verify invariants that should hold for any sequence of
//! valid operations.

use chrono::{Duration, Utc};
use escrow_ledger_rs::{
    BankDetails, BookingId, AdminId, Engine, LedgerConfig, LedgerError, OfferId, OwnerId,
    PayoutMode, TransactionKind,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

const OWNER: OwnerId = OwnerId(1);

fn test_config() -> LedgerConfig {
    LedgerConfig {
        min_deposit_per_offer: Decimal::ONE,
        maturity_window: Duration::zero(),
        ..LedgerConfig::default()
    }
}

fn bank_details() -> BankDetails {
    BankDetails {
        account_holder: "Holder".into(),
        account_number: "000111222".into(),
        bank_name: "Bank".into(),
        routing_code: "RC001".into(),
    }
}

fn check_invariants(engine: &Engine, owner: OwnerId) {
    let summary = engine.wallet_summary(owner).unwrap();
    assert_eq!(summary.total, summary.locked + summary.available);
    assert!(summary.total >= Decimal::ZERO);
    assert!(summary.locked >= Decimal::ZERO);
    assert!(summary.available >= Decimal::ZERO);
}

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate a positive amount (whole minor units, 1 to 1,000,000).
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000i64).prop_map(Decimal::from)
}

/// A random wallet operation to replay against the engine.
#[derive(Debug, Clone)]
enum Op {
    Credit(Decimal),
    OpenEscrow(Decimal),
    CancelEscrow(usize),
    Settle(usize, Decimal),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_amount().prop_map(Op::Credit),
        arb_amount().prop_map(Op::OpenEscrow),
        (0usize..16).prop_map(Op::CancelEscrow),
        ((0usize..16), arb_amount()).prop_map(|(i, amount)| Op::Settle(i, amount)),
    ]
}

// =============================================================================
// Wallet Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Total balance always equals locked + available.
    #[test]
    fn total_equals_locked_plus_available(
        credits in prop::collection::vec(arb_amount(), 1..10),
    ) {
        let engine = Engine::with_config(test_config());
        for amount in &credits {
            engine.credit_wallet(OWNER, *amount).unwrap();
        }
        check_invariants(&engine, OWNER);
    }

    /// Sum of credits equals total balance when nothing is spent.
    #[test]
    fn credits_sum_to_total(
        credits in prop::collection::vec(arb_amount(), 1..20),
    ) {
        let engine = Engine::with_config(test_config());
        let expected: Decimal = credits.iter().copied().sum();

        for amount in &credits {
            engine.credit_wallet(OWNER, *amount).unwrap();
        }

        let summary = engine.wallet_summary(OWNER).unwrap();
        prop_assert_eq!(summary.total, expected);
        prop_assert_eq!(summary.available, expected);
        prop_assert_eq!(summary.locked, Decimal::ZERO);
    }

    /// Balances never go negative under any replayed op sequence, and the
    /// three-balance identity survives every step.
    #[test]
    fn random_ops_preserve_invariants(
        ops in prop::collection::vec(arb_op(), 1..40),
    ) {
        let engine = Engine::with_config(test_config());
        engine.credit_wallet(OWNER, Decimal::from(1_000_000)).unwrap();

        let mut next_offer = 0u64;
        let mut next_booking = 0u64;
        let mut offers: Vec<OfferId> = Vec::new();

        for op in &ops {
            match op {
                Op::Credit(amount) => {
                    engine.credit_wallet(OWNER, *amount).unwrap();
                }
                Op::OpenEscrow(deposit) => {
                    next_offer += 1;
                    let offer = OfferId(next_offer);
                    if engine.open_offer_escrow(OWNER, offer, *deposit).is_ok() {
                        offers.push(offer);
                    }
                }
                Op::CancelEscrow(i) => {
                    if let Some(offer) = offers.get(i % offers.len().max(1)).copied() {
                        // May already be released, that's ok.
                        let _ = engine.cancel_offer_escrow(OWNER, offer);
                    }
                }
                Op::Settle(i, amount) => {
                    if let Some(offer) = offers.get(i % offers.len().max(1)).copied() {
                        next_booking += 1;
                        let booking = BookingId(next_booking);
                        if engine.register_booking(booking, offer).is_ok() {
                            engine.accept_content(booking).unwrap();
                            let _ = engine.record_settlement(booking, *amount, PayoutMode::Upi);
                        }
                    }
                }
            }
            check_invariants(&engine, OWNER);
        }
    }

    /// Failed escrow opens change nothing.
    #[test]
    fn failed_lock_changes_nothing(
        credit in arb_amount(),
        extra in arb_amount(),
    ) {
        let engine = Engine::with_config(test_config());
        engine.credit_wallet(OWNER, credit).unwrap();

        let result = engine.open_offer_escrow(OWNER, OfferId(1), credit + extra);
        prop_assert_eq!(result.unwrap_err(), LedgerError::InsufficientAvailableBalance);

        let summary = engine.wallet_summary(OWNER).unwrap();
        prop_assert_eq!(summary.available, credit);
        prop_assert_eq!(summary.locked, Decimal::ZERO);
        prop_assert!(engine.offer_escrow(OfferId(1)).is_none());
    }
}

// =============================================================================
// Escrow Conservation Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Locking moves funds from available to locked, preserving total.
    #[test]
    fn lock_preserves_total(
        deposit in arb_amount(),
        headroom in arb_amount(),
    ) {
        let engine = Engine::with_config(test_config());
        engine.credit_wallet(OWNER, deposit + headroom).unwrap();

        engine.open_offer_escrow(OWNER, OfferId(1), deposit).unwrap();

        let summary = engine.wallet_summary(OWNER).unwrap();
        prop_assert_eq!(summary.total, deposit + headroom);
        prop_assert_eq!(summary.locked, deposit);
        prop_assert_eq!(summary.available, headroom);
    }

    /// Cancelling an escrow restores the exact pre-lock balances.
    #[test]
    fn cancel_restores_balances(
        deposit in arb_amount(),
        headroom in arb_amount(),
    ) {
        let engine = Engine::with_config(test_config());
        engine.credit_wallet(OWNER, deposit + headroom).unwrap();
        engine.open_offer_escrow(OWNER, OfferId(1), deposit).unwrap();

        engine.cancel_offer_escrow(OWNER, OfferId(1)).unwrap();

        let summary = engine.wallet_summary(OWNER).unwrap();
        prop_assert_eq!(summary.total, deposit + headroom);
        prop_assert_eq!(summary.locked, Decimal::ZERO);
        prop_assert_eq!(summary.available, deposit + headroom);
    }

    /// Settlement removes exactly the paid amount from both total and locked.
    #[test]
    fn settlement_conserves_value(
        deposit in (2i64..=1_000_000i64).prop_map(Decimal::from),
        fraction in 0.01f64..=1.0,
    ) {
        let engine = Engine::with_config(test_config());
        engine.credit_wallet(OWNER, deposit).unwrap();
        engine.open_offer_escrow(OWNER, OfferId(1), deposit).unwrap();
        engine.register_booking(BookingId(1), OfferId(1)).unwrap();
        engine.accept_content(BookingId(1)).unwrap();

        let paid = (deposit * Decimal::try_from(fraction).unwrap()).round_dp(0);
        prop_assume!(paid > Decimal::ZERO && paid <= deposit);

        engine.record_settlement(BookingId(1), paid, PayoutMode::BankTransfer).unwrap();

        let summary = engine.wallet_summary(OWNER).unwrap();
        prop_assert_eq!(summary.total, deposit - paid);
        prop_assert_eq!(summary.locked, deposit - paid);
        prop_assert_eq!(summary.available, Decimal::ZERO);

        let escrow = engine.offer_escrow(OfferId(1)).unwrap();
        prop_assert_eq!(escrow.locked_amount(), deposit - paid);
    }

    /// Approved withdrawals pay out exactly the remaining escrow amount.
    #[test]
    fn approval_pays_remaining_escrow(
        deposit in arb_amount(),
    ) {
        let engine = Engine::with_config(test_config());
        engine.credit_wallet(OWNER, deposit).unwrap();
        engine.open_offer_escrow(OWNER, OfferId(1), deposit).unwrap();
        engine.sweep_matured_escrows_at(Utc::now() + Duration::seconds(1));

        let request = engine.request_withdrawal(OWNER, OfferId(1), bank_details()).unwrap();
        prop_assert_eq!(request.amount, deposit);

        let approved = engine.approve_withdrawal(request.id, AdminId(1)).unwrap();
        prop_assert_eq!(approved.amount, deposit);

        let summary = engine.wallet_summary(OWNER).unwrap();
        prop_assert_eq!(summary.total, Decimal::ZERO);
    }
}

// =============================================================================
// Ledger Trail Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every committed mutation produces exactly one ledger entry, and the
    /// before/after snapshots chain across the owner's history.
    #[test]
    fn ledger_entries_chain(
        credits in prop::collection::vec(arb_amount(), 1..10),
    ) {
        let engine = Engine::with_config(test_config());
        for amount in &credits {
            engine.credit_wallet(OWNER, *amount).unwrap();
        }

        let page = engine.list_transactions(OWNER, 1, 100);
        prop_assert_eq!(page.total, credits.len());

        let mut items = page.items.clone();
        items.reverse(); // oldest first
        for window in items.windows(2) {
            prop_assert_eq!(window[0].balance_after, window[1].balance_before);
        }
    }

    /// Replaying the ledger reproduces the wallet's final balances.
    #[test]
    fn ledger_replay_matches_balances(
        credits in prop::collection::vec(arb_amount(), 1..8),
        deposit_idx in 0usize..8,
    ) {
        let engine = Engine::with_config(test_config());
        for amount in &credits {
            engine.credit_wallet(OWNER, *amount).unwrap();
        }

        // Lock one of the credited amounts as an escrow deposit.
        let deposit = credits[deposit_idx % credits.len()];
        engine.open_offer_escrow(OWNER, OfferId(1), deposit).unwrap();

        let mut total = Decimal::ZERO;
        let mut locked = Decimal::ZERO;
        let page = engine.list_transactions(OWNER, 1, 100);
        for tx in page.items.iter().rev() {
            match tx.kind {
                TransactionKind::Credit => total += tx.amount,
                TransactionKind::Lock => locked += tx.amount,
                TransactionKind::Unlock | TransactionKind::Refund => locked -= tx.amount,
                TransactionKind::Debit | TransactionKind::Withdrawal => {
                    total -= tx.amount;
                    locked -= tx.amount;
                }
            }
        }

        let summary = engine.wallet_summary(OWNER).unwrap();
        prop_assert_eq!(summary.total, total);
        prop_assert_eq!(summary.locked, locked);
    }
}

// =============================================================================
// Multi-Owner Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Different owners are fully isolated.
    #[test]
    fn owners_are_isolated(
        amount1 in arb_amount(),
        amount2 in arb_amount(),
    ) {
        let engine = Engine::with_config(test_config());
        engine.credit_wallet(OwnerId(1), amount1).unwrap();
        engine.credit_wallet(OwnerId(2), amount2).unwrap();

        engine.open_offer_escrow(OwnerId(1), OfferId(1), amount1).unwrap();

        let summary1 = engine.wallet_summary(OwnerId(1)).unwrap();
        let summary2 = engine.wallet_summary(OwnerId(2)).unwrap();
        prop_assert_eq!(summary1.locked, amount1);
        prop_assert_eq!(summary2.locked, Decimal::ZERO);
        prop_assert_eq!(summary2.available, amount2);
    }

    /// Engine handles many operations without panicking.
    #[test]
    fn engine_handles_many_operations(
        op_count in 10usize..100,
    ) {
        let engine = Engine::with_config(test_config());

        for i in 0..op_count {
            let amount = Decimal::from((i as i64 + 1) * 100);
            engine.credit_wallet(OWNER, amount).unwrap();
        }

        let expected: Decimal = (1..=op_count as i64).map(|i| Decimal::from(i * 100)).sum();
        let summary = engine.wallet_summary(OWNER).unwrap();
        prop_assert_eq!(summary.total, expected);
        prop_assert_eq!(engine.list_transactions(OWNER, 1, 1).total, op_count);
    }
}
