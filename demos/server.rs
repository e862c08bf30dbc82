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

//! REST demo server over the escrow ledger engine.
//!
//! ```bash
//! cargo run --example server
//!
//! # Credit a wallet
//! curl -X POST http://localhost:3000/wallets/1/credit \
//!   -H "Content-Type: application/json" \
//!   -d '{"amount": "50000"}'
//!
//! # Open an offer escrow
//! curl -X POST http://localhost:3000/offers \
//!   -H "Content-Type: application/json" \
//!   -d '{"owner_id": 1, "offer_id": 10, "deposit": "20000"}'
//!
//! # Wallet summary and ledger
//! curl http://localhost:3000/wallets/1
//! curl "http://localhost:3000/wallets/1/transactions?page=1&page_size=20"
//! ```

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use escrow_ledger_rs::{
    AdminId, BankDetails, BookingId, Engine, LedgerError, OfferId, OwnerId, PayoutMode, RequestId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OpenEscrowRequest {
    pub owner_id: u64,
    pub offer_id: u64,
    pub deposit: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SettlementRequest {
    pub booking_id: u64,
    pub amount: Decimal,
    pub mode: PayoutMode,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequestBody {
    pub owner_id: u64,
    pub offer_id: u64,
    pub bank_details: BankDetails,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub admin_id: u64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub owner_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            LedgerError::DepositBelowMinimum => (StatusCode::BAD_REQUEST, "DEPOSIT_BELOW_MINIMUM"),
            LedgerError::MissingBankDetails => (StatusCode::BAD_REQUEST, "MISSING_BANK_DETAILS"),
            LedgerError::MissingRejectionReason => {
                (StatusCode::BAD_REQUEST, "MISSING_REJECTION_REASON")
            }
            LedgerError::InsufficientAvailableBalance => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_AVAILABLE_BALANCE")
            }
            LedgerError::InsufficientLockedBalance => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_LOCKED_BALANCE")
            }
            LedgerError::WalletNotFound => (StatusCode::NOT_FOUND, "WALLET_NOT_FOUND"),
            LedgerError::WalletArchived => (StatusCode::FORBIDDEN, "WALLET_ARCHIVED"),
            LedgerError::OfferNotFound => (StatusCode::NOT_FOUND, "OFFER_NOT_FOUND"),
            LedgerError::DuplicateOffer => (StatusCode::CONFLICT, "DUPLICATE_OFFER"),
            LedgerError::BookingNotFound => (StatusCode::NOT_FOUND, "BOOKING_NOT_FOUND"),
            LedgerError::DuplicateBooking => (StatusCode::CONFLICT, "DUPLICATE_BOOKING"),
            LedgerError::RequestNotFound => (StatusCode::NOT_FOUND, "REQUEST_NOT_FOUND"),
            LedgerError::OwnerMismatch => (StatusCode::FORBIDDEN, "OWNER_MISMATCH"),
            LedgerError::AlreadySettled => (StatusCode::CONFLICT, "ALREADY_SETTLED"),
            LedgerError::ContentNotAccepted => (StatusCode::CONFLICT, "CONTENT_NOT_ACCEPTED"),
            LedgerError::DuplicateWithdrawalRequest => {
                (StatusCode::CONFLICT, "DUPLICATE_WITHDRAWAL_REQUEST")
            }
            LedgerError::NotEligibleForWithdrawal => {
                (StatusCode::CONFLICT, "NOT_ELIGIBLE_FOR_WITHDRAWAL")
            }
            LedgerError::EscrowReleased => (StatusCode::CONFLICT, "ESCROW_RELEASED"),
            LedgerError::RequestNotPending => (StatusCode::CONFLICT, "REQUEST_NOT_PENDING"),
            LedgerError::EscrowInsufficient => {
                (StatusCode::UNPROCESSABLE_ENTITY, "ESCROW_INSUFFICIENT")
            }
            LedgerError::TransientFailure => {
                (StatusCode::SERVICE_UNAVAILABLE, "TRANSIENT_FAILURE")
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /wallets/:id/credit - Credit a confirmed top-up.
async fn credit_wallet(
    State(state): State<AppState>,
    Path(owner): Path<u64>,
    Json(request): Json<CreditRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.engine.credit_wallet(OwnerId(owner), request.amount)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /wallets/:id - Wallet summary.
async fn get_wallet(
    State(state): State<AppState>,
    Path(owner): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.engine.wallet_summary(OwnerId(owner))?;
    Ok(Json(summary))
}

/// GET /wallets/:id/transactions - Paginated ledger entries, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Path(owner): Path<u64>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let page = state
        .engine
        .list_transactions(OwnerId(owner), params.page, params.page_size);
    Json(page)
}

/// POST /offers - Open an offer escrow.
async fn open_escrow(
    State(state): State<AppState>,
    Json(request): Json<OpenEscrowRequest>,
) -> Result<impl IntoResponse, AppError> {
    let escrow = state.engine.open_offer_escrow(
        OwnerId(request.owner_id),
        OfferId(request.offer_id),
        request.deposit,
    )?;
    Ok((StatusCode::CREATED, Json(escrow)))
}

/// POST /settlements - Record a creator settlement.
async fn record_settlement(
    State(state): State<AppState>,
    Json(request): Json<SettlementRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.engine.record_settlement(
        BookingId(request.booking_id),
        request.amount,
        request.mode,
    )?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /withdrawals - Open a withdrawal request.
async fn request_withdrawal(
    State(state): State<AppState>,
    Json(request): Json<WithdrawalRequestBody>,
) -> Result<impl IntoResponse, AppError> {
    let created = state.engine.request_withdrawal(
        OwnerId(request.owner_id),
        OfferId(request.offer_id),
        request.bank_details,
    )?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /withdrawals/:id/cancel - Owner cancels a pending request.
async fn cancel_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(request): Json<CancelRequest>,
) -> Result<StatusCode, AppError> {
    state
        .engine
        .cancel_withdrawal(RequestId(id), OwnerId(request.owner_id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /withdrawals/:id/approve - Admin approves a pending request.
async fn approve_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(request): Json<ResolveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let approved = state
        .engine
        .approve_withdrawal(RequestId(id), AdminId(request.admin_id))?;
    Ok(Json(approved))
}

/// POST /withdrawals/:id/reject - Admin rejects a pending request.
async fn reject_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(request): Json<ResolveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reason = request.reason.unwrap_or_default();
    let rejected = state
        .engine
        .reject_withdrawal(RequestId(id), AdminId(request.admin_id), &reason)?;
    Ok(Json(rejected))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/wallets/{id}", get(get_wallet))
        .route("/wallets/{id}/credit", post(credit_wallet))
        .route("/wallets/{id}/transactions", get(list_transactions))
        .route("/offers", post(open_escrow))
        .route("/settlements", post(record_settlement))
        .route("/withdrawals", post(request_withdrawal))
        .route("/withdrawals/{id}/cancel", post(cancel_withdrawal))
        .route("/withdrawals/{id}/approve", post(approve_withdrawal))
        .route("/withdrawals/{id}/reject", post(reject_withdrawal))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    let state = AppState {
        engine: Arc::new(Engine::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Escrow ledger API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST /wallets/:id/credit        - Credit a top-up");
    println!("  GET  /wallets/:id               - Wallet summary");
    println!("  GET  /wallets/:id/transactions  - Paginated ledger entries");
    println!("  POST /offers                    - Open an offer escrow");
    println!("  POST /settlements               - Record a settlement");
    println!("  POST /withdrawals               - Open a withdrawal request");
    println!("  POST /withdrawals/:id/cancel    - Cancel a pending request");
    println!("  POST /withdrawals/:id/approve   - Approve a pending request");
    println!("  POST /withdrawals/:id/reject    - Reject a pending request");

    axum::serve(listener, app).await.unwrap();
}
