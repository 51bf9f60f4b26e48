use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::api::requests::{
    AtmWithdrawalRequest, BillPaymentApiRequest, CardPaymentApiRequest, CreateAccountRequest,
    CreateCardRequest, CreateReversalApiRequest, DepositRequest, LedgerQuery, LoanRequest,
    MobileMoneyApiRequest, ReviewApiRequest, TransferApiRequest,
};
use crate::api::responses::{
    AccountResponse, ApiResponse, ErrorResponse, HealthResponse, ReceiptResponse,
    ReversalResponse, SettlementResponse, TransactionResponse,
};
use crate::error::AppError;
use crate::gateway::CallbackPayload;
use crate::models::{Account, Card};
use crate::repositories::{AccountRepository, CardRepository, TransactionRepository};
use crate::services::payments::{CardPaymentRequest, TransferRequest};

use super::routes::AppState;

type ApiError = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Maps the error taxonomy onto HTTP statuses.
fn error_response(error: AppError) -> ApiError {
    let status = match &error {
        AppError::AccountNotFound(_)
        | AppError::TransactionNotFound(_)
        | AppError::CardNotFound(_)
        | AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::InsufficientFunds { .. } | AppError::InsufficientAvailableBalance { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AppError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
        AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
        AppError::Validation(_)
        | AppError::InvalidExternalAccount(_)
        | AppError::CardInactive(_)
        | AppError::CardExpired(_) => StatusCode::BAD_REQUEST,
        AppError::GatewayUnavailable(_) | AppError::GatewayError { .. } => StatusCode::BAD_GATEWAY,
        AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
            tracing::error!(error = %error, "internal error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "An internal error occurred".to_string()
    } else {
        error.to_string()
    };

    (
        status,
        Json(ApiResponse::<()>::error(ErrorResponse::new(error.code(), message))),
    )
}

fn validation_error(errors: validator::ValidationErrors) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(ErrorResponse::new(
            "VALIDATION_ERROR",
            errors.to_string(),
        ))),
    )
}

// ============================================================================
// Health
// ============================================================================

pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();

    Json(ApiResponse::success(HealthResponse {
        status: if db_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        database: db_healthy,
    }))
}

pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}

// ============================================================================
// Accounts
// ============================================================================

pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), ApiError> {
    request.validate().map_err(validation_error)?;

    let mut account = Account::new(request.customer_id, request.account_number, request.currency);
    if let Some(initial) = request.initial_balance {
        if initial < Decimal::ZERO {
            return Err(error_response(AppError::Validation(
                "Initial balance cannot be negative".to_string(),
            )));
        }
        account = account.with_balance(initial);
    }

    let account = AccountRepository::new(state.pool.clone())
        .create(&account)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AccountResponse::from(account))),
    ))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AccountResponse> {
    let account = AccountRepository::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(AppError::AccountNotFound(id.to_string())))?;

    Ok(Json(ApiResponse::success(AccountResponse::from(account))))
}

pub async fn get_account_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<Vec<TransactionResponse>> {
    let entries = TransactionRepository::new(state.pool.clone())
        .find_by_account(id, query.limit.unwrap_or(50), query.offset.unwrap_or(0))
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(
        entries.into_iter().map(TransactionResponse::from).collect(),
    )))
}

// ============================================================================
// Cards
// ============================================================================

pub async fn create_card(
    State(state): State<AppState>,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Uuid>>), ApiError> {
    request.validate().map_err(validation_error)?;

    let card = Card::new(
        request.account_id,
        request.masked_pan,
        &request.secret,
        request.expiry_month,
        request.expiry_year,
    );

    let card = CardRepository::new(state.pool.clone())
        .create(&card)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(card.id))))
}

// ============================================================================
// Money movement
// ============================================================================

pub async fn deposit(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> ApiResult<ReceiptResponse> {
    let receipt = state
        .payments
        .deposit(request.account_id, request.amount)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReceiptResponse::from(receipt))))
}

pub async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferApiRequest>,
) -> ApiResult<ReceiptResponse> {
    request.validate().map_err(validation_error)?;

    let receipt = state
        .payments
        .transfer(TransferRequest {
            from_account_id: request.from_account_id,
            to_account_id: request.to_account_id,
            amount: request.amount,
            description: request.description,
        })
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReceiptResponse::from(receipt))))
}

pub async fn card_payment(
    State(state): State<AppState>,
    Json(request): Json<CardPaymentApiRequest>,
) -> ApiResult<ReceiptResponse> {
    request.validate().map_err(validation_error)?;

    let receipt = state
        .payments
        .card_payment(CardPaymentRequest {
            card_id: request.card_id,
            secret: request.secret,
            amount: request.amount,
            merchant: request.merchant,
        })
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReceiptResponse::from(receipt))))
}

pub async fn atm_withdrawal(
    State(state): State<AppState>,
    Json(request): Json<AtmWithdrawalRequest>,
) -> ApiResult<ReceiptResponse> {
    request.validate().map_err(validation_error)?;

    let receipt = state
        .payments
        .atm_withdrawal(request.card_id, &request.secret, request.amount)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReceiptResponse::from(receipt))))
}

pub async fn bill_payment(
    State(state): State<AppState>,
    Json(request): Json<BillPaymentApiRequest>,
) -> ApiResult<ReceiptResponse> {
    request.validate().map_err(validation_error)?;

    let receipt = state
        .payments
        .bill_payment(request.account_id, &request.biller, request.amount)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReceiptResponse::from(receipt))))
}

pub async fn loan_disbursement(
    State(state): State<AppState>,
    Json(request): Json<LoanRequest>,
) -> ApiResult<ReceiptResponse> {
    let receipt = state
        .payments
        .loan_disbursement(request.account_id, request.amount)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReceiptResponse::from(receipt))))
}

pub async fn loan_payment(
    State(state): State<AppState>,
    Json(request): Json<LoanRequest>,
) -> ApiResult<ReceiptResponse> {
    let receipt = state
        .payments
        .loan_payment(request.account_id, request.amount)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReceiptResponse::from(receipt))))
}

// ============================================================================
// Reversal workflow
// ============================================================================

pub async fn create_reversal(
    State(state): State<AppState>,
    Json(request): Json<CreateReversalApiRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReversalResponse>>), ApiError> {
    request.validate().map_err(validation_error)?;

    let reversal = state
        .reversals
        .create(
            request.original_transaction_id,
            request.requested_by,
            request.amount,
            request.reason,
            request.reversal_type,
        )
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ReversalResponse::from(reversal))),
    ))
}

pub async fn get_reversal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReversalResponse> {
    let reversal = state
        .reversals
        .find_by_id(id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| {
            error_response(AppError::NotFound(format!("Reversal request '{}' not found", id)))
        })?;

    Ok(Json(ApiResponse::success(ReversalResponse::from(reversal))))
}

pub async fn approve_reversal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewApiRequest>,
) -> ApiResult<ReversalResponse> {
    let reversal = state
        .reversals
        .approve(id, request.reviewed_by)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReversalResponse::from(reversal))))
}

pub async fn reject_reversal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewApiRequest>,
) -> ApiResult<ReversalResponse> {
    let reversal = state
        .reversals
        .reject(
            id,
            request.reviewed_by,
            request.notes.unwrap_or_else(|| "rejected".to_string()),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReversalResponse::from(reversal))))
}

pub async fn complete_reversal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReversalResponse> {
    let reversal = state.reversals.complete(id).await.map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReversalResponse::from(reversal))))
}

pub async fn release_reversal_hold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewApiRequest>,
) -> ApiResult<ReversalResponse> {
    let reversal = state
        .reversals
        .release_hold(
            id,
            request.reviewed_by,
            request.notes.unwrap_or_else(|| "hold released".to_string()),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ReversalResponse::from(reversal))))
}

// ============================================================================
// Mobile money
// ============================================================================

pub async fn mobile_money_deposit(
    State(state): State<AppState>,
    Json(request): Json<MobileMoneyApiRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SettlementResponse>>), ApiError> {
    request.validate().map_err(validation_error)?;

    let settlement = state
        .mobile_money
        .initiate_deposit(request.account_id, &request.phone_number, request.amount)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(SettlementResponse::from(settlement))),
    ))
}

pub async fn mobile_money_withdrawal(
    State(state): State<AppState>,
    Json(request): Json<MobileMoneyApiRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SettlementResponse>>), ApiError> {
    request.validate().map_err(validation_error)?;

    let settlement = state
        .mobile_money
        .initiate_withdrawal(request.account_id, &request.phone_number, request.amount)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(SettlementResponse::from(settlement))),
    ))
}

/// Inbound gateway callback. Replays are safe: the processor's guarded
/// transition means a duplicate delivery resolves to AlreadyResolved.
pub async fn mobile_money_callback(
    State(state): State<AppState>,
    Json(payload): Json<CallbackPayload>,
) -> ApiResult<String> {
    let action = state
        .reconciliation
        .handle_callback(&payload)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(format!("{:?}", action))))
}

pub async fn get_mobile_money_request(
    State(state): State<AppState>,
    Path(checkout_id): Path<String>,
) -> ApiResult<SettlementResponse> {
    let settlement = state
        .mobile_money
        .find_by_checkout_id(&checkout_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| {
            error_response(AppError::NotFound(format!(
                "No tracked request for checkout id '{}'",
                checkout_id
            )))
        })?;

    Ok(Json(ApiResponse::success(SettlementResponse::from(settlement))))
}

/// On-demand batch sweep for gateway-side reversals.
pub async fn sweep_reversals(State(state): State<AppState>) -> ApiResult<u32> {
    let reversed = state
        .reconciliation
        .sweep_reversals()
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(reversed)))
}
