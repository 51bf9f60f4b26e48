use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;

use super::handlers;
use crate::gateway::MobileMoneyAdapter;
use crate::reconciliation::ReconciliationProcessor;
use crate::services::{LedgerService, PaymentEngine, ReversalService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub ledger: Arc<LedgerService>,
    pub payments: Arc<PaymentEngine>,
    pub reversals: Arc<ReversalService>,
    pub mobile_money: Arc<MobileMoneyAdapter>,
    pub reconciliation: Arc<ReconciliationProcessor>,
    pub metrics_handle: Option<PrometheusHandle>,
}

/// Creates the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Accounts
        .route("/accounts", post(handlers::create_account))
        .route("/accounts/:id", get(handlers::get_account))
        .route("/accounts/:id/transactions", get(handlers::get_account_transactions))
        // Cards
        .route("/cards", post(handlers::create_card))
        // Money movement
        .route("/deposits", post(handlers::deposit))
        .route("/transfers", post(handlers::transfer))
        .route("/payments/card", post(handlers::card_payment))
        .route("/payments/bill", post(handlers::bill_payment))
        .route("/withdrawals/atm", post(handlers::atm_withdrawal))
        .route("/loans/disbursements", post(handlers::loan_disbursement))
        .route("/loans/payments", post(handlers::loan_payment))
        // Reversal workflow
        .route("/reversals", post(handlers::create_reversal))
        .route("/reversals/:id", get(handlers::get_reversal))
        .route("/reversals/:id/approve", post(handlers::approve_reversal))
        .route("/reversals/:id/reject", post(handlers::reject_reversal))
        .route("/reversals/:id/complete", post(handlers::complete_reversal))
        .route("/reversals/:id/release", post(handlers::release_reversal_hold))
        // Mobile money
        .route("/mobile-money/deposits", post(handlers::mobile_money_deposit))
        .route("/mobile-money/withdrawals", post(handlers::mobile_money_withdrawal))
        .route("/mobile-money/callback", post(handlers::mobile_money_callback))
        .route("/mobile-money/requests/:checkout_id", get(handlers::get_mobile_money_request))
        .route("/mobile-money/sweep-reversals", post(handlers::sweep_reversals))
        .with_state(state)
}
