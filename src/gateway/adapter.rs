use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::gateway::client::MobileMoneyGateway;
use crate::gateway::phone::normalize_msisdn;
use crate::models::{MobileMoneyRequest, SettlementDirection};
use crate::observability::mask_phone;
use crate::repositories::{AccountRepository, SettlementRepository};

/// Initiates mobile-money movements and persists the tracked request.
///
/// Validation (phone shape, account existence, amount) happens before any
/// network call; a gateway transport failure surfaces as
/// `GatewayUnavailable` and persists nothing, so there is never a tracked
/// request without a gateway-side counterpart.
pub struct MobileMoneyAdapter {
    gateway: Arc<dyn MobileMoneyGateway>,
    accounts: AccountRepository,
    settlements: SettlementRepository,
}

impl MobileMoneyAdapter {
    pub fn new(pool: PgPool, gateway: Arc<dyn MobileMoneyGateway>) -> Self {
        Self {
            gateway,
            accounts: AccountRepository::new(pool.clone()),
            settlements: SettlementRepository::new(pool),
        }
    }

    /// Starts a customer deposit (push payment). The internal credit happens
    /// later, exactly once, when reconciliation confirms the request.
    pub async fn initiate_deposit(
        &self,
        account_id: Uuid,
        phone_number: &str,
        amount: Decimal,
    ) -> Result<MobileMoneyRequest> {
        let (msisdn, account_number) = self.validate(account_id, phone_number, amount).await?;

        let initiation = self
            .gateway
            .initiate_push(&msisdn, amount, &account_number)
            .await?;

        let request = MobileMoneyRequest::new(
            initiation.merchant_request_id,
            initiation.checkout_request_id,
            msisdn,
            account_id,
            SettlementDirection::Deposit,
            amount,
        );
        let request = self.settlements.create(&request).await?;

        info!(
            request_id = %request.id,
            checkout_id = %request.checkout_request_id,
            phone = %mask_phone(&request.phone_number),
            "deposit initiated"
        );
        Ok(request)
    }

    /// Starts a payout to the customer's phone. The internal debit happens
    /// when reconciliation confirms the payout landed.
    pub async fn initiate_withdrawal(
        &self,
        account_id: Uuid,
        phone_number: &str,
        amount: Decimal,
    ) -> Result<MobileMoneyRequest> {
        let (msisdn, account_number) = self.validate(account_id, phone_number, amount).await?;

        // The payout must be coverable now, even though the debit lands at
        // confirmation; rejecting early beats stranding the reconciler.
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;
        if !account.has_available(amount) {
            return Err(AppError::InsufficientFunds {
                requested: amount,
                available: account.available_balance,
            });
        }

        let initiation = self
            .gateway
            .initiate_payout(&msisdn, amount, &format!("withdrawal from {account_number}"))
            .await?;

        let request = MobileMoneyRequest::new(
            initiation.merchant_request_id,
            initiation.checkout_request_id,
            msisdn,
            account_id,
            SettlementDirection::Withdrawal,
            amount,
        );
        let request = self.settlements.create(&request).await?;

        info!(
            request_id = %request.id,
            checkout_id = %request.checkout_request_id,
            phone = %mask_phone(&request.phone_number),
            "withdrawal initiated"
        );
        Ok(request)
    }

    pub async fn find_by_checkout_id(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<MobileMoneyRequest>> {
        self.settlements.find_by_checkout_id(checkout_request_id).await
    }

    async fn validate(
        &self,
        account_id: Uuid,
        phone_number: &str,
        amount: Decimal,
    ) -> Result<(String, String)> {
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation("Amount must be positive".to_string()));
        }

        let msisdn = normalize_msisdn(phone_number)?;

        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        if !account.is_operational() {
            return Err(AppError::Validation(format!(
                "Account '{}' is not operational",
                account_id
            )));
        }

        Ok((msisdn, account.account_number))
    }
}
