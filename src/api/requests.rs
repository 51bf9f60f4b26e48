use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::ReversalType;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 6, max = 20))]
    pub account_number: String,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub initial_balance: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCardRequest {
    pub account_id: Uuid,
    #[validate(length(min = 8, max = 25))]
    pub masked_pan: String,
    #[validate(length(min = 4, max = 12))]
    pub secret: String,
    #[validate(range(min = 1, max = 12))]
    pub expiry_month: i16,
    #[validate(range(min = 2024, max = 2099))]
    pub expiry_year: i16,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferApiRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    #[validate(length(max = 200))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CardPaymentApiRequest {
    pub card_id: Uuid,
    #[validate(length(min = 4, max = 12))]
    pub secret: String,
    pub amount: Decimal,
    #[validate(length(min = 1, max = 100))]
    pub merchant: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AtmWithdrawalRequest {
    pub card_id: Uuid,
    #[validate(length(min = 4, max = 12))]
    pub secret: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BillPaymentApiRequest {
    pub account_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub biller: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub account_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct LoanRequest {
    pub account_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReversalApiRequest {
    pub original_transaction_id: Uuid,
    pub requested_by: Uuid,
    pub amount: Option<Decimal>,
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
    pub reversal_type: ReversalType,
}

#[derive(Debug, Deserialize)]
pub struct ReviewApiRequest {
    pub reviewed_by: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MobileMoneyApiRequest {
    pub account_id: Uuid,
    #[validate(length(min = 9, max = 15))]
    pub phone_number: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_account_validation() {
        let request = CreateAccountRequest {
            customer_id: Uuid::new_v4(),
            account_number: "0001000123".to_string(),
            currency: "KES".to_string(),
            initial_balance: None,
        };
        assert!(request.validate().is_ok());

        let bad = CreateAccountRequest {
            customer_id: Uuid::new_v4(),
            account_number: "123".to_string(),
            currency: "KENYA".to_string(),
            initial_balance: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_reversal_request_deserializes_type_tag() {
        let json = r#"{
            "original_transaction_id": "550e8400-e29b-41d4-a716-446655440000",
            "requested_by": "550e8400-e29b-41d4-a716-446655440001",
            "reason": "duplicate charge",
            "reversal_type": "REFUND"
        }"#;
        let request: CreateReversalApiRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.reversal_type, ReversalType::Refund);
        assert!(request.amount.is_none());
    }
}
