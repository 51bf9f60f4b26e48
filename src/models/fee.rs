use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fee-bearing transaction channels. Each maps to one or more rate-table
/// rows bracketed by amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionCategory {
    Transfer,
    CardPayment,
    AtmWithdrawal,
    BillPayment,
    LoanPayment,
    MobileMoneyDeposit,
    MobileMoneyWithdrawal,
}

/// One row of the fee rate table: for a category and amount bracket, either
/// a flat amount, a percentage, or both (percentage wins).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeeRule {
    pub id: Uuid,
    pub category: TransactionCategory,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub fee_amount: Option<Decimal>,
    pub fee_percentage: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl FeeRule {
    pub fn flat(category: TransactionCategory, min: Decimal, max: Decimal, fee: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            min_amount: min,
            max_amount: max,
            fee_amount: Some(fee),
            fee_percentage: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn percentage(
        category: TransactionCategory,
        min: Decimal,
        max: Decimal,
        percentage: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            min_amount: min,
            max_amount: max,
            fee_amount: None,
            fee_percentage: Some(percentage),
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn matches(&self, category: TransactionCategory, amount: Decimal) -> bool {
        self.active
            && self.category == category
            && amount >= self.min_amount
            && amount <= self.max_amount
    }

    /// Fee for `amount` under this rule. Percentage takes precedence over the
    /// flat amount when both are configured.
    pub fn fee_for(&self, amount: Decimal) -> Decimal {
        if let Some(percentage) = self.fee_percentage {
            return (amount * percentage / Decimal::ONE_HUNDRED).round_dp(2);
        }
        self.fee_amount.unwrap_or(Decimal::ZERO)
    }
}

/// Links a ledger entry to the fee collected for it and the profit account
/// that received the fee.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeeRecord {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub fee_rule_id: Option<Uuid>,
    pub amount: Decimal,
    pub profit_account_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl FeeRecord {
    pub fn new(
        transaction_id: Uuid,
        fee_rule_id: Option<Uuid>,
        amount: Decimal,
        profit_account_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            fee_rule_id,
            amount,
            profit_account_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flat_rule_fee() {
        let rule = FeeRule::flat(TransactionCategory::Transfer, dec!(0), dec!(1000), dec!(25));
        assert_eq!(rule.fee_for(dec!(500)), dec!(25));
    }

    #[test]
    fn test_percentage_rule_fee() {
        let rule = FeeRule::percentage(
            TransactionCategory::Transfer,
            dec!(1000),
            dec!(10000),
            dec!(1.5),
        );
        assert_eq!(rule.fee_for(dec!(2000)), dec!(30));
    }

    #[test]
    fn test_percentage_takes_precedence_over_flat() {
        let mut rule = FeeRule::flat(TransactionCategory::Transfer, dec!(0), dec!(1000), dec!(25));
        rule.fee_percentage = Some(dec!(2));
        assert_eq!(rule.fee_for(dec!(100)), dec!(2));
    }

    #[test]
    fn test_percentage_fee_rounds_to_cents() {
        let rule = FeeRule::percentage(
            TransactionCategory::CardPayment,
            dec!(0),
            dec!(10000),
            dec!(0.33),
        );
        assert_eq!(rule.fee_for(dec!(99.99)), dec!(0.33));
    }

    #[test]
    fn test_matches_respects_bracket_and_active_flag() {
        let mut rule = FeeRule::flat(
            TransactionCategory::AtmWithdrawal,
            dec!(100),
            dec!(5000),
            dec!(35),
        );
        assert!(rule.matches(TransactionCategory::AtmWithdrawal, dec!(100)));
        assert!(rule.matches(TransactionCategory::AtmWithdrawal, dec!(5000)));
        assert!(!rule.matches(TransactionCategory::AtmWithdrawal, dec!(99)));
        assert!(!rule.matches(TransactionCategory::AtmWithdrawal, dec!(5001)));
        assert!(!rule.matches(TransactionCategory::Transfer, dec!(500)));

        rule.active = false;
        assert!(!rule.matches(TransactionCategory::AtmWithdrawal, dec!(500)));
    }

    #[test]
    fn test_rule_with_neither_amount_nor_percentage_is_free() {
        let mut rule = FeeRule::flat(TransactionCategory::Transfer, dec!(0), dec!(100), dec!(0));
        rule.fee_amount = None;
        assert_eq!(rule.fee_for(dec!(50)), Decimal::ZERO);
    }
}
