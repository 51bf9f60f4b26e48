use rust_decimal::Decimal;
use tracing::warn;

use crate::models::{FeeRule, TransactionCategory};

/// Outcome of a fee lookup: the amount to charge and the rule that priced it
/// (None when no bracket matched and the zero-fee fallback applied).
#[derive(Debug, Clone)]
pub struct FeeAssessment {
    pub amount: Decimal,
    pub rule_id: Option<uuid::Uuid>,
}

impl FeeAssessment {
    pub fn free() -> Self {
        Self {
            amount: Decimal::ZERO,
            rule_id: None,
        }
    }
}

/// In-memory snapshot of the fee rate table. Pure lookup, no side effects;
/// the repositories load it and services consult it.
#[derive(Debug, Clone, Default)]
pub struct FeeSchedule {
    rules: Vec<FeeRule>,
}

impl FeeSchedule {
    pub fn new(rules: Vec<FeeRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fee for a transaction of `amount` in `category`.
    ///
    /// No matching active bracket means zero fee. That fallback is policy,
    /// not an error, but it is logged so a mispriced category is visible.
    pub fn assess(&self, category: TransactionCategory, amount: Decimal) -> FeeAssessment {
        match self.rules.iter().find(|r| r.matches(category, amount)) {
            Some(rule) => FeeAssessment {
                amount: rule.fee_for(amount),
                rule_id: Some(rule.id),
            },
            None => {
                warn!(?category, %amount, "no fee bracket matched; charging zero");
                FeeAssessment::free()
            }
        }
    }

    /// Convenience for callers that only need the amount.
    pub fn fee_for(&self, category: TransactionCategory, amount: Decimal) -> Decimal {
        self.assess(category, amount).amount
    }
}
