use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "card_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    Active,
    Inactive,
    Blocked,
}

/// A payment card linked to an account. Only the SHA-256 of the card secret
/// (PIN) is stored; the PAN is kept masked.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Card {
    pub id: Uuid,
    pub account_id: Uuid,
    pub masked_pan: String,
    pub secret_hash: String,
    pub status: CardStatus,
    pub expiry_month: i16,
    pub expiry_year: i16,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn new(
        account_id: Uuid,
        masked_pan: String,
        secret: &str,
        expiry_month: i16,
        expiry_year: i16,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            masked_pan,
            secret_hash: Self::hash_secret(secret),
            status: CardStatus::Active,
            expiry_month,
            expiry_year,
            created_at: Utc::now(),
        }
    }

    pub fn hash_secret(secret: &str) -> String {
        hex::encode(Sha256::digest(secret.as_bytes()))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let (year, month) = (now.year() as i16, now.month() as i16);
        self.expiry_year < year || (self.expiry_year == year && self.expiry_month < month)
    }

    /// Full instrument check: card active, not expired, secret matches.
    /// Runs before any ledger write; failures abort the whole operation.
    pub fn validate_for_payment(&self, secret: &str, now: DateTime<Utc>) -> Result<()> {
        if self.status != CardStatus::Active {
            return Err(AppError::CardInactive(self.masked_pan.clone()));
        }
        if self.is_expired_at(now) {
            return Err(AppError::CardExpired(self.masked_pan.clone()));
        }
        if Self::hash_secret(secret) != self.secret_hash {
            return Err(AppError::InvalidCredential);
        }
        Ok(())
    }
}
