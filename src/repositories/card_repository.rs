use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Card;

pub struct CardRepository {
    pool: PgPool,
}

impl CardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, card: &Card) -> Result<Card> {
        let row = sqlx::query_as::<_, Card>(
            r#"
            INSERT INTO cards (id, account_id, masked_pan, secret_hash, status, expiry_month, expiry_year, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, account_id, masked_pan, secret_hash, status, expiry_month, expiry_year, created_at
            "#,
        )
        .bind(card.id)
        .bind(card.account_id)
        .bind(&card.masked_pan)
        .bind(&card.secret_hash)
        .bind(card.status)
        .bind(card.expiry_month)
        .bind(card.expiry_year)
        .bind(card.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Card>> {
        let row = sqlx::query_as::<_, Card>(
            r#"
            SELECT id, account_id, masked_pan, secret_hash, status, expiry_month, expiry_year, created_at
            FROM cards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
