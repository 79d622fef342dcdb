use crate::errors::{TrustError, TrustResult};
use crate::models::{NewReview, Review, Transaction, User};
use crate::store::TrustStore;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// PostgreSQL-backed store. Schema lives in `migrations/`.
pub struct PgTrustStore {
    pool: PgPool,
}

impl PgTrustStore {
    pub fn new(pool: PgPool) -> Self {
        PgTrustStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TrustStore for PgTrustStore {
    async fn find_user(&self, user_id: Uuid) -> TrustResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, created_at, email_verified, phone_verified, kyc_verified,
                    two_factor_enabled, failed_login_attempts
             FROM users
             WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn user_transactions(&self, user_id: Uuid) -> TrustResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            "SELECT id, user_id, amount, status, created_at
             FROM transactions
             WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn find_transaction(&self, transaction_id: Uuid) -> TrustResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "SELECT id, user_id, amount, status, created_at
             FROM transactions
             WHERE id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn reviews_for(&self, reviewee_id: Uuid) -> TrustResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT id, reviewer_id, reviewee_id, rating, comment, transaction_id, created_at
             FROM reviews
             WHERE reviewee_id = $1",
        )
        .bind(reviewee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn review_page(
        &self,
        reviewee_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> TrustResult<(Vec<Review>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE reviewee_id = $1")
            .bind(reviewee_id)
            .fetch_one(&self.pool)
            .await?;

        let reviews = sqlx::query_as::<_, Review>(
            "SELECT id, reviewer_id, reviewee_id, rating, comment, transaction_id, created_at
             FROM reviews
             WHERE reviewee_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(reviewee_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((reviews, total.max(0) as u64))
    }

    async fn has_reviewed_transaction(
        &self,
        reviewer_id: Uuid,
        transaction_id: Uuid,
    ) -> TrustResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM reviews WHERE reviewer_id = $1 AND transaction_id = $2
             )",
        )
        .bind(reviewer_id)
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_review(&self, review: NewReview) -> TrustResult<Review> {
        let result = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (id, reviewer_id, reviewee_id, rating, comment, transaction_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             RETURNING id, reviewer_id, reviewee_id, rating, comment, transaction_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(review.reviewer_id)
        .bind(review.reviewee_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.transaction_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(stored) => Ok(stored),
            // A concurrent submission won the unique (reviewer_id, transaction_id) index
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(TrustError::DuplicateReview(format!(
                    "transaction {} already reviewed",
                    review.transaction_id.map(|id| id.to_string()).unwrap_or_default()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self) -> TrustResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
