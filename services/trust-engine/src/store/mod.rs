pub mod memory;

use crate::errors::TrustResult;
use crate::models::{NewReview, Review, Transaction, TrustSnapshot, User};
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::InMemoryTrustStore;

/// Persistence seam of the trust service.
///
/// `PgTrustStore` (see `database`) backs production; `InMemoryTrustStore`
/// backs tests and local runs without PostgreSQL.
#[async_trait]
pub trait TrustStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> TrustResult<Option<User>>;

    async fn user_transactions(&self, user_id: Uuid) -> TrustResult<Vec<Transaction>>;

    async fn find_transaction(&self, transaction_id: Uuid) -> TrustResult<Option<Transaction>>;

    /// All reviews received by the user.
    async fn reviews_for(&self, reviewee_id: Uuid) -> TrustResult<Vec<Review>>;

    /// One page of received reviews, newest first, plus the total count.
    async fn review_page(
        &self,
        reviewee_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> TrustResult<(Vec<Review>, u64)>;

    async fn has_reviewed_transaction(
        &self,
        reviewer_id: Uuid,
        transaction_id: Uuid,
    ) -> TrustResult<bool>;

    async fn insert_review(&self, review: NewReview) -> TrustResult<Review>;

    async fn ping(&self) -> TrustResult<()>;

    /// Reads everything the scorer needs. None when the user does not exist.
    async fn snapshot(&self, user_id: Uuid) -> TrustResult<Option<TrustSnapshot>> {
        let user = match self.find_user(user_id).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let transactions = self.user_transactions(user_id).await?;
        let reviews = self.reviews_for(user_id).await?;

        Ok(Some(TrustSnapshot {
            user,
            transactions,
            reviews,
        }))
    }
}
