use super::TrustStore;
use crate::errors::{TrustError, TrustResult};
use crate::models::{NewReview, Review, Transaction, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    transactions: Vec<Transaction>,
    reviews: Vec<Review>,
}

/// Process-local store. Seed it with `add_user`/`add_transaction`.
#[derive(Default)]
pub struct InMemoryTrustStore {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
}

impl InMemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn add_transaction(&self, transaction: Transaction) {
        self.state.write().await.transactions.push(transaction);
    }

    pub async fn add_review(&self, review: Review) {
        self.state.write().await.reviews.push(review);
    }

    /// Makes every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> TrustResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TrustError::Internal("trust store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TrustStore for InMemoryTrustStore {
    async fn find_user(&self, user_id: Uuid) -> TrustResult<Option<User>> {
        self.check_available()?;
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn user_transactions(&self, user_id: Uuid) -> TrustResult<Vec<Transaction>> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .await
            .transactions
            .iter()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_transaction(&self, transaction_id: Uuid) -> TrustResult<Option<Transaction>> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .await
            .transactions
            .iter()
            .find(|tx| tx.id == transaction_id)
            .cloned())
    }

    async fn reviews_for(&self, reviewee_id: Uuid) -> TrustResult<Vec<Review>> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .await
            .reviews
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .cloned()
            .collect())
    }

    async fn review_page(
        &self,
        reviewee_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> TrustResult<(Vec<Review>, u64)> {
        let mut received = self.reviews_for(reviewee_id).await?;
        received.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = received.len() as u64;
        let page = received
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn has_reviewed_transaction(
        &self,
        reviewer_id: Uuid,
        transaction_id: Uuid,
    ) -> TrustResult<bool> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .await
            .reviews
            .iter()
            .any(|r| r.reviewer_id == reviewer_id && r.transaction_id == Some(transaction_id)))
    }

    async fn insert_review(&self, review: NewReview) -> TrustResult<Review> {
        self.check_available()?;
        let mut state = self.state.write().await;

        // Same uniqueness rule the SQL schema enforces
        if let Some(tx_id) = review.transaction_id {
            if state
                .reviews
                .iter()
                .any(|r| r.reviewer_id == review.reviewer_id && r.transaction_id == Some(tx_id))
            {
                return Err(TrustError::DuplicateReview(format!(
                    "transaction {} already reviewed",
                    tx_id
                )));
            }
        }

        let stored = Review {
            id: Uuid::new_v4(),
            reviewer_id: review.reviewer_id,
            reviewee_id: review.reviewee_id,
            rating: review.rating,
            comment: review.comment,
            transaction_id: review.transaction_id,
            created_at: Utc::now(),
        };
        state.reviews.push(stored.clone());

        Ok(stored)
    }

    async fn ping(&self) -> TrustResult<()> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn review_at(reviewee_id: Uuid, rating: i32, minutes_ago: i64) -> Review {
        Review {
            id: Uuid::new_v4(),
            reviewer_id: Uuid::new_v4(),
            reviewee_id,
            rating,
            comment: None,
            transaction_id: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_review_page_is_newest_first() {
        let store = InMemoryTrustStore::new();
        let reviewee = Uuid::new_v4();
        store.add_review(review_at(reviewee, 1, 30)).await;
        store.add_review(review_at(reviewee, 2, 10)).await;
        store.add_review(review_at(reviewee, 3, 20)).await;
        store.add_review(review_at(Uuid::new_v4(), 4, 5)).await;

        let (page, total) = store.review_page(reviewee, 0, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.iter().map(|r| r.rating).collect::<Vec<_>>(), vec![2, 3]);

        let (page, _) = store.review_page(reviewee, 2, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].rating, 1);
    }

    #[tokio::test]
    async fn test_duplicate_transaction_review_rejected() {
        let store = InMemoryTrustStore::new();
        let review = NewReview {
            reviewer_id: Uuid::new_v4(),
            reviewee_id: Uuid::new_v4(),
            rating: 4,
            comment: None,
            transaction_id: Some(Uuid::new_v4()),
        };

        assert!(store.insert_review(review.clone()).await.is_ok());
        assert!(matches!(
            store.insert_review(review).await,
            Err(TrustError::DuplicateReview(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = InMemoryTrustStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.ping().await, Err(TrustError::Internal(_))));
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
