use crate::errors::{TrustError, TrustResult};
use crate::metrics::{REVIEWS_REJECTED, REVIEWS_SUBMITTED, TRUST_SCORES_COMPUTED, TRUST_SCORE_DURATION};
use crate::models::*;
use crate::scoring::TrustScorer;
use crate::store::TrustStore;
use chrono::Utc;
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

type ReviewLimiter = RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock>;

/// Reads user data, scores it and manages reviews.
pub struct TrustService {
    store: Arc<dyn TrustStore>,
    scorer: TrustScorer,
    review_limiter: ReviewLimiter,
    clock: DefaultClock,
}

impl TrustService {
    pub fn new(
        store: Arc<dyn TrustStore>,
        scorer: TrustScorer,
        reviews_per_hour: u32,
    ) -> TrustResult<Self> {
        let per_hour = NonZeroU32::new(reviews_per_hour).ok_or_else(|| {
            TrustError::Internal("reviews_per_hour must be greater than 0".to_string())
        })?;

        Ok(TrustService {
            store,
            scorer,
            review_limiter: RateLimiter::keyed(Quota::per_hour(per_hour)),
            clock: DefaultClock::default(),
        })
    }

    /// Drops reviewer quotas that have fully refilled.
    pub fn prune_rate_limits(&self) {
        let before = self.review_limiter.len();
        self.review_limiter.retain_recent();
        self.review_limiter.shrink_to_fit();
        debug!(
            "Pruned review rate limits: {} -> {} reviewers",
            before,
            self.review_limiter.len()
        );
    }

    /// Reviewers currently holding a quota entry.
    pub fn tracked_reviewers(&self) -> usize {
        self.review_limiter.len()
    }

    /// Full score of one user, computed fresh from the store.
    pub async fn compute_trust_score(&self, user_id: Uuid) -> TrustResult<TrustScore> {
        let timer = TRUST_SCORE_DURATION.with_label_values(&["private"]).start_timer();
        let score = self.score(user_id).await?;
        timer.observe_duration();
        Ok(score)
    }

    /// Score of another user with sub-scores and fraud indicators stripped.
    pub async fn public_trust_score(&self, user_id: Uuid) -> TrustResult<PublicTrustScore> {
        let timer = TRUST_SCORE_DURATION.with_label_values(&["public"]).start_timer();
        let score = self.score(user_id).await?;
        timer.observe_duration();
        Ok(PublicTrustScore::from(score))
    }

    async fn score(&self, user_id: Uuid) -> TrustResult<TrustScore> {
        let snapshot = self
            .store
            .snapshot(user_id)
            .await?
            .ok_or(TrustError::UserNotFound(user_id))?;

        let score = self.scorer.calculate(&snapshot, Utc::now());
        TRUST_SCORES_COMPUTED
            .with_label_values(&[score.risk_level.as_str()])
            .inc();

        Ok(score)
    }

    pub async fn submit_review(
        &self,
        reviewer_id: Uuid,
        request: SubmitReviewRequest,
    ) -> TrustResult<ReviewSummary> {
        match self.try_submit_review(reviewer_id, request).await {
            Ok(review) => {
                REVIEWS_SUBMITTED.inc();
                info!(
                    "Review {} submitted by {} for {} (rating {})",
                    review.id, review.reviewer_id, review.reviewee_id, review.rating
                );
                Ok(review)
            }
            Err(err) => {
                let reason = match &err {
                    TrustError::Validation(_) => "validation",
                    TrustError::UserNotFound(_) | TrustError::TransactionNotFound(_) => "not_found",
                    TrustError::DuplicateReview(_) => "duplicate",
                    TrustError::RateLimited { .. } => "rate_limited",
                    _ => "internal",
                };
                REVIEWS_REJECTED.with_label_values(&[reason]).inc();
                warn!("Review by {} rejected ({}): {}", reviewer_id, reason, err);
                Err(err)
            }
        }
    }

    async fn try_submit_review(
        &self,
        reviewer_id: Uuid,
        request: SubmitReviewRequest,
    ) -> TrustResult<ReviewSummary> {
        request.validate()?;

        if reviewer_id == request.reviewee_id {
            return Err(TrustError::Validation("Cannot review yourself".to_string()));
        }

        if self.store.find_user(reviewer_id).await?.is_none() {
            return Err(TrustError::UserNotFound(reviewer_id));
        }

        // Only known reviewers get a limiter slot
        if let Err(not_until) = self.review_limiter.check_key(&reviewer_id) {
            let wait = not_until.wait_time_from(self.clock.now());
            return Err(TrustError::RateLimited {
                retry_after_secs: wait.as_secs().max(1),
            });
        }

        if self.store.find_user(request.reviewee_id).await?.is_none() {
            return Err(TrustError::UserNotFound(request.reviewee_id));
        }

        if let Some(tx_id) = request.transaction_id {
            let transaction = self
                .store
                .find_transaction(tx_id)
                .await?
                .ok_or(TrustError::TransactionNotFound(tx_id))?;

            if transaction.user_id != reviewer_id && transaction.user_id != request.reviewee_id {
                return Err(TrustError::Validation(
                    "Transaction does not involve the reviewer or the reviewee".to_string(),
                ));
            }

            if self.store.has_reviewed_transaction(reviewer_id, tx_id).await? {
                return Err(TrustError::DuplicateReview(format!(
                    "transaction {} already reviewed",
                    tx_id
                )));
            }
        }

        let comment = request
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let stored = self
            .store
            .insert_review(NewReview {
                reviewer_id,
                reviewee_id: request.reviewee_id,
                rating: request.rating,
                comment,
                transaction_id: request.transaction_id,
            })
            .await?;

        Ok(ReviewSummary::from(stored))
    }

    /// Reviews received by `user_id`, newest first.
    pub async fn list_reviews(&self, user_id: Uuid, query: PageQuery) -> TrustResult<ReviewPage> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(TrustError::UserNotFound(user_id));
        }

        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = (page as u64 - 1) * limit as u64;

        let (reviews, total) = self.store.review_page(user_id, offset, limit).await?;
        let total_pages = ((total + limit as u64 - 1) / limit as u64) as u32;

        Ok(ReviewPage {
            user_id,
            reviews: reviews.into_iter().map(ReviewSummary::from).collect(),
            page,
            limit,
            total,
            total_pages,
        })
    }

    pub async fn health(&self) -> TrustResult<()> {
        self.store.ping().await
    }
}
