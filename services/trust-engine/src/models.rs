use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ===== Source Records =====
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub kyc_verified: bool,
    pub two_factor_enabled: bool,
    pub failed_login_attempts: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Succeeded,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Everything the calculator reads for one user.
#[derive(Debug, Clone)]
pub struct TrustSnapshot {
    pub user: User,
    pub transactions: Vec<Transaction>,
    pub reviews: Vec<Review>,
}

// ===== Trust Score =====
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubScores {
    pub transaction_history: f64, // 0-25
    pub account_age: f64,         // 0-25
    pub verification_level: f64,  // 0-25
    pub community_rating: f64,    // 0-25
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrustScore {
    pub user_id: Uuid,
    pub overall_score: u8, // 0-100
    pub risk_level: RiskLevel,
    pub sub_scores: SubScores,
    pub fraud_indicators: Vec<String>,
    pub total_reviews: usize,
    pub average_rating: Option<f64>,
    pub calculated_at: DateTime<Utc>,
}

/// Score as shown to other users: no sub-scores, no fraud indicators.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PublicTrustScore {
    pub user_id: Uuid,
    pub overall_score: u8,
    pub risk_level: RiskLevel,
    pub total_reviews: usize,
    pub average_rating: Option<f64>,
    pub calculated_at: DateTime<Utc>,
}

impl From<TrustScore> for PublicTrustScore {
    fn from(score: TrustScore) -> Self {
        PublicTrustScore {
            user_id: score.user_id,
            overall_score: score.overall_score,
            risk_level: score.risk_level,
            total_reviews: score.total_reviews,
            average_rating: score.average_rating,
            calculated_at: score.calculated_at,
        }
    }
}

// ===== Reviews API =====
#[derive(Debug, Deserialize, Serialize, Clone, validator::Validate)]
pub struct SubmitReviewRequest {
    pub reviewee_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 1000, message = "Comment must be at most 1000 characters"))]
    pub comment: Option<String>,
    pub transaction_id: Option<Uuid>,
}

/// Row handed to the store on review submission.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub transaction_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReviewSummary {
    pub id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewSummary {
    fn from(review: Review) -> Self {
        ReviewSummary {
            id: review.id,
            reviewer_id: review.reviewer_id,
            reviewee_id: review.reviewee_id,
            rating: review.rating,
            comment: review.comment,
            transaction_id: review.transaction_id,
            created_at: review.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReviewPage {
    pub user_id: Uuid,
    pub reviews: Vec<ReviewSummary>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

// ===== Health Check =====
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
}
