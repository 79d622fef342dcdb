use crate::config::{FraudConfig, ScoringConfig};
use crate::fraud::FraudDetector;
use crate::models::*;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

/// Digits kept before the final rounding step. Division residue lives far
/// below this, so exact halves such as 59.5 stay halves.
const SUM_PRECISION: u32 = 9;

/// Weighted-sum reputation calculator.
///
/// The score is the rounded sum of four sub-scores, each capped at
/// `sub_score_cap`:
/// transaction history, account age, verification level and community rating.
/// Sub-scores are summed in decimal arithmetic and the total is rounded half
/// away from zero. Computation is a pure function of the snapshot and `now`;
/// nothing is cached.
pub struct TrustScorer {
    config: ScoringConfig,
    detector: FraudDetector,
}

impl TrustScorer {
    pub fn new(config: ScoringConfig, fraud: FraudConfig) -> Self {
        TrustScorer {
            config,
            detector: FraudDetector::new(fraud),
        }
    }

    pub fn calculate(&self, snapshot: &TrustSnapshot, now: DateTime<Utc>) -> TrustScore {
        let transaction_history = self.transaction_history_score(&snapshot.transactions);
        let account_age = self.account_age_score(&snapshot.user, now);
        let verification_level = self.verification_score(&snapshot.user);
        let community_rating = self.community_rating_score(&snapshot.reviews);

        let overall_score = overall(
            transaction_history + account_age + verification_level + community_rating,
        );

        let sub_scores = SubScores {
            transaction_history: to_points(transaction_history),
            account_age: to_points(account_age),
            verification_level: to_points(verification_level),
            community_rating: to_points(community_rating),
        };

        let fraud_indicators: Vec<String> = self
            .detector
            .detect(snapshot, now)
            .iter()
            .map(|indicator| indicator.to_string())
            .collect();

        let risk_level = self.risk_level(overall_score, fraud_indicators.len());

        info!(
            "Trust score calculated: {} (risk: {}, indicators: {}) for user {}",
            overall_score,
            risk_level.as_str(),
            fraud_indicators.len(),
            snapshot.user.id
        );

        TrustScore {
            user_id: snapshot.user.id,
            overall_score,
            risk_level,
            sub_scores,
            fraud_indicators,
            total_reviews: snapshot.reviews.len(),
            average_rating: average_rating(&snapshot.reviews),
            calculated_at: now,
        }
    }

    /// Deterministic in its two inputs.
    pub fn risk_level(&self, overall_score: u8, indicator_count: usize) -> RiskLevel {
        if indicator_count >= self.config.critical_indicator_count {
            return RiskLevel::Critical;
        }

        match overall_score {
            s if s >= self.config.low_risk_min => RiskLevel::Low,
            s if s >= self.config.medium_risk_min => RiskLevel::Medium,
            s if s >= self.config.high_risk_min => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    fn transaction_history_score(&self, transactions: &[Transaction]) -> Decimal {
        let total = transactions.len();
        if total == 0 {
            return Decimal::ZERO;
        }

        let succeeded = transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Succeeded)
            .count();

        let saturation = self.config.volume_saturation.max(1) as usize;
        let success = Decimal::from(succeeded) * points(self.config.success_rate_weight)
            / Decimal::from(total);
        let volume = Decimal::from(total.min(saturation)) * points(self.config.volume_weight)
            / Decimal::from(saturation);

        self.cap(success + volume)
    }

    fn account_age_score(&self, user: &User, now: DateTime<Utc>) -> Decimal {
        let age_days = (now - user.created_at).num_days().max(0);

        let bracket_points = self
            .config
            .age_brackets
            .iter()
            .find(|bracket| age_days >= bracket.min_days)
            .map(|bracket| points(bracket.points))
            .unwrap_or(Decimal::ZERO);

        self.cap(bracket_points)
    }

    fn verification_score(&self, user: &User) -> Decimal {
        let mut total = Decimal::ZERO;
        if user.email_verified {
            total += points(self.config.email_points);
        }
        if user.phone_verified {
            total += points(self.config.phone_points);
        }
        if user.kyc_verified {
            total += points(self.config.kyc_points);
        }
        if user.two_factor_enabled {
            total += points(self.config.two_factor_points);
        }
        self.cap(total)
    }

    fn community_rating_score(&self, reviews: &[Review]) -> Decimal {
        let max_rating = points(self.config.max_rating);
        if reviews.is_empty() || max_rating.is_zero() {
            return self.cap(points(self.config.neutral_rating_score));
        }

        let sum: i64 = reviews.iter().map(|r| r.rating as i64).sum();
        // avg / max * cap, with a single division
        self.cap(
            Decimal::from(sum) * points(self.config.sub_score_cap)
                / (Decimal::from(reviews.len()) * max_rating),
        )
    }

    fn cap(&self, value: Decimal) -> Decimal {
        value.clamp(Decimal::ZERO, points(self.config.sub_score_cap))
    }
}

fn points(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

fn to_points(value: Decimal) -> f64 {
    value.round_dp(SUM_PRECISION).to_f64().unwrap_or(0.0)
}

/// Rounds the summed sub-scores half away from zero into 0..=100.
fn overall(total: Decimal) -> u8 {
    total
        .round_dp(SUM_PRECISION)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .to_u8()
        .unwrap_or(0)
}

fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: i64 = reviews.iter().map(|r| r.rating as i64).sum();
    Some(sum as f64 / reviews.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn scorer() -> TrustScorer {
        TrustScorer::new(ScoringConfig::default(), FraudConfig::default())
    }

    fn user(now: DateTime<Utc>, age_days: i64, verified: bool) -> User {
        User {
            id: Uuid::new_v4(),
            created_at: now - Duration::days(age_days),
            email_verified: verified,
            phone_verified: verified,
            kyc_verified: verified,
            two_factor_enabled: verified,
            failed_login_attempts: 0,
        }
    }

    fn transactions(user_id: Uuid, succeeded: usize, failed: usize, at: DateTime<Utc>) -> Vec<Transaction> {
        let mut out = Vec::new();
        for i in 0..(succeeded + failed) {
            out.push(Transaction {
                id: Uuid::new_v4(),
                user_id,
                amount: dec!(100.00),
                status: if i < succeeded {
                    TransactionStatus::Succeeded
                } else {
                    TransactionStatus::Failed
                },
                created_at: at,
            });
        }
        out
    }

    fn reviews(reviewee_id: Uuid, ratings: &[i32], at: DateTime<Utc>) -> Vec<Review> {
        ratings
            .iter()
            .map(|&rating| Review {
                id: Uuid::new_v4(),
                reviewer_id: Uuid::new_v4(),
                reviewee_id,
                rating,
                comment: None,
                transaction_id: None,
                created_at: at,
            })
            .collect()
    }

    #[test]
    fn test_established_verified_user_scores_low_risk() {
        let now = Utc::now();
        let user = user(now, 400, true);
        let snapshot = TrustSnapshot {
            transactions: transactions(user.id, 10, 0, now - Duration::days(20)),
            reviews: reviews(user.id, &[5, 5, 5], now),
            user,
        };

        let score = scorer().calculate(&snapshot, now);

        assert_eq!(score.sub_scores.transaction_history, 20.5);
        assert_eq!(score.sub_scores.account_age, 25.0);
        assert_eq!(score.sub_scores.verification_level, 25.0);
        assert_eq!(score.sub_scores.community_rating, 25.0);
        assert_eq!(score.overall_score, 96);
        assert_eq!(score.risk_level, RiskLevel::Low);
        assert!(score.fraud_indicators.is_empty());
        assert_eq!(score.average_rating, Some(5.0));
    }

    #[test]
    fn test_new_unverified_user_scores_critical() {
        let now = Utc::now();
        let snapshot = TrustSnapshot {
            user: user(now, 2, false),
            transactions: vec![],
            reviews: vec![],
        };

        let score = scorer().calculate(&snapshot, now);

        assert_eq!(score.sub_scores.transaction_history, 0.0);
        assert_eq!(score.sub_scores.account_age, 0.0);
        assert_eq!(score.sub_scores.verification_level, 0.0);
        assert_eq!(score.sub_scores.community_rating, 12.5);
        assert_eq!(score.overall_score, 13);
        assert_eq!(score.risk_level, RiskLevel::Critical);
        assert_eq!(score.fraud_indicators, vec!["Email not verified", "KYC pending"]);
        assert_eq!(score.average_rating, None);
        assert_eq!(score.total_reviews, 0);
    }

    #[test]
    fn test_zero_activity_score_is_age_plus_verification_plus_neutral() {
        let now = Utc::now();
        let cases = [(3, 0.0), (10, 5.0), (45, 10.0), (100, 15.0), (200, 20.0), (365, 25.0)];

        for (age, age_points) in cases {
            let mut u = user(now, age, false);
            u.email_verified = true;
            u.kyc_verified = true;
            let snapshot = TrustSnapshot {
                user: u,
                transactions: vec![],
                reviews: vec![],
            };

            let score = scorer().calculate(&snapshot, now);
            let expected = (0.0 + age_points + 15.0 + 12.5_f64).round() as u8;
            assert_eq!(score.overall_score, expected, "age {} days", age);
            assert_eq!(score.risk_level, scorer().risk_level(expected, 0));
        }
    }

    #[test]
    fn test_age_bracket_boundaries() {
        let now = Utc::now();
        let s = scorer();
        let expectations = [
            (0, dec!(0)),
            (6, dec!(0)),
            (7, dec!(5)),
            (29, dec!(5)),
            (30, dec!(10)),
            (89, dec!(10)),
            (90, dec!(15)),
            (179, dec!(15)),
            (180, dec!(20)),
            (364, dec!(20)),
            (365, dec!(25)),
            (3650, dec!(25)),
        ];
        for (days, points) in expectations {
            assert_eq!(s.account_age_score(&user(now, days, false), now), points, "{} days", days);
        }

        let mut future = user(now, 0, false);
        future.created_at = now + Duration::days(30);
        assert_eq!(s.account_age_score(&future, now), Decimal::ZERO);
    }

    #[test]
    fn test_transaction_volume_bonus_saturates() {
        let now = Utc::now();
        let s = scorer();
        let id = Uuid::new_v4();

        assert_eq!(s.transaction_history_score(&transactions(id, 50, 0, now)), dec!(22.5));
        assert_eq!(s.transaction_history_score(&transactions(id, 100, 0, now)), dec!(25.0));
        assert_eq!(s.transaction_history_score(&transactions(id, 500, 0, now)), dec!(25.0));
        // 3 of 4 succeeded: 0.75 * 20 + 0.04 * 5
        assert_eq!(s.transaction_history_score(&transactions(id, 3, 1, now)), dec!(15.2));
    }

    #[test]
    fn test_pending_transactions_count_toward_total_only() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut txs = transactions(id, 1, 0, now);
        txs.push(Transaction {
            id: Uuid::new_v4(),
            user_id: id,
            amount: dec!(5.00),
            status: TransactionStatus::Pending,
            created_at: now,
        });

        // 0.5 * 20 + 0.02 * 5
        assert_eq!(scorer().transaction_history_score(&txs), dec!(10.1));
    }

    #[test]
    fn test_verification_points() {
        let now = Utc::now();
        let s = scorer();
        let mut u = user(now, 10, false);
        assert_eq!(s.verification_score(&u), dec!(0.0));
        u.email_verified = true;
        assert_eq!(s.verification_score(&u), dec!(5.0));
        u.phone_verified = true;
        assert_eq!(s.verification_score(&u), dec!(10.0));
        u.kyc_verified = true;
        assert_eq!(s.verification_score(&u), dec!(20.0));
        u.two_factor_enabled = true;
        assert_eq!(s.verification_score(&u), dec!(25.0));
    }

    #[test]
    fn test_community_rating_from_average() {
        let now = Utc::now();
        let s = scorer();
        let id = Uuid::new_v4();
        assert_eq!(s.community_rating_score(&[]), dec!(12.5));
        assert_eq!(s.community_rating_score(&reviews(id, &[1], now)), dec!(5.0));
        assert_eq!(s.community_rating_score(&reviews(id, &[4, 2], now)), dec!(15.0));
        assert_eq!(s.community_rating_score(&reviews(id, &[5, 5], now)), dec!(25.0));
    }

    #[test]
    fn test_risk_level_thresholds() {
        let s = scorer();
        assert_eq!(s.risk_level(100, 0), RiskLevel::Low);
        assert_eq!(s.risk_level(80, 0), RiskLevel::Low);
        assert_eq!(s.risk_level(79, 0), RiskLevel::Medium);
        assert_eq!(s.risk_level(60, 0), RiskLevel::Medium);
        assert_eq!(s.risk_level(59, 0), RiskLevel::High);
        assert_eq!(s.risk_level(40, 0), RiskLevel::High);
        assert_eq!(s.risk_level(39, 0), RiskLevel::Critical);
        assert_eq!(s.risk_level(0, 0), RiskLevel::Critical);
    }

    #[test]
    fn test_three_indicators_force_critical() {
        let s = scorer();
        assert_eq!(s.risk_level(95, 2), RiskLevel::Low);
        assert_eq!(s.risk_level(95, 3), RiskLevel::Critical);
        assert_eq!(s.risk_level(95, 5), RiskLevel::Critical);
    }

    #[test]
    fn test_scores_stay_in_bounds() {
        let now = Utc::now();
        let s = scorer();
        for age in [0, 15, 400] {
            for (ok, bad) in [(0, 0), (0, 7), (3, 3), (250, 1)] {
                for ratings in [vec![], vec![1, 1], vec![3, 4, 5], vec![5]] {
                    for verified in [false, true] {
                        let u = user(now, age, verified);
                        let snapshot = TrustSnapshot {
                            transactions: transactions(u.id, ok, bad, now - Duration::days(1)),
                            reviews: reviews(u.id, &ratings, now),
                            user: u,
                        };
                        let score = s.calculate(&snapshot, now);
                        for sub in [
                            score.sub_scores.transaction_history,
                            score.sub_scores.account_age,
                            score.sub_scores.verification_level,
                            score.sub_scores.community_rating,
                        ] {
                            assert!((0.0..=25.0).contains(&sub));
                        }
                        assert!(score.overall_score <= 100);
                    }
                }
            }
        }
    }

    #[test]
    fn test_fraudulent_user_overridden_to_critical() {
        let now = Utc::now();
        let mut u = user(now, 400, true);
        u.email_verified = false;
        u.failed_login_attempts = 9;
        let snapshot = TrustSnapshot {
            // 21 transactions today, 15 failed
            transactions: transactions(u.id, 6, 15, now),
            reviews: reviews(u.id, &[5, 5], now),
            user: u,
        };

        let score = scorer().calculate(&snapshot, now);
        assert!(score.overall_score >= 60);
        assert_eq!(score.fraud_indicators.len(), 4);
        assert_eq!(score.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_exact_half_rounds_up() {
        let now = Utc::now();
        let mut u = user(now, 400, false);
        u.email_verified = true;
        u.phone_verified = true;
        let snapshot = TrustSnapshot {
            // 17/30 * 20 + 30/100 * 5 = 12.8333..., ratings average 7/3 gives 11.6666...
            transactions: transactions(u.id, 17, 13, now - Duration::days(20)),
            reviews: reviews(u.id, &[2, 2, 3], now),
            user: u,
        };

        let score = scorer().calculate(&snapshot, now);

        // 12.8333... + 25 + 10 + 11.6666... is exactly 59.5
        assert_eq!(score.overall_score, 60);
        assert_eq!(score.risk_level, RiskLevel::Medium);
        assert_eq!(score.fraud_indicators, vec!["KYC pending"]);
    }

    #[test]
    fn test_overall_matches_exact_fraction_rounding() {
        let now = Utc::now();
        let s = scorer();
        let mut u = user(now, 400, false);
        u.email_verified = true;
        u.phone_verified = true;

        for n in 1..=30i64 {
            for succeeded in 0..=n {
                for m in 1..=3i64 {
                    for r in m..=5 * m {
                        let mut ratings = vec![1i32; m as usize];
                        let mut left = r - m;
                        for rating in ratings.iter_mut() {
                            let bump = left.min(4);
                            *rating += bump as i32;
                            left -= bump;
                        }
                        let snapshot = TrustSnapshot {
                            transactions: transactions(
                                u.id,
                                succeeded as usize,
                                (n - succeeded) as usize,
                                now - Duration::days(20),
                            ),
                            reviews: reviews(u.id, &ratings, now),
                            user: u.clone(),
                        };

                        // 20s/n + n/20 + 5r/m + 35 as one fraction over 100nm
                        let num = 2000 * succeeded * m + 5 * n * n * m + 500 * r * n + 3500 * n * m;
                        let den = 100 * n * m;
                        let expected = ((2 * num + den) / (2 * den)) as u8;

                        assert_eq!(
                            s.calculate(&snapshot, now).overall_score,
                            expected,
                            "{} of {} succeeded, ratings {:?}",
                            succeeded,
                            n,
                            ratings
                        );
                    }
                }
            }
        }
    }
}
