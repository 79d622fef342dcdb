use crate::config::FraudConfig;
use crate::models::{TransactionStatus, TrustSnapshot};
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Rule-based red flags. Indicators are reported, not scored; only their
/// count feeds into the risk level.
#[derive(Debug, Clone, PartialEq)]
pub enum FraudIndicator {
    ExcessiveFailedLogins(u32),
    HighFailureRate(f64),
    HighVelocity { count: usize, window_days: i64 },
    EmailNotVerified,
    KycPending,
}

impl fmt::Display for FraudIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FraudIndicator::ExcessiveFailedLogins(count) => {
                write!(f, "Excessive failed login attempts ({})", count)
            }
            FraudIndicator::HighFailureRate(rate) => {
                write!(f, "High transaction failure rate ({:.0}%)", rate * 100.0)
            }
            FraudIndicator::HighVelocity { count, window_days } => write!(
                f,
                "Unusual transaction velocity ({} in {} days)",
                count, window_days
            ),
            FraudIndicator::EmailNotVerified => write!(f, "Email not verified"),
            FraudIndicator::KycPending => write!(f, "KYC pending"),
        }
    }
}

pub struct FraudDetector {
    config: FraudConfig,
}

impl FraudDetector {
    pub fn new(config: FraudConfig) -> Self {
        FraudDetector { config }
    }

    pub fn detect(&self, snapshot: &TrustSnapshot, now: DateTime<Utc>) -> Vec<FraudIndicator> {
        let mut indicators = Vec::new();

        let failed_logins = snapshot.user.failed_login_attempts.max(0) as u32;
        if failed_logins > self.config.max_failed_logins {
            indicators.push(FraudIndicator::ExcessiveFailedLogins(failed_logins));
        }

        if let Some(rate) = self.failure_rate(snapshot) {
            if rate > self.config.max_failure_rate {
                indicators.push(FraudIndicator::HighFailureRate(rate));
            }
        }

        let recent = self.recent_transaction_count(snapshot, now);
        if recent > self.config.max_transactions_in_window {
            indicators.push(FraudIndicator::HighVelocity {
                count: recent,
                window_days: self.config.velocity_window_days,
            });
        }

        if !snapshot.user.email_verified {
            indicators.push(FraudIndicator::EmailNotVerified);
        }

        if !snapshot.user.kyc_verified {
            indicators.push(FraudIndicator::KycPending);
        }

        indicators
    }

    /// None when the user has no transactions.
    fn failure_rate(&self, snapshot: &TrustSnapshot) -> Option<f64> {
        if snapshot.transactions.is_empty() {
            return None;
        }

        let failed = snapshot
            .transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Failed)
            .count();

        Some(failed as f64 / snapshot.transactions.len() as f64)
    }

    fn recent_transaction_count(&self, snapshot: &TrustSnapshot, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(self.config.velocity_window_days);
        snapshot
            .transactions
            .iter()
            .filter(|tx| tx.created_at >= cutoff)
            .count()
    }
}
