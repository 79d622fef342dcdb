pub mod config;
pub mod database;
pub mod errors;
pub mod fraud;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod scoring;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use scoring::TrustScorer;
pub use service::TrustService;
pub use store::{InMemoryTrustStore, TrustStore};
