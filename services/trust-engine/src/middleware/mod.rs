pub mod auth;
pub mod rate_limit;

pub use auth::{AuthenticatedUser, Claims, JwtAuth};
pub use rate_limit::RateLimiter;
