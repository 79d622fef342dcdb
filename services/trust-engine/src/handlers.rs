use crate::errors::TrustError;
use crate::metrics;
use crate::middleware::AuthenticatedUser;
use crate::models::*;
use crate::service::TrustService;
use actix_web::{web, HttpResponse};
use prometheus::Registry;
use std::sync::Arc;
use uuid::Uuid;

// ===== Health Check =====
pub async fn health_check(service: web::Data<Arc<TrustService>>) -> HttpResponse {
    let (status, store) = match service.health().await {
        Ok(()) => ("healthy", "connected"),
        Err(_) => ("degraded", "disconnected"),
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store.to_string(),
    };

    if status == "healthy" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

// ===== Metrics =====
pub async fn metrics_endpoint(registry: web::Data<Registry>) -> Result<HttpResponse, TrustError> {
    let body = metrics::render(registry.get_ref())
        .map_err(|e| TrustError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

// ===== Caller's Own Score =====
pub async fn get_my_score(
    caller: AuthenticatedUser,
    service: web::Data<Arc<TrustService>>,
) -> Result<HttpResponse, TrustError> {
    let score = service.compute_trust_score(caller.0).await?;
    Ok(HttpResponse::Ok().json(score))
}

// ===== Another User's Public Score =====
pub async fn get_user_score(
    path: web::Path<Uuid>,
    service: web::Data<Arc<TrustService>>,
) -> Result<HttpResponse, TrustError> {
    let score = service.public_trust_score(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(score))
}

// ===== Submit Review =====
pub async fn submit_review(
    caller: AuthenticatedUser,
    req: web::Json<SubmitReviewRequest>,
    service: web::Data<Arc<TrustService>>,
) -> Result<HttpResponse, TrustError> {
    let review = service.submit_review(caller.0, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(review))
}

// ===== List Reviews =====
pub async fn list_reviews(
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
    service: web::Data<Arc<TrustService>>,
) -> Result<HttpResponse, TrustError> {
    let page = service
        .list_reviews(path.into_inner(), query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// JSON body errors (missing fields, fractional ratings) become validation errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req| TrustError::Validation(err.to_string()).into())
}

/// Malformed `page`/`limit` become validation errors.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| TrustError::Validation(err.to_string()).into())
}

// ===== Configure Routes =====
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(
            web::scope("/api/v1/trust")
                .route("/score", web::get().to(get_my_score))
                .route("/user/{id}", web::get().to(get_user_score))
                .route("/review", web::post().to(submit_review))
                .route("/reviews/{id}", web::get().to(list_reviews)),
        )
        .route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics_endpoint));
}
