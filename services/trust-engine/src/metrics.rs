use actix_web::dev::ServiceResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use lazy_static::lazy_static;

lazy_static! {
    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("trust_http_requests_total", "Total HTTP requests"),
        &["method", "status"]
    ).expect("metric can be created");

    // Business metrics - Trust Engine specific
    pub static ref TRUST_SCORES_COMPUTED: IntCounterVec = IntCounterVec::new(
        Opts::new("trust_scores_computed_total", "Trust scores computed by resulting risk level"),
        &["risk_level"]
    ).expect("metric can be created");

    pub static ref TRUST_SCORE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("trust_score_duration_seconds", "Read-and-score latency in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["visibility"]
    ).expect("metric can be created");

    pub static ref REVIEWS_SUBMITTED: IntCounter = IntCounter::new(
        "trust_reviews_submitted_total",
        "Total reviews accepted"
    ).expect("metric can be created");

    pub static ref REVIEWS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("trust_reviews_rejected_total", "Review submissions rejected by reason"),
        &["reason"]
    ).expect("metric can be created");
}

/// Register all metrics with the given registry
pub fn register_metrics(registry: &Registry) -> Result<(), Box<dyn std::error::Error>> {
    registry.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    registry.register(Box::new(TRUST_SCORES_COMPUTED.clone()))?;
    registry.register(Box::new(TRUST_SCORE_DURATION.clone()))?;
    registry.register(Box::new(REVIEWS_SUBMITTED.clone()))?;
    registry.register(Box::new(REVIEWS_REJECTED.clone()))?;
    Ok(())
}

/// Counts one finished request. Middleware rejections (401, 429) arrive as
/// `Err` and are counted under the status they render to.
pub fn record_http_request<B>(method: &str, result: &Result<ServiceResponse<B>, actix_web::Error>) {
    let status = match result {
        Ok(res) => res.status(),
        Err(err) => err.as_response_error().status_code(),
    };
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, status.as_str()])
        .inc();
}

/// Generate metrics output in Prometheus text format
pub fn render(registry: &Registry) -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
