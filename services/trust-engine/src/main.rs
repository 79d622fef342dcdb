use actix_cors::Cors;
use actix_web::{dev::Service, middleware, web, App, HttpServer};
use dotenv::dotenv;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use trust_engine::{
    config::Config,
    database::{self, PgTrustStore},
    handlers, metrics,
    middleware::{JwtAuth, RateLimiter},
    scoring::TrustScorer,
    service::TrustService,
};

/// How often idle reviewer quotas are dropped.
const RATE_LIMIT_PRUNE_SECS: u64 = 600;

fn startup_error(msg: String) -> std::io::Error {
    error!("{}", msg);
    std::io::Error::new(std::io::ErrorKind::Other, msg)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Trust Engine...");

    let config = Config::from_env()
        .map_err(|e| startup_error(format!("Failed to load configuration: {}", e)))?;
    config
        .validate()
        .map_err(|e| startup_error(format!("Invalid configuration: {}", e)))?;
    info!("Configuration loaded successfully");

    info!("Connecting to database");
    let pool = database::create_pool(&config.database.url, config.database.max_connections)
        .await
        .map_err(|e| startup_error(format!("Database connection failed: {}", e)))?;

    database::health_check(&pool)
        .await
        .map_err(|e| startup_error(format!("Database health check failed: {}", e)))?;
    info!("Database health check passed");

    let registry = Registry::new();
    metrics::register_metrics(&registry)
        .map_err(|e| startup_error(format!("Failed to register metrics: {}", e)))?;

    let scorer = TrustScorer::new(config.scoring.clone(), config.fraud.clone());
    let service = Arc::new(
        TrustService::new(
            Arc::new(PgTrustStore::new(pool)),
            scorer,
            config.rate_limit.reviews_per_hour,
        )
        .map_err(|e| startup_error(e.to_string()))?,
    );
    let pruned = service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(RATE_LIMIT_PRUNE_SECS));
        loop {
            interval.tick().await;
            pruned.prune_rate_limits();
        }
    });

    let rate_limiter = RateLimiter::new(config.rate_limit.requests_per_minute);
    let jwt_secret = config.auth.jwt_secret.clone();

    info!("Trust components initialized successfully");

    let server_config = config.server.clone();
    info!(
        "Starting HTTP server on {}:{}",
        server_config.host, server_config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .app_data(web::Data::new(registry.clone()))
            .wrap(JwtAuth::new(jwt_secret.clone()))
            .wrap(rate_limiter.clone())
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let fut = srv.call(req);
                async move {
                    let result = fut.await;
                    metrics::record_http_request(&method, &result);
                    result
                }
            })
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .workers(server_config.workers)
    .bind((server_config.host, server_config.port))?
    .run()
    .await
}
