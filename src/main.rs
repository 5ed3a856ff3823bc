//! marketplace-billing server binary.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use marketplace_billing::adapters::cache::RedisCacheInvalidator;
use marketplace_billing::adapters::catalog::StaticPlanCatalog;
use marketplace_billing::adapters::http::{app_router, BillingAppState, BillingPorts, BillingSettings};
use marketplace_billing::adapters::memory::NoopCacheInvalidator;
use marketplace_billing::adapters::mercadopago::{MercadoPagoConfig, MercadoPagoGateway};
use marketplace_billing::adapters::postgres::{
    PostgresAuditLog, PostgresBillingUnitOfWork, PostgresBusinessDirectory,
    PostgresPaymentRepository, PostgresSubscriptionRepository, PostgresWebhookEventRepository,
};
use marketplace_billing::application::handlers::billing::{
    CheckoutSettings, ExpireLapsedPlansHandler, PurgeWebhookEventsHandler,
};
use marketplace_billing::config::{AppConfig, ConfigError, ValidationError};
use marketplace_billing::domain::foundation::{DomainError, Timestamp};
use marketplace_billing::ports::{BackUrls, CacheInvalidator, GatewayError, PlanCatalog};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("payment gateway: {0}")]
    Gateway(#[from] GatewayError),
    #[error("plan catalog: {0}")]
    Catalog(#[from] DomainError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = %e, "marketplace-billing failed to start");
        eprintln!("marketplace-billing: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let pool = config.database.connect().await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let cache: Arc<dyn CacheInvalidator> = match &config.redis {
        Some(redis_config) => {
            let client = redis::Client::open(redis_config.url.as_str())?;
            let conn = client.get_multiplexed_async_connection().await?;
            Arc::new(RedisCacheInvalidator::new(conn))
        }
        None => {
            tracing::info!("Redis not configured, cache invalidation disabled");
            Arc::new(NoopCacheInvalidator)
        }
    };

    let catalog: Arc<dyn PlanCatalog> = match &config.billing.plan_catalog_path {
        Some(path) => Arc::new(StaticPlanCatalog::from_yaml_file(path)?),
        None => Arc::new(StaticPlanCatalog::with_defaults(&config.billing.currency)),
    };

    let gateway = MercadoPagoGateway::new(
        MercadoPagoConfig::new(SecretString::new(config.payment.access_token.clone()))
            .with_base_url(config.payment.api_base_url.clone())
            .with_timeout(config.payment.gateway_timeout()),
    )?;

    let subscriptions = Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let unit_of_work = Arc::new(PostgresBillingUnitOfWork::new(pool.clone()));
    let webhook_events = Arc::new(PostgresWebhookEventRepository::new(pool.clone()));

    let ports = BillingPorts {
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        plans: subscriptions.clone(),
        trials: subscriptions.clone(),
        unit_of_work: unit_of_work.clone(),
        webhook_events: webhook_events.clone(),
        gateway: Arc::new(gateway),
        catalog,
        cache: cache.clone(),
        audit_log: Arc::new(PostgresAuditLog::new(pool.clone())),
        businesses: Arc::new(PostgresBusinessDirectory::new(pool.clone())),
    };

    let settings = BillingSettings {
        webhook_secret: SecretString::new(config.payment.webhook_secret.clone()),
        checkout: CheckoutSettings {
            notification_url: config.server.notification_url(&config.payment.processor),
            back_urls: BackUrls {
                success: config.payment.success_url.clone().unwrap_or_default(),
                failure: config.payment.failure_url.clone().unwrap_or_default(),
                pending: config.payment.pending_url.clone().unwrap_or_default(),
            },
        },
        subscription_days: config.billing.subscription_days,
        trial_days: config.billing.trial_days,
    };

    spawn_maintenance(
        ExpireLapsedPlansHandler::new(subscriptions, unit_of_work, cache, 500),
        PurgeWebhookEventsHandler::new(webhook_events, config.billing.webhook_retention_days),
        config.billing.maintenance_interval(),
    );

    let mut app = app_router(
        BillingAppState::new(ports, settings),
        config.server.request_timeout(),
    );

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    if !origins.is_empty() {
        app = app.layer(CorsLayer::new().allow_origin(AllowOrigin::list(origins)));
    }

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "marketplace-billing listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("marketplace-billing stopped");
    Ok(())
}

/// Runs the plan expiry and ledger retention sweeps on a fixed interval.
fn spawn_maintenance(
    expire: ExpireLapsedPlansHandler,
    purge: PurgeWebhookEventsHandler,
    every: std::time::Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let now = Timestamp::now();
            match expire.handle(now).await {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired, "Expiry sweep finished"),
                Err(e) => tracing::error!(error = %e, alert = e.is_alerting(), "Expiry sweep failed"),
            }
            if let Err(e) = purge.handle(now).await {
                tracing::warn!(error = %e, "Webhook retention sweep failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
