mod api;
mod config;
mod db;
mod errors;
mod ledger;
mod openapi;
mod provider;
mod tasks;
mod types;

#[cfg(test)]
mod test_utils;

use crate::{
    api::handlers::{balances, charges, redemption_codes, redemptions, referrals, transactions},
    db::{LedgerStore, PgLedgerStore},
    ledger::{ChargeGuard, MilestoneEvaluator, RedemptionService},
    openapi::ApiDoc,
    provider::{OpenAiCompatibleProvider, TextProvider},
    tasks::{PgTaskStore, TaskStore},
};
use axum::{
    http::{header, HeaderValue, Method, Request, Response},
    routing::{get, post},
    Router,
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use clap::Parser;
use config::{Args, Config, CorsOrigin};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, Span};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

#[derive(Clone, Builder)]
pub struct AppState<S: LedgerStore> {
    pub ledger: S,
    pub tasks: Arc<dyn TaskStore>,
    pub provider: Arc<dyn TextProvider>,
    pub config: Config,
}

impl<S: LedgerStore> AppState<S> {
    pub fn redemptions(&self) -> RedemptionService<S> {
        RedemptionService::new(self.ledger.clone(), self.config.rewards.referral_base_points)
    }

    pub fn milestones(&self) -> MilestoneEvaluator<S> {
        MilestoneEvaluator::new(self.ledger.clone())
    }

    pub fn charges(&self) -> ChargeGuard<S> {
        ChargeGuard::new(self.ledger.clone())
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router over any ledger store
pub fn build_router<S: LedgerStore>(state: AppState<S>) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Redemption
        .route("/redemptions", post(redemptions::redeem::<S>))
        .route("/redemption-codes", post(redemption_codes::create_redemption_codes::<S>))
        // Paid provider calls
        .route("/charges", post(charges::create_charge::<S>))
        .route("/charges/async", post(charges::create_async_charge::<S>))
        .route("/tasks/{task_id}", get(charges::get_task::<S>))
        // Balances and the transaction log
        .route("/users/{user_id}/balance", get(balances::get_balance::<S>))
        .route("/users/{user_id}/ledger/reconciliation", get(balances::reconcile::<S>))
        .route("/users/{user_id}/transactions", get(transactions::list_transactions::<S>))
        .route("/transactions/{transaction_id}", get(transactions::get_transaction::<S>))
        // Referrals
        .route("/users/{user_id}/invitation-code", post(referrals::ensure_invitation_code::<S>))
        .route("/invitations/register", post(referrals::register_invitation::<S>))
        .route("/users/{user_id}/referrals", get(referrals::get_referral_summary::<S>))
        .route("/users/{user_id}/milestones/evaluate", post(referrals::evaluate_milestones::<S>))
        .layer(ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = %response.status(),
                        latency = ?latency,
                        "request completed"
                    );
                }),
        ))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/docs"));

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    Ok(router)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    debug!("{:?}", args);

    let config = Config::load(&args)?;
    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }
    debug!("Starting with configuration: {:#?}", config);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let task_store = PgTaskStore::new(pool.clone(), config.tasks.ttl);
    let _sweeper = task_store.spawn_sweeper(config.tasks.sweep_interval);

    let state = AppState::builder()
        .ledger(PgLedgerStore::new(pool.clone()))
        .tasks(Arc::new(task_store))
        .provider(Arc::new(OpenAiCompatibleProvider::new(&config.provider)?))
        .config(config.clone())
        .build();

    let router = build_router(state)?;

    let bind_addr = config.bind_address();
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("pointsd listening on http://{}", bind_addr);

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    pool.close().await;
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
