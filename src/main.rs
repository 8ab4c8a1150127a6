//! media-checkout server entry point.
//!
//! Starts the Axum HTTP server with the checkout, access, and admin
//! endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::StatusCode;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use media_checkout::api;
use media_checkout::app_state::AppState;
use media_checkout::catalog::{ContentCatalog, InMemoryCatalog};
use media_checkout::config::{CheckoutConfig, LogFormat};
use media_checkout::domain::{EventBus, SiteSettings};
use media_checkout::gateway::{ZarinpalClient, ZarinpalConfig};
use media_checkout::identity::{IdentityProvider, StaticIdentity};
use media_checkout::ledger::{InMemoryLedger, PurchaseLedger};
use media_checkout::persistence::{
    MIGRATOR, PgCatalog, PgEventLog, PgIdentity, PgLedger, load_site_settings,
};
use media_checkout::service::{CheckoutService, spawn_sweeper};

struct Backends {
    ledger: Arc<dyn PurchaseLedger>,
    catalog: Arc<dyn ContentCatalog>,
    identity: Arc<dyn IdentityProvider>,
    settings: SiteSettings,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn connect(config: &CheckoutConfig, event_bus: &EventBus) -> anyhow::Result<Backends> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled, using in-memory stores");
        return Ok(Backends {
            ledger: Arc::new(InMemoryLedger::new()),
            catalog: Arc::new(InMemoryCatalog::new()),
            identity: Arc::new(StaticIdentity::new()),
            settings: SiteSettings::default(),
        });
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;
    MIGRATOR
        .run(&pool)
        .await
        .context("applying database migrations")?;
    tracing::info!("database ready");

    if config.event_log_enabled {
        PgEventLog::new(pool.clone()).spawn(event_bus.subscribe());
    }

    let settings = load_site_settings(&pool)
        .await
        .context("loading site settings")?;

    Ok(Backends {
        ledger: Arc::new(PgLedger::new(pool.clone())),
        catalog: Arc::new(PgCatalog::new(pool.clone())),
        identity: Arc::new(PgIdentity::new(pool)),
        settings,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = CheckoutConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting media-checkout");
    if config.zarinpal_merchant_id.is_empty() {
        tracing::warn!("ZARINPAL_MERCHANT_ID is not set; payment requests will be rejected");
    }

    // Build domain and persistence layers
    let event_bus = EventBus::new(config.event_bus_capacity);
    let backends = connect(&config, &event_bus).await?;
    if backends.settings.maintenance_mode {
        tracing::warn!("maintenance mode is on, new checkouts are refused");
    }

    let gateway = ZarinpalClient::new(ZarinpalConfig::new(
        config.zarinpal_merchant_id.clone(),
        config.zarinpal_sandbox,
        config.gateway_timeout(),
    ))
    .context("building payment gateway client")?;

    // Build service layer
    let checkout = Arc::new(CheckoutService::new(
        backends.ledger,
        backends.catalog,
        Arc::new(gateway),
        event_bus,
        &config.public_base_url,
    ));

    if let Some(max_age) = config.pending_expiry() {
        spawn_sweeper(Arc::clone(&checkout), max_age, config.sweep_interval());
        tracing::info!(
            max_age_secs = max_age.as_secs(),
            interval_secs = config.sweep_interval().as_secs(),
            "pending sweep scheduled"
        );
    }

    // Build application state
    let app_state = AppState {
        checkout,
        identity: backends.identity,
        settings: Arc::new(backends.settings),
        admin_token: config.admin_token.as_deref().map(Arc::from),
    };

    // Build router
    let app = Router::new().merge(api::build_router());
    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };
    let app = app
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
