use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod blob;
mod config;
mod dto;
mod error;
mod handlers;
mod models;
mod services;
mod store;
#[cfg(test)]
mod test_support;

use auth::gate::{SharedSecretGate, WriteGate};
use auth::middleware::{require_upload_secret, UPLOAD_SECRET_HEADER};
use auth::rate_limit::RateLimitState;
use blob::gcs::GcsBlobStore;
use blob::gcs_auth::{GcsAuth, GcsCredentials};
use blob::local::LocalBlobStore;
use blob::BlobStore;
use config::{BlobBackend, Config};
use store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub blob: Arc<dyn BlobStore>,
    pub records: RecordStore,
    pub gate: Arc<dyn WriteGate>,
    pub rate_limiter: RateLimitState,
}

async fn build_blob_store(config: &Config) -> anyhow::Result<Arc<dyn BlobStore>> {
    match config.blob_backend {
        BlobBackend::Gcs => {
            let credentials = GcsCredentials::from_config(config)?;
            let store = GcsBlobStore::new(
                config.gcs_bucket.clone(),
                config.gcs_public_base_url.clone(),
                GcsAuth::new(credentials),
            )?;
            tracing::info!(bucket = %config.gcs_bucket, "Using GCS blob store");
            Ok(Arc::new(store))
        }
        BlobBackend::Local => {
            let store = LocalBlobStore::new(
                &config.local_blob_dir,
                config.local_public_base_url.clone(),
            )
            .await?;
            tracing::info!(dir = %config.local_blob_dir.display(), "Using local blob store");
            Ok(Arc::new(store))
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .into_iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(UPLOAD_SECRET_HEADER),
        ])
}

pub fn app_router(state: AppState) -> Router {
    let config = state.config.clone();
    let gate = || middleware::from_fn_with_state(state.clone(), require_upload_secret);

    // route_layer on a MethodRouter covers only the methods added before it,
    // so the GETs on shared paths stay public.
    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route(
            "/api/daily-records",
            post(handlers::daily_records::submit_daily_record)
                .route_layer(gate())
                .get(handlers::daily_records::list_daily_records),
        )
        .route(
            "/api/reflections",
            post(handlers::reflections::submit_reflection)
                .route_layer(gate())
                .get(handlers::reflections::list_reflections),
        )
        .route("/api/stats/weekly", get(handlers::stats::weekly_stats))
        .route("/api/stats/overview", get(handlers::stats::overview))
        .route("/api/meals/weekly", get(handlers::stats::weekly_meals));

    if config.blob_backend == BlobBackend::Local {
        app = app.route("/files/:name", get(handlers::files::serve_file));
    }

    app.layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habitlog_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);
    tracing::debug!(?config, "Configuration loaded");

    let blob = build_blob_store(&config).await?;
    let gate: Arc<dyn WriteGate> = Arc::new(SharedSecretGate::new(&config.upload_secret)?);

    let rate_limiter = RateLimitState::new();
    rate_limiter.spawn_cleanup_worker();

    let state = AppState {
        config: config.clone(),
        records: RecordStore::new(blob.clone()),
        blob,
        gate,
        rate_limiter,
    };

    let app = app_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    // Connect info gives the rate limiter a client IP
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
