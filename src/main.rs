pub mod config;
pub mod error;
pub mod routes;
pub mod store;
pub mod studies;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aide::axum::ApiRouter;
use aide::openapi::OpenApi;
use axum::{Extension, Router};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{resolve_db_url, validate_schema, CoordinateColumns, QueryLimits};
use crate::routes::dissociate::dissociate_routes;
use crate::routes::docs::docs_routes;
use crate::routes::studies_routes;
use crate::routes::system::system_routes;
use crate::store::postgres::PgStudyStore;
use crate::store::StudyStore;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn StudyStore>,
    limits: QueryLimits,
    image: PathBuf,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[clap(
        long,
        env = "DB_URL",
        hide_env_values = true,
        help = "Database connection string"
    )]
    db_url: Option<String>,
    #[clap(
        long,
        env = "DATABASE_URL",
        hide_env_values = true,
        help = "Fallback connection string, used when --db-url is not set"
    )]
    database_url: Option<String>,
    #[clap(
        long,
        env = "NS_SCHEMA",
        default_value = "ns",
        help = "Schema holding the coordinates, metadata and annotations_terms tables"
    )]
    schema: String,
    #[clap(long, value_enum, default_value_t = CoordinateColumns::Xyz)]
    coordinate_columns: CoordinateColumns,
    #[clap(long, default_value = "2000", help = "Maximum rows returned by a study query")]
    max_rows: u32,
    #[clap(long, default_value = "200", help = "Maximum study ids echoed in a response")]
    display_cap: usize,
    #[clap(long, default_value = "100", help = "Metadata rows fetched per non-empty result")]
    sample_size: u32,
    #[clap(long, default_value = "5")]
    pool_size: u32,
    #[clap(long, default_value = "5", help = "Seconds to wait for a pooled connection")]
    acquire_timeout: u64,
    #[clap(long, default_value = "static/amygdala.gif")]
    image: PathBuf,
    #[clap(long, default_value = "0.0.0.0")]
    host: String,
    #[clap(long, default_value = "8000")]
    port: u16,
    #[clap(long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..))]
    workers: u16,
}

fn app(app_state: AppState) -> Router {
    let mut api = OpenApi::default();

    let app = ApiRouter::new()
        .merge(system_routes(&app_state))
        .merge(studies_routes())
        .nest_api_service("/dissociate", dissociate_routes(app_state.clone()))
        .nest_api_service("/docs", docs_routes(app_state.clone()));

    app.finish_api(&mut api)
        .layer(Extension(api))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn serve(args: Args) -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format!(
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_url = resolve_db_url(args.db_url, args.database_url)?;
    validate_schema(&args.schema)?;

    tracing::info!(
        "Using schema '{}' with {:?} coordinate columns",
        args.schema,
        args.coordinate_columns
    );
    let store = PgStudyStore::connect_lazy(
        &db_url,
        args.schema,
        args.coordinate_columns,
        PgPoolOptions::new()
            .max_connections(args.pool_size)
            .acquire_timeout(Duration::from_secs(args.acquire_timeout)),
    )?;
    let app_state = AppState {
        store: Arc::new(store),
        limits: QueryLimits {
            max_rows: args.max_rows,
            display_cap: args.display_cap,
            sample_size: args.sample_size,
        },
        image: args.image,
    };

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", args.host, args.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app(app_state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Closing database pool");
    app_state.store.close().await;
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(usize::from(args.workers))
        .enable_all()
        .build()?
        .block_on(async { serve(args).await })
}
