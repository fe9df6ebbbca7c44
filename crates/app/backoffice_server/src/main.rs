//! Back-office API server binary.
//!
//! Reads configuration from the environment (and `.env`), runs migrations,
//! optionally seeds an administrator, then serves the API until Ctrl-C.

use std::sync::Arc;

use backoffice_api::AppState;
use backoffice_api::config::ApiConfig;
use backoffice_core::notify::{LogNotifier, Notifier};
use backoffice_core::services::{Services, Stores};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "backoffice_server", about = "Back-office API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/backoffice"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep all state in memory instead of PostgreSQL. Data is lost on exit.
    #[arg(long, default_value_t = false)]
    memory: bool,

    /// Seed an administrator with this email at start-up.
    #[arg(long, env = "ADMIN_EMAIL", requires = "admin_password")]
    admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    #[arg(long, env = "ADMIN_NAME", default_value = "Administrator")]
    admin_name: String,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,backoffice_api=debug,backoffice_core=debug",
                )
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    config.bind_addr = args.bind;
    config.pg_connection_url = args.database_url;
    info!(?config, memory = args.memory, "starting backoffice_server");

    let stores = if args.memory {
        warn!("using in-memory stores");
        Stores::in_memory()
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.pg_connection_url)
            .await?;

        info!("running database migrations");
        backoffice_api::migrate(&pool).await?;
        Stores::postgres(pool)
    };

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let services = Arc::new(Services::new(
        stores,
        notifier,
        &config.service_settings(),
    )?);

    if let (Some(email), Some(password)) = (&args.admin_email, &args.admin_password) {
        let admin = services
            .lifecycle
            .bootstrap_admin(email, &args.admin_name, password)
            .await?;
        info!(uuid = %admin.uuid, "administrator available");
    }

    let app = backoffice_api::router(AppState { services });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
