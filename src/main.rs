use anyhow::Context;
use clap::{Parser, Subcommand};
use hrplatform::{
    config,
    db::{self, pool::CatalogPool},
    email::EmailService,
    state::AppState,
    tenant::registrar::Registrar,
};
use std::net::SocketAddr;
use tracing::info;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hrplatform", about = "Multi-Tenant HR Platform Control Plane", version)]
struct Cli {
    /// Path to TOML config file
    #[arg(short, long, default_value = "platform.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialise data directories and the catalog database
    Bootstrap,
    /// Start the HTTP API server
    Serve,
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging from RUST_LOG (default: info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hrplatform=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Bootstrap => bootstrap(cfg).await,
        Commands::Serve => serve(cfg).await,
    }
}

// ── Bootstrap ──────────────────────────────────────────────────────────────

async fn bootstrap(cfg: config::PlatformConfig) -> anyhow::Result<()> {
    info!("Starting bootstrap...");

    if let Some(parent) = cfg.catalog_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create catalog directory")?;
    }
    std::fs::create_dir_all(&cfg.database.dir)
        .context("failed to create tenant databases directory")?;

    let catalog_path = cfg
        .catalog_path
        .to_str()
        .context("catalog_path is not valid UTF-8")?;
    let catalog = CatalogPool::open(catalog_path, 1).context("failed to open catalog")?;
    db::run_migrations(&catalog).context("failed to run catalog migrations")?;
    info!("Catalog migrations applied");

    info!("Bootstrap complete.");
    Ok(())
}

// ── Serve ──────────────────────────────────────────────────────────────────

async fn serve(cfg: config::PlatformConfig) -> anyhow::Result<()> {
    info!("Opening catalog (4 reader connections)...");
    let catalog_path = cfg
        .catalog_path
        .to_str()
        .context("catalog_path is not valid UTF-8")?;
    let catalog = CatalogPool::open(catalog_path, 4).context("failed to open catalog")?;
    db::run_migrations(&catalog).context("failed to run catalog migrations")?;

    std::fs::create_dir_all(&cfg.database.dir)
        .context("failed to create tenant databases directory")?;

    let registrar = Registrar::new(&cfg);

    // Email service (only if SMTP is configured)
    let email = cfg.smtp.as_ref().and_then(|smtp_cfg| {
        match EmailService::new(smtp_cfg) {
            Ok(svc) => {
                info!(
                    "Email service ready (SMTP: {}:{})",
                    smtp_cfg.host, smtp_cfg.port
                );
                Some(svc)
            }
            Err(e) => {
                tracing::warn!(
                    "SMTP not available: {} — welcome emails will be skipped",
                    e
                );
                None
            }
        }
    });
    if email.is_none() {
        info!("No SMTP configured; tenant welcome emails will be logged only");
    }

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid bind address")?;

    let state = AppState::new(cfg, catalog, registrar, email);
    let app = hrplatform::routes::app(state);

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
