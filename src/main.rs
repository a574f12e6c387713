use clap::Parser;
use confpay::application::intake::IntakeService;
use confpay::application::reconciliation::ReconciliationEngine;
use confpay::application::registration::RegistrationService;
use confpay::config::AppConfig;
use confpay::domain::ports::{Gateways, NotifierRef, OrderStoreRef, SponsorshipStoreRef};
use confpay::infrastructure::cashfree::CashfreeGateway;
use confpay::infrastructure::in_memory::{InMemoryOrderStore, InMemorySponsorshipStore};
use confpay::infrastructure::notifier::LogNotifier;
use confpay::infrastructure::razorpay::RazorpayGateway;
use confpay::interfaces::http::state::AppState;
use confpay::interfaces::http::build_router;
use miette::{IntoDiagnostic, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Listen address
    #[arg(long, env = "CONFPAY_LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "CONFPAY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "CONFPAY_LOG_JSON")]
    json: bool,
}

#[cfg(feature = "storage-rocksdb")]
fn build_stores(db_path: Option<PathBuf>) -> Result<(OrderStoreRef, SponsorshipStoreRef)> {
    match db_path {
        Some(path) => {
            let store = confpay::infrastructure::rocksdb::RocksDbStore::open(path)
                .into_diagnostic()?;
            Ok((Arc::new(store.clone()), Arc::new(store)))
        }
        None => Ok((
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(InMemorySponsorshipStore::new()),
        )),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_stores(db_path: Option<PathBuf>) -> Result<(OrderStoreRef, SponsorshipStoreRef)> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' \
             feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok((
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(InMemorySponsorshipStore::new()),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = AppConfig::from_env().into_diagnostic()?;

    let mut gateways = Gateways::new();
    if let Some(razorpay) = config.razorpay.clone() {
        gateways.register(Arc::new(RazorpayGateway::new(razorpay).into_diagnostic()?));
        info!("razorpay gateway configured");
    }
    if let Some(cashfree) = config.cashfree.clone() {
        gateways.register(Arc::new(
            CashfreeGateway::new(cashfree, config.public_base_url.clone()).into_diagnostic()?,
        ));
        info!("cashfree gateway configured");
    }
    if gateways.is_empty() {
        warn!("no payment gateway configured, registration endpoints will refuse requests");
    }

    let (orders, sponsorships) = build_stores(cli.db_path)?;
    let notifier: NotifierRef = Arc::new(LogNotifier::new());

    let state = AppState::new(
        ReconciliationEngine::new(orders.clone(), gateways.clone(), notifier.clone()),
        RegistrationService::new(orders, gateways),
        IntakeService::new(sponsorships, notifier),
    );
    let app = build_router(state);

    info!(listen = %cli.listen, "confpay listening");
    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .into_diagnostic()?;
    axum::serve(listener, app).await.into_diagnostic()?;
    Ok(())
}
