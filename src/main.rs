use academy::application::auth::AuthService;
use academy::application::cohorts::CohortService;
use academy::application::enrollment::EnrollmentService;
use academy::config::{ProviderChoice, Settings};
use academy::domain::payment::ProviderStatus;
use academy::domain::ports::{ProviderRef, StoreRef};
use academy::infrastructure::in_memory::InMemoryStore;
use academy::infrastructure::paystack::PaystackClient;
use academy::infrastructure::sandbox::SandboxProvider;
use academy::infrastructure::signature::WebhookSigner;
use academy::infrastructure::tokens::TokenService;
use academy::interfaces::http::{self, AppState};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Academy enrollment and payments API", long_about = None)]
struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Path to persistent database (overrides DB_PATH). Requires the
    /// `storage-rocksdb` feature; otherwise data is kept in memory.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Payment provider (overrides PAYMENT_PROVIDER)
    #[arg(long, value_enum)]
    provider: Option<ProviderChoice>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::from_env().into_diagnostic()?;
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(db_path) = cli.db_path {
        settings.db_path = Some(db_path);
    }
    if let Some(provider) = cli.provider {
        settings.provider = provider;
    }
    info!(?settings, "starting");

    let store = open_store(&settings)?;
    let provider: ProviderRef = match settings.provider {
        ProviderChoice::Paystack => Arc::new(PaystackClient::new(
            settings.paystack_base_url.clone(),
            settings.paystack_secret_key.clone(),
        )),
        ProviderChoice::Sandbox => {
            Arc::new(SandboxProvider::new(settings.app_url.clone(), ProviderStatus::Success))
        }
    };

    let tokens = TokenService::new(&settings.jwt_access_secret, &settings.jwt_refresh_secret);
    let state = AppState::new(
        EnrollmentService::new(
            store.clone(),
            provider,
            tokens.clone(),
            settings.default_callback_url(),
        ),
        AuthService::new(store.clone(), tokens),
        CohortService::new(store),
        WebhookSigner::new(&settings.paystack_secret_key).into_diagnostic()?,
    );

    let listener = tokio::net::TcpListener::bind(settings.bind_addr())
        .await
        .into_diagnostic()?;
    http::serve(listener, state, shutdown_signal())
        .await
        .into_diagnostic()?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutting down");
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(settings: &Settings) -> Result<StoreRef> {
    use academy::infrastructure::rocksdb::RocksDBStore;

    match &settings.db_path {
        Some(path) => {
            info!(path = %path.display(), "using RocksDB storage");
            Ok(Arc::new(RocksDBStore::open(path).into_diagnostic()?))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(settings: &Settings) -> Result<StoreRef> {
    if let Some(path) = &settings.db_path {
        tracing::warn!(
            path = %path.display(),
            "WARNING: built without `storage-rocksdb`; falling back to in-memory storage"
        );
    }
    Ok(Arc::new(InMemoryStore::new()))
}
