//! OpenInv CLI
//!
//! # Usage
//!
//! ```bash
//! openinv serve
//! openinv migrate
//! openinv migrate --tenant foobar
//! openinv version
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use inv_store::TenantStore;
use openinv_api::{build_router, ApiState, AuthClient};

#[derive(Parser)]
#[command(name = "openinv")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "OpenInv device inventory service", long_about = None)]
struct Cli {
    /// Listen address for the API server
    #[arg(long, env = "OPENINV_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Snapshot file backing the store; omitted runs in-memory
    #[arg(long, env = "OPENINV_STATE")]
    state: Option<PathBuf>,

    /// External auth validator endpoint; omitted disables verification
    #[arg(long, env = "OPENINV_AUTH_URL")]
    auth_url: Option<String>,

    /// Timeout for auth validator calls, in milliseconds
    #[arg(long, env = "OPENINV_AUTH_TIMEOUT_MS", default_value_t = 5000)]
    auth_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations and serve the API
    Serve,
    /// Apply pending schema migrations and exit
    Migrate {
        /// Migrate a single tenant namespace instead of all of them
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Print the service version
    Version,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Service(#[from] inv_common::Error),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openinv=info,inv_store=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let store = open_store(&cli)?;

    match cli.command {
        Commands::Serve => {
            store.migrate_all()?;
            store.flush()?;

            let auth = AuthClient::new(
                cli.auth_url.clone(),
                Duration::from_millis(cli.auth_timeout_ms),
            )?;
            let app = build_router(ApiState {
                store: Arc::new(store),
                auth,
            });

            info!(listen = %cli.listen, "openinv starting up");
            let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
            axum::serve(listener, app).await?;
            Ok(())
        }
        Commands::Migrate { tenant } => {
            match tenant {
                Some(tenant) => {
                    let applied = store.migrate(Some(&tenant))?;
                    info!(tenant = %tenant, applied = applied.len(), "migration finished");
                }
                None => {
                    store.migrate_all()?;
                    info!("migration finished for all namespaces");
                }
            }
            store.flush()?;
            Ok(())
        }
        Commands::Version => {
            println!("openinv {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_store(cli: &Cli) -> Result<TenantStore, CliError> {
    match &cli.state {
        Some(path) => Ok(TenantStore::open(path)?),
        None => Ok(TenantStore::new()),
    }
}
