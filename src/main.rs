use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockroom::config::ServerConfig;
use stockroom::server::{AppState, create_router};
use stockroom::store::{SqliteStore, Store};
use stockroom::transfer::{export_csv, import_csv};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(about = "An inventory server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides PORT, default 4000)
        #[arg(long, short)]
        port: Option<u16>,

        /// SQLite database file (overrides DB_FILE, default ./data.db)
        #[arg(long)]
        db_file: Option<PathBuf>,
    },

    /// Import products from a CSV file
    Import {
        /// CSV file with a name,unit,category,brand,stock,status,image header
        file: PathBuf,

        /// SQLite database file (overrides DB_FILE)
        #[arg(long)]
        db_file: Option<PathBuf>,
    },

    /// Export all products as CSV
    Export {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// SQLite database file (overrides DB_FILE)
        #[arg(long)]
        db_file: Option<PathBuf>,
    },
}

/// Environment first, then command-line flags on top.
fn load_config(
    host: Option<String>,
    port: Option<u16>,
    db_file: Option<PathBuf>,
) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::from_env()?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(db_file) = db_file {
        config.db_file = db_file;
    }
    Ok(config)
}

fn open_store(db_file: &Path) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = db_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let store = SqliteStore::new(db_file)?;
    store.initialize()?;
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    info!("Shutting down");
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let store = open_store(&config.db_file)?;
    info!("Using database {}", config.db_file.display());

    let state = Arc::new(AppState::new(Arc::new(store)));
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn run_import(file: &Path, db_file: &Path) -> anyhow::Result<()> {
    let data = fs::read(file)?;
    let store = open_store(db_file)?;
    let report = import_csv(&store, &data)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_export(output: Option<&Path>, db_file: &Path) -> anyhow::Result<()> {
    let store = open_store(db_file)?;
    let products = store.all_products()?;
    let csv = export_csv(&products)?;

    match output {
        Some(path) => {
            fs::write(path, &csv)?;
            eprintln!("Exported {} products to {}", products.len(), path.display());
        }
        None => std::io::stdout().write_all(&csv)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("stockroom=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            db_file,
        } => run_serve(load_config(host, port, db_file)?).await?,
        Commands::Import { file, db_file } => {
            let config = load_config(None, None, db_file)?;
            run_import(&file, &config.db_file)?
        }
        Commands::Export { output, db_file } => {
            let config = load_config(None, None, db_file)?;
            run_export(output.as_deref(), &config.db_file)?
        }
    }

    Ok(())
}
