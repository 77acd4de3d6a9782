use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use wallet_ledger::application::engine::WalletEngine;
use std::time::Duration;
use wallet_ledger::config::{DatabaseConfig, EngineConfig};
use wallet_ledger::infrastructure::in_memory::InMemoryStore;
use wallet_ledger::interfaces::csv::balance_writer::BalanceWriter;
use wallet_ledger::interfaces::csv::command_reader::CommandReader;
use wallet_ledger::interfaces::csv::replay::Replayer;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input wallet commands CSV file
    input: PathBuf,

    /// PostgreSQL connection URL (optional). If provided, wallets are stored in PostgreSQL.
    #[arg(long, env = "WALLET_DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "WALLET_DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Stop waiting for a wallet row lock after this many milliseconds.
    #[arg(long, env = "WALLET_LOCK_TIMEOUT_MS")]
    lock_timeout_ms: Option<u64>,
}

impl Cli {
    /// Database settings, present only when a URL was given.
    fn database_config(&self) -> Option<DatabaseConfig> {
        let url = self.database_url.clone()?;
        Some(DatabaseConfig {
            url,
            max_connections: self.max_connections,
            lock_timeout: self.lock_timeout_ms.map(Duration::from_millis),
        })
    }
}

#[cfg(feature = "storage-postgres")]
async fn build_engine(
    database: Option<DatabaseConfig>,
    config: &EngineConfig,
) -> Result<WalletEngine> {
    use wallet_ledger::infrastructure::postgres::PostgresStore;

    let Some(database) = database else {
        return Ok(WalletEngine::from_store(config, InMemoryStore::new()));
    };
    let store = PostgresStore::connect(&database).await?;
    Ok(WalletEngine::from_store(config, store))
}

#[cfg(not(feature = "storage-postgres"))]
async fn build_engine(
    database: Option<DatabaseConfig>,
    config: &EngineConfig,
) -> Result<WalletEngine> {
    if database.is_some() {
        eprintln!(
            "WARNING: A database URL was provided, but 'storage-postgres' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(WalletEngine::from_store(config, InMemoryStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity; stdout is reserved for the balance report.
    tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .compact()
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    // History paging is not reachable from a replay file, so its defaults stand.
    let config = EngineConfig::default();
    let engine = build_engine(cli.database_config(), &config).await?;
    let mut replayer = Replayer::new(engine);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command_result in reader.commands() {
        match command_result {
            Ok(command) => {
                if let Err(e) = replayer.apply(command).await {
                    eprintln!("Error processing command: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    let balances = replayer.balances().await?;

    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(balances)?;

    Ok(())
}
