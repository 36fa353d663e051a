use clap::Parser;
use ledgerflow::application::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
use ledgerflow::application::orchestrator::TransactionOrchestrator;
use ledgerflow::config::{CircuitBreakerArgs, EndpointArgs};
use ledgerflow::domain::ports::{AccountLedgerBox, NotificationClientBox, TransactionLogBox};
use ledgerflow::error::OrchestrationError;
use ledgerflow::infrastructure::http::{HttpAccountLedgerClient, HttpNotificationClient};
use ledgerflow::infrastructure::in_memory::{
    InMemoryAccountLedger, InMemoryNotificationClient, InMemoryTransactionLog,
};
use ledgerflow::interfaces::csv::account_reader::AccountReader;
use ledgerflow::interfaces::csv::operation_reader::OperationReader;
use ledgerflow::interfaces::csv::transaction_writer::TransactionWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Operations CSV file (op, account, to_account, amount)
    input: PathBuf,

    /// Accounts CSV (account, holder, balance) seeding the in-memory ledger
    #[arg(long)]
    accounts: Option<PathBuf>,

    /// Print this account's transaction history instead of the processed records
    #[arg(long)]
    history: Option<String>,

    /// Path to persistent transaction log (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(flatten)]
    endpoints: EndpointArgs,

    #[command(flatten)]
    breaker: CircuitBreakerArgs,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ledgerflow=info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn build_ledger(cli: &Cli) -> Result<AccountLedgerBox> {
    if let Some(url) = &cli.endpoints.ledger_url {
        let client = HttpAccountLedgerClient::new(url, cli.endpoints.request_timeout())
            .into_diagnostic()?;
        return Ok(Box::new(client));
    }

    let ledger = InMemoryAccountLedger::new();
    if let Some(path) = &cli.accounts {
        let file = File::open(path).into_diagnostic()?;
        for account in AccountReader::new(file).accounts() {
            ledger.open_account(account.into_diagnostic()?).await;
        }
    }
    Ok(Box::new(ledger))
}

fn build_notifier(cli: &Cli) -> Result<NotificationClientBox> {
    match &cli.endpoints.notification_url {
        Some(url) => {
            let client = HttpNotificationClient::new(url, cli.endpoints.request_timeout())
                .into_diagnostic()?;
            Ok(Box::new(client))
        }
        None => Ok(Box::new(InMemoryNotificationClient::new())),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn build_log(cli: &Cli) -> Result<TransactionLogBox> {
    use ledgerflow::infrastructure::rocksdb::RocksDbTransactionLog;

    match &cli.db_path {
        Some(path) => Ok(Box::new(RocksDbTransactionLog::open(path).into_diagnostic()?)),
        None => Ok(Box::new(InMemoryTransactionLog::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_log(cli: &Cli) -> Result<TransactionLogBox> {
    if cli.db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryTransactionLog::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let breakers = CircuitBreakerRegistry::new(CircuitBreakerConfig::from(&cli.breaker));
    let orchestrator = TransactionOrchestrator::new(
        build_ledger(&cli).await?,
        build_notifier(&cli)?,
        build_log(&cli)?,
        &breakers,
    );

    let mut writer = TransactionWriter::new(io::stdout().lock()).into_diagnostic()?;

    let file = File::open(&cli.input).into_diagnostic()?;
    for operation in OperationReader::new(file).operations() {
        match operation {
            Ok(operation) => match orchestrator.execute(operation).await {
                Ok(record) => {
                    if cli.history.is_none() {
                        writer.write(&record).into_diagnostic()?;
                    }
                }
                // The log could not record the attempt; nothing after it can be trusted.
                Err(err @ OrchestrationError::Storage(_)) => return Err(err).into_diagnostic(),
                Err(err) => eprintln!("Rejected operation: {}", err),
            },
            Err(err) => eprintln!("Error reading operation: {}", err),
        }
    }

    if let Some(account) = &cli.history {
        let history = orchestrator.history(account).await.into_diagnostic()?;
        writer.write_all(&history).into_diagnostic()?;
    }

    writer.flush().into_diagnostic()?;
    Ok(())
}
