use clap::Parser;
use miette::{IntoDiagnostic, Result};
use penalty_ledger::application::classifier::TransactionClassifier;
use penalty_ledger::application::reconciler::LedgerReconciler;
use penalty_ledger::clock::SystemClock;
use penalty_ledger::config::Config;
use penalty_ledger::domain::ports::{SharedLedgerClient, SharedSnapshotStore};
use penalty_ledger::infrastructure::in_memory::InMemorySnapshotStore;
#[cfg(feature = "storage-rocksdb")]
use penalty_ledger::infrastructure::rocksdb::RocksDbStore;
use penalty_ledger::interfaces::csv::ledger_reader::FileLedgerClient;
use penalty_ledger::interfaces::csv::rule_reader::RuleReader;
use penalty_ledger::interfaces::csv::view_writer::ViewWriter;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reconcile a ledger file and print the resulting penalty view.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Ledger line items CSV file (stands in for the external finance
    /// system)
    input: PathBuf,

    /// Customer code to reconcile
    #[arg(long)]
    customer_code: String,

    /// Company code to reconcile
    #[arg(long, default_value = "LP")]
    company_code: String,

    /// Classification rules CSV (defaults to the built-in rules)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Service configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent snapshot database (optional). If provided, uses
    /// RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path).into_diagnostic()?,
        None => Config::default(),
    };

    let classifier = Arc::new(match &cli.rules {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            RuleReader::new(file).into_classifier().into_diagnostic()?
        }
        None => TransactionClassifier::default_rules(),
    });

    let snapshots = snapshot_store(cli.db_path.as_deref())?;
    let ledger: SharedLedgerClient =
        Arc::new(FileLedgerClient::from_path(&cli.input).into_diagnostic()?);

    let reconciler = LedgerReconciler::new(
        snapshots,
        ledger,
        classifier,
        &config,
        Arc::new(SystemClock),
    );
    let view = reconciler
        .penalty_view(&cli.customer_code, &cli.company_code)
        .await
        .into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ViewWriter::new(stdout.lock());
    writer.write_view(&view).into_diagnostic()?;

    Ok(())
}

fn snapshot_store(db_path: Option<&Path>) -> Result<SharedSnapshotStore> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(RocksDbStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => Err(miette::miette!(
            "--db-path requires a build with the storage-rocksdb feature"
        )),
        None => Ok(Arc::new(InMemorySnapshotStore::new())),
    }
}
