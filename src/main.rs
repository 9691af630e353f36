use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payflow::application::ledger::WalletLedger;
use payflow::application::orchestrator::{PaymentOrchestrator, SubmitPaymentRequest};
use payflow::config::Config;
use payflow::domain::payment::PaymentMethod;
use payflow::domain::ports::{GatewaySessionRef, OrderNotifierRef, PaymentStoreRef, WalletStoreRef};
use payflow::domain::wallet::TopUpMethod;
use payflow::error::PaymentError;
use payflow::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryWalletStore};
use payflow::interfaces::csv::command_reader::{CommandKind, CommandReader, PaymentCommand};
use payflow::interfaces::csv::report_writer::ReportWriter;
use payflow::interfaces::gateway::client::HostedCheckoutClient;
use payflow::interfaces::gateway::transport::HttpGatewayTransport;
use payflow::interfaces::orders::notifier::HttpOrderNotifier;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payment commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Also print wallet balances after the payment report.
    #[arg(long)]
    wallets: bool,
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent(path: &std::path::Path) -> Result<(PaymentStoreRef, WalletStoreRef)> {
    let store = payflow::infrastructure::rocksdb::RocksDbStore::open(path).into_diagnostic()?;
    Ok((Arc::new(store.clone()), Arc::new(store)))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent(_path: &std::path::Path) -> Result<(PaymentStoreRef, WalletStoreRef)> {
    Err(miette::miette!(
        "this binary was built without the storage-rocksdb feature"
    ))
}

async fn run_command(
    orchestrator: &PaymentOrchestrator,
    command: PaymentCommand,
) -> payflow::error::Result<()> {
    match command.op {
        CommandKind::Pay => {
            let order_id = command
                .order
                .filter(|order| !order.is_empty())
                .ok_or_else(|| {
                    PaymentError::Validation("pay command requires an order".to_string())
                })?;
            let method: PaymentMethod = command.method.parse()?;
            orchestrator
                .submit_payment(SubmitPaymentRequest {
                    order_id,
                    payer_id: command.payer,
                    amount: command.amount,
                    method,
                    metadata: None,
                })
                .await?;
        }
        CommandKind::Topup => {
            let method: TopUpMethod = command.method.parse()?;
            orchestrator
                .top_up_wallet(&command.payer, command.amount, method)
                .await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let (payments, wallets): (PaymentStoreRef, WalletStoreRef) = match &cli.db_path {
        // Use persistent storage (RocksDB)
        Some(db_path) => open_persistent(db_path)?,
        // Use in-memory storage
        None => (
            Arc::new(InMemoryPaymentStore::new()),
            Arc::new(InMemoryWalletStore::new()),
        ),
    };

    let ledger = WalletLedger::new(Arc::clone(&wallets));
    let transport = HttpGatewayTransport::new(&config).into_diagnostic()?;
    let gateway: GatewaySessionRef = Arc::new(HostedCheckoutClient::new(
        transport,
        config.gateway_merchant_id.clone(),
    ));
    let notifier: OrderNotifierRef = Arc::new(HttpOrderNotifier::new(&config).into_diagnostic()?);
    let orchestrator = PaymentOrchestrator::new(
        Arc::clone(&payments),
        ledger,
        gateway,
        notifier,
        config.currency.clone(),
    );

    // Process commands
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command_result in reader.commands() {
        match command_result {
            Ok(command) => {
                if let Err(e) = run_command(&orchestrator, command).await {
                    eprintln!("Error processing command: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    // Output final state
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer
        .write_payments(payments.all().await.into_diagnostic()?)
        .into_diagnostic()?;
    if cli.wallets {
        writer
            .write_wallets(wallets.all().await.into_diagnostic()?)
            .into_diagnostic()?;
    }

    Ok(())
}
