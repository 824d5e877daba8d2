use clap::{Parser, Subcommand};
use tracing::info;

use pricewatch::{
    CheckerConfig, ChromeSessionProvider, FsDiagnostics, PriceChecker, RecordStore,
};

#[derive(Debug, Parser)]
#[command(name = "pricewatch")]
#[command(about = "Rental car price tracking driven by headless Chrome")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check prices for every reservation in the record store.
    Run,
    /// Check prices for a single reservation.
    Check { reservation_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = CheckerConfig::from_env()?;

    let store = RecordStore::new(&config.store_url, &config.store_key)?;
    let provider = ChromeSessionProvider::new(config.browser());
    let diagnostics = Box::new(FsDiagnostics::new(&config.screenshot_dir));
    let checker = PriceChecker::new(provider, store, config, diagnostics);

    match cli.command {
        Command::Run => {
            let summary = checker.run_batch().await?;
            info!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "price checking completed"
            );
        }
        Command::Check { reservation_id } => {
            let snapshot = checker.check_by_id(&reservation_id).await?;
            info!(
                reservation = %reservation_id,
                lowest_category = %snapshot.lowest_category,
                lowest_price = snapshot.lowest_price,
                "price check completed"
            );
        }
    }

    Ok(())
}
