//! Vantage - a headless runner for saved relational queries with run-as
//! access verification.

use db_vantage::app::App;
use db_vantage::cli::Cli;
use db_vantage::error::Result;
use db_vantage::logging;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut app = App::from_cli(&cli)?;
    app.run(&cli).await
}
