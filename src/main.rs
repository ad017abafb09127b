use clap::Parser;
use payoff::cli::{self, Cli};
use payoff::telemetry::init_tracing;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Err(e) = cli::run(cli).await {
        tracing::error!(error = %e, "payoff exited with an error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
